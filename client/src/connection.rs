//! Raumkanal: eine WebSocket-Verbindung pro ausgewaehltem Raum
//!
//! Der Verbindungsaufbau laeuft im Hintergrund; bis dahin steht der Kanal
//! auf `Connecting`. Gesendet wird nur im Zustand `Open`, alles andere
//! wird stillschweigend verworfen (fire-and-forget, hoechstens einmal).
//!
//! Eingehende Nachrichten kommen als [`ChannelEvent`] ueber einen
//! mpsc-Kanal in die Sitzungs-Schleife.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use streamflow_core::RoomId;
use streamflow_protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Zustand und Ereignisse
// ---------------------------------------------------------------------------

/// Verbindungszustand (Werte wie WebSocket.readyState)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    fn aus_u8(wert: u8) -> Self {
        match wert {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Gemeinsam genutzter Verbindungszustand (Transport schreibt, Kanal liest)
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub fn new(zustand: ReadyState) -> Self {
        Self(Arc::new(AtomicU8::new(zustand as u8)))
    }

    pub fn get(&self) -> ReadyState {
        ReadyState::aus_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, zustand: ReadyState) {
        self.0.store(zustand as u8, Ordering::Release);
    }
}

/// Ereignisse einer Kanal-Verbindung
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened,
    Message(ServerMessage),
    Closed,
}

// ---------------------------------------------------------------------------
// Transport-Abstraktion
// ---------------------------------------------------------------------------

/// Sendeseite einer Kanal-Verbindung
pub trait ChannelTransport: Send {
    fn ready_state(&self) -> ReadyState;

    /// Uebergibt einen Textframe; darf nur im Zustand `Open` gerufen werden
    fn transmit(&mut self, text: String);

    fn close(&mut self);
}

/// Baut Kanal-Verbindungen auf
pub trait ChannelConnector: Send + Sync {
    /// Startet den Verbindungsaufbau und kehrt sofort zurueck
    fn connect(
        &self,
        room: &RoomId,
        user_name: &str,
    ) -> (Box<dyn ChannelTransport>, mpsc::UnboundedReceiver<ChannelEvent>);
}

// ---------------------------------------------------------------------------
// RoomChannel
// ---------------------------------------------------------------------------

/// Die (einzige) offene Verbindung zum ausgewaehlten Raum
///
/// Droppen schliesst die Verbindung.
pub struct RoomChannel {
    room: RoomId,
    transport: Box<dyn ChannelTransport>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl RoomChannel {
    pub fn oeffnen(connector: &dyn ChannelConnector, room: RoomId, user_name: &str) -> Self {
        info!(room = %room, user = user_name, "Oeffne Raumkanal");
        let (transport, events) = connector.connect(&room, user_name);
        Self {
            room,
            transport,
            events,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn ready_state(&self) -> ReadyState {
        self.transport.ready_state()
    }

    pub fn ist_offen(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Sendet eine Nachricht, falls der Kanal offen ist.
    ///
    /// Gibt zurueck ob die Nachricht an den Transport ging. Ein
    /// geschlossener Kanal ist kein Fehler.
    pub fn send(&mut self, nachricht: &ClientMessage) -> bool {
        if !self.ist_offen() {
            trace!(art = nachricht.art(), zustand = ?self.ready_state(), "Kanal nicht offen, Nachricht verworfen");
            return false;
        }
        match nachricht.to_json() {
            Ok(json) => {
                self.transport.transmit(json);
                true
            }
            Err(e) => {
                warn!(art = nachricht.art(), "Nachricht nicht serialisierbar: {}", e);
                false
            }
        }
    }

    /// Naechstes Ereignis. Nach dem Ende der Verbindung wartet die Methode
    /// unbegrenzt.
    pub async fn recv(&mut self) -> ChannelEvent {
        match self.events.recv().await {
            Some(ev) => ev,
            None => std::future::pending().await,
        }
    }
}

impl Drop for RoomChannel {
    fn drop(&mut self) {
        self.transport.close();
        debug!(room = %self.room, "Raumkanal geschlossen");
    }
}

/// Empfaengt vom Kanal, falls einer offen ist
pub async fn kanal_empfangen(kanal: Option<&mut RoomChannel>) -> ChannelEvent {
    match kanal {
        Some(k) => k.recv().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// WebSocket-Implementierung
// ---------------------------------------------------------------------------

/// Verbindet zu `ws://<host>/ws/{room_id}/{user_name}`
#[derive(Debug, Clone)]
pub struct WsConnector {
    basis_url: String,
}

impl WsConnector {
    pub fn new(basis_url: impl Into<String>) -> Self {
        Self {
            basis_url: basis_url.into(),
        }
    }

    pub fn url(&self, room: &RoomId, user_name: &str) -> String {
        format!(
            "{}/ws/{}/{}",
            self.basis_url.trim_end_matches('/'),
            room,
            user_name
        )
    }
}

impl ChannelConnector for WsConnector {
    fn connect(
        &self,
        room: &RoomId,
        user_name: &str,
    ) -> (Box<dyn ChannelTransport>, mpsc::UnboundedReceiver<ChannelEvent>) {
        let zustand = SharedReadyState::new(ReadyState::Connecting);
        let cancel = CancellationToken::new();
        let (ausgang_tx, ausgang_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(verbindung_betreiben(
            self.url(room, user_name),
            zustand.clone(),
            cancel.clone(),
            ausgang_rx,
            event_tx,
        ));

        let transport = WsTransport {
            zustand,
            ausgang: ausgang_tx,
            cancel,
        };
        (Box::new(transport), event_rx)
    }
}

/// Sendeseite der WebSocket-Verbindung
pub struct WsTransport {
    zustand: SharedReadyState,
    ausgang: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl ChannelTransport for WsTransport {
    fn ready_state(&self) -> ReadyState {
        self.zustand.get()
    }

    fn transmit(&mut self, text: String) {
        // Verbindungs-Task kann bereits beendet sein
        let _ = self.ausgang.send(text);
    }

    fn close(&mut self) {
        if self.zustand.get() != ReadyState::Closed {
            self.zustand.set(ReadyState::Closing);
        }
        self.cancel.cancel();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Verbindungs-Task: Aufbau, Lesen, Schreiben, Abbau
async fn verbindung_betreiben(
    url: String,
    zustand: SharedReadyState,
    cancel: CancellationToken,
    mut ausgang: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let verbindung = tokio::select! {
        _ = cancel.cancelled() => {
            zustand.set(ReadyState::Closed);
            return;
        }
        v = tokio_tungstenite::connect_async(url.as_str()) => v,
    };

    let ws = match verbindung {
        Ok((ws, _antwort)) => ws,
        Err(e) => {
            warn!(url = %url, "Raumkanal-Verbindung fehlgeschlagen: {}", e);
            zustand.set(ReadyState::Closed);
            let _ = events.send(ChannelEvent::Closed);
            return;
        }
    };

    zustand.set(ReadyState::Open);
    info!(url = %url, "Raumkanal offen");
    let _ = events.send(ChannelEvent::Opened);

    let (mut schreiber, mut leser) = ws.split();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = schreiber.send(Message::Close(None)).await;
                break;
            }
            text = ausgang.recv() => {
                let Some(text) = text else { break };
                if let Err(e) = schreiber.send(Message::Text(text.into())).await {
                    warn!("Senden auf Raumkanal fehlgeschlagen: {}", e);
                    break;
                }
            }
            eingang = leser.next() => match eingang {
                Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                    Ok(nachricht) => {
                        let _ = events.send(ChannelEvent::Message(nachricht));
                    }
                    Err(e) => warn!("Unbekannte Kanal-Nachricht verworfen: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Raumkanal vom Server geschlossen");
                    break;
                }
                // Ping/Pong auf WebSocket-Ebene erledigt tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Lesefehler auf Raumkanal: {}", e);
                    break;
                }
            },
        }
    }

    zustand.set(ReadyState::Closed);
    let _ = events.send(ChannelEvent::Closed);
    info!(url = %url, "Raumkanal beendet");
}
