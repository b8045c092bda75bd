//! Sitzungs-Schleife
//!
//! Ein einziger Task verarbeitet alle Ereignisse nacheinander: Befehle,
//! REST-Antworten, Kanal-Nachrichten, Capture-Ergebnisse, Refresh-Takte
//! und die periodische Raumabfrage. Nach jedem Ereignis werden Capture,
//! Sprech-Erkennung und Frame-Versand mit dem Raum-Zustand abgeglichen.
//!
//! Es gibt keine Locks auf dem Sitzungszustand; nur die Schleife selbst
//! veraendert ihn.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use streamflow_core::RoomId;
use streamflow_protocol::{ChatLine, ChatPost, ClientMessage, ParticipantInfo, RoomCreate, RoomInfo};
use streamflow_video::{FrameEncoder, StreamSettings};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::activity::ActivityDetector;
use crate::api::RoomDirectory;
use crate::commands::{SessionCommand, SessionHandle};
use crate::config::ClientConfig;
use crate::connection::{kanal_empfangen, ChannelConnector, ChannelEvent, RoomChannel};
use crate::error::ClientResult;
use crate::media::{CaptureDevice, MediaSource};
use crate::pipeline::{FrameSink, FrameTransmitter};
use crate::reconciler::{Abgleich, DeviceReconciler};
use crate::scheduler::{FrameToken, RefreshScheduler};
use crate::state::{capture_gewuenscht, ChatFeed, Effect, RoomEvent, RoomState};

/// Puffer fuer Befehle an die Sitzung
const BEFEHL_PUFFER: usize = 64;

/// Einstellungen einer Sitzung
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_name: String,
    pub chat_farbe: String,
    pub poll_intervall: Duration,
    pub settings: StreamSettings,
}

impl SessionConfig {
    pub fn aus_config(config: &ClientConfig) -> Self {
        Self {
            user_name: config.profil.name.clone(),
            chat_farbe: config.profil.chat_farbe.clone(),
            poll_intervall: config.poll_intervall(),
            settings: config.stream,
        }
    }
}

/// Austauschbare Bausteine einer Sitzung
pub struct SessionParts {
    pub connector: Arc<dyn ChannelConnector>,
    pub directory: Arc<dyn RoomDirectory>,
    pub geraet: Arc<dyn CaptureDevice>,
    pub takt: Box<dyn RefreshScheduler>,
    pub kodierer: Box<dyn FrameEncoder>,
}

/// Beobachtbare Aenderungen der Sitzung
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Rooms(Vec<RoomInfo>),
    Selection(Option<RoomId>),
    ChannelOpened(RoomId),
    ChannelClosed(RoomId),
    Participants(Vec<ParticipantInfo>),
    ChatHistory(Vec<ChatLine>),
    Chat(ChatLine),
    /// Eigenes Sprech-Flag hat sich geaendert
    Speaking(bool),
    /// Lokaler Capture aktiv / freigegeben
    Capture(bool),
    Settings(StreamSettings),
    Fehler(String),
}

/// Antworten der REST-Tasks
enum Antwort {
    Raeume(ClientResult<Vec<RoomInfo>>),
    RaumErstellt(ClientResult<RoomInfo>),
    RaumGeschlossen(RoomId, ClientResult<()>),
    Verlauf(RoomId, ClientResult<Vec<ChatLine>>),
    ChatGesendet(ClientResult<()>),
}

enum LoopEvent {
    Befehl(Option<SessionCommand>),
    Antwort(Antwort),
    Kanal(ChannelEvent),
    Erfasst(ClientResult<Arc<dyn MediaSource>>),
    Refresh(Instant, Vec<FrameToken>),
    Poll,
}

pub struct Session {
    config: SessionConfig,
    state: RoomState,
    chat: ChatFeed,
    settings: StreamSettings,

    connector: Arc<dyn ChannelConnector>,
    directory: Arc<dyn RoomDirectory>,
    kanal: Option<RoomChannel>,

    reconciler: DeviceReconciler,
    detektor: ActivityDetector,
    pipeline: FrameTransmitter,
    pipeline_raum: Option<RoomId>,
    takt: Box<dyn RefreshScheduler>,

    befehle: mpsc::Receiver<SessionCommand>,
    antworten_tx: mpsc::UnboundedSender<Antwort>,
    antworten_rx: mpsc::UnboundedReceiver<Antwort>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        parts: SessionParts,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (befehl_tx, befehl_rx) = mpsc::channel(BEFEHL_PUFFER);
        let (antworten_tx, antworten_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let session = Self {
            state: RoomState::new(config.user_name.clone()),
            chat: ChatFeed::default(),
            settings: config.settings,
            connector: parts.connector,
            directory: parts.directory,
            kanal: None,
            reconciler: DeviceReconciler::new(parts.geraet),
            detektor: ActivityDetector::new(),
            pipeline: FrameTransmitter::new(parts.kodierer, config.settings),
            pipeline_raum: None,
            takt: parts.takt,
            befehle: befehl_rx,
            antworten_tx,
            antworten_rx,
            updates: update_tx,
            config,
        };
        (session, SessionHandle::new(befehl_tx), update_rx)
    }

    /// Laeuft bis `Shutdown` oder bis alle Handles gedroppt sind
    pub async fn run(mut self) -> ClientResult<()> {
        info!(user = %self.config.user_name, "Sitzung gestartet");
        self.raeume_laden();

        let periode = self.config.poll_intervall;
        let mut poll = tokio::time::interval_at(Instant::now() + periode, periode);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let ereignis = tokio::select! {
                befehl = self.befehle.recv() => LoopEvent::Befehl(befehl),
                Some(antwort) = self.antworten_rx.recv() => LoopEvent::Antwort(antwort),
                ev = kanal_empfangen(self.kanal.as_mut()) => LoopEvent::Kanal(ev),
                ergebnis = self.reconciler.anforderung_abwarten() => LoopEvent::Erfasst(ergebnis),
                (jetzt, tokens) = self.takt.next_frame() => LoopEvent::Refresh(jetzt, tokens),
                _ = poll.tick() => LoopEvent::Poll,
            };

            match ereignis {
                LoopEvent::Befehl(None) | LoopEvent::Befehl(Some(SessionCommand::Shutdown)) => {
                    break
                }
                LoopEvent::Befehl(Some(befehl)) => self.befehl_ausfuehren(befehl),
                LoopEvent::Antwort(antwort) => self.antwort_verarbeiten(antwort),
                LoopEvent::Kanal(ev) => self.kanal_ereignis(ev),
                LoopEvent::Erfasst(ergebnis) => self.capture_installieren(ergebnis),
                LoopEvent::Refresh(jetzt, tokens) => self.refresh(jetzt, tokens),
                LoopEvent::Poll => self.raeume_laden(),
            }
            self.abgleichen();
        }

        self.beenden();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Befehle
    // -----------------------------------------------------------------------

    fn befehl_ausfuehren(&mut self, befehl: SessionCommand) {
        debug!(befehl = ?befehl, "Befehl");
        match befehl {
            SessionCommand::SelectRoom(room) => self.anwenden(RoomEvent::Select(room)),
            SessionCommand::Leave => self.verlassen(),
            SessionCommand::CreateRoom { title } => {
                let anfrage = RoomCreate {
                    title,
                    host_name: self.config.user_name.clone(),
                };
                let directory = Arc::clone(&self.directory);
                self.aufgabe(async move {
                    Antwort::RaumErstellt(directory.create_room(&anfrage).await)
                });
            }
            SessionCommand::ToggleAudio => {
                let Some(stumm) = self.state.lokaler_teilnehmer().map(|p| !p.is_muted) else {
                    debug!("Kein eigener Teilnehmer, Mute ignoriert");
                    return;
                };
                self.reconciler.audio_setzen(!stumm);
                self.senden(&ClientMessage::mute(stumm));
            }
            SessionCommand::ToggleVideo => {
                let Some(aus) = self.state.lokaler_teilnehmer().map(|p| !p.is_video_off) else {
                    debug!("Kein eigener Teilnehmer, Video-Umschaltung ignoriert");
                    return;
                };
                self.senden(&ClientMessage::video_off(aus));
            }
            SessionCommand::SendChat(text) => self.chat_senden(text),
            SessionCommand::UpdateSettings(settings) => {
                if let Err(e) = settings.pruefen() {
                    warn!("Stream-Einstellungen abgelehnt: {}", e);
                    return;
                }
                info!(quality = %settings.quality, fps = settings.fps, "Stream-Einstellungen geaendert");
                self.settings = settings;
                self.melden(SessionUpdate::Settings(settings));
            }
            SessionCommand::RefreshRooms => self.raeume_laden(),
            SessionCommand::Shutdown => {}
        }
    }

    fn verlassen(&mut self) {
        let Some(room) = self.state.ausgewaehlt().cloned() else {
            return;
        };
        if !self.state.ist_host() {
            self.anwenden(RoomEvent::Leave);
            return;
        }
        // Host schliesst den Raum, bevor er ihn verlaesst
        info!(room = %room, "Schliesse eigenen Raum");
        let directory = Arc::clone(&self.directory);
        self.aufgabe(async move {
            let ergebnis = directory.close_room(&room).await;
            Antwort::RaumGeschlossen(room, ergebnis)
        });
    }

    fn chat_senden(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        if let Some(kanal) = self.kanal.as_mut().filter(|k| k.ist_offen()) {
            kanal.send(&ClientMessage::Chat {
                text,
                color: self.config.chat_farbe.clone(),
            });
            return;
        }
        let Some(room) = self.state.ausgewaehlt().cloned() else {
            debug!("Kein Raum ausgewaehlt, Chat verworfen");
            return;
        };
        let post = ChatPost {
            user_name: self.config.user_name.clone(),
            text,
            color: self.config.chat_farbe.clone(),
        };
        let directory = Arc::clone(&self.directory);
        self.aufgabe(async move { Antwort::ChatGesendet(directory.post_chat(&room, &post).await) });
    }

    // -----------------------------------------------------------------------
    // Antworten und Kanal
    // -----------------------------------------------------------------------

    fn antwort_verarbeiten(&mut self, antwort: Antwort) {
        match antwort {
            Antwort::Raeume(Ok(raeume)) => self.anwenden(RoomEvent::RoomsLoaded(raeume)),
            Antwort::Raeume(Err(e)) => warn!("Raumliste nicht abrufbar: {}", e),
            Antwort::RaumErstellt(Ok(raum)) => {
                info!(room = %raum.room_id, title = %raum.title, "Raum angelegt");
                self.anwenden(RoomEvent::RoomCreated(raum));
            }
            Antwort::RaumErstellt(Err(e)) => {
                error!("Raum konnte nicht angelegt werden: {}", e);
                self.melden(SessionUpdate::Fehler(e.to_string()));
            }
            Antwort::RaumGeschlossen(room, ergebnis) => {
                if let Err(e) = ergebnis {
                    error!(room = %room, "Raum konnte nicht geschlossen werden: {}", e);
                }
                if self.state.ausgewaehlt() == Some(&room) {
                    self.anwenden(RoomEvent::Leave);
                }
            }
            Antwort::Verlauf(room, Ok(verlauf)) => {
                if self.state.ausgewaehlt() != Some(&room) {
                    return;
                }
                self.chat.verlauf_setzen(verlauf);
                self.melden(SessionUpdate::ChatHistory(self.chat.zeilen().to_vec()));
            }
            Antwort::Verlauf(room, Err(e)) => {
                warn!(room = %room, "Chat-Verlauf nicht abrufbar: {}", e)
            }
            Antwort::ChatGesendet(Ok(())) => debug!("Chat ueber HTTP gesendet"),
            Antwort::ChatGesendet(Err(e)) => warn!("Chat-Fallback fehlgeschlagen: {}", e),
        }
    }

    fn kanal_ereignis(&mut self, ev: ChannelEvent) {
        let Some(room) = self.kanal.as_ref().map(|k| k.room().clone()) else {
            return;
        };
        match ev {
            ChannelEvent::Opened => self.melden(SessionUpdate::ChannelOpened(room)),
            ChannelEvent::Message(nachricht) => self.anwenden(RoomEvent::Server(nachricht)),
            ChannelEvent::Closed => {
                warn!(room = %room, "Raumkanal geschlossen");
                self.melden(SessionUpdate::ChannelClosed(room));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reducer und Effekte
    // -----------------------------------------------------------------------

    fn anwenden(&mut self, ereignis: RoomEvent) {
        let effekte = self.state.apply(ereignis);
        for effekt in effekte {
            self.effekt_ausfuehren(effekt);
        }
    }

    fn effekt_ausfuehren(&mut self, effekt: Effect) {
        match effekt {
            Effect::Send(nachricht) => self.senden(&nachricht),
            Effect::RefreshRooms => self.raeume_laden(),
            Effect::Chat(zeile) => {
                if self.chat.anhaengen(zeile.clone()) {
                    self.melden(SessionUpdate::Chat(zeile));
                }
            }
            Effect::SelectionChanged(auswahl) => self.auswahl_wechseln(auswahl),
            Effect::ParticipantsChanged => {
                let teilnehmer = self
                    .state
                    .aktiver_raum()
                    .map(|r| r.participants.clone())
                    .unwrap_or_default();
                self.melden(SessionUpdate::Participants(teilnehmer));
            }
            Effect::RoomsChanged => {
                self.melden(SessionUpdate::Rooms(self.state.raeume().to_vec()));
            }
        }
    }

    /// Schliesst den alten Kanal und oeffnet (falls ausgewaehlt) den neuen
    fn auswahl_wechseln(&mut self, auswahl: Option<RoomId>) {
        // Der alte Raum soll das Ende des Sprechens noch sehen
        self.detektor_zuruecksetzen();
        self.kanal = None;
        self.chat.leeren();

        if let Some(room) = auswahl.clone() {
            self.kanal = Some(RoomChannel::oeffnen(
                self.connector.as_ref(),
                room.clone(),
                &self.config.user_name,
            ));
            let directory = Arc::clone(&self.directory);
            self.aufgabe(async move {
                let ergebnis = directory.chat_history(&room).await;
                Antwort::Verlauf(room, ergebnis)
            });
        }
        self.melden(SessionUpdate::Selection(auswahl));
    }

    // -----------------------------------------------------------------------
    // Capture, Detektor, Pipeline
    // -----------------------------------------------------------------------

    fn capture_installieren(&mut self, ergebnis: ClientResult<Arc<dyn MediaSource>>) {
        let gewuenscht = capture_gewuenscht(self.state.lokaler_teilnehmer());
        let audio_aktiv = !self.state.lokal_stumm();
        if self
            .reconciler
            .installieren(ergebnis, gewuenscht, audio_aktiv)
            .is_some()
        {
            self.melden(SessionUpdate::Capture(true));
        }
    }

    fn refresh(&mut self, jetzt: Instant, tokens: Vec<FrameToken>) {
        for token in tokens {
            if self.detektor.besitzt(token) {
                if let Some(spricht) = self.detektor.frame(token, self.takt.as_mut()) {
                    self.sprechen_melden(spricht);
                }
            } else if self.pipeline.besitzt(token) {
                let kanal = self.kanal.as_mut().map(|k| k as &mut dyn FrameSink);
                self.pipeline.frame(token, jetzt, kanal, self.takt.as_mut());
            }
        }
    }

    fn sprechen_melden(&mut self, spricht: bool) {
        debug!(spricht, "Sprech-Flag geaendert");
        self.senden(&ClientMessage::AudioActivity {
            is_speaking: spricht,
        });
        self.melden(SessionUpdate::Speaking(spricht));
    }

    fn detektor_zuruecksetzen(&mut self) {
        if let Some(spricht) = self.detektor.beenden(self.takt.as_mut()) {
            self.sprechen_melden(spricht);
        }
    }

    /// Bringt Capture, Detektor und Pipeline auf den aktuellen Zustand
    fn abgleichen(&mut self) {
        let gewuenscht = capture_gewuenscht(self.state.lokaler_teilnehmer());
        if self.reconciler.abgleichen(gewuenscht) == Abgleich::Freigegeben {
            self.melden(SessionUpdate::Capture(false));
        }
        let handle = self.reconciler.handle();

        let stumm = self.state.lokal_stumm();
        if let Some(spricht) = self
            .detektor
            .aktualisieren(handle.as_ref(), stumm, self.takt.as_mut())
        {
            self.sprechen_melden(spricht);
        }

        let raum = self.state.aktiver_raum().map(|r| r.room_id.clone());
        match (handle, raum) {
            (Some(handle), Some(raum)) => {
                let neu = self.pipeline.quelle_generation() != Some(handle.generation())
                    || self.pipeline.settings() != self.settings
                    || self.pipeline_raum.as_ref() != Some(&raum);
                if neu {
                    self.pipeline
                        .starten(handle, self.settings, self.takt.as_mut());
                    self.pipeline_raum = Some(raum);
                }
            }
            _ => {
                if self.pipeline.laeuft() {
                    self.pipeline.stoppen(self.takt.as_mut());
                }
                self.pipeline_raum = None;
            }
        }
    }

    fn beenden(&mut self) {
        self.detektor_zuruecksetzen();
        self.kanal = None;
        self.pipeline.stoppen(self.takt.as_mut());
        self.reconciler.freigeben();
        info!(
            frames = self.pipeline.gesendet(),
            anforderungen = self.reconciler.anforderungen(),
            "Sitzung beendet"
        );
    }

    // -----------------------------------------------------------------------
    // Hilfen
    // -----------------------------------------------------------------------

    fn senden(&mut self, nachricht: &ClientMessage) {
        if let Some(kanal) = self.kanal.as_mut() {
            kanal.send(nachricht);
        }
    }

    fn raeume_laden(&self) {
        let directory = Arc::clone(&self.directory);
        self.aufgabe(async move { Antwort::Raeume(directory.list_rooms().await) });
    }

    /// Fuehrt einen REST-Aufruf in einem eigenen Task aus; die Antwort
    /// kommt als Ereignis zurueck in die Schleife
    fn aufgabe<F>(&self, f: F)
    where
        F: Future<Output = Antwort> + Send + 'static,
    {
        let tx = self.antworten_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f.await);
        });
    }

    fn melden(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }
}
