//! Raum-Zustand der Sitzung
//!
//! Ein einziges Zustandsobjekt mit Reducer-artigen Uebergaengen: jedes
//! Ereignis veraendert den Zustand synchron und liefert die Effekte, die
//! die Sitzung danach ausfuehrt. Der Reducer selbst macht keine I/O.

use streamflow_core::RoomId;
use streamflow_protocol::{
    AudioActivity, ChatLine, ClientMessage, MediaState, ParticipantInfo, RoomInfo, ServerMessage,
};
use tracing::{debug, trace};

/// Eingaben fuer den Reducer
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Neue Raumliste vom Verzeichnis (ersetzt die alte vollstaendig)
    RoomsLoaded(Vec<RoomInfo>),
    /// Eigener Raum wurde angelegt: anhaengen und auswaehlen
    RoomCreated(RoomInfo),
    Select(RoomId),
    Leave,
    /// Nachricht aus dem Raumkanal
    Server(ServerMessage),
}

/// Vom Reducer angeforderte Nebenwirkungen
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nachricht ueber den Kanal senden (falls offen)
    Send(ClientMessage),
    /// Raumliste neu laden
    RefreshRooms,
    /// Chat-Zeile an die Chat-Ansicht weitergeben
    Chat(ChatLine),
    /// Auswahl hat sich geaendert: Kanal wechseln
    SelectionChanged(Option<RoomId>),
    /// Teilnehmer des gewaehlten Raums haben sich geaendert
    ParticipantsChanged,
    /// Raumliste wurde ersetzt oder erweitert
    RoomsChanged,
}

/// Zustand: Raumliste, Auswahl und eigener Anzeigename
#[derive(Debug, Clone)]
pub struct RoomState {
    eigener_name: String,
    raeume: Vec<RoomInfo>,
    ausgewaehlt: Option<RoomId>,
}

impl RoomState {
    pub fn new(eigener_name: impl Into<String>) -> Self {
        Self {
            eigener_name: eigener_name.into(),
            raeume: Vec::new(),
            ausgewaehlt: None,
        }
    }

    pub fn eigener_name(&self) -> &str {
        &self.eigener_name
    }

    pub fn raeume(&self) -> &[RoomInfo] {
        &self.raeume
    }

    pub fn ausgewaehlt(&self) -> Option<&RoomId> {
        self.ausgewaehlt.as_ref()
    }

    /// Der ausgewaehlte Raum, falls er in der Liste steht
    pub fn aktiver_raum(&self) -> Option<&RoomInfo> {
        let id = self.ausgewaehlt.as_ref()?;
        self.raeume.iter().find(|r| &r.room_id == id)
    }

    fn aktiver_raum_mut(&mut self) -> Option<&mut RoomInfo> {
        let id = self.ausgewaehlt.as_ref()?;
        self.raeume.iter_mut().find(|r| &r.room_id == id)
    }

    /// Eigener Teilnehmer-Datensatz im ausgewaehlten Raum
    pub fn lokaler_teilnehmer(&self) -> Option<&ParticipantInfo> {
        self.aktiver_raum()?.teilnehmer(&self.eigener_name)
    }

    /// Bin ich Host des ausgewaehlten Raums?
    pub fn ist_host(&self) -> bool {
        self.aktiver_raum()
            .is_some_and(|r| r.ist_host(&self.eigener_name))
    }

    /// Bestaetigter Mute-Status (false ohne Teilnehmer-Datensatz)
    pub fn lokal_stumm(&self) -> bool {
        self.lokaler_teilnehmer().is_some_and(|p| p.is_muted)
    }

    /// Wendet ein Ereignis an und liefert die Folge-Effekte
    pub fn apply(&mut self, event: RoomEvent) -> Vec<Effect> {
        match event {
            RoomEvent::RoomsLoaded(raeume) => {
                self.raeume = raeume;
                vec![Effect::RoomsChanged]
            }
            RoomEvent::RoomCreated(raum) => {
                let id = raum.room_id.clone();
                self.raeume.push(raum);
                let mut effekte = vec![Effect::RoomsChanged];
                effekte.extend(self.auswahl_setzen(Some(id)));
                effekte
            }
            RoomEvent::Select(id) => self.auswahl_setzen(Some(id)),
            RoomEvent::Leave => self.auswahl_setzen(None),
            RoomEvent::Server(nachricht) => self.server_nachricht(nachricht),
        }
    }

    fn auswahl_setzen(&mut self, neu: Option<RoomId>) -> Vec<Effect> {
        if self.ausgewaehlt == neu {
            return Vec::new();
        }
        self.ausgewaehlt = neu.clone();
        vec![Effect::SelectionChanged(neu)]
    }

    fn server_nachricht(&mut self, nachricht: ServerMessage) -> Vec<Effect> {
        trace!(art = nachricht.art(), "Kanal-Nachricht");
        match nachricht {
            ServerMessage::Chat(zeile) => vec![Effect::Chat(zeile)],
            ServerMessage::MediaState(stand) => self.media_state(stand),
            ServerMessage::AudioActivity(aktivitaet) => self.audio_activity(aktivitaet),
            ServerMessage::ParticipantList { participants } => {
                match self.aktiver_raum_mut() {
                    Some(raum) => {
                        raum.participants = participants;
                        vec![Effect::ParticipantsChanged]
                    }
                    None => {
                        debug!("Teilnehmerliste ohne aktiven Raum verworfen");
                        Vec::new()
                    }
                }
            }
            ServerMessage::RoomClosed { room_id } => {
                debug!(room_id = ?room_id, "Raum geschlossen");
                let mut effekte = self.auswahl_setzen(None);
                effekte.push(Effect::RefreshRooms);
                effekte
            }
            ServerMessage::Ping => vec![Effect::Send(ClientMessage::Pong)],
        }
    }

    fn media_state(&mut self, stand: MediaState) -> Vec<Effect> {
        let Some(p) = self
            .aktiver_raum_mut()
            .and_then(|r| r.teilnehmer_mut(&stand.user_name))
        else {
            debug!(user = %stand.user_name, "media_state fuer unbekannten Teilnehmer verworfen");
            return Vec::new();
        };
        if let Some(muted) = stand.is_muted {
            p.is_muted = muted;
        }
        if let Some(video_off) = stand.is_video_off {
            p.is_video_off = video_off;
        }
        vec![Effect::ParticipantsChanged]
    }

    fn audio_activity(&mut self, aktivitaet: AudioActivity) -> Vec<Effect> {
        let Some(p) = self
            .aktiver_raum_mut()
            .and_then(|r| r.teilnehmer_mut(&aktivitaet.user_name))
        else {
            debug!(user = %aktivitaet.user_name, "audio_activity fuer unbekannten Teilnehmer verworfen");
            return Vec::new();
        };
        p.is_speaking = Some(aktivitaet.is_speaking);
        vec![Effect::ParticipantsChanged]
    }
}

/// Soll die lokale Hardware erfasst werden?
///
/// Ja, sobald der eigene Teilnehmer existiert und Video oder Audio an ist.
/// Kamera und Mikrofon werden immer gemeinsam angefordert.
pub fn capture_gewuenscht(teilnehmer: Option<&ParticipantInfo>) -> bool {
    teilnehmer.is_some_and(|p| !p.is_video_off || !p.is_muted)
}

// ---------------------------------------------------------------------------
// Chat-Verlauf
// ---------------------------------------------------------------------------

/// Chat-Zeilen des ausgewaehlten Raums
#[derive(Debug, Clone, Default)]
pub struct ChatFeed {
    zeilen: Vec<ChatLine>,
}

impl ChatFeed {
    pub fn zeilen(&self) -> &[ChatLine] {
        &self.zeilen
    }

    pub fn leeren(&mut self) {
        self.zeilen.clear();
    }

    /// Ersetzt den Verlauf (nach dem Laden der Historie). Zeilen, die in
    /// der Zwischenzeit ueber den Kanal kamen, bleiben erhalten.
    pub fn verlauf_setzen(&mut self, verlauf: Vec<ChatLine>) {
        let live = std::mem::replace(&mut self.zeilen, verlauf);
        for zeile in live {
            self.anhaengen(zeile);
        }
    }

    /// Haengt eine Zeile an, sofern ihre ID noch nicht bekannt ist.
    /// Zeilen ohne ID werden immer angehaengt.
    pub fn anhaengen(&mut self, zeile: ChatLine) -> bool {
        if let Some(id) = zeile.id {
            if self.zeilen.iter().any(|z| z.id == Some(id)) {
                return false;
            }
        }
        self.zeilen.push(zeile);
        true
    }
}
