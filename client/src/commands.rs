//! Befehle an die Sitzung
//!
//! Die Oberflaeche (hier: stdin des Headless-Clients) steuert die Sitzung
//! ausschliesslich ueber [`SessionCommand`]s. [`SessionHandle`] ist der
//! klonbare Sender dafuer.

use streamflow_core::RoomId;
use streamflow_video::{QualityTier, StreamSettings};
use tokio::sync::mpsc;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SelectRoom(RoomId),
    /// Raum verlassen; als Host wird der Raum vorher geschlossen
    Leave,
    CreateRoom { title: String },
    ToggleAudio,
    ToggleVideo,
    SendChat(String),
    UpdateSettings(StreamSettings),
    RefreshRooms,
    Shutdown,
}

/// Klonbarer Zugriff auf eine laufende Sitzung
#[derive(Debug, Clone)]
pub struct SessionHandle {
    befehle: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(befehle: mpsc::Sender<SessionCommand>) -> Self {
        Self { befehle }
    }

    pub async fn senden(&self, befehl: SessionCommand) -> ClientResult<()> {
        self.befehle
            .send(befehl)
            .await
            .map_err(|_| ClientError::SitzungBeendet)
    }

    pub async fn raum_waehlen(&self, room: impl Into<RoomId>) -> ClientResult<()> {
        self.senden(SessionCommand::SelectRoom(room.into())).await
    }

    pub async fn verlassen(&self) -> ClientResult<()> {
        self.senden(SessionCommand::Leave).await
    }

    pub async fn beenden(&self) -> ClientResult<()> {
        self.senden(SessionCommand::Shutdown).await
    }
}

// ---------------------------------------------------------------------------
// Textbefehle
// ---------------------------------------------------------------------------

/// Ergebnis einer Eingabezeile
#[derive(Debug, Clone, PartialEq)]
pub enum Eingabe {
    Befehl(SessionCommand),
    /// Raumliste anzeigen (nur lokal)
    RaeumeAnzeigen,
    Hilfe,
    Leer,
}

pub const HILFE: &str = "\
/rooms            Raumliste anzeigen
/refresh          Raumliste neu laden
/create <titel>   Raum anlegen und betreten
/join <room_id>   Raum betreten
/leave            Raum verlassen
/mute             Mikrofon umschalten
/video            Kamera umschalten
/quality <q>      360p | 720p | 1080p
/fps <n>          10 | 30 | 60
/quit             Beenden
<text>            Chat-Nachricht";

/// Parst eine Eingabezeile. `settings` sind die aktuellen Einstellungen,
/// auf die `/quality` und `/fps` aufsetzen.
pub fn eingabe_parsen(zeile: &str, settings: StreamSettings) -> Result<Eingabe, String> {
    let zeile = zeile.trim();
    if zeile.is_empty() {
        return Ok(Eingabe::Leer);
    }
    if !zeile.starts_with('/') {
        return Ok(Eingabe::Befehl(SessionCommand::SendChat(zeile.to_string())));
    }

    let (befehl, argument) = match zeile.split_once(char::is_whitespace) {
        Some((b, a)) => (b, a.trim()),
        None => (zeile, ""),
    };

    let befehl = match befehl {
        "/rooms" => return Ok(Eingabe::RaeumeAnzeigen),
        "/help" => return Ok(Eingabe::Hilfe),
        "/refresh" => SessionCommand::RefreshRooms,
        "/create" if !argument.is_empty() => SessionCommand::CreateRoom {
            title: argument.to_string(),
        },
        "/create" => return Err("Titel fehlt: /create <titel>".into()),
        "/join" if !argument.is_empty() => SessionCommand::SelectRoom(RoomId::new(argument)),
        "/join" => return Err("Raum fehlt: /join <room_id>".into()),
        "/leave" => SessionCommand::Leave,
        "/mute" => SessionCommand::ToggleAudio,
        "/video" => SessionCommand::ToggleVideo,
        "/quality" => {
            let quality: QualityTier = argument.parse().map_err(|e| format!("{e}"))?;
            SessionCommand::UpdateSettings(StreamSettings { quality, ..settings })
        }
        "/fps" => {
            let fps: u32 = argument
                .parse()
                .map_err(|_| format!("Keine Zahl: '{argument}'"))?;
            let neu = StreamSettings::new(settings.quality, fps).map_err(|e| e.to_string())?;
            SessionCommand::UpdateSettings(neu)
        }
        "/quit" | "/exit" => SessionCommand::Shutdown,
        andere => return Err(format!("Unbekannter Befehl: {andere}")),
    };
    Ok(Eingabe::Befehl(befehl))
}
