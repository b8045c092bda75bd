//! Raumkanal-Protokoll (WebSocket)
//!
//! Definiert alle Nachrichten die ueber die eine WebSocket-Verbindung pro
//! Raum zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Jede Nachricht ist ein JSON-Textframe mit einem `type`-Feld
//! - Getrennte Enums fuer beide Richtungen, weil `chat` und `audio_activity`
//!   je nach Richtung unterschiedliche Felder tragen
//! - Keine Request-IDs: Nachrichten sind idempotent bzw. last-write-wins
//! - Senden ist fire-and-forget, es gibt keine Bestaetigung

use serde::{Deserialize, Serialize};
use streamflow_core::types::{ParticipantId, Role, RoomId};

// ---------------------------------------------------------------------------
// Teilnehmer
// ---------------------------------------------------------------------------

/// Teilnehmer-Datensatz wie ihn der Server ausliefert
///
/// `id` fehlt in der Raumliste der REST-API und ist daher optional.
/// `is_speaking` wird nie vom Server gesetzt, sondern nur lokal aus
/// `audio_activity`-Ereignissen zusammengefuehrt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParticipantId>,
    /// Anzeigename (dient gleichzeitig als Zuordnungsschluessel)
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_video_off: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_speaking: Option<bool>,
}

impl ParticipantInfo {
    /// Erstellt einen Gast ohne Server-ID (v.a. fuer Tests und lokale Platzhalter)
    pub fn gast(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            role: Role::Guest,
            avatar: String::new(),
            is_muted: false,
            is_video_off: false,
            is_speaking: None,
        }
    }

    /// Sprech-Flag unter Beruecksichtigung der Stummschaltung
    ///
    /// Ein stummgeschalteter Teilnehmer spricht nie, egal was zuletzt
    /// per `audio_activity` gemeldet wurde.
    pub fn spricht(&self) -> bool {
        !self.is_muted && self.is_speaking.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Eingehende Nachrichten (Server -> Client)
// ---------------------------------------------------------------------------

/// Chat-Zeile (eingehend ueber den Kanal oder aus dem REST-Verlauf)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLine {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Zeitstempel wie vom Server formatiert (nicht weiter interpretiert)
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ChatLine {
    /// Absender fuer die Anzeige, "?" wenn der Server keinen mitschickt
    pub fn absender(&self) -> &str {
        self.user_name.as_deref().unwrap_or("?")
    }
}

/// Teil-Aktualisierung der Geraete-Flags eines Teilnehmers
///
/// Fehlende (oder `null`) Felder behalten ihren bisherigen Wert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaState {
    pub user_name: String,
    #[serde(default)]
    pub is_muted: Option<bool>,
    #[serde(default)]
    pub is_video_off: Option<bool>,
}

/// Sprech-Aktivitaet eines Teilnehmers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioActivity {
    pub user_name: String,
    #[serde(default)]
    pub is_speaking: bool,
}

/// Alle Nachrichten die der Server an den Client schickt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Chat(ChatLine),
    MediaState(MediaState),
    ParticipantList {
        participants: Vec<ParticipantInfo>,
    },
    AudioActivity(AudioActivity),
    RoomClosed {
        #[serde(default)]
        room_id: Option<RoomId>,
    },
    Ping,
}

impl ServerMessage {
    /// Deserialisiert eine Nachricht aus einem JSON-Textframe
    pub fn from_json(json: &str) -> streamflow_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialisiert die Nachricht (fuer Tests und Server-Attrappen)
    pub fn to_json(&self) -> streamflow_core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Kurzname fuer Logs
    pub fn art(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::MediaState(_) => "media_state",
            Self::ParticipantList { .. } => "participant_list",
            Self::AudioActivity(_) => "audio_activity",
            Self::RoomClosed { .. } => "room_closed",
            Self::Ping => "ping",
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten (Client -> Server)
// ---------------------------------------------------------------------------

/// Alle Nachrichten die der Client an den Server schickt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Chat {
        text: String,
        color: String,
    },
    /// Wunsch nach Aenderung der Geraete-Flags; genau ein Feld ist gesetzt
    MediaToggle {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_muted: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_video_off: Option<bool>,
    },
    /// Der Server ergaenzt den Absender selbst
    AudioActivity {
        is_speaking: bool,
    },
    /// Kodierter Einzelframe als Data-URL (`data:image/jpeg;base64,...`)
    VideoFrame {
        data: String,
    },
    Pong,
}

impl ClientMessage {
    pub fn mute(is_muted: bool) -> Self {
        Self::MediaToggle {
            is_muted: Some(is_muted),
            is_video_off: None,
        }
    }

    pub fn video_off(is_video_off: bool) -> Self {
        Self::MediaToggle {
            is_muted: None,
            is_video_off: Some(is_video_off),
        }
    }

    /// Serialisiert die Nachricht als JSON-Textframe
    pub fn to_json(&self) -> streamflow_core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialisiert eine Nachricht (fuer Tests und Server-Attrappen)
    pub fn from_json(json: &str) -> streamflow_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Kurzname fuer Logs
    pub fn art(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::MediaToggle { .. } => "media_toggle",
            Self::AudioActivity { .. } => "audio_activity",
            Self::VideoFrame { .. } => "video_frame",
            Self::Pong => "pong",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
