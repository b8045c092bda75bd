//! REST-Datentypen
//!
//! Anfrage- und Antwortformate der HTTP-Endpunkte fuer Raumliste,
//! Raum-Erstellung und Chat-Verlauf. Der Client behandelt diese Aufrufe
//! als undurchsichtige Request/Response-Paare.

use serde::{Deserialize, Serialize};
use streamflow_core::types::RoomId;

use crate::channel::ParticipantInfo;

/// Raum wie ihn `GET /rooms` und `POST /rooms` liefern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Datenbank-ID (nur fuer Sortierung/Anzeige)
    #[serde(default)]
    pub id: i64,
    pub room_id: RoomId,
    pub title: String,
    pub host_name: String,
    #[serde(default)]
    pub host_avatar: String,
    #[serde(default)]
    pub viewers: i64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default = "aktiv_standard")]
    pub is_active: bool,
    #[serde(default)]
    pub participants: Vec<ParticipantInfo>,
}

fn aktiv_standard() -> bool {
    true
}

impl RoomInfo {
    /// Ist `name` der Host dieses Raums?
    pub fn ist_host(&self, name: &str) -> bool {
        self.host_name == name
    }

    /// Sucht einen Teilnehmer ueber den Anzeigenamen
    pub fn teilnehmer(&self, name: &str) -> Option<&ParticipantInfo> {
        self.participants.iter().find(|p| p.name == name)
    }

    /// Veraenderlicher Zugriff auf einen Teilnehmer ueber den Anzeigenamen
    pub fn teilnehmer_mut(&mut self, name: &str) -> Option<&mut ParticipantInfo> {
        self.participants.iter_mut().find(|p| p.name == name)
    }
}

/// Body fuer `POST /rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreate {
    pub title: String,
    pub host_name: String,
}

/// Body fuer `POST /rooms/{room_id}/messages` (Chat-Fallback ohne Kanal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPost {
    pub user_name: String,
    pub text: String,
    pub color: String,
}
