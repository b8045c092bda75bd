//! Gemeinsame Identifikationstypen fuer StreamFlow
//!
//! Die IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Raum-Kennung und Teilnehmer-Kennung zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};

/// Oeffentliche Raum-Kennung (kurzer String, vom Server vergeben)
///
/// Erscheint in allen URLs (`/rooms/{room_id}`, `/ws/{room_id}/{name}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Teilnehmer-Kennung (Datenbank-ID des Servers)
///
/// Wird vom Server mitgeliefert, aber eingehende Ereignisse referenzieren
/// Teilnehmer nur ueber den Anzeigenamen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl ParticipantId {
    /// Gibt die innere ID zurueck
    pub fn inner(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "participant:{}", self.0)
    }
}

/// Rolle eines Teilnehmers im Raum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    #[default]
    Guest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_ist_transparent() {
        let id = RoomId::new("a1b2c3d4");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"a1b2c3d4\"");
        let id2: RoomId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn participant_id_display() {
        let id = ParticipantId(7);
        assert_eq!(id.to_string(), "participant:7");
    }

    #[test]
    fn rolle_kleingeschrieben() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
        let r: Role = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(r, Role::Guest);
    }
}
