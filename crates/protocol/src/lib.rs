//! streamflow-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichten die ueber den Raumkanal
//! (WebSocket, JSON-Textframes) ausgetauscht werden, sowie die
//! Datentypen der REST-Endpunkte fuer Raumliste und Chat-Verlauf.

pub mod channel;
pub mod rest;

pub use channel::{
    AudioActivity, ChatLine, ClientMessage, MediaState, ParticipantInfo, ServerMessage,
};
pub use rest::{ChatPost, RoomCreate, RoomInfo};
