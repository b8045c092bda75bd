//! streamflow-client – Bibliotheks-Root
//!
//! Client-Seite eines Echtzeit-Raums: Raumliste und Auswahl, Raumkanal
//! (WebSocket), Geraete-Abgleich, Sprech-Erkennung und JPEG-Frame-Versand.
//! Alles laeuft in einer einzigen [`Session`]-Schleife.

pub mod activity;
pub mod api;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod reconciler;
pub mod scheduler;
pub mod session;
pub mod state;

pub use api::{HttpDirectory, RoomDirectory};
pub use commands::{SessionCommand, SessionHandle};
pub use config::ClientConfig;
pub use connection::{ChannelConnector, ChannelEvent, ChannelTransport, ReadyState, WsConnector};
pub use error::{ClientError, ClientResult};
pub use media::{CaptureDevice, LocalDevice, MediaSource};
pub use scheduler::{FrameToken, IntervalScheduler, RefreshScheduler};
pub use session::{Session, SessionConfig, SessionParts, SessionUpdate};
