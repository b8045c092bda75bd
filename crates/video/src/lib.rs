//! streamflow-video – Einzelbild-Video fuer StreamFlow
//!
//! Es gibt keinen Video-Codec: jeder Frame wird einzeln als JPEG
//! komprimiert und als Data-URL verschickt.
//!
//! - [`RgbFrame`]: roher RGB24-Frame einer Quelle
//! - [`Canvas`]: Off-Screen-Zeichenflaeche mit Skalierung
//! - [`StreamSettings`]: Qualitaetsstufe und Bildrate
//! - [`FrameEncoder`] / [`JpegEncoder`]: Kompression zu Data-URLs
//! - [`TestPattern`]: synthetische Farbbalken-Quelle

pub mod canvas;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod pattern;
pub mod settings;

pub use canvas::Canvas;
pub use encoder::{data_url, FrameEncoder, JpegEncoder};
pub use error::{VideoError, VideoResult};
pub use frame::RgbFrame;
pub use pattern::TestPattern;
pub use settings::{QualityTier, StreamSettings, ERLAUBTE_FPS};
