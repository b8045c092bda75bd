//! streamflow-audio – Audio fuer StreamFlow
//!
//! - Mikrofon-Capture via cpal in ein gleitendes Sample-Fenster
//! - Frequenz-Analyser (FFT, 256 Samples, 8-Bit-Betraege)
//! - Sprech-Erkennung ueber den mittleren Betrag aller Frequenz-Bins

pub mod activity;
pub mod analyser;
pub mod capture;
pub mod device;
pub mod error;

// Bequeme Re-Exporte der wichtigsten Typen
pub use activity::{ist_sprache, mittlerer_betrag, SpeechAnalysis, SPRECH_SCHWELLE};
pub use analyser::{FrequencyAnalyser, FFT_GROESSE};
pub use capture::{CaptureConfig, MicrophoneCapture, SampleWindow};
pub use device::{list_input_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
