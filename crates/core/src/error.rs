//! Fehlertypen fuer StreamFlow
//!
//! Fehler beim Lesen und Schreiben der Kanal-Nachrichten.
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer StreamFlow
pub type Result<T> = std::result::Result<T, StreamflowError>;

/// Alle crate-uebergreifenden Fehler
#[derive(Debug, Error)]
pub enum StreamflowError {
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Nachricht nicht serialisierbar: {0}")]
    Serialisierung(String),
}

impl From<serde_json::Error> for StreamflowError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Self::UngueltigeNachricht(e.to_string())
        } else {
            Self::Serialisierung(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = StreamflowError::UngueltigeNachricht("abc".into());
        assert_eq!(e.to_string(), "Ungueltige Nachricht: abc");
    }

    #[test]
    fn json_fehler_wird_ungueltige_nachricht() {
        let e: StreamflowError = serde_json::from_str::<u32>("kein json").unwrap_err().into();
        assert!(matches!(e, StreamflowError::UngueltigeNachricht(_)));
    }
}
