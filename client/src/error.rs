//! Fehlertypen des Clients
//!
//! Nichts davon ist fatal fuer die Sitzung: Fehler werden geloggt und die
//! Sitzung faellt auf den letzten bekannten Zustand zurueck.

use streamflow_audio::AudioError;
use streamflow_core::StreamflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP-Fehler: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] StreamflowError),

    #[error("Geraetefehler: {0}")]
    Geraet(String),

    #[error("Audiofehler: {0}")]
    Audio(#[from] AudioError),

    #[error("Sitzung beendet")]
    SitzungBeendet,
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn geraet(msg: impl Into<String>) -> Self {
        Self::Geraet(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_fehler_wird_umgewandelt() {
        let err: ClientError = AudioError::KeinAudioTrack.into();
        assert!(matches!(err, ClientError::Audio(_)));
        assert!(err.to_string().starts_with("Audiofehler"));
    }

    #[test]
    fn json_fehler_ist_protokollfehler() {
        let err: ClientError = streamflow_protocol::ServerMessage::from_json("x")
            .unwrap_err()
            .into();
        assert!(matches!(err, ClientError::Protokoll(_)));
    }
}
