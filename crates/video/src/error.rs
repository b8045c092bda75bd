//! Fehlertypen fuer Frames, Einstellungen und Kodierung

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Ungueltige Frame-Groesse: {breite}x{hoehe}")]
    UngueltigeGroesse { breite: u32, hoehe: u32 },

    #[error("Frame-Daten zu klein: {ist} < {erwartet}")]
    DatenZuKlein { ist: usize, erwartet: usize },

    #[error("Ungueltige Qualitaetsstufe: {0}")]
    UngueltigeQualitaet(String),

    #[error("Nicht unterstuetzte Bildrate: {0}")]
    UngueltigeBildrate(u32),

    #[error("Kodierung fehlgeschlagen: {0}")]
    Kodierung(String),
}

pub type VideoResult<T> = Result<T, VideoError>;
