//! Stream-Einstellungen
//!
//! Qualitaetsstufe und Bildrate gelten nur lokal fuer den Sender und
//! werden nicht mit anderen Teilnehmern ausgehandelt.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VideoError;

/// Bildraten die ueber Konfiguration und Befehle waehlbar sind
pub const ERLAUBTE_FPS: [u32; 3] = [10, 30, 60];

/// Qualitaetsstufe eines gesendeten Streams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    #[default]
    P1080,
}

impl QualityTier {
    /// Zielbreite der Zeichenflaeche in Pixeln
    pub fn ziel_breite(self) -> u32 {
        match self {
            Self::P360 => 320,
            Self::P720 => 1280,
            Self::P1080 => 1920,
        }
    }

    /// JPEG-Qualitaet (0.0..=1.0): grob zweistufig, nicht stufenweise
    pub fn jpeg_qualitaet(self) -> f32 {
        match self {
            Self::P360 => 0.4,
            _ => 0.6,
        }
    }

    pub fn als_str(self) -> &'static str {
        match self {
            Self::P360 => "360p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

impl FromStr for QualityTier {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "360p" => Ok(Self::P360),
            "720p" => Ok(Self::P720),
            "1080p" => Ok(Self::P1080),
            other => Err(VideoError::UngueltigeQualitaet(other.to_string())),
        }
    }
}

/// Zielhoehe bei gegebener Zielbreite unter Erhalt des Seitenverhaeltnisses.
///
/// Wie bei einer Canvas-Hoehe wird abgeschnitten, nicht gerundet; das
/// Ergebnis ist mindestens 1. Ohne Quellbreite gibt es keine Hoehe.
pub fn ziel_hoehe(quell_breite: u32, quell_hoehe: u32, ziel_breite: u32) -> Option<u32> {
    if quell_breite == 0 || quell_hoehe == 0 {
        return None;
    }
    let h = quell_hoehe as u64 * ziel_breite as u64 / quell_breite as u64;
    Some(h.max(1) as u32)
}

/// Lokale Sende-Einstellungen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub quality: QualityTier,
    pub fps: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            quality: QualityTier::P1080,
            fps: 60,
        }
    }
}

impl StreamSettings {
    /// Erstellt Einstellungen und prueft die Bildrate
    pub fn new(quality: QualityTier, fps: u32) -> Result<Self, VideoError> {
        let s = Self { quality, fps };
        s.pruefen()?;
        Ok(s)
    }

    pub fn pruefen(&self) -> Result<(), VideoError> {
        if ERLAUBTE_FPS.contains(&self.fps) {
            Ok(())
        } else {
            Err(VideoError::UngueltigeBildrate(self.fps))
        }
    }

    /// Mindestabstand zwischen zwei Sendungen (`1000 / fps` ms)
    pub fn min_intervall(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zielbreiten_exakt() {
        assert_eq!(QualityTier::P360.ziel_breite(), 320);
        assert_eq!(QualityTier::P720.ziel_breite(), 1280);
        assert_eq!(QualityTier::P1080.ziel_breite(), 1920);
    }

    #[test]
    fn jpeg_qualitaet_zweistufig() {
        assert_eq!(QualityTier::P360.jpeg_qualitaet(), 0.4);
        assert_eq!(QualityTier::P720.jpeg_qualitaet(), 0.6);
        assert_eq!(QualityTier::P1080.jpeg_qualitaet(), 0.6);
    }

    #[test]
    fn hoehe_erhaelt_seitenverhaeltnis() {
        assert_eq!(ziel_hoehe(640, 480, 320), Some(240));
        assert_eq!(ziel_hoehe(1280, 720, 1920), Some(1080));
        // 4:3 -> 1280 breit
        assert_eq!(ziel_hoehe(640, 480, 1280), Some(960));
        // ungerades Verhaeltnis: abgeschnitten
        assert_eq!(ziel_hoehe(1000, 333, 320), Some(106));
        assert_eq!(ziel_hoehe(0, 480, 320), None);
    }

    #[test]
    fn min_intervall_pro_bildrate() {
        let s60 = StreamSettings::new(QualityTier::P1080, 60).unwrap();
        let ms = s60.min_intervall().as_secs_f64() * 1000.0;
        assert!((ms - 16.666).abs() < 0.01);

        let s10 = StreamSettings::new(QualityTier::P360, 10).unwrap();
        assert_eq!(s10.min_intervall(), Duration::from_millis(100));
    }

    #[test]
    fn bildrate_wird_geprueft() {
        assert!(StreamSettings::new(QualityTier::P720, 30).is_ok());
        assert!(matches!(
            StreamSettings::new(QualityTier::P720, 0),
            Err(VideoError::UngueltigeBildrate(0))
        ));
    }

    #[test]
    fn qualitaet_parsen_und_serde() {
        assert_eq!("720p".parse::<QualityTier>().unwrap(), QualityTier::P720);
        assert!("4k".parse::<QualityTier>().is_err());
        let json = serde_json::to_string(&QualityTier::P360).unwrap();
        assert_eq!(json, "\"360p\"");
    }

    #[test]
    fn standard_ist_1080p_60() {
        let s = StreamSettings::default();
        assert_eq!(s.quality, QualityTier::P1080);
        assert_eq!(s.fps, 60);
    }
}
