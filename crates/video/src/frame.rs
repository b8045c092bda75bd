//! Rohe Video-Frames

use bytes::Bytes;

use crate::error::{VideoError, VideoResult};

/// Bytes pro Pixel (RGB24)
pub const RGB_BPP: usize = 3;

/// Ein RGB24-Frame ohne Zeilen-Padding
///
/// Die Pixeldaten liegen in `Bytes`, Klone sind daher billig.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    breite: u32,
    hoehe: u32,
    daten: Bytes,
}

impl RgbFrame {
    /// Erstellt einen Frame und prueft Groesse und Datenlaenge
    pub fn new(breite: u32, hoehe: u32, daten: impl Into<Bytes>) -> VideoResult<Self> {
        if breite == 0 || hoehe == 0 {
            return Err(VideoError::UngueltigeGroesse { breite, hoehe });
        }
        let daten = daten.into();
        let erwartet = breite as usize * hoehe as usize * RGB_BPP;
        if daten.len() < erwartet {
            return Err(VideoError::DatenZuKlein {
                ist: daten.len(),
                erwartet,
            });
        }
        Ok(Self {
            breite,
            hoehe,
            daten,
        })
    }

    /// Einfarbiger Frame
    pub fn einfarbig(breite: u32, hoehe: u32, rgb: [u8; 3]) -> VideoResult<Self> {
        let pixel = breite as usize * hoehe as usize;
        let mut daten = Vec::with_capacity(pixel * RGB_BPP);
        for _ in 0..pixel {
            daten.extend_from_slice(&rgb);
        }
        Self::new(breite, hoehe, daten)
    }

    pub fn breite(&self) -> u32 {
        self.breite
    }

    pub fn hoehe(&self) -> u32 {
        self.hoehe
    }

    pub fn daten(&self) -> &[u8] {
        &self.daten
    }

    /// Pixel an (x, y); ausserhalb des Frames None
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.breite || y >= self.hoehe {
            return None;
        }
        let i = (y as usize * self.breite as usize + x as usize) * RGB_BPP;
        Some([self.daten[i], self.daten[i + 1], self.daten[i + 2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_groesse_abgelehnt() {
        assert!(RgbFrame::new(0, 10, vec![]).is_err());
    }

    #[test]
    fn zu_wenig_daten_abgelehnt() {
        let err = RgbFrame::new(2, 2, vec![0u8; 11]).unwrap_err();
        assert!(matches!(err, VideoError::DatenZuKlein { ist: 11, erwartet: 12 }));
    }

    #[test]
    fn einfarbig_pixelzugriff() {
        let f = RgbFrame::einfarbig(4, 3, [10, 20, 30]).unwrap();
        assert_eq!(f.pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(f.pixel(4, 0), None);
        assert_eq!(f.daten().len(), 4 * 3 * 3);
    }
}
