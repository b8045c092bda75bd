//! Synthetische Videoquelle
//!
//! Farbbalken, die sich mit der Zeit seitlich verschieben. Dient als
//! Kamera-Ersatz fuer den Headless-Client und fuer Tests.

use std::time::Duration;

use crate::error::VideoResult;
use crate::frame::{RgbFrame, RGB_BPP};

const BALKEN: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Pixel pro Sekunde, um die sich die Balken verschieben
const GESCHWINDIGKEIT: f64 = 40.0;

#[derive(Debug, Clone)]
pub struct TestPattern {
    breite: u32,
    hoehe: u32,
}

impl TestPattern {
    pub fn new(breite: u32, hoehe: u32) -> Self {
        Self {
            breite: breite.max(1),
            hoehe: hoehe.max(1),
        }
    }

    pub fn breite(&self) -> u32 {
        self.breite
    }

    pub fn hoehe(&self) -> u32 {
        self.hoehe
    }

    /// Frame zum Zeitpunkt `seit_start`
    pub fn frame(&self, seit_start: Duration) -> VideoResult<RgbFrame> {
        let b = self.breite as usize;
        let h = self.hoehe as usize;
        let versatz = (seit_start.as_secs_f64() * GESCHWINDIGKEIT) as usize;
        let balken_breite = (b / BALKEN.len()).max(1);

        let mut zeile = Vec::with_capacity(b * RGB_BPP);
        for x in 0..b {
            let idx = ((x + versatz) / balken_breite) % BALKEN.len();
            zeile.extend_from_slice(&BALKEN[idx]);
        }

        let mut daten = Vec::with_capacity(b * h * RGB_BPP);
        for _ in 0..h {
            daten.extend_from_slice(&zeile);
        }
        RgbFrame::new(self.breite, self.hoehe, daten)
    }
}
