//! Off-Screen-Zeichenflaeche
//!
//! Haelt einen RGB24-Puffer in Zielgroesse. Jeder Frame wird komplett
//! auf die aktuelle Flaeche skaliert (Naechster-Nachbar).

use crate::frame::{RgbFrame, RGB_BPP};

#[derive(Debug, Clone, Default)]
pub struct Canvas {
    breite: u32,
    hoehe: u32,
    pixel: Vec<u8>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breite(&self) -> u32 {
        self.breite
    }

    pub fn hoehe(&self) -> u32 {
        self.hoehe
    }

    pub fn pixel(&self) -> &[u8] {
        &self.pixel
    }

    /// Setzt die Groesse neu. Wie beim Browser-Canvas wird der Inhalt dabei
    /// geloescht, auch wenn sich die Groesse nicht aendert.
    pub fn groesse_setzen(&mut self, breite: u32, hoehe: u32) {
        self.breite = breite;
        self.hoehe = hoehe;
        self.pixel.clear();
        self.pixel
            .resize(breite as usize * hoehe as usize * RGB_BPP, 0);
    }

    /// Zeichnet `frame` skaliert auf die volle Flaeche
    pub fn zeichnen(&mut self, frame: &RgbFrame) {
        if self.breite == 0 || self.hoehe == 0 {
            return;
        }
        let (qb, qh) = (frame.breite() as usize, frame.hoehe() as usize);
        let (zb, zh) = (self.breite as usize, self.hoehe as usize);
        let quelle = frame.daten();

        for y in 0..zh {
            let sy = y * qh / zh;
            let quell_zeile = sy * qb * RGB_BPP;
            let ziel_zeile = y * zb * RGB_BPP;
            for x in 0..zb {
                let sx = x * qb / zb;
                let s = quell_zeile + sx * RGB_BPP;
                let d = ziel_zeile + x * RGB_BPP;
                self.pixel[d..d + RGB_BPP].copy_from_slice(&quelle[s..s + RGB_BPP]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groesse_setzen_loescht_inhalt() {
        let mut canvas = Canvas::new();
        canvas.groesse_setzen(2, 2);
        canvas.zeichnen(&RgbFrame::einfarbig(4, 4, [255, 0, 0]).unwrap());
        assert_eq!(&canvas.pixel()[..3], &[255, 0, 0]);

        canvas.groesse_setzen(2, 2);
        assert!(canvas.pixel().iter().all(|&b| b == 0));
    }

    #[test]
    fn verkleinern_waehlt_naechsten_nachbarn() {
        // 4x1: rot, gruen, blau, weiss -> 2x1: rot, blau
        let daten = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let frame = RgbFrame::new(4, 1, daten).unwrap();
        let mut canvas = Canvas::new();
        canvas.groesse_setzen(2, 1);
        canvas.zeichnen(&frame);
        assert_eq!(canvas.pixel(), &[255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn vergroessern_fuellt_ganze_flaeche() {
        let frame = RgbFrame::einfarbig(2, 2, [7, 8, 9]).unwrap();
        let mut canvas = Canvas::new();
        canvas.groesse_setzen(5, 3);
        canvas.zeichnen(&frame);
        assert_eq!(canvas.pixel().len(), 5 * 3 * 3);
        assert!(canvas.pixel().chunks(3).all(|p| p == [7, 8, 9]));
    }

    #[test]
    fn leere_flaeche_ignoriert_zeichnen() {
        let mut canvas = Canvas::new();
        canvas.zeichnen(&RgbFrame::einfarbig(2, 2, [1, 1, 1]).unwrap());
        assert!(canvas.pixel().is_empty());
    }
}
