//! Sprech-Erkennung
//!
//! Harte Schwelle auf dem mittleren 8-Bit-Betrag aller Frequenz-Bins.
//! Keine Hysterese und keine Glaettung: nahe der Schwelle darf das
//! Ergebnis von Aufruf zu Aufruf flackern.

use crate::analyser::{FrequencyAnalyser, FFT_GROESSE};
use crate::error::AudioResult;

/// Schwelle auf der 0..=255-Skala; "spricht" erst bei Mittelwert > 15
pub const SPRECH_SCHWELLE: f32 = 15.0;

/// Arithmetisches Mittel ueber alle Bins (0.0 fuer leere Eingabe)
pub fn mittlerer_betrag(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let summe: u32 = bins.iter().map(|&b| b as u32).sum();
    summe as f32 / bins.len() as f32
}

/// Klassifiziert einen Bin-Puffer als Sprache
pub fn ist_sprache(bins: &[u8]) -> bool {
    mittlerer_betrag(bins) > SPRECH_SCHWELLE
}

/// Analyse-Graph fuer eine Audio-Quelle
///
/// Haelt Analyser, Sample-Fenster und Bin-Puffer. Pro Refresh fuellt der
/// Aufrufer das Sample-Fenster und ruft [`SpeechAnalysis::auswerten`].
pub struct SpeechAnalysis {
    analyser: FrequencyAnalyser,
    samples: Vec<f32>,
    bins: Vec<u8>,
}

impl SpeechAnalysis {
    /// Baut den Graphen mit der Standard-Fenstergroesse (256 Samples)
    pub fn neu() -> AudioResult<Self> {
        Self::mit_groesse(FFT_GROESSE)
    }

    pub fn mit_groesse(fft_groesse: usize) -> AudioResult<Self> {
        let analyser = FrequencyAnalyser::new(fft_groesse)?;
        let bins = vec![0u8; analyser.bin_anzahl()];
        Ok(Self {
            analyser,
            samples: vec![0.0; fft_groesse],
            bins,
        })
    }

    /// Zeitbereichs-Fenster, das vor jedem Auswerten gefuellt wird
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Zuletzt berechnete Bins
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    /// Transformiert das aktuelle Fenster und wendet die Schwelle an
    pub fn auswerten(&mut self) -> AudioResult<bool> {
        self.analyser
            .byte_frequenzdaten(&self.samples, &mut self.bins)?;
        Ok(ist_sprache(&self.bins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mittelwert_leer_ist_null() {
        assert_eq!(mittlerer_betrag(&[]), 0.0);
    }

    #[test]
    fn schwelle_genau_15_ist_keine_sprache() {
        assert!(!ist_sprache(&[15u8; 128]));
    }

    #[test]
    fn knapp_ueber_schwelle_ist_sprache() {
        // Mittel = 15 + 1/128
        let mut bins = [15u8; 128];
        bins[0] = 16;
        assert!(ist_sprache(&bins));
    }

    #[test]
    fn unter_schwelle_ist_keine_sprache() {
        assert!(!ist_sprache(&[0u8; 128]));
        let mut bins = [0u8; 128];
        bins[3] = 255; // einzelner Ausreisser: Mittel ~2
        assert!(!ist_sprache(&bins));
    }

    #[test]
    fn mittelwert_ueber_alle_bins() {
        let bins = [10u8, 20, 30, 40];
        assert!((mittlerer_betrag(&bins) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stille_quelle_spricht_nicht() {
        let mut analyse = SpeechAnalysis::neu().unwrap();
        analyse.samples_mut().fill(0.0);
        assert!(!analyse.auswerten().unwrap());
    }

    #[test]
    fn breitbandiges_signal_spricht() {
        let mut analyse = SpeechAnalysis::neu().unwrap();
        // Summe mehrerer Sinus-Toene ueber das Spektrum verteilt
        for (i, s) in analyse.samples_mut().iter_mut().enumerate() {
            let t = i as f32 / 256.0;
            *s = (1..40)
                .map(|k| (2.0 * std::f32::consts::PI * (k * 3) as f32 * t).sin())
                .sum::<f32>()
                * 0.05;
        }
        assert!(analyse.auswerten().unwrap());
        assert_eq!(analyse.bins().len(), 128);
    }
}
