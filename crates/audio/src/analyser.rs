//! Frequenz-Analyser
//!
//! Bildet die juengsten `fft_groesse` Zeitbereichs-Samples auf
//! `fft_groesse / 2` Frequenz-Bins mit 8-Bit-Betraegen (0..=255) ab.
//!
//! Ablauf pro Aufruf:
//! ```text
//! Samples -> Blackman-Fenster -> reelle FFT -> |X[k]| / N
//!         -> dB -> linear auf [min_db, max_db] -> u8
//! ```
//!
//! Es gibt bewusst keine zeitliche Glaettung zwischen zwei Aufrufen:
//! jeder Aufruf sieht nur das aktuelle Fenster.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::{AudioError, AudioResult};

/// Fenstergroesse der Transformation fuer die Sprech-Erkennung
pub const FFT_GROESSE: usize = 256;

/// Untere Grenze der dB-Skala (entspricht Byte 0)
pub const MIN_DB: f32 = -100.0;
/// Obere Grenze der dB-Skala (entspricht Byte 255)
pub const MAX_DB: f32 = -30.0;

/// FFT-basierter Analyser mit vorbelegten Puffern
pub struct FrequencyAnalyser {
    fft: Arc<dyn RealToComplex<f32>>,
    fenster: Vec<f32>,
    eingabe: Vec<f32>,
    ausgabe: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    fft_groesse: usize,
}

impl FrequencyAnalyser {
    /// Erstellt einen Analyser fuer die gegebene Fenstergroesse.
    ///
    /// Die Groesse muss eine Zweierpotenz zwischen 32 und 32768 sein.
    pub fn new(fft_groesse: usize) -> AudioResult<Self> {
        if !fft_groesse.is_power_of_two() || !(32..=32768).contains(&fft_groesse) {
            return Err(AudioError::Analyser(format!(
                "Ungueltige FFT-Groesse: {}",
                fft_groesse
            )));
        }

        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(fft_groesse);
        let eingabe = fft.make_input_vec();
        let ausgabe = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Ok(Self {
            fft,
            fenster: blackman_fenster(fft_groesse),
            eingabe,
            ausgabe,
            scratch,
            fft_groesse,
        })
    }

    /// Analyser mit der Standard-Fenstergroesse (256)
    pub fn standard() -> AudioResult<Self> {
        Self::new(FFT_GROESSE)
    }

    pub fn fft_groesse(&self) -> usize {
        self.fft_groesse
    }

    /// Anzahl der Frequenz-Bins (halbe Fenstergroesse)
    pub fn bin_anzahl(&self) -> usize {
        self.fft_groesse / 2
    }

    /// Berechnet die 8-Bit-Betraege fuer das aktuelle Fenster.
    ///
    /// `samples` enthaelt die juengsten Samples (aelteste zuerst). Kuerzere
    /// Eingaben werden vorne mit Stille aufgefuellt, laengere vorne gekuerzt.
    /// `bins` muss mindestens `bin_anzahl()` lang sein.
    pub fn byte_frequenzdaten(&mut self, samples: &[f32], bins: &mut [u8]) -> AudioResult<()> {
        let n = self.fft_groesse;
        if bins.len() < self.bin_anzahl() {
            return Err(AudioError::Analyser(format!(
                "Bin-Puffer zu klein: {} < {}",
                bins.len(),
                self.bin_anzahl()
            )));
        }

        let quelle = if samples.len() > n {
            &samples[samples.len() - n..]
        } else {
            samples
        };
        let versatz = n - quelle.len();

        for (i, ziel) in self.eingabe.iter_mut().enumerate() {
            let s = if i < versatz { 0.0 } else { quelle[i - versatz] };
            *ziel = s * self.fenster[i];
        }

        self.fft
            .process_with_scratch(&mut self.eingabe, &mut self.ausgabe, &mut self.scratch)
            .map_err(|e| AudioError::Analyser(e.to_string()))?;

        let skala = 255.0 / (MAX_DB - MIN_DB);
        for (k, bin) in bins.iter_mut().take(self.bin_anzahl()).enumerate() {
            let betrag = self.ausgabe[k].norm() / n as f32;
            *bin = betrag_zu_byte(betrag, skala);
        }
        Ok(())
    }
}

fn betrag_zu_byte(betrag: f32, skala: f32) -> u8 {
    if betrag <= 0.0 {
        return 0;
    }
    let db = 20.0 * betrag.log10();
    let wert = (skala * (db - MIN_DB)).floor();
    wert.clamp(0.0, 255.0) as u8
}

/// Blackman-Fenster (a0 = 0.42, a1 = 0.5, a2 = 0.08)
fn blackman_fenster(n: usize) -> Vec<f32> {
    let a0 = 0.42f32;
    let a1 = 0.5f32;
    let a2 = 0.08f32;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (2.0 * std::f32::consts::PI * x).cos()
                + a2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}
