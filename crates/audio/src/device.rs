//! Mikrofon-Auswahl
//!
//! Der Capture oeffnet entweder das Standard-Eingabegeraet oder das erste
//! Geraet, dessen Name den konfigurierten Teilstring enthaelt.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};

/// Abtastraten, die fuer die Sprech-Erkennung in Frage kommen
const GAENGIGE_RATEN: [u32; 3] = [16_000, 44_100, 48_000];

/// Beschreibung eines Mikrofons fuer Logs und Auswahl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    /// Ist das Standard-Eingabegeraet des Hosts
    pub ist_standard: bool,
    /// Von [`GAENGIGE_RATEN`] unterstuetzte Raten, aufsteigend
    pub sample_rates: Vec<u32>,
    pub channels: u16,
}

/// Alle Mikrofone des Standard-Hosts
pub fn list_input_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let standard = host.default_input_device().and_then(|d| d.name().ok());
    let geraete = host
        .input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let liste: Vec<AudioDevice> = geraete
        .filter_map(|device| match beschreiben(&device, standard.as_deref()) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("Mikrofon nicht lesbar: {}", e);
                None
            }
        })
        .collect();
    debug!(anzahl = liste.len(), "Mikrofone gefunden");
    Ok(liste)
}

/// Oeffnet das Mikrofon fuer den Capture (None = Standard)
pub fn load_cpal_input_device(name_teil: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    let Some(teil) = name_teil else {
        return host
            .default_input_device()
            .ok_or(AudioError::KeinStandardEingabegeraet);
    };
    host.input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|d| d.name().is_ok_and(|n| name_passt(&n, teil)))
        .ok_or_else(|| AudioError::GeraetNichtGefunden(teil.to_string()))
}

/// Gross-/Kleinschreibung wird ignoriert
fn name_passt(name: &str, teil: &str) -> bool {
    name.to_lowercase().contains(&teil.to_lowercase())
}

fn beschreiben(device: &Device, standard: Option<&str>) -> AudioResult<AudioDevice> {
    let name = device
        .name()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let mut sample_rates = Vec::new();
    let mut channels = 1u16;
    for cfg in device.supported_input_configs().into_iter().flatten() {
        let bereich = cfg.min_sample_rate().0..=cfg.max_sample_rate().0;
        sample_rates.extend(GAENGIGE_RATEN.iter().filter(|r| bereich.contains(*r)));
        channels = channels.max(cfg.channels());
    }
    sample_rates.sort_unstable();
    sample_rates.dedup();

    Ok(AudioDevice {
        ist_standard: standard == Some(name.as_str()),
        name,
        sample_rates,
        channels,
    })
}
