//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, der Client laeuft also auch ohne Konfigurationsdatei.

use rand::Rng;
use serde::{Deserialize, Serialize};
use streamflow_video::StreamSettings;

/// Umgebungsvariable fuer den Pfad der Konfigurationsdatei
pub const CONFIG_ENV: &str = "STREAMFLOW_CONFIG";

/// Standardpfad der Konfigurationsdatei
pub const CONFIG_STANDARD: &str = "streamflow.toml";

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server-Adressen und Abfrage-Intervall
    pub server: ServerEinstellungen,
    /// Anzeigename und Avatar
    pub profil: ProfilEinstellungen,
    /// Qualitaetsstufe und Bildrate des eigenen Streams
    pub stream: StreamSettings,
    /// Lokale Capture-Geraete
    pub geraet: GeraetEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Server-Adressen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Basis-URL der REST-Endpunkte
    pub http_url: String,
    /// Basis-URL des Raumkanals
    pub ws_url: String,
    /// Abstand der Raumlisten-Abfrage in Sekunden
    pub poll_intervall_sek: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            http_url: "http://localhost:8000".into(),
            ws_url: "ws://localhost:8000".into(),
            poll_intervall_sek: 10,
        }
    }
}

/// Lokales Profil
///
/// Ohne Konfiguration bekommt jeder Start einen zufaelligen Namen
/// (`User_<0..999>`). Der Name ist gleichzeitig der Zuordnungsschluessel
/// fuer alle Teilnehmer-Ereignisse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilEinstellungen {
    pub name: String,
    pub avatar: String,
    /// Farbe eigener Chat-Zeilen
    pub chat_farbe: String,
}

impl Default for ProfilEinstellungen {
    fn default() -> Self {
        let mut rng = rand::thread_rng();
        let nummer: u32 = rng.gen_range(0..999);
        let seed: f64 = rng.gen();
        Self {
            name: format!("User_{nummer}"),
            avatar: format!("https://api.dicebear.com/7.x/avataaars/svg?seed={seed}"),
            chat_farbe: "#theme-accent".into(),
        }
    }
}

/// Lokale Capture-Geraete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeraetEinstellungen {
    /// Breite der synthetischen Videoquelle
    pub video_breite: u32,
    /// Hoehe der synthetischen Videoquelle
    pub video_hoehe: u32,
    /// Mikrofon oeffnen (sonst hat der Stream keinen Audio-Track)
    pub mikrofon: bool,
    /// Namensteil des Eingabegeraets (leer = Standardgeraet)
    pub mikrofon_name: Option<String>,
}

impl Default for GeraetEinstellungen {
    fn default() -> Self {
        Self {
            video_breite: 640,
            video_hoehe: 480,
            mikrofon: false,
            mikrofon_name: None,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level (trace, debug, info, warn, error)
    pub level: String,
    /// Format (text oder json)
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    ///
    /// Fehlt die Datei, werden Standardwerte verwendet.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config: Self = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.pruefen()?;
        Ok(config)
    }

    /// Pfad aus `STREAMFLOW_CONFIG` oder `streamflow.toml`
    pub fn pfad_aus_env() -> String {
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_STANDARD.into())
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        self.stream
            .pruefen()
            .map_err(|e| anyhow::anyhow!("[stream]: {e}"))?;
        if self.profil.name.trim().is_empty() {
            anyhow::bail!("[profil]: name darf nicht leer sein");
        }
        if !crate::logging::log_format_gueltig(&self.logging.format) {
            anyhow::bail!("[logging]: unbekanntes Format '{}'", self.logging.format);
        }
        if self.server.poll_intervall_sek == 0 {
            anyhow::bail!("[server]: poll_intervall_sek muss groesser 0 sein");
        }
        Ok(())
    }

    /// Abstand der Raumlisten-Abfrage
    pub fn poll_intervall(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.poll_intervall_sek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamflow_video::QualityTier;

    #[test]
    fn standard_konfiguration() {
        let config = ClientConfig::default();
        assert_eq!(config.server.http_url, "http://localhost:8000");
        assert_eq!(config.server.ws_url, "ws://localhost:8000");
        assert_eq!(config.server.poll_intervall_sek, 10);
        assert_eq!(config.stream.quality, QualityTier::P1080);
        assert_eq!(config.stream.fps, 60);
        assert!(!config.geraet.mikrofon);
        assert!(config.pruefen().is_ok());
    }

    #[test]
    fn zufaelliger_standardname() {
        let profil = ProfilEinstellungen::default();
        let nummer: u32 = profil
            .name
            .strip_prefix("User_")
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(nummer < 999);
    }

    #[test]
    fn teilweise_toml_ergaenzt_standardwerte() {
        let toml = r#"
[profil]
name = "alice"

[stream]
quality = "360p"
fps = 10
"#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.profil.name, "alice");
        assert_eq!(config.profil.chat_farbe, "#theme-accent");
        assert_eq!(config.stream.quality, QualityTier::P360);
        assert_eq!(config.stream.fps, 10);
        assert_eq!(config.server.poll_intervall_sek, 10);
        assert_eq!(config.geraet.video_breite, 640);
    }

    #[test]
    fn ungueltige_bildrate_abgelehnt() {
        let config: ClientConfig = toml::from_str("[stream]\nfps = 25\n").unwrap();
        assert!(config.pruefen().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let config = ClientConfig::laden("/pfad/der/nicht/existiert.toml").unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn kaputte_datei_ist_fehler() {
        let pfad = std::env::temp_dir().join("streamflow-config-kaputt.toml");
        std::fs::write(&pfad, "[server\nhttp_url = ").unwrap();
        let ergebnis = ClientConfig::laden(pfad.to_str().unwrap());
        let _ = std::fs::remove_file(&pfad);
        assert!(ergebnis.is_err());
    }
}
