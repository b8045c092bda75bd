//! Logging-Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `SF_LOG_LEVEL`: Filter (z.B. `debug` oder `streamflow_client=trace,warn`)
//! - `SF_LOG_FORMAT`: Format (text/json)
//!
//! Ohne Umgebungsvariablen gelten die Werte aus `[logging]`.

use tracing_subscriber::{fmt, EnvFilter};

pub const LEVEL_ENV: &str = "SF_LOG_LEVEL";
pub const FORMAT_ENV: &str = "SF_LOG_FORMAT";

/// Initialisiert das Logging. Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(FORMAT_ENV).unwrap_or_else(|_| format.to_string());

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
