//! Lokale Medienquellen
//!
//! Ein erfasster Stream gehoert genau einem Besitzer ([`OwnedStream`]),
//! der ihn stoppen darf. Detektor und Versand-Pipeline bekommen nur
//! [`StreamHandle`]s, die lesen aber nicht stoppen koennen.
//!
//! [`LocalDevice`] ist die native Capture-Quelle: synthetisches Testbild
//! plus optionales cpal-Mikrofon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use streamflow_audio::{CaptureConfig, MicrophoneCapture};
use streamflow_video::{RgbFrame, TestPattern};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::GeraetEinstellungen;
use crate::error::{ClientError, ClientResult};

/// Eine laufende Audio/Video-Quelle
pub trait MediaSource: Send + Sync {
    /// Anzahl der Audio-Tracks (0 = nur Video)
    fn audio_tracks(&self) -> usize;

    /// Fuellt `out` mit den juengsten Mono-Samples. Deaktivierte Tracks
    /// liefern Stille.
    fn read_audio(&self, out: &mut [f32]);

    /// Aktiviert oder deaktiviert alle Audio-Tracks
    fn set_audio_enabled(&self, enabled: bool);

    /// Aktuelles Videobild; None solange nicht genug Daten zum Zeichnen
    /// vorliegen
    fn video_frame(&self, jetzt: Instant) -> Option<RgbFrame>;

    /// Stoppt alle Tracks. Mehrfacher Aufruf ist erlaubt.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Besitz und Ansicht
// ---------------------------------------------------------------------------

/// Besitzender Griff auf einen erfassten Stream
///
/// Nicht klonbar. Beim Stoppen oder Droppen werden alle Tracks beendet.
pub struct OwnedStream {
    quelle: Arc<dyn MediaSource>,
    generation: u64,
}

impl OwnedStream {
    pub fn new(quelle: Arc<dyn MediaSource>, generation: u64) -> Self {
        Self { quelle, generation }
    }

    /// Lesender Griff fuer Detektor und Pipeline
    pub fn handle(&self) -> StreamHandle {
        StreamHandle {
            quelle: Arc::clone(&self.quelle),
            generation: self.generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        self.quelle.set_audio_enabled(enabled);
    }

    /// Stoppt alle Tracks und gibt den Stream frei
    pub fn stop(self) {
        // Drop erledigt das Stoppen
    }
}

impl Drop for OwnedStream {
    fn drop(&mut self) {
        self.quelle.stop();
        debug!(generation = self.generation, "Lokaler Stream gestoppt");
    }
}

impl std::fmt::Debug for OwnedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedStream")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Nur-Lese-Griff auf einen erfassten Stream
///
/// Die Generation unterscheidet aufeinanderfolgende Streams desselben
/// Teilnehmers.
#[derive(Clone)]
pub struct StreamHandle {
    quelle: Arc<dyn MediaSource>,
    generation: u64,
}

impl StreamHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn audio_tracks(&self) -> usize {
        self.quelle.audio_tracks()
    }

    pub fn read_audio(&self, out: &mut [f32]) {
        self.quelle.read_audio(out);
    }

    pub fn video_frame(&self, jetzt: Instant) -> Option<RgbFrame> {
        self.quelle.video_frame(jetzt)
    }

    pub fn is_live(&self) -> bool {
        self.quelle.is_live()
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("generation", &self.generation)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Capture-Geraet
// ---------------------------------------------------------------------------

/// Fordert Kamera und Mikrofon gemeinsam an
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn acquire(&self) -> ClientResult<Arc<dyn MediaSource>>;
}

/// Vorlaufzeit, bevor die synthetische Kamera das erste Bild liefert
const AUFWAERMZEIT: Duration = Duration::from_millis(100);

/// Natives Capture-Geraet: Testbild und optional Mikrofon
pub struct LocalDevice {
    einstellungen: GeraetEinstellungen,
}

impl LocalDevice {
    pub fn new(einstellungen: GeraetEinstellungen) -> Self {
        Self { einstellungen }
    }
}

#[async_trait]
impl CaptureDevice for LocalDevice {
    async fn acquire(&self) -> ClientResult<Arc<dyn MediaSource>> {
        let mikrofon = if self.einstellungen.mikrofon {
            let config = CaptureConfig {
                geraet: self.einstellungen.mikrofon_name.clone(),
                ..CaptureConfig::default()
            };
            // Oeffnen blockiert bis der cpal-Stream laeuft
            let capture = tokio::task::spawn_blocking(move || MicrophoneCapture::starten(config))
                .await
                .map_err(|e| ClientError::geraet(format!("Mikrofon-Task: {e}")))??;
            Some(capture)
        } else {
            None
        };

        let stream = LocalStream::new(
            TestPattern::new(self.einstellungen.video_breite, self.einstellungen.video_hoehe),
            mikrofon,
        );
        info!(
            breite = self.einstellungen.video_breite,
            hoehe = self.einstellungen.video_hoehe,
            audio_tracks = stream.audio_tracks(),
            "Lokaler Stream erfasst"
        );
        Ok(Arc::new(stream))
    }
}

/// Stream aus Testbild und optionalem Mikrofon
pub struct LocalStream {
    muster: TestPattern,
    start: Instant,
    mikrofon: Mutex<Option<MicrophoneCapture>>,
    live: AtomicBool,
}

impl LocalStream {
    pub fn new(muster: TestPattern, mikrofon: Option<MicrophoneCapture>) -> Self {
        Self {
            muster,
            start: Instant::now(),
            mikrofon: Mutex::new(mikrofon),
            live: AtomicBool::new(true),
        }
    }
}

impl MediaSource for LocalStream {
    fn audio_tracks(&self) -> usize {
        usize::from(self.mikrofon.lock().is_some())
    }

    fn read_audio(&self, out: &mut [f32]) {
        match self.mikrofon.lock().as_ref() {
            Some(m) => m.fenster().letzte(out),
            None => out.fill(0.0),
        }
    }

    fn set_audio_enabled(&self, enabled: bool) {
        if let Some(m) = self.mikrofon.lock().as_ref() {
            m.fenster().set_aktiv(enabled);
        }
    }

    fn video_frame(&self, jetzt: Instant) -> Option<RgbFrame> {
        if !self.is_live() {
            return None;
        }
        let seit_start = jetzt.checked_duration_since(self.start)?;
        if seit_start < AUFWAERMZEIT {
            return None;
        }
        self.muster.frame(seit_start).ok()
    }

    fn stop(&self) {
        if !self.live.swap(false, Ordering::Relaxed) {
            return;
        }
        if let Some(mut m) = self.mikrofon.lock().take() {
            m.stoppen();
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }
}
