//! Mikrofon-Capture via cpal
//!
//! Oeffnet einen cpal InputStream und schreibt die (auf Mono gemischten)
//! Samples in ein gleitendes Fenster. Der Analyser liest daraus jeweils
//! die juengsten Samples.
//!
//! cpal::Stream ist !Send, daher lebt der Stream in einem eigenen
//! std::thread, der bis zum Stoppen weiterlaeuft.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::device::load_cpal_input_device;
use crate::error::{AudioError, AudioResult};

/// Konfiguration fuer den Mikrofon-Capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Kanalanzahl des Geraete-Streams (wird auf Mono gemischt)
    pub channels: u16,
    /// Laenge des gleitenden Fensters in Samples
    pub fenster_laenge: usize,
    /// Geraetename (None = Standard-Eingabegeraet)
    pub geraet: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            fenster_laenge: 2048,
            geraet: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SampleWindow
// ---------------------------------------------------------------------------

/// Gleitendes Fenster der juengsten Mono-Samples
///
/// Geschrieben wird aus dem cpal-Callback, gelesen vom Analyser. Ist der
/// Track deaktiviert (stummgeschaltet), liefert das Lesen Stille.
pub struct SampleWindow {
    samples: Mutex<VecDeque<f32>>,
    kapazitaet: usize,
    aktiv: AtomicBool,
}

impl SampleWindow {
    pub fn new(kapazitaet: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(kapazitaet)),
            kapazitaet: kapazitaet.max(1),
            aktiv: AtomicBool::new(true),
        }
    }

    /// Haengt Samples an und verwirft die aeltesten ueber der Kapazitaet
    pub fn push(&self, neue: &[f32]) {
        let mut samples = self.samples.lock();
        for &s in neue {
            if samples.len() == self.kapazitaet {
                samples.pop_front();
            }
            samples.push_back(s);
        }
    }

    /// Kopiert die juengsten `out.len()` Samples (aelteste zuerst).
    /// Fehlende Samples am Anfang werden mit 0.0 aufgefuellt.
    pub fn letzte(&self, out: &mut [f32]) {
        out.fill(0.0);
        if !self.ist_aktiv() {
            return;
        }
        let samples = self.samples.lock();
        let n = out.len().min(samples.len());
        let start = samples.len() - n;
        let versatz = out.len() - n;
        for (i, s) in samples.range(start..).enumerate() {
            out[versatz + i] = *s;
        }
    }

    pub fn set_aktiv(&self, aktiv: bool) {
        self.aktiv.store(aktiv, Ordering::Relaxed);
    }

    pub fn ist_aktiv(&self) -> bool {
        self.aktiv.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// MicrophoneCapture
// ---------------------------------------------------------------------------

/// Laufender Mikrofon-Capture
///
/// Wird der Capture gestoppt oder gedroppt, endet der Audio-Thread und
/// mit ihm der cpal-Stream.
pub struct MicrophoneCapture {
    fenster: Arc<SampleWindow>,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneCapture {
    /// Oeffnet das Geraet und startet die Aufnahme.
    ///
    /// Blockiert bis der Stream laeuft oder das Oeffnen fehlgeschlagen ist.
    pub fn starten(config: CaptureConfig) -> AudioResult<Self> {
        let fenster = Arc::new(SampleWindow::new(config.fenster_laenge));
        let running = Arc::new(AtomicBool::new(true));

        let (bereit_tx, bereit_rx) = std::sync::mpsc::sync_channel::<AudioResult<()>>(1);
        let thread_fenster = Arc::clone(&fenster);
        let thread_running = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name("streamflow-mikrofon".to_string())
            .spawn(move || {
                let stream = load_cpal_input_device(config.geraet.as_deref())
                    .and_then(|device| open_capture_stream(&device, &config, thread_fenster));
                let _stream = match stream {
                    Ok(s) => {
                        let _ = bereit_tx.send(Ok(()));
                        s
                    }
                    Err(e) => {
                        let _ = bereit_tx.send(Err(e));
                        return;
                    }
                };

                parken_bis_gestoppt(&thread_running);
                debug!("Mikrofon-Thread beendet, cpal-Stream wird gedroppt");
            })?;

        match bereit_rx.recv() {
            Ok(Ok(())) => {
                info!("Mikrofon-Capture gestartet");
                Ok(Self {
                    fenster,
                    running,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::StreamFehler(
                    "Mikrofon-Thread ohne Rueckmeldung beendet".to_string(),
                ))
            }
        }
    }

    /// Gemeinsames Sample-Fenster (nur lesend fuer Analyser)
    pub fn fenster(&self) -> Arc<SampleWindow> {
        Arc::clone(&self.fenster)
    }

    pub fn laeuft(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stoppt die Aufnahme und wartet auf das Ende des Audio-Threads
    pub fn stoppen(&mut self) {
        if !self.running.swap(false, Ordering::Release) {
            return;
        }
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
        info!("Mikrofon-Capture gestoppt");
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        self.stoppen();
    }
}

/// Haelt den Audio-Thread geparkt, bis `running` false wird.
///
/// Geweckt wird per `Thread::unpark` aus [`MicrophoneCapture::stoppen`].
fn parken_bis_gestoppt(running: &AtomicBool) {
    while running.load(Ordering::Acquire) {
        std::thread::park();
    }
}

/// Oeffnet einen Capture-Stream der in `fenster` schreibt
fn open_capture_stream(
    device: &Device,
    config: &CaptureConfig,
    fenster: Arc<SampleWindow>,
) -> AudioResult<Stream> {
    // Format der ersten Geraete-Konfiguration, die Rate und Kanaele abdeckt
    let format = device
        .supported_input_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&config.sample_rate)
                && c.channels() >= config.channels
        })
        .map_or(SampleFormat::F32, |c| c.sample_format());

    let stream = match format {
        SampleFormat::F32 => stream_bauen(device, config, fenster, |s: f32| s)?,
        SampleFormat::I16 => stream_bauen(device, config, fenster, |s: i16| {
            s as f32 / i16::MAX as f32
        })?,
        SampleFormat::U8 => stream_bauen(device, config, fenster, |s: u8| {
            (s as f32 - 128.0) / 128.0
        })?,
        andere => {
            return Err(AudioError::StreamFehler(format!(
                "Sample-Format {andere:?} wird nicht unterstuetzt"
            )))
        }
    };
    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!(
        rate = config.sample_rate,
        kanaele = config.channels,
        format = ?format,
        "Capture-Stream geoeffnet"
    );
    Ok(stream)
}

/// Baut den Input-Stream fuer ein Sample-Format; `wandeln` normiert auf -1.0..1.0
fn stream_bauen<T, F>(
    device: &Device,
    config: &CaptureConfig,
    fenster: Arc<SampleWindow>,
    wandeln: F,
) -> AudioResult<Stream>
where
    T: SizedSample + Send + 'static,
    F: Fn(T) -> f32 + Send + 'static,
{
    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let kanaele = usize::from(config.channels.max(1));
    device
        .build_input_stream(
            &stream_config,
            move |daten: &[T], _| {
                fenster.push(&mono_mischen(daten.iter().map(|&s| wandeln(s)), kanaele));
            },
            |e| error!("Capture-Fehler: {}", e),
            None,
        )
        .map_err(|e| AudioError::StreamFehler(e.to_string()))
}

/// Mischt interleavte Samples auf Mono (Mittelwert pro Frame)
fn mono_mischen(samples: impl Iterator<Item = f32>, kanaele: usize) -> Vec<f32> {
    let alle: Vec<f32> = samples.collect();
    if kanaele <= 1 {
        return alle;
    }
    alle.chunks(kanaele)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
