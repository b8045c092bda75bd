//! Sprech-Erkennung fuer den lokalen Stream
//!
//! Pro (Stream, Mute-Status) wird genau ein Analyse-Graph gebaut. Solange
//! er lebt, wertet er bei jedem Refresh das juengste Sample-Fenster aus.
//! Stumm oder ohne Quelle gibt es keinen Graphen und das Ergebnis ist
//! immer false.

use streamflow_audio::{AudioError, SpeechAnalysis};
use tracing::{debug, error, warn};

use crate::media::StreamHandle;
use crate::scheduler::{FrameToken, RefreshScheduler};

/// Schluessel, fuer den ein Graph gebaut wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GraphSchluessel {
    generation: Option<u64>,
    stumm: bool,
}

struct Graph {
    quelle: StreamHandle,
    analyse: SpeechAnalysis,
}

#[derive(Default)]
pub struct ActivityDetector {
    schluessel: Option<GraphSchluessel>,
    graph: Option<Graph>,
    token: Option<FrameToken>,
    spricht: bool,
}

impl ActivityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spricht(&self) -> bool {
        self.spricht
    }

    pub fn laeuft(&self) -> bool {
        self.graph.is_some()
    }

    pub fn besitzt(&self, token: FrameToken) -> bool {
        self.token == Some(token)
    }

    /// Passt den Detektor an Quelle und Mute-Status an.
    ///
    /// Liefert den neuen Wert, falls sich das Sprech-Flag geaendert hat.
    pub fn aktualisieren(
        &mut self,
        quelle: Option<&StreamHandle>,
        stumm: bool,
        takt: &mut dyn RefreshScheduler,
    ) -> Option<bool> {
        let schluessel = GraphSchluessel {
            generation: quelle.map(StreamHandle::generation),
            stumm,
        };
        if self.schluessel == Some(schluessel) {
            return None;
        }
        self.schluessel = Some(schluessel);
        self.abbauen(takt);

        let quelle = match quelle {
            Some(q) if !stumm => q,
            _ => return self.setzen(false),
        };

        match graph_bauen(quelle) {
            Ok(graph) => {
                debug!(generation = quelle.generation(), "Audio-Analyse gestartet");
                self.graph = Some(graph);
                self.token = Some(takt.request_frame());
                None
            }
            Err(AudioError::KeinAudioTrack) => {
                warn!(generation = quelle.generation(), "Stream ohne Audio-Track, keine Sprech-Erkennung");
                self.setzen(false)
            }
            Err(e) => {
                error!("Audio-Analyse konnte nicht aufgebaut werden: {}", e);
                self.setzen(false)
            }
        }
    }

    /// Ein Refresh fuer dieses Token: auswerten und neu anfordern
    pub fn frame(&mut self, token: FrameToken, takt: &mut dyn RefreshScheduler) -> Option<bool> {
        if !self.besitzt(token) {
            return None;
        }
        self.token = None;
        let graph = self.graph.as_mut()?;

        graph.quelle.read_audio(graph.analyse.samples_mut());
        let spricht = match graph.analyse.auswerten() {
            Ok(s) => s,
            Err(e) => {
                warn!("Audio-Auswertung fehlgeschlagen: {}", e);
                false
            }
        };
        self.token = Some(takt.request_frame());
        self.setzen(spricht)
    }

    /// Bricht die Schleife ab und gibt den Graphen frei
    pub fn abbauen(&mut self, takt: &mut dyn RefreshScheduler) {
        if let Some(token) = self.token.take() {
            takt.cancel_frame(token);
        }
        self.graph = None;
    }

    /// Vollstaendiger Reset (Raumwechsel, Sitzungsende).
    ///
    /// Liefert `Some(false)`, wenn vorher gesprochen wurde.
    pub fn beenden(&mut self, takt: &mut dyn RefreshScheduler) -> Option<bool> {
        self.abbauen(takt);
        self.schluessel = None;
        self.setzen(false)
    }

    fn setzen(&mut self, spricht: bool) -> Option<bool> {
        if self.spricht == spricht {
            return None;
        }
        self.spricht = spricht;
        Some(spricht)
    }
}

fn graph_bauen(quelle: &StreamHandle) -> Result<Graph, AudioError> {
    if quelle.audio_tracks() == 0 {
        return Err(AudioError::KeinAudioTrack);
    }
    Ok(Graph {
        quelle: quelle.clone(),
        analyse: SpeechAnalysis::neu()?,
    })
}
