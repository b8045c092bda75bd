//! Abgleich von gewuenschtem und tatsaechlichem Capture-Zustand
//!
//! Der Reconciler ist alleiniger Besitzer des lokalen Streams. Er wird
//! nach jeder Zustandsaenderung mit dem aktuellen Wunsch aufgerufen und
//! fordert an oder gibt frei. Die Anforderung laeuft asynchron als
//! ausstehendes Future, das die Sitzungs-Schleife abfragt.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{debug, error, info};

use crate::error::ClientResult;
use crate::media::{CaptureDevice, MediaSource, OwnedStream, StreamHandle};

type Anforderung = BoxFuture<'static, ClientResult<Arc<dyn MediaSource>>>;

/// Ergebnis eines Abgleichs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abgleich {
    Unveraendert,
    /// Anforderung gestartet
    Angefordert,
    /// Stream gestoppt und freigegeben
    Freigegeben,
}

pub struct DeviceReconciler {
    geraet: Arc<dyn CaptureDevice>,
    stream: Option<OwnedStream>,
    ausstehend: Option<Anforderung>,
    generation: u64,
    anforderungen: u64,
}

impl DeviceReconciler {
    pub fn new(geraet: Arc<dyn CaptureDevice>) -> Self {
        Self {
            geraet,
            stream: None,
            ausstehend: None,
            generation: 0,
            anforderungen: 0,
        }
    }

    /// Lesender Griff auf den aktuellen Stream
    pub fn handle(&self) -> Option<StreamHandle> {
        self.stream.as_ref().map(OwnedStream::handle)
    }

    pub fn hat_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn fordert_an(&self) -> bool {
        self.ausstehend.is_some()
    }

    /// Anzahl gestarteter Anforderungen seit Erstellung
    pub fn anforderungen(&self) -> u64 {
        self.anforderungen
    }

    /// Bringt den Capture-Zustand auf den Wunsch.
    ///
    /// Freigabe passiert immer vor einer neuen Anforderung: solange ein
    /// Stream gehalten wird, wird nicht erneut angefordert.
    pub fn abgleichen(&mut self, gewuenscht: bool) -> Abgleich {
        if gewuenscht {
            if self.stream.is_some() || self.ausstehend.is_some() {
                return Abgleich::Unveraendert;
            }
            let geraet = Arc::clone(&self.geraet);
            self.ausstehend = Some(Box::pin(async move { geraet.acquire().await }));
            self.anforderungen += 1;
            debug!(anforderung = self.anforderungen, "Capture angefordert");
            return Abgleich::Angefordert;
        }

        if self.ausstehend.take().is_some() {
            debug!("Ausstehende Capture-Anforderung verworfen");
        }
        match self.stream.take() {
            Some(stream) => {
                info!(generation = stream.generation(), "Capture freigegeben");
                stream.stop();
                Abgleich::Freigegeben
            }
            None => Abgleich::Unveraendert,
        }
    }

    /// Wartet auf das Ende der ausstehenden Anforderung.
    ///
    /// Ohne Anforderung wartet die Methode unbegrenzt. Abbruch-sicher: die
    /// Anforderung laeuft beim naechsten Aufruf weiter.
    pub async fn anforderung_abwarten(&mut self) -> ClientResult<Arc<dyn MediaSource>> {
        match self.ausstehend.as_mut() {
            Some(anforderung) => {
                let ergebnis = anforderung.await;
                self.ausstehend = None;
                ergebnis
            }
            None => std::future::pending().await,
        }
    }

    /// Uebernimmt das Ergebnis einer Anforderung.
    ///
    /// Wird der Stream inzwischen nicht mehr gewuenscht, wird er sofort
    /// wieder gestoppt. Fehler werden geloggt, es gibt keinen neuen Versuch.
    /// Liefert den neuen Griff, falls ein Stream installiert wurde.
    pub fn installieren(
        &mut self,
        ergebnis: ClientResult<Arc<dyn MediaSource>>,
        gewuenscht: bool,
        audio_aktiv: bool,
    ) -> Option<StreamHandle> {
        let quelle = match ergebnis {
            Ok(q) => q,
            Err(e) => {
                error!("Capture-Geraet nicht verfuegbar: {}", e);
                return None;
            }
        };
        if !gewuenscht || self.stream.is_some() {
            debug!("Capture nicht mehr gewuenscht, Stream wird gestoppt");
            quelle.stop();
            return None;
        }
        self.generation += 1;
        let stream = OwnedStream::new(quelle, self.generation);
        stream.set_audio_enabled(audio_aktiv);
        info!(generation = self.generation, "Capture aktiv");
        let handle = stream.handle();
        self.stream = Some(stream);
        Some(handle)
    }

    /// Aktiviert oder deaktiviert die Audio-Tracks des gehaltenen Streams
    pub fn audio_setzen(&self, aktiv: bool) {
        if let Some(stream) = &self.stream {
            stream.set_audio_enabled(aktiv);
        }
    }

    /// Gibt alles frei (Sitzungsende)
    pub fn freigeben(&mut self) {
        self.abgleichen(false);
    }
}
