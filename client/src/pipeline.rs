//! Frame-Versand
//!
//! Zeichnet bei jedem Refresh das aktuelle Videobild auf eine
//! Off-Screen-Flaeche, kodiert es als JPEG und schickt es als
//! `video_frame` ueber den Raumkanal. Gedrosselt wird allein ueber den
//! Mindestabstand `1000 / fps` ms zwischen zwei Sendungen.

use streamflow_protocol::ClientMessage;
use streamflow_video::settings::ziel_hoehe;
use streamflow_video::{Canvas, FrameEncoder, StreamSettings};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::connection::RoomChannel;
use crate::media::StreamHandle;
use crate::scheduler::{FrameToken, RefreshScheduler};

/// Ziel fuer kodierte Frames
pub trait FrameSink {
    fn ist_offen(&self) -> bool;
    fn senden(&mut self, nachricht: &ClientMessage) -> bool;
}

impl FrameSink for RoomChannel {
    fn ist_offen(&self) -> bool {
        RoomChannel::ist_offen(self)
    }

    fn senden(&mut self, nachricht: &ClientMessage) -> bool {
        self.send(nachricht)
    }
}

pub struct FrameTransmitter {
    kodierer: Box<dyn FrameEncoder>,
    canvas: Canvas,
    settings: StreamSettings,
    quelle: Option<StreamHandle>,
    token: Option<FrameToken>,
    letzte_sendung: Option<Instant>,
    in_flight: bool,
    gesendet: u64,
}

impl FrameTransmitter {
    pub fn new(kodierer: Box<dyn FrameEncoder>, settings: StreamSettings) -> Self {
        Self {
            kodierer,
            canvas: Canvas::new(),
            settings,
            quelle: None,
            token: None,
            letzte_sendung: None,
            in_flight: false,
            gesendet: 0,
        }
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    /// Generation des angehaengten Streams
    pub fn quelle_generation(&self) -> Option<u64> {
        self.quelle.as_ref().map(StreamHandle::generation)
    }

    pub fn laeuft(&self) -> bool {
        self.quelle.is_some()
    }

    pub fn besitzt(&self, token: FrameToken) -> bool {
        self.token == Some(token)
    }

    /// Anzahl gesendeter Frames seit Erstellung
    pub fn gesendet(&self) -> u64 {
        self.gesendet
    }

    /// Haengt eine Quelle an und startet die Schleife neu
    pub fn starten(
        &mut self,
        quelle: StreamHandle,
        settings: StreamSettings,
        takt: &mut dyn RefreshScheduler,
    ) {
        self.stoppen(takt);
        debug!(
            generation = quelle.generation(),
            quality = %settings.quality,
            fps = settings.fps,
            "Frame-Versand gestartet"
        );
        self.quelle = Some(quelle);
        self.settings = settings;
        self.letzte_sendung = None;
        self.in_flight = false;
        self.token = Some(takt.request_frame());
    }

    /// Storniert den naechsten Durchlauf und loest die Quelle
    pub fn stoppen(&mut self, takt: &mut dyn RefreshScheduler) {
        if let Some(token) = self.token.take() {
            takt.cancel_frame(token);
        }
        if self.quelle.take().is_some() {
            debug!(gesendet = self.gesendet, "Frame-Versand gestoppt");
        }
    }

    /// Ein Refresh fuer dieses Token: ggf. senden, dann neu anfordern.
    /// Liefert true wenn ein Frame gesendet wurde.
    pub fn frame(
        &mut self,
        token: FrameToken,
        jetzt: Instant,
        kanal: Option<&mut dyn FrameSink>,
        takt: &mut dyn RefreshScheduler,
    ) -> bool {
        if !self.besitzt(token) {
            return false;
        }
        self.token = None;
        let gesendet = self.tick(jetzt, kanal);
        if self.quelle.is_some() {
            self.token = Some(takt.request_frame());
        }
        gesendet
    }

    /// Ein Durchlauf ohne Neuplanung.
    ///
    /// Gesendet wird nur wenn nichts in Bearbeitung ist, die Quelle ein
    /// Bild hat, der Kanal offen ist und seit der letzten Sendung mehr als
    /// `1000 / fps` ms vergangen sind.
    pub fn tick(&mut self, jetzt: Instant, kanal: Option<&mut dyn FrameSink>) -> bool {
        let Some(quelle) = self.quelle.as_ref() else {
            return false;
        };
        let Some(kanal) = kanal else {
            return false;
        };
        if self.in_flight || !kanal.ist_offen() {
            return false;
        }
        if let Some(letzte) = self.letzte_sendung {
            if jetzt.saturating_duration_since(letzte) <= self.settings.min_intervall() {
                return false;
            }
        }
        let Some(frame) = quelle.video_frame(jetzt) else {
            trace!("Videoquelle noch ohne Bild, Frame uebersprungen");
            return false;
        };

        let breite = self.settings.quality.ziel_breite();
        let Some(hoehe) = ziel_hoehe(frame.breite(), frame.hoehe(), breite) else {
            return false;
        };

        self.in_flight = true;
        self.letzte_sendung = Some(jetzt);

        self.canvas.groesse_setzen(breite, hoehe);
        self.canvas.zeichnen(&frame);
        let gesendet = match self
            .kodierer
            .kodieren(&self.canvas, self.settings.quality.jpeg_qualitaet())
        {
            Ok(data) => kanal.senden(&ClientMessage::VideoFrame { data }),
            Err(e) => {
                warn!("Frame-Kodierung fehlgeschlagen: {}", e);
                false
            }
        };
        self.in_flight = false;

        if gesendet {
            self.gesendet += 1;
            trace!(breite, hoehe, nr = self.gesendet, "Frame gesendet");
        }
        gesendet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaSource, OwnedStream};
    use crate::scheduler::IntervalScheduler;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use streamflow_video::{QualityTier, RgbFrame, VideoResult};

    struct Kamera {
        bereit: AtomicBool,
        breite: u32,
        hoehe: u32,
    }

    impl MediaSource for Kamera {
        fn audio_tracks(&self) -> usize {
            0
        }
        fn read_audio(&self, out: &mut [f32]) {
            out.fill(0.0);
        }
        fn set_audio_enabled(&self, _enabled: bool) {}
        fn video_frame(&self, _jetzt: Instant) -> Option<RgbFrame> {
            if !self.bereit.load(Ordering::SeqCst) {
                return None;
            }
            RgbFrame::einfarbig(self.breite, self.hoehe, [10, 20, 30]).ok()
        }
        fn stop(&self) {}
        fn is_live(&self) -> bool {
            true
        }
    }

    /// Kodierer, der nur Groesse und Qualitaet notiert
    struct Notizkodierer {
        notizen: Arc<parking_lot::Mutex<Vec<(u32, u32, f32)>>>,
    }

    impl FrameEncoder for Notizkodierer {
        fn kodieren(&mut self, canvas: &Canvas, qualitaet: f32) -> VideoResult<String> {
            self.notizen
                .lock()
                .push((canvas.breite(), canvas.hoehe(), qualitaet));
            Ok("data:image/jpeg;base64,AAAA".into())
        }
    }

    #[derive(Default)]
    struct Senke {
        offen: bool,
        nachrichten: Vec<ClientMessage>,
    }

    impl FrameSink for Senke {
        fn ist_offen(&self) -> bool {
            self.offen
        }
        fn senden(&mut self, nachricht: &ClientMessage) -> bool {
            if !self.offen {
                return false;
            }
            self.nachrichten.push(nachricht.clone());
            true
        }
    }

    struct Aufbau {
        sender: FrameTransmitter,
        takt: IntervalScheduler,
        kamera: Arc<Kamera>,
        _stream: OwnedStream,
        notizen: Arc<parking_lot::Mutex<Vec<(u32, u32, f32)>>>,
    }

    fn aufbau(quality: QualityTier, fps: u32, breite: u32, hoehe: u32) -> Aufbau {
        let notizen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let settings = StreamSettings::new(quality, fps).unwrap();
        let mut sender = FrameTransmitter::new(
            Box::new(Notizkodierer {
                notizen: notizen.clone(),
            }),
            settings,
        );
        let kamera = Arc::new(Kamera {
            bereit: AtomicBool::new(true),
            breite,
            hoehe,
        });
        let stream = OwnedStream::new(kamera.clone(), 1);
        let mut takt = IntervalScheduler::default();
        sender.starten(stream.handle(), settings, &mut takt);
        Aufbau {
            sender,
            takt,
            kamera,
            _stream: stream,
            notizen,
        }
    }

    fn offene_senke() -> Senke {
        Senke {
            offen: true,
            ..Senke::default()
        }
    }

    /// Simuliert `dauer` in Refresh-Schritten von `schritt`
    fn simulieren(a: &mut Aufbau, senke: &mut Senke, dauer: Duration, schritt: Duration) {
        let start = Instant::now();
        let mut t = Duration::ZERO;
        while t < dauer {
            a.sender.tick(start + t, Some(&mut *senke));
            t += schritt;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sechzig_fps_hoechstens_ein_frame_pro_fenster() {
        let mut a = aufbau(QualityTier::P720, 60, 640, 480);
        let mut senke = offene_senke();
        // 1 s bei 1-ms-Refresh
        simulieren(&mut a, &mut senke, Duration::from_secs(1), Duration::from_millis(1));
        let n = senke.nachrichten.len();
        // alle 17 ms ein Frame (streng groesser als 16.67 ms)
        assert!((55..=60).contains(&n), "gesendet: {n}");
    }

    #[tokio::test(start_paused = true)]
    async fn zehn_fps_abstand_ueber_100_ms() {
        let mut a = aufbau(QualityTier::P360, 10, 640, 480);
        let mut senke = offene_senke();
        let start = Instant::now();
        assert!(a.sender.tick(start, Some(&mut senke)));
        // genau 100 ms reicht nicht
        assert!(!a.sender.tick(start + Duration::from_millis(100), Some(&mut senke)));
        assert!(a.sender.tick(start + Duration::from_millis(101), Some(&mut senke)));
        assert_eq!(senke.nachrichten.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn geschlossener_kanal_sendet_nichts() {
        let mut a = aufbau(QualityTier::P720, 60, 640, 480);
        let mut senke = Senke::default();
        assert!(!a.sender.tick(Instant::now(), Some(&mut senke)));
        assert!(!a.sender.tick(Instant::now(), None));
        assert!(a.notizen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ohne_bild_wird_uebersprungen() {
        let mut a = aufbau(QualityTier::P720, 60, 640, 480);
        a.kamera.bereit.store(false, Ordering::SeqCst);
        let mut senke = offene_senke();
        let start = Instant::now();
        assert!(!a.sender.tick(start, Some(&mut senke)));
        // uebersprungener Durchlauf zaehlt nicht als Sendung
        a.kamera.bereit.store(true, Ordering::SeqCst);
        assert!(a.sender.tick(start + Duration::from_millis(1), Some(&mut senke)));
    }

    #[tokio::test(start_paused = true)]
    async fn zielgroesse_und_qualitaet() {
        for (tier, breite, hoehe, q) in [
            (QualityTier::P360, 320, 240, 0.4),
            (QualityTier::P720, 1280, 960, 0.6),
            (QualityTier::P1080, 1920, 1440, 0.6),
        ] {
            let mut a = aufbau(tier, 30, 640, 480);
            let mut senke = offene_senke();
            assert!(a.sender.tick(Instant::now(), Some(&mut senke)));
            assert_eq!(a.notizen.lock()[0], (breite, hoehe, q));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn nachricht_ist_video_frame() {
        let mut a = aufbau(QualityTier::P360, 60, 160, 90);
        let mut senke = offene_senke();
        a.sender.tick(Instant::now(), Some(&mut senke));
        assert_eq!(
            senke.nachrichten,
            vec![ClientMessage::VideoFrame {
                data: "data:image/jpeg;base64,AAAA".into()
            }]
        );
        // 16:9 auf 320 Breite
        assert_eq!(a.notizen.lock()[0].1, 180);
    }

    #[tokio::test(start_paused = true)]
    async fn schleife_plant_sich_selbst_neu() {
        let mut a = aufbau(QualityTier::P360, 60, 64, 48);
        let mut senke = offene_senke();
        assert_eq!(a.takt.ausstehend(), 1);
        let (jetzt, tokens) = a.takt.next_frame().await;
        assert!(a
            .sender
            .frame(tokens[0], jetzt, Some(&mut senke), &mut a.takt));
        assert_eq!(a.takt.ausstehend(), 1);

        a.sender.stoppen(&mut a.takt);
        assert_eq!(a.takt.ausstehend(), 0);
        assert!(!a.sender.laeuft());
    }

    #[tokio::test(start_paused = true)]
    async fn neustart_setzt_drossel_zurueck() {
        let mut a = aufbau(QualityTier::P360, 10, 64, 48);
        let mut senke = offene_senke();
        let start = Instant::now();
        assert!(a.sender.tick(start, Some(&mut senke)));

        let stream = OwnedStream::new(a.kamera.clone(), 2);
        let settings = StreamSettings::new(QualityTier::P720, 10).unwrap();
        a.sender.starten(stream.handle(), settings, &mut a.takt);
        assert_eq!(a.takt.ausstehend(), 1);
        assert_eq!(a.sender.quelle_generation(), Some(2));
        assert!(a
            .sender
            .tick(start + Duration::from_millis(1), Some(&mut senke)));
    }
}
