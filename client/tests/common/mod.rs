//! Attrappen fuer Sitzungs-Tests: Kanal, Verzeichnis, Capture-Geraet,
//! Kodierer. Alle zaehlen mit, was die Sitzung mit ihnen macht.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use streamflow_client::connection::SharedReadyState;
use streamflow_client::{
    CaptureDevice, ChannelConnector, ChannelEvent, ChannelTransport, ClientResult,
    IntervalScheduler, MediaSource, ReadyState, RoomDirectory, Session, SessionConfig,
    SessionHandle, SessionParts, SessionUpdate,
};
use streamflow_core::RoomId;
use streamflow_protocol::{
    ChatLine, ChatPost, ClientMessage, ParticipantInfo, RoomCreate, RoomInfo, ServerMessage,
};
use streamflow_video::{Canvas, FrameEncoder, QualityTier, RgbFrame, StreamSettings, VideoResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const EIGENER_NAME: &str = "alice";
pub const WARTEZEIT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Kanal
// ---------------------------------------------------------------------------

/// Testseite einer Verbindung
#[derive(Clone)]
pub struct FakeVerbindung {
    pub room: RoomId,
    pub user_name: String,
    pub zustand: SharedReadyState,
    pub events: mpsc::UnboundedSender<ChannelEvent>,
    pub gesendet: Arc<Mutex<Vec<String>>>,
}

impl FakeVerbindung {
    /// Server nimmt die Verbindung an
    pub fn oeffnen(&self) {
        self.zustand.set(ReadyState::Open);
        let _ = self.events.send(ChannelEvent::Opened);
    }

    pub fn server(&self, nachricht: ServerMessage) {
        let _ = self.events.send(ChannelEvent::Message(nachricht));
    }

    /// Alle gesendeten Nachrichten, dekodiert
    pub fn nachrichten(&self) -> Vec<ClientMessage> {
        self.gesendet
            .lock()
            .iter()
            .map(|json| ClientMessage::from_json(json).expect("gueltiges JSON"))
            .collect()
    }

    pub fn ohne_frames(&self) -> Vec<ClientMessage> {
        self.nachrichten()
            .into_iter()
            .filter(|m| !matches!(m, ClientMessage::VideoFrame { .. }))
            .collect()
    }

    pub fn frames(&self) -> usize {
        self.nachrichten()
            .iter()
            .filter(|m| matches!(m, ClientMessage::VideoFrame { .. }))
            .count()
    }
}

struct FakeTransport {
    zustand: SharedReadyState,
    gesendet: Arc<Mutex<Vec<String>>>,
}

impl ChannelTransport for FakeTransport {
    fn ready_state(&self) -> ReadyState {
        self.zustand.get()
    }

    fn transmit(&mut self, text: String) {
        assert_eq!(self.zustand.get(), ReadyState::Open, "Senden auf nicht offenem Kanal");
        self.gesendet.lock().push(text);
    }

    fn close(&mut self) {
        self.zustand.set(ReadyState::Closed);
    }
}

#[derive(Default)]
pub struct FakeConnector {
    verbindungen: Mutex<Vec<FakeVerbindung>>,
}

impl FakeConnector {
    pub fn anzahl(&self) -> usize {
        self.verbindungen.lock().len()
    }

    pub fn letzte(&self) -> Option<FakeVerbindung> {
        self.verbindungen.lock().last().cloned()
    }
}

impl ChannelConnector for FakeConnector {
    fn connect(
        &self,
        room: &RoomId,
        user_name: &str,
    ) -> (Box<dyn ChannelTransport>, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let verbindung = FakeVerbindung {
            room: room.clone(),
            user_name: user_name.to_string(),
            zustand: SharedReadyState::new(ReadyState::Connecting),
            events: tx,
            gesendet: Arc::new(Mutex::new(Vec::new())),
        };
        let transport = FakeTransport {
            zustand: verbindung.zustand.clone(),
            gesendet: verbindung.gesendet.clone(),
        };
        self.verbindungen.lock().push(verbindung);
        (Box::new(transport), rx)
    }
}

// ---------------------------------------------------------------------------
// Verzeichnis
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDirectory {
    pub raeume: Mutex<Vec<RoomInfo>>,
    pub verlauf: Mutex<Vec<ChatLine>>,
    pub list_aufrufe: AtomicUsize,
    pub geschlossen: Mutex<Vec<RoomId>>,
    pub posts: Mutex<Vec<(RoomId, ChatPost)>>,
}

impl FakeDirectory {
    pub fn mit_raeumen(raeume: Vec<RoomInfo>) -> Self {
        Self {
            raeume: Mutex::new(raeume),
            ..Default::default()
        }
    }

    pub fn listen(&self) -> usize {
        self.list_aufrufe.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomDirectory for FakeDirectory {
    async fn list_rooms(&self) -> ClientResult<Vec<RoomInfo>> {
        self.list_aufrufe.fetch_add(1, Ordering::SeqCst);
        Ok(self.raeume.lock().clone())
    }

    async fn create_room(&self, anfrage: &RoomCreate) -> ClientResult<RoomInfo> {
        let raum = raum("neu00001", &anfrage.host_name, Vec::new());
        Ok(RoomInfo {
            title: anfrage.title.clone(),
            ..raum
        })
    }

    async fn close_room(&self, room: &RoomId) -> ClientResult<()> {
        self.geschlossen.lock().push(room.clone());
        Ok(())
    }

    async fn chat_history(&self, _room: &RoomId) -> ClientResult<Vec<ChatLine>> {
        Ok(self.verlauf.lock().clone())
    }

    async fn post_chat(&self, room: &RoomId, post: &ChatPost) -> ClientResult<()> {
        self.posts.lock().push((room.clone(), post.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

pub struct FakeQuelle {
    pub audio: AtomicBool,
    pub gestoppt: AtomicBool,
    /// Breitbandiges Signal statt Stille
    pub laut: AtomicBool,
}

impl FakeQuelle {
    pub fn lauter_machen(&self) {
        self.laut.store(true, Ordering::SeqCst);
    }
}

impl MediaSource for FakeQuelle {
    fn audio_tracks(&self) -> usize {
        1
    }

    fn read_audio(&self, out: &mut [f32]) {
        if !self.audio.load(Ordering::SeqCst) || !self.laut.load(Ordering::SeqCst) {
            out.fill(0.0);
            return;
        }
        let n = out.len() as f32;
        for (i, s) in out.iter_mut().enumerate() {
            let t = i as f32 / n;
            *s = (1..40)
                .map(|k| (2.0 * std::f32::consts::PI * (k * 3) as f32 * t).sin())
                .sum::<f32>()
                * 0.05;
        }
    }

    fn set_audio_enabled(&self, enabled: bool) {
        self.audio.store(enabled, Ordering::SeqCst);
    }

    fn video_frame(&self, _jetzt: Instant) -> Option<RgbFrame> {
        RgbFrame::einfarbig(64, 48, [10, 200, 30]).ok()
    }

    fn stop(&self) {
        self.gestoppt.store(true, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        !self.gestoppt.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeDevice {
    pub quellen: Mutex<Vec<Arc<FakeQuelle>>>,
}

impl FakeDevice {
    pub fn anforderungen(&self) -> usize {
        self.quellen.lock().len()
    }

    pub fn letzte(&self) -> Option<Arc<FakeQuelle>> {
        self.quellen.lock().last().cloned()
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    async fn acquire(&self) -> ClientResult<Arc<dyn MediaSource>> {
        let quelle = Arc::new(FakeQuelle {
            audio: AtomicBool::new(true),
            gestoppt: AtomicBool::new(false),
            laut: AtomicBool::new(false),
        });
        self.quellen.lock().push(quelle.clone());
        Ok(quelle)
    }
}

/// Kodierer ohne libjpeg
pub struct FakeEncoder;

impl FrameEncoder for FakeEncoder {
    fn kodieren(&mut self, canvas: &Canvas, _qualitaet: f32) -> VideoResult<String> {
        Ok(format!("data:image/jpeg;base64,{}x{}", canvas.breite(), canvas.hoehe()))
    }
}

// ---------------------------------------------------------------------------
// Aufbau
// ---------------------------------------------------------------------------

pub fn raum(room_id: &str, host: &str, participants: Vec<ParticipantInfo>) -> RoomInfo {
    RoomInfo {
        id: 1,
        room_id: RoomId::from(room_id),
        title: format!("Raum {room_id}"),
        host_name: host.to_string(),
        host_avatar: String::new(),
        viewers: participants.len() as i64,
        thumbnail: String::new(),
        is_active: true,
        participants,
    }
}

pub struct Umgebung {
    pub handle: SessionHandle,
    pub updates: mpsc::UnboundedReceiver<SessionUpdate>,
    pub connector: Arc<FakeConnector>,
    pub directory: Arc<FakeDirectory>,
    pub geraet: Arc<FakeDevice>,
    pub task: JoinHandle<ClientResult<()>>,
}

/// Startet eine Sitzung mit Attrappen. Die periodische Abfrage ist so
/// lang, dass sie im Test nie feuert.
pub fn starten(directory: FakeDirectory) -> Umgebung {
    let connector = Arc::new(FakeConnector::default());
    let directory = Arc::new(directory);
    let geraet = Arc::new(FakeDevice::default());

    let config = SessionConfig {
        user_name: EIGENER_NAME.to_string(),
        chat_farbe: "#theme-accent".to_string(),
        poll_intervall: Duration::from_secs(3600),
        settings: StreamSettings {
            quality: QualityTier::P360,
            fps: 60,
        },
    };
    let parts = SessionParts {
        connector: connector.clone(),
        directory: directory.clone(),
        geraet: geraet.clone(),
        takt: Box::new(IntervalScheduler::default()),
        kodierer: Box::new(FakeEncoder),
    };
    let (session, handle, updates) = Session::new(config, parts);
    let task = tokio::spawn(session.run());

    Umgebung {
        handle,
        updates,
        connector,
        directory,
        geraet,
        task,
    }
}

impl Umgebung {
    /// Wartet auf das erste Update, das `pruefen` erfuellt
    pub async fn erwarten<F>(&mut self, mut pruefen: F) -> SessionUpdate
    where
        F: FnMut(&SessionUpdate) -> bool,
    {
        let suche = async {
            loop {
                match self.updates.recv().await {
                    Some(update) if pruefen(&update) => return update,
                    Some(_) => continue,
                    None => panic!("Sitzung beendet"),
                }
            }
        };
        tokio::time::timeout(WARTEZEIT, suche)
            .await
            .expect("Update nicht rechtzeitig eingetroffen")
    }

    /// Wartet bis `bedingung` gilt
    pub async fn warten_bis<F>(&self, mut bedingung: F)
    where
        F: FnMut() -> bool,
    {
        let ende = Instant::now() + WARTEZEIT;
        while !bedingung() {
            assert!(Instant::now() < ende, "Bedingung nicht rechtzeitig erfuellt");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn verbindung(&self) -> FakeVerbindung {
        self.connector.letzte().expect("keine Verbindung geoeffnet")
    }

    /// Waehlt einen Raum, oeffnet den Kanal und wartet bis beides gemeldet ist
    pub async fn betreten(&mut self, room: &str) -> FakeVerbindung {
        self.handle.raum_waehlen(room).await.expect("Sitzung laeuft");
        self.erwarten(|u| matches!(u, SessionUpdate::Selection(Some(_))))
            .await;
        let verbindung = self.verbindung();
        verbindung.oeffnen();
        self.erwarten(|u| matches!(u, SessionUpdate::ChannelOpened(_)))
            .await;
        verbindung
    }

    pub async fn beenden(self) {
        self.handle.beenden().await.expect("Sitzung laeuft");
        let ergebnis = tokio::time::timeout(WARTEZEIT, self.task)
            .await
            .expect("Sitzung nicht rechtzeitig beendet")
            .expect("Task panikte");
        assert!(ergebnis.is_ok());
    }
}
