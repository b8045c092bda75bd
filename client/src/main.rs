//! StreamFlow Client – Einstiegspunkt
//!
//! Headless-Client: Befehle kommen zeilenweise ueber stdin, Aenderungen
//! der Sitzung werden geloggt.

use std::sync::Arc;

use anyhow::Result;
use streamflow_client::commands::{eingabe_parsen, Eingabe, HILFE};
use streamflow_client::logging::logging_initialisieren;
use streamflow_client::{
    ClientConfig, HttpDirectory, IntervalScheduler, LocalDevice, Session, SessionCommand,
    SessionConfig, SessionHandle, SessionParts, SessionUpdate, WsConnector,
};
use streamflow_video::{JpegEncoder, StreamSettings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config_pfad = ClientConfig::pfad_aus_env();
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        user = %config.profil.name,
        "StreamFlow Client wird initialisiert"
    );

    // Die Sitzung ist ein einzelner Task, ein Thread genuegt
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(starten(config))
}

async fn starten(config: ClientConfig) -> Result<()> {
    if config.geraet.mikrofon {
        eingabegeraete_loggen();
    }

    let verzeichnis = Arc::new(HttpDirectory::new(&config.server.http_url));
    let parts = SessionParts {
        connector: Arc::new(WsConnector::new(&config.server.ws_url)),
        directory: verzeichnis.clone(),
        geraet: Arc::new(LocalDevice::new(config.geraet.clone())),
        takt: Box::new(IntervalScheduler::default()),
        kodierer: Box::new(JpegEncoder),
    };

    let (session, handle, updates) = Session::new(SessionConfig::aus_config(&config), parts);

    tokio::spawn(updates_loggen(updates, verzeichnis, config.profil.name.clone()));
    tokio::spawn(eingabe_lesen(handle.clone(), config.stream));

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C empfangen, Sitzung wird beendet");
            let _ = shutdown.beenden().await;
        }
    });
    drop(handle);

    session.run().await?;
    info!("StreamFlow Client beendet");
    Ok(())
}

fn eingabegeraete_loggen() {
    match streamflow_audio::list_input_devices() {
        Ok(geraete) => {
            for g in &geraete {
                info!(name = %g.name, standard = g.ist_standard, kanaele = g.channels, "Audio-Eingabegeraet");
            }
        }
        Err(e) => warn!("Audio-Eingabegeraete nicht abrufbar: {}", e),
    }
}

/// Liest Befehle von stdin, bis die Eingabe endet
async fn eingabe_lesen(handle: SessionHandle, mut settings: StreamSettings) {
    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    println!("{HILFE}");

    while let Ok(Some(zeile)) = zeilen.next_line().await {
        let befehl = match eingabe_parsen(&zeile, settings) {
            Ok(Eingabe::Befehl(befehl)) => befehl,
            Ok(Eingabe::RaeumeAnzeigen) => SessionCommand::RefreshRooms,
            Ok(Eingabe::Hilfe) => {
                println!("{HILFE}");
                continue;
            }
            Ok(Eingabe::Leer) => continue,
            Err(fehler) => {
                println!("{fehler}");
                continue;
            }
        };
        if let SessionCommand::UpdateSettings(neu) = &befehl {
            settings = *neu;
        }
        let ende = befehl == SessionCommand::Shutdown;
        if handle.senden(befehl).await.is_err() || ende {
            break;
        }
    }
    let _ = handle.beenden().await;
}

async fn updates_loggen(
    mut updates: mpsc::UnboundedReceiver<SessionUpdate>,
    verzeichnis: Arc<HttpDirectory>,
    user_name: String,
) {
    while let Some(update) = updates.recv().await {
        match update {
            SessionUpdate::Rooms(raeume) => {
                println!("{} Raum/Raeume:", raeume.len());
                for raum in &raeume {
                    println!(
                        "  {}  {}  (Host: {}, {} Teilnehmer)",
                        raum.room_id,
                        raum.title,
                        raum.host_name,
                        raum.participants.len()
                    );
                }
            }
            SessionUpdate::Selection(Some(room)) => {
                info!(room = %room, feed = %verzeichnis.video_feed_url(&room, &user_name), "Raum betreten");
            }
            SessionUpdate::Selection(None) => info!("Kein Raum ausgewaehlt"),
            SessionUpdate::ChannelOpened(room) => info!(room = %room, "Raumkanal offen"),
            SessionUpdate::ChannelClosed(room) => warn!(room = %room, "Raumkanal geschlossen"),
            SessionUpdate::Participants(teilnehmer) => {
                for p in &teilnehmer {
                    println!(
                        "  {}{}{}{}",
                        p.name,
                        if p.is_muted { " [stumm]" } else { "" },
                        if p.is_video_off { " [kamera aus]" } else { "" },
                        if p.spricht() { " *spricht*" } else { "" },
                    );
                }
            }
            SessionUpdate::ChatHistory(zeilen) => {
                for z in &zeilen {
                    println!("[{}] {}", z.absender(), z.text);
                }
            }
            SessionUpdate::Chat(z) => println!("[{}] {}", z.absender(), z.text),
            SessionUpdate::Speaking(spricht) => info!(spricht, "Sprech-Status"),
            SessionUpdate::Capture(aktiv) => info!(aktiv, "Capture"),
            SessionUpdate::Settings(s) => info!(quality = %s.quality, fps = s.fps, "Stream-Einstellungen"),
            SessionUpdate::Fehler(fehler) => warn!("{}", fehler),
        }
    }
}
