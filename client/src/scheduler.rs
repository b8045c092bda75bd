//! Refresh-Takt fuer die Analyse- und Versandschleifen
//!
//! Funktioniert wie eine Animation-Frame-API: eine Schleife fordert pro
//! Durchlauf genau einen Frame an und bekommt beim naechsten Refresh ihr
//! Token zurueck. Beim Abbau wird das ausstehende Token storniert, danach
//! ruft der Takt die Schleife nicht mehr auf.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Standard-Refresh-Rate (entspricht einem 60-Hz-Display)
pub const STANDARD_REFRESH: Duration = Duration::from_micros(16_667);

/// Kennung einer einzelnen Frame-Anforderung
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Abstrakter Refresh-Takt
#[async_trait]
pub trait RefreshScheduler: Send {
    /// Fordert einen Aufruf beim naechsten Refresh an
    fn request_frame(&mut self) -> FrameToken;

    /// Storniert eine ausstehende Anforderung (unbekannte Tokens werden ignoriert)
    fn cancel_frame(&mut self, token: FrameToken);

    /// Anzahl ausstehender Anforderungen
    fn ausstehend(&self) -> usize;

    /// Wartet auf den naechsten Refresh und liefert alle bis dahin
    /// angeforderten Tokens. Ohne ausstehende Anforderung wartet die
    /// Methode unbegrenzt.
    ///
    /// Abbruch-sicher: wird das Future vor Abschluss verworfen, bleiben
    /// alle Anforderungen erhalten.
    async fn next_frame(&mut self) -> (Instant, Vec<FrameToken>);
}

// ---------------------------------------------------------------------------
// IntervalScheduler
// ---------------------------------------------------------------------------

/// Timer-basierter Takt fuer native Ziele
pub struct IntervalScheduler {
    interval: Interval,
    naechstes: u64,
    ausstehend: BTreeSet<FrameToken>,
}

impl IntervalScheduler {
    pub fn new(periode: Duration) -> Self {
        let mut interval = tokio::time::interval(periode);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            naechstes: 1,
            ausstehend: BTreeSet::new(),
        }
    }

    pub fn periode(&self) -> Duration {
        self.interval.period()
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new(STANDARD_REFRESH)
    }
}

#[async_trait]
impl RefreshScheduler for IntervalScheduler {
    fn request_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.naechstes);
        self.naechstes += 1;
        self.ausstehend.insert(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.ausstehend.remove(&token);
    }

    fn ausstehend(&self) -> usize {
        self.ausstehend.len()
    }

    async fn next_frame(&mut self) -> (Instant, Vec<FrameToken>) {
        if self.ausstehend.is_empty() {
            std::future::pending::<()>().await;
        }
        let jetzt = self.interval.tick().await;
        let tokens = std::mem::take(&mut self.ausstehend).into_iter().collect();
        (jetzt, tokens)
    }
}
