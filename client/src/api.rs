//! Raum-Verzeichnis (REST)
//!
//! Raumliste, Raum anlegen und schliessen, Chat-Verlauf und
//! Chat-Fallback. Die Sitzung fuehrt alle Aufrufe in eigenen Tasks aus,
//! die Antworten kommen als Ereignisse zurueck in die Schleife.

use async_trait::async_trait;
use reqwest::Client;
use streamflow_core::RoomId;
use streamflow_protocol::{ChatLine, ChatPost, RoomCreate, RoomInfo};
use tracing::debug;

use crate::error::ClientResult;

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// `GET /rooms`
    async fn list_rooms(&self) -> ClientResult<Vec<RoomInfo>>;

    /// `POST /rooms`
    async fn create_room(&self, anfrage: &RoomCreate) -> ClientResult<RoomInfo>;

    /// `POST /rooms/{room_id}/close` (nur Host)
    async fn close_room(&self, room: &RoomId) -> ClientResult<()>;

    /// `GET /rooms/{room_id}/messages`
    async fn chat_history(&self, room: &RoomId) -> ClientResult<Vec<ChatLine>>;

    /// `POST /rooms/{room_id}/messages`
    async fn post_chat(&self, room: &RoomId, post: &ChatPost) -> ClientResult<()>;
}

/// HTTP-Implementierung ueber reqwest
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: Client,
    basis_url: String,
}

impl HttpDirectory {
    pub fn new(basis_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            basis_url: basis_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, pfad: &str) -> String {
        format!("{}{}", self.basis_url, pfad)
    }

    /// MJPEG-Fallback eines Teilnehmers. Der Client baut nur die URL.
    pub fn video_feed_url(&self, room: &RoomId, user_name: &str) -> String {
        self.url(&format!("/rooms/{room}/video_feed/{user_name}"))
    }
}

#[async_trait]
impl RoomDirectory for HttpDirectory {
    async fn list_rooms(&self) -> ClientResult<Vec<RoomInfo>> {
        let raeume: Vec<RoomInfo> = self
            .client
            .get(self.url("/rooms"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(anzahl = raeume.len(), "Raumliste geladen");
        Ok(raeume)
    }

    async fn create_room(&self, anfrage: &RoomCreate) -> ClientResult<RoomInfo> {
        let raum = self
            .client
            .post(self.url("/rooms"))
            .json(anfrage)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(raum)
    }

    async fn close_room(&self, room: &RoomId) -> ClientResult<()> {
        self.client
            .post(self.url(&format!("/rooms/{room}/close")))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn chat_history(&self, room: &RoomId) -> ClientResult<Vec<ChatLine>> {
        let verlauf = self
            .client
            .get(self.url(&format!("/rooms/{room}/messages")))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(verlauf)
    }

    async fn post_chat(&self, room: &RoomId, post: &ChatPost) -> ClientResult<()> {
        self.client
            .post(self.url(&format!("/rooms/{room}/messages")))
            .json(post)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_ohne_doppelten_schraegstrich() {
        let d = HttpDirectory::new("http://localhost:8000/");
        assert_eq!(d.url("/rooms"), "http://localhost:8000/rooms");
        assert_eq!(
            d.video_feed_url(&RoomId::from("ab12"), "bob"),
            "http://localhost:8000/rooms/ab12/video_feed/bob"
        );
    }

    #[tokio::test]
    async fn nicht_erreichbarer_server_ist_fehler() {
        let d = HttpDirectory::new("http://127.0.0.1:9");
        assert!(d.list_rooms().await.is_err());
    }
}
