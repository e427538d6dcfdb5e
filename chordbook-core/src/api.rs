//! # REST Boundary
//!
//! Thin typed wrappers over the backend's JSON endpoints: auth, songs with
//! their chord annotations, the moderation workflow, playlists and the chord
//! catalog. No protocol design lives here — request out, JSON back.
//!
//! Authentication is an explicit [`AuthSession`] injected at construction.
//! There is no ambient token store: a client built with an anonymous session
//! stays anonymous, and tests can hand in a fake session.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Bearer-token credentials for the backend, or anonymous.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    token: Option<String>,
}

impl AuthSession {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Client for the song/playlist backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: AuthSession,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: AuthSession) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn handle<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(response.url().path().to_string())),
            _ => Err(ApiError::Api(
                status.as_u16(),
                response.text().await.unwrap_or_default(),
            )),
        }
    }

    // --- auth ---

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let resp = self
            .request(Method::POST, "/api/auth/login")
            .json(&body)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .request(Method::POST, "/api/auth/register")
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    // --- songs ---

    /// Approved, publicly visible songs, paginated.
    pub async fn public_songs(
        &self,
        page: u32,
        size: u32,
    ) -> Result<PageResponse<Song>, ApiError> {
        let resp = self
            .request(Method::GET, "/api/songs/public")
            .query(&[("page", page), ("size", size)])
            .send()
            .await?;
        Self::handle(resp).await
    }

    /// The caller's own songs, drafts included.
    pub async fn my_songs(&self) -> Result<Vec<Song>, ApiError> {
        let resp = self.request(Method::GET, "/api/songs/my").send().await?;
        Self::handle(resp).await
    }

    pub async fn song(&self, id: i64) -> Result<Song, ApiError> {
        let resp = self
            .request(Method::GET, &format!("/api/songs/{id}"))
            .send()
            .await?;
        Self::handle(resp).await
    }

    /// Creates a song; the backend stores it as a draft.
    pub async fn create_song(&self, request: &SongRequest) -> Result<Song, ApiError> {
        let resp = self
            .request(Method::POST, "/api/songs")
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn update_song(&self, id: i64, request: &SongRequest) -> Result<Song, ApiError> {
        let resp = self
            .request(Method::PUT, &format!("/api/songs/{id}"))
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    /// Moves a draft into the moderation queue (DRAFT → PENDING).
    pub async fn submit_song(&self, id: i64) -> Result<Song, ApiError> {
        let resp = self
            .request(Method::PUT, &format!("/api/songs/{id}/submit"))
            .send()
            .await?;
        Self::handle(resp).await
    }

    // --- moderation (admin role) ---

    pub async fn pending_songs(&self) -> Result<Vec<Song>, ApiError> {
        let resp = self
            .request(Method::GET, "/api/admin/songs/pending")
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn approve_song(&self, id: i64) -> Result<Song, ApiError> {
        let resp = self
            .request(Method::PUT, &format!("/api/admin/songs/{id}/approve"))
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn reject_song(&self, id: i64, reason: &str) -> Result<Song, ApiError> {
        let body = serde_json::json!({ "reason": reason });
        let resp = self
            .request(Method::PUT, &format!("/api/admin/songs/{id}/reject"))
            .json(&body)
            .send()
            .await?;
        Self::handle(resp).await
    }

    // --- playlists ---

    pub async fn my_playlists(&self) -> Result<Vec<Playlist>, ApiError> {
        let resp = self.request(Method::GET, "/api/playlists/my").send().await?;
        Self::handle(resp).await
    }

    pub async fn create_playlist(&self, name: &str) -> Result<Playlist, ApiError> {
        let body = serde_json::json!({ "name": name });
        let resp = self
            .request(Method::POST, "/api/playlists")
            .json(&body)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn add_song_to_playlist(
        &self,
        playlist_id: i64,
        song_id: i64,
    ) -> Result<Playlist, ApiError> {
        let body = serde_json::json!({ "songId": song_id });
        let resp = self
            .request(Method::POST, &format!("/api/playlists/{playlist_id}/songs"))
            .json(&body)
            .send()
            .await?;
        Self::handle(resp).await
    }

    // --- chord catalog (public) ---

    pub async fn available_chords(&self) -> Result<Vec<ChordInfo>, ApiError> {
        let resp = self
            .request(Method::GET, "/api/songs/available-chords")
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn common_chords(&self) -> Result<Vec<ChordInfo>, ApiError> {
        let resp = self
            .request(Method::GET, "/api/songs/common-chords")
            .send()
            .await?;
        Self::handle(resp).await
    }
}

// --- DTOs; field names follow the backend's camelCase JSON ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub email: String,
}

/// Moderation lifecycle of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SongStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for SongStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SongStatus::Draft => "draft",
            SongStatus::Pending => "pending",
            SongStatus::Approved => "approved",
            SongStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A chord anchored to a character offset in a lyric line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordPosition {
    /// 0-based character offset in the line
    pub start: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chord_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    pub line_number: u32,
    pub text: String,
    #[serde(default)]
    pub chords: Vec<ChordPosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Song key as a chord name ("C", "Am", ...)
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tempo: Option<u32>,
    pub status: SongStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub lyrics: Vec<LyricLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRequest {
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,
    pub lyrics: Vec<LyricLine>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordInfo {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub finger_positions: Option<String>,
    #[serde(default)]
    pub is_common: bool,
}

/// Spring-style page envelope used by the paginated song listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub size: u32,
    pub number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_status_round_trips_through_screaming_case() {
        let s: SongStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(s, SongStatus::Pending);
        assert_eq!(serde_json::to_string(&SongStatus::Draft).unwrap(), "\"DRAFT\"");
    }

    #[test]
    fn song_deserializes_backend_shape() {
        let json = r#"{
            "id": 7,
            "title": "Wish You Were Here",
            "artist": "Pink Floyd",
            "key": "G",
            "status": "APPROVED",
            "lyrics": [
                {
                    "lineNumber": 0,
                    "text": "So, so you think you can tell",
                    "chords": [{"start": 0, "name": "C"}, {"start": 18, "name": "D"}]
                }
            ]
        }"#;
        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.status, SongStatus::Approved);
        assert_eq!(song.lyrics[0].chords[1].start, 18);
        assert!(song.album.is_none());
    }

    #[test]
    fn page_response_deserializes() {
        let json = r#"{
            "content": [],
            "totalElements": 42,
            "totalPages": 5,
            "size": 10,
            "number": 0
        }"#;
        let page: PageResponse<Song> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_elements, 42);
        assert!(page.content.is_empty());
    }

    #[test]
    fn anonymous_session_carries_no_token() {
        assert!(AuthSession::anonymous().token().is_none());
        assert_eq!(AuthSession::with_token("abc").token(), Some("abc"));
    }
}
