//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all music-library-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client holding an optional bearer token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Token sent as `Authorization: Bearer <token>` when set
    pub token: Option<String>,
}

/// Multipart fields of a song upload
pub struct SongUploadForm<'a> {
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub duration: Option<&'a str>,
    pub file: Option<(&'a str, Vec<u8>)>,
}

impl Default for SongUploadForm<'_> {
    fn default() -> Self {
        Self {
            title: Some("Uploaded Song"),
            artist: Some("Uploader"),
            album: None,
            duration: Some("215"),
            file: Some(("uploaded song.mp3", vec![0xFF, 0xFB, 0x90, 0x64, 1, 2, 3, 4])),
        }
    }
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client with a pre-set token, valid or not
    pub fn with_token(base_url: String, token: impl Into<String>) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.into());
        client
    }

    /// Creates a client pre-authenticated as the test user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the given user
    pub async fn authenticated_as(base_url: String, username: &str, password: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Authentication of {} failed",
            username
        );
        let body: Value = response.json().await.expect("Invalid login response");
        client.token = Some(
            body["token"]
                .as_str()
                .expect("Login response has no token")
                .to_string(),
        );

        client
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // ========================================================================
    // Public Endpoints
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.get("/").send().await.expect("Home request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /auth/register
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/auth/register", self.base_url))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /auth/login
    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/auth/session")
            .send()
            .await
            .expect("Session request failed")
    }

    /// GET /auth/session with a raw Authorization header value
    pub async fn get_session_with_header(&self, authorization: &str) -> Response {
        self.client
            .get(format!("{}/auth/session", self.base_url))
            .header("Authorization", authorization)
            .send()
            .await
            .expect("Session request failed")
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// GET /songs
    pub async fn get_songs(&self) -> Response {
        self.get("/songs").send().await.expect("Songs request failed")
    }

    /// GET /songs/{id}
    pub async fn get_song(&self, id: usize) -> Response {
        self.get(&format!("/songs/{}", id))
            .send()
            .await
            .expect("Song request failed")
    }

    /// GET /songs/{id}/play
    pub async fn play_song(&self, id: usize) -> Response {
        self.get(&format!("/songs/{}/play", id))
            .send()
            .await
            .expect("Play request failed")
    }

    /// GET /songs/{id}/play with a Range header
    pub async fn play_song_range(&self, id: usize, range: &str) -> Response {
        self.get(&format!("/songs/{}/play", id))
            .header("Range", range)
            .send()
            .await
            .expect("Play request failed")
    }

    /// POST /songs (multipart)
    pub async fn upload_song(&self, upload: SongUploadForm<'_>) -> Response {
        let mut form = Form::new();
        if let Some(title) = upload.title {
            form = form.text("title", title.to_string());
        }
        if let Some(artist) = upload.artist {
            form = form.text("artist", artist.to_string());
        }
        if let Some(album) = upload.album {
            form = form.text("album", album.to_string());
        }
        if let Some(duration) = upload.duration {
            form = form.text("duration", duration.to_string());
        }
        if let Some((file_name, data)) = upload.file {
            form = form.part(
                "file",
                Part::bytes(data).file_name(file_name.to_string()),
            );
        }
        self.post("/songs")
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    /// GET /playlists
    pub async fn get_playlists(&self) -> Response {
        self.get("/playlists")
            .send()
            .await
            .expect("Playlists request failed")
    }

    /// POST /playlists
    pub async fn create_playlist(&self, name: &str, description: Option<&str>) -> Response {
        self.post("/playlists")
            .json(&json!({
                "name": name,
                "description": description,
            }))
            .send()
            .await
            .expect("Create playlist request failed")
    }

    /// POST /playlists/add-song
    pub async fn add_song_to_playlist(&self, playlist_id: usize, song_id: usize) -> Response {
        self.post("/playlists/add-song")
            .json(&json!({
                "playlist_id": playlist_id,
                "song_id": song_id,
            }))
            .send()
            .await
            .expect("Add song request failed")
    }

    /// GET /playlists/{id}/songs
    pub async fn get_playlist_songs(&self, playlist_id: usize) -> Response {
        self.get(&format!("/playlists/{}/songs", playlist_id))
            .send()
            .await
            .expect("Playlist songs request failed")
    }

    // ========================================================================
    // Favorite Endpoints
    // ========================================================================

    /// GET /favorites
    pub async fn get_favorites(&self) -> Response {
        self.get("/favorites")
            .send()
            .await
            .expect("Favorites request failed")
    }

    /// POST /favorites/{song_id}
    pub async fn toggle_favorite(&self, song_id: usize) -> Response {
        self.post(&format!("/favorites/{}", song_id))
            .send()
            .await
            .expect("Toggle favorite request failed")
    }
}
