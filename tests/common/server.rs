//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases and media directory.

use super::constants::*;
use music_library_server::library::{LibraryStore, NewSong, SqliteLibraryStore};
use music_library_server::media::MediaStorage;
use music_library_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use music_library_server::user::{
    HashCost, PasswordHasher, SigningSecret, SqliteUserStore, TokenIssuer, TokenVerifier,
    UserManager,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Deterministic fake audio content used for seeded songs.
pub fn seeded_song_bytes() -> Vec<u8> {
    (0..SEEDED_SONG_SIZE_BYTES).map(|i| (i % 251) as u8).collect()
}

/// Test server instance with isolated databases and media directory
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Library store for direct database access in tests
    pub library: Arc<dyn LibraryStore>,

    /// Ids of the two seeded songs, in seeding order
    pub song_ids: [usize; 2],

    /// Id of the pre-registered test user
    pub test_user_id: usize,

    /// Issuer sharing the server's signing secret
    pub token_issuer: TokenIssuer,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates temporary databases and a media directory
    /// 2. Seeds two songs and registers the test user
    /// 3. Binds to a random port (127.0.0.1:0)
    /// 4. Spawns the server in a background task
    /// 5. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if any setup step fails or the server doesn't become ready
    /// within timeout.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let library = Arc::new(
            SqliteLibraryStore::new(temp_dir.path().join("library.db"))
                .expect("Failed to open library store"),
        );
        let user_store = Arc::new(
            SqliteUserStore::new(temp_dir.path().join("user.db"))
                .expect("Failed to open user store"),
        );

        let media = Arc::new(MediaStorage::new(temp_dir.path().join("media")));
        media.init().await.expect("Failed to create media dir");

        let song_ids = [
            seed_song(&library, &media, SONG_1_TITLE, SONG_1_ARTIST, "opening.mp3"),
            seed_song(&library, &media, SONG_2_TITLE, SONG_2_ARTIST, "jazz.mp3"),
        ];

        let secret = SigningSecret::new(TEST_SIGNING_SECRET);
        let user_manager = UserManager::new(
            user_store,
            library.clone(),
            PasswordHasher::new(HashCost::MINIMAL).expect("Failed to build hasher"),
            TokenIssuer::new(&secret),
        )
        .expect("Failed to build user manager");
        let test_user_id = user_manager
            .register(TEST_USER, TEST_EMAIL, TEST_PASS)
            .expect("Failed to register test user")
            .user
            .id;

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
            ..ServerConfig::default()
        };
        let state = ServerState::new(
            config,
            Arc::new(user_manager),
            library.clone(),
            media,
            Arc::new(TokenVerifier::new(&secret)),
        );
        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            library,
            song_ids,
            test_user_id,
            token_issuer: TokenIssuer::new(&secret),
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

fn seed_song(
    library: &SqliteLibraryStore,
    media: &MediaStorage,
    title: &str,
    artist: &str,
    file_name: &str,
) -> usize {
    let path = media.songs_dir().join(file_name);
    std::fs::write(&path, seeded_song_bytes()).expect("Failed to write seeded song");
    library
        .create_song(NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            duration: 180,
            file_path: path.to_string_lossy().into_owned(),
            file_size: SEEDED_SONG_SIZE_BYTES as u64,
            ..Default::default()
        })
        .expect("Failed to seed song")
        .id
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
