//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, seeded songs, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Test user registered by `TestServer::spawn()`
pub const TEST_USER: &str = "testuser";

/// Test user email
pub const TEST_EMAIL: &str = "testuser@example.com";

/// Test user password
pub const TEST_PASS: &str = "testpass123";

/// Second user, registered by tests that need one
pub const OTHER_USER: &str = "otheruser";
pub const OTHER_EMAIL: &str = "other@example.com";
pub const OTHER_PASS: &str = "otherpass123";

/// Signing secret shared by the test server and tests forging tokens
pub const TEST_SIGNING_SECRET: &str = "e2e-test-signing-secret";

// ============================================================================
// Seeded Songs
// ============================================================================

/// Title of the first song seeded by `TestServer::spawn()`
pub const SONG_1_TITLE: &str = "Opening Track";

/// Title of the second seeded song
pub const SONG_2_TITLE: &str = "Smooth Jazz";

pub const SONG_1_ARTIST: &str = "The Test Band";
pub const SONG_2_ARTIST: &str = "Jazz Ensemble";

/// Size of the fake audio content written for each seeded song
pub const SEEDED_SONG_SIZE_BYTES: usize = 4096;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Upload limit configured on the test server (bytes)
pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;
