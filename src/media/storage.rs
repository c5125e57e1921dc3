//! On-disk storage for uploaded audio files.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

const SONGS_DIR: &str = "songs";
const SONG_EXTENSION: &str = "mp3";
const MAX_NAME_ATTEMPTS: usize = 100;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("only MP3 files are allowed")]
    UnsupportedFileType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSong {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn songs_dir(&self) -> PathBuf {
        self.root.join(SONGS_DIR)
    }

    /// Creates the songs directory if missing.
    pub async fn init(&self) -> Result<(), MediaError> {
        fs::create_dir_all(self.songs_dir()).await?;
        Ok(())
    }

    pub fn is_song_file(filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(SONG_EXTENSION))
            .unwrap_or(false)
    }

    /// Writes `data` as `<stem>_<unix_seconds>.mp3` under the songs directory.
    /// An existing file is never overwritten; a numeric suffix is appended
    /// instead.
    pub async fn save_song(
        &self,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredSong, MediaError> {
        if !Self::is_song_file(original_filename) {
            return Err(MediaError::UnsupportedFileType);
        }
        let safe_name = sanitize_filename(original_filename)?;
        let stem = Path::new(&safe_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MediaError::InvalidFilename(original_filename.to_string()))?
            .to_owned();

        let timestamp = chrono::Utc::now().timestamp();

        let songs_dir = self.songs_dir();
        fs::create_dir_all(&songs_dir).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{}_{}.{}", stem, timestamp, SONG_EXTENSION)
            } else {
                format!("{}_{}_{}.{}", stem, timestamp, attempt, SONG_EXTENSION)
            };
            let path = songs_dir.join(&file_name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };
            write_or_discard(&mut file, &path, data).await?;
            debug!("Stored {} bytes at {:?}", data.len(), path);
            return Ok(StoredSong {
                path,
                file_name,
                size: data.len() as u64,
            });
        }

        Err(MediaError::InvalidFilename(original_filename.to_string()))
    }

    /// Best effort removal, used when the metadata insert fails after the
    /// file was written.
    pub async fn remove(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path).await {
            debug!("Could not remove {:?}: {}", path, err);
        }
    }
}

/// Writes and flushes `data`; on failure the partially written file at
/// `path` is removed before the error is returned.
async fn write_or_discard<W>(writer: &mut W, path: &Path, data: &[u8]) -> Result<(), MediaError>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(data).await {
        Ok(()) => writer.flush().await,
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        if let Err(remove_err) = fs::remove_file(path).await {
            debug!("Could not remove partial file {:?}: {}", path, remove_err);
        }
        return Err(err.into());
    }
    Ok(())
}

/// Keeps only the final path component and replaces characters that are
/// unsafe in file names.
fn sanitize_filename(filename: &str) -> Result<String, MediaError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MediaError::InvalidFilename(filename.to_string()))?;

    if name.contains('\0') || name.starts_with('.') {
        return Err(MediaError::InvalidFilename(filename.to_string()));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            _ => c,
        })
        .collect();

    if sanitized.is_empty() {
        return Err(MediaError::InvalidFilename(filename.to_string()));
    }
    Ok(sanitized)
}
