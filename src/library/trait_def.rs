//! LibraryStore trait definition.

use super::models::{NewSong, Song};
use anyhow::Result;

pub trait LibraryStore: Send + Sync {
    /// Inserts the song metadata and returns the stored song.
    fn create_song(&self, song: NewSong) -> Result<Song>;

    /// Returns Ok(None) if the song does not exist.
    fn get_song(&self, song_id: usize) -> Result<Option<Song>>;

    /// All songs ordered by id.
    fn get_songs(&self) -> Result<Vec<Song>>;

    /// Resolves the given ids, preserving their order and skipping ids that
    /// don't exist.
    fn get_songs_by_ids(&self, song_ids: &[usize]) -> Result<Vec<Song>>;
}
