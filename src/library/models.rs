use serde::Serialize;

/// A stored song. `file_path` stays server-side and is never serialized.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: usize,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Seconds.
    pub duration: u32,
    #[serde(skip)]
    pub file_path: String,
    pub file_size: u64,
    pub created: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub duration: u32,
    pub file_path: String,
    pub file_size: u64,
}
