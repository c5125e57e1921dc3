mod storage;

pub use storage::{MediaError, MediaStorage, StoredSong};
