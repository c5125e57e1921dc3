use super::models::{NewSong, Song};
use super::schema::{LIBRARY_VERSIONED_SCHEMAS, SONG_TABLE_V_0};
use super::trait_def::LibraryStore;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SONG_COLUMNS: &str = "id, title, artist, album, genre, duration, file_path, file_size, created";

#[derive(Clone)]
pub struct SqliteLibraryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLibraryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path, LIBRARY_VERSIONED_SCHEMAS)?;
        Ok(SqliteLibraryStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Library database connection mutex poisoned"))
    }
}

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get::<_, i64>(0)? as usize,
        title: row.get(1)?,
        artist: row.get(2)?,
        album: row.get(3)?,
        genre: row.get(4)?,
        duration: row.get(5)?,
        file_path: row.get(6)?,
        file_size: row.get::<_, i64>(7)? as u64,
        created: row.get(8)?,
    })
}

impl LibraryStore for SqliteLibraryStore {
    fn create_song(&self, song: NewSong) -> Result<Song> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (title, artist, album, genre, duration, file_path, file_size) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                SONG_TABLE_V_0.name
            ),
            params![
                song.title,
                song.artist,
                song.album,
                song.genre,
                song.duration,
                song.file_path,
                song.file_size as i64
            ],
        )
        .with_context(|| format!("Failed to insert song {}", song.title))?;
        let id = conn.last_insert_rowid();
        debug!("Inserted song {} with id {}", song.title, id);
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                SONG_COLUMNS, SONG_TABLE_V_0.name
            ),
            params![id],
            song_from_row,
        )
        .context("Failed to read back inserted song")
    }

    fn get_song(&self, song_id: usize) -> Result<Option<Song>> {
        let conn = self.lock()?;
        let song = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    SONG_COLUMNS, SONG_TABLE_V_0.name
                ),
                params![song_id as i64],
                song_from_row,
            )
            .optional()?;
        Ok(song)
    }

    fn get_songs(&self) -> Result<Vec<Song>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY id",
            SONG_COLUMNS, SONG_TABLE_V_0.name
        ))?;
        let songs = stmt
            .query_map([], song_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(songs)
    }

    fn get_songs_by_ids(&self, song_ids: &[usize]) -> Result<Vec<Song>> {
        if song_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let placeholders = vec!["?"; song_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE id IN ({})",
            SONG_COLUMNS, SONG_TABLE_V_0.name, placeholders
        ))?;
        let ids: Vec<i64> = song_ids.iter().map(|id| *id as i64).collect();
        let by_id: HashMap<usize, Song> = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), song_from_row)?
            .map(|song| song.map(|song| (song.id, song)))
            .collect::<Result<_, _>>()?;

        Ok(song_ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect())
    }
}
