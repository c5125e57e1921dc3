use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "username",
            &SqlType::Text,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("password_hash", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_username", "username"), ("idx_user_email", "email")],
};
const PLAYLIST_TABLE_V_0: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_playlist_user_id", "user_id")],
};
// Songs live in the library database, so song_id carries no foreign key.
const PLAYLIST_SONG_TABLE_V_0: Table = Table {
    name: "playlist_song",
    columns: &[
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("song_id", &SqlType::Integer, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["playlist_id", "song_id"]],
    indices: &[],
};

/// V 1
const USER_FAVORITE_SONG_TABLE_V_1: Table = Table {
    name: "user_favorite_song",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("song_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "song_id"]],
    indices: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[USER_TABLE_V_0, PLAYLIST_TABLE_V_0, PLAYLIST_SONG_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            PLAYLIST_TABLE_V_0,
            PLAYLIST_SONG_TABLE_V_0,
            USER_FAVORITE_SONG_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            USER_FAVORITE_SONG_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("User database connection mutex poisoned"))
    }

    fn query_user(&self, column: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT id, username, email, password_hash, created FROM {} WHERE {} = ?1",
                USER_TABLE_V_0.name, column
            ),
            params![value],
            user_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to read user by {}", column))
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get::<_, i64>(0)? as usize,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created: row.get(4)?,
    })
}

fn playlist_from_row(row: &Row) -> rusqlite::Result<UserPlaylist> {
    Ok(UserPlaylist {
        id: row.get::<_, i64>(0)? as usize,
        user_id: row.get::<_, i64>(1)? as usize,
        name: row.get(2)?,
        description: row.get(3)?,
        created: row.get(4)?,
    })
}

/// Maps a UNIQUE violation on the user table to the column that caused it.
fn classify_insert_error(err: rusqlite::Error) -> CreateUserError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("user.username") {
                return CreateUserError::UsernameTaken;
            }
            if message.contains("user.email") {
                return CreateUserError::EmailTaken;
            }
        }
    }
    CreateUserError::Other(anyhow::Error::new(err).context("Failed to insert user"))
}

impl UserCredentialsStore for SqliteUserStore {
    fn create_user(&self, user: NewUser) -> Result<usize, CreateUserError> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (username, email, password_hash) VALUES (?1, ?2, ?3)",
                USER_TABLE_V_0.name
            ),
            params![user.username, user.email, user.password_hash],
        )
        .map_err(classify_insert_error)?;
        let id = conn.last_insert_rowid() as usize;
        debug!("Created user {} with id {}", user.username, id);
        Ok(id)
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        self.query_user("id", &(user_id as i64))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.query_user("username", &username)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("email", &email)
    }
}

impl UserPlaylistStore for SqliteUserStore {
    fn create_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: Option<&str>,
    ) -> Result<UserPlaylist> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, name, description) VALUES (?1, ?2, ?3)",
                PLAYLIST_TABLE_V_0.name
            ),
            params![user_id as i64, name, description],
        )
        .with_context(|| format!("Failed to create playlist for user {}", user_id))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!(
                "SELECT id, user_id, name, description, created FROM {} WHERE id = ?1",
                PLAYLIST_TABLE_V_0.name
            ),
            params![id],
            playlist_from_row,
        )
        .context("Failed to read back created playlist")
    }

    fn get_user_playlists(&self, user_id: usize) -> Result<Vec<UserPlaylist>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, name, description, created FROM {} WHERE user_id = ?1 ORDER BY id",
            PLAYLIST_TABLE_V_0.name
        ))?;
        let playlists = stmt
            .query_map(params![user_id as i64], playlist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(playlists)
    }

    fn get_playlist(&self, playlist_id: usize, user_id: usize) -> Result<Option<UserPlaylist>> {
        let conn = self.lock()?;
        let playlist = conn
            .query_row(
                &format!(
                    "SELECT id, user_id, name, description, created FROM {} WHERE id = ?1 AND user_id = ?2",
                    PLAYLIST_TABLE_V_0.name
                ),
                params![playlist_id as i64, user_id as i64],
                playlist_from_row,
            )
            .optional()?;
        Ok(playlist)
    }

    fn add_song_to_playlist(&self, playlist_id: usize, song_id: usize) -> Result<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {table} (playlist_id, song_id, position) \
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM {table} WHERE playlist_id = ?1))",
                table = PLAYLIST_SONG_TABLE_V_0.name
            ),
            params![playlist_id as i64, song_id as i64],
        )
        .with_context(|| format!("Failed to add song {} to playlist {}", song_id, playlist_id))?;
        Ok(inserted > 0)
    }

    fn get_playlist_song_ids(&self, playlist_id: usize) -> Result<Vec<usize>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id FROM {} WHERE playlist_id = ?1 ORDER BY position",
            PLAYLIST_SONG_TABLE_V_0.name
        ))?;
        let ids = stmt
            .query_map(params![playlist_id as i64], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| id as usize))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl UserFavoritesStore for SqliteUserStore {
    fn toggle_favorite_song(&self, user_id: usize, song_id: usize) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND song_id = ?2",
                USER_FAVORITE_SONG_TABLE_V_1.name
            ),
            params![user_id as i64, song_id as i64],
        )?;
        if removed == 0 {
            tx.execute(
                &format!(
                    "INSERT INTO {} (user_id, song_id) VALUES (?1, ?2)",
                    USER_FAVORITE_SONG_TABLE_V_1.name
                ),
                params![user_id as i64, song_id as i64],
            )
            .with_context(|| format!("Failed to favorite song {} for user {}", song_id, user_id))?;
        }
        tx.commit()?;
        Ok(removed == 0)
    }

    fn get_favorite_song_ids(&self, user_id: usize) -> Result<Vec<usize>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id FROM {} WHERE user_id = ?1 ORDER BY rowid",
            USER_FAVORITE_SONG_TABLE_V_1.name
        ))?;
        let ids = stmt
            .query_map(params![user_id as i64], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| id as usize))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
