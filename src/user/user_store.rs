use super::user_models::{NewUser, User, UserPlaylist};
use anyhow::Result;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("username already exists")]
    UsernameTaken,

    #[error("email already exists")]
    EmailTaken,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait UserCredentialsStore: Send + Sync {
    /// Inserts a new user and returns its id.
    /// Uniqueness of username and email is enforced by the store itself,
    /// a violation is reported as the matching `CreateUserError` variant.
    fn create_user(&self, user: NewUser) -> Result<usize, CreateUserError>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has the given username.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has the given email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

pub trait UserPlaylistStore: Send + Sync {
    /// Creates a playlist owned by `user_id` and returns it.
    fn create_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: Option<&str>,
    ) -> Result<UserPlaylist>;

    /// Returns all playlists owned by the user, oldest first.
    fn get_user_playlists(&self, user_id: usize) -> Result<Vec<UserPlaylist>>;

    /// Returns the playlist only if it exists and is owned by `user_id`.
    fn get_playlist(&self, playlist_id: usize, user_id: usize) -> Result<Option<UserPlaylist>>;

    /// Appends a song to the playlist. Adding a song that is already there
    /// is a no-op. Returns false if the song was already present.
    fn add_song_to_playlist(&self, playlist_id: usize, song_id: usize) -> Result<bool>;

    /// Song ids of the playlist, in insertion order.
    fn get_playlist_song_ids(&self, playlist_id: usize) -> Result<Vec<usize>>;
}

pub trait UserFavoritesStore: Send + Sync {
    /// Flips the favorite state of the song for the user and returns the new
    /// state (true if it is now a favorite).
    fn toggle_favorite_song(&self, user_id: usize, song_id: usize) -> Result<bool>;

    /// Favorite song ids, most recently added last.
    fn get_favorite_song_ids(&self, user_id: usize) -> Result<Vec<usize>>;
}

pub trait UserStore: UserCredentialsStore + UserPlaylistStore + UserFavoritesStore {}

impl<T: UserCredentialsStore + UserPlaylistStore + UserFavoritesStore> UserStore for T {}
