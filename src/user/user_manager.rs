use super::{
    auth::PasswordHasher,
    session_token::TokenIssuer,
    user_models::{NewUser, PublicUser, User, UserPlaylist},
    CreateUserError, UserStore,
};
use crate::library::{LibraryStore, Song};
use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("username already exists")]
    UsernameTaken,

    #[error("email already exists")]
    EmailTaken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CreateUserError> for RegisterError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::UsernameTaken => RegisterError::UsernameTaken,
            CreateUserError::EmailTaken => RegisterError::EmailTaken,
            CreateUserError::Other(err) => RegisterError::Internal(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("playlist not found")]
    PlaylistNotFound,

    #[error("song not found")]
    SongNotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize, Debug, Clone)]
pub struct AuthenticatedUser {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Serialize, Debug, Clone)]
pub struct PlaylistWithSongs {
    #[serde(flatten)]
    pub playlist: UserPlaylist,
    pub songs: Vec<Song>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteState {
    pub song_id: usize,
    pub favorite: bool,
}

pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), RegisterError> {
    let username_len = username.chars().count();
    if username_len < MIN_USERNAME_LEN {
        return Err(RegisterError::Invalid(
            "username must be at least 3 characters",
        ));
    }
    if username_len > MAX_USERNAME_LEN {
        return Err(RegisterError::Invalid(
            "username must be at most 50 characters",
        ));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(RegisterError::Invalid("invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RegisterError::Invalid(
            "password must be at least 6 characters",
        ));
    }
    Ok(())
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    library: Arc<dyn LibraryStore>,
    hasher: PasswordHasher,
    token_issuer: TokenIssuer,
    /// Verified against when the username is unknown, so that both login
    /// failure paths cost one hash verification.
    dummy_hash: String,
}

impl UserManager {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        library: Arc<dyn LibraryStore>,
        hasher: PasswordHasher,
        token_issuer: TokenIssuer,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher
            .hash("not-a-real-password")
            .context("Failed to prepare login hash")?;
        Ok(Self {
            user_store,
            library,
            hasher,
            token_issuer,
            dummy_hash,
        })
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, RegisterError> {
        validate_registration(username, email, password)?;

        // Fast path only; the UNIQUE indices decide under concurrency.
        if self.user_store.get_user_by_username(username)?.is_some() {
            return Err(RegisterError::UsernameTaken);
        }
        if self.user_store.get_user_by_email(email)?.is_some() {
            return Err(RegisterError::EmailTaken);
        }

        let password_hash = self.hasher.hash(password)?;
        let user_id = self.user_store.create_user(NewUser {
            username,
            email,
            password_hash: &password_hash,
        })?;
        info!("Registered user {} with id {}", username, user_id);

        let token = self.token_issuer.issue(user_id, username)?;
        Ok(AuthenticatedUser {
            token,
            user: PublicUser {
                id: user_id,
                username: username.to_owned(),
                email: email.to_owned(),
            },
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, LoginError> {
        let user = match self.user_store.get_user_by_username(username)? {
            Some(user) => user,
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                debug!("Login attempt for unknown user {}", username);
                return Err(LoginError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!("Wrong password for user {}", username);
            return Err(LoginError::InvalidCredentials);
        }

        let token = self.token_issuer.issue(user.id, &user.username)?;
        Ok(AuthenticatedUser {
            token,
            user: PublicUser::from(&user),
        })
    }

    pub fn get_user(&self, user_id: usize) -> anyhow::Result<Option<User>> {
        self.user_store.get_user(user_id)
    }

    pub fn create_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: Option<&str>,
    ) -> Result<UserPlaylist, ContentError> {
        if name.trim().is_empty() {
            return Err(ContentError::Invalid("playlist name is required"));
        }
        let description = description.filter(|d| !d.is_empty());
        Ok(self
            .user_store
            .create_playlist(user_id, name, description)?)
    }

    pub fn get_playlists(&self, user_id: usize) -> Result<Vec<UserPlaylist>, ContentError> {
        Ok(self.user_store.get_user_playlists(user_id)?)
    }

    pub fn add_song_to_playlist(
        &self,
        user_id: usize,
        playlist_id: usize,
        song_id: usize,
    ) -> Result<PlaylistWithSongs, ContentError> {
        let playlist = self
            .user_store
            .get_playlist(playlist_id, user_id)?
            .ok_or(ContentError::PlaylistNotFound)?;
        self.library
            .get_song(song_id)?
            .ok_or(ContentError::SongNotFound)?;

        if !self.user_store.add_song_to_playlist(playlist_id, song_id)? {
            debug!("Song {} already in playlist {}", song_id, playlist_id);
        }
        let songs = self.resolve_playlist_songs(playlist_id)?;
        Ok(PlaylistWithSongs { playlist, songs })
    }

    pub fn get_playlist_songs(
        &self,
        user_id: usize,
        playlist_id: usize,
    ) -> Result<Vec<Song>, ContentError> {
        self.user_store
            .get_playlist(playlist_id, user_id)?
            .ok_or(ContentError::PlaylistNotFound)?;
        self.resolve_playlist_songs(playlist_id)
    }

    fn resolve_playlist_songs(&self, playlist_id: usize) -> Result<Vec<Song>, ContentError> {
        let song_ids = self.user_store.get_playlist_song_ids(playlist_id)?;
        Ok(self.library.get_songs_by_ids(&song_ids)?)
    }

    pub fn toggle_favorite(
        &self,
        user_id: usize,
        song_id: usize,
    ) -> Result<FavoriteState, ContentError> {
        self.library
            .get_song(song_id)?
            .ok_or(ContentError::SongNotFound)?;
        let favorite = self.user_store.toggle_favorite_song(user_id, song_id)?;
        Ok(FavoriteState { song_id, favorite })
    }

    pub fn get_favorites(&self, user_id: usize) -> Result<Vec<Song>, ContentError> {
        let song_ids = self.user_store.get_favorite_song_ids(user_id)?;
        Ok(self.library.get_songs_by_ids(&song_ids)?)
    }
}
