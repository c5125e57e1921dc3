use axum::extract::FromRef;

use crate::library::LibraryStore;
use crate::media::MediaStorage;
use crate::user::{TokenVerifier, UserManager};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedLibraryStore = Arc<dyn LibraryStore>;
pub type GuardedMediaStorage = Arc<MediaStorage>;
pub type GuardedTokenVerifier = Arc<TokenVerifier>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub library: GuardedLibraryStore,
    pub media: GuardedMediaStorage,
    pub token_verifier: GuardedTokenVerifier,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        user_manager: GuardedUserManager,
        library: GuardedLibraryStore,
        media: GuardedMediaStorage,
        token_verifier: GuardedTokenVerifier,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            user_manager,
            library,
            media,
            token_verifier,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedLibraryStore {
    fn from_ref(input: &ServerState) -> Self {
        input.library.clone()
    }
}

impl FromRef<ServerState> for GuardedMediaStorage {
    fn from_ref(input: &ServerState) -> Self {
        input.media.clone()
    }
}

impl FromRef<ServerState> for GuardedTokenVerifier {
    fn from_ref(input: &ServerState) -> Self {
        input.token_verifier.clone()
    }
}
