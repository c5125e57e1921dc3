pub mod auth;
pub mod session_token;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{HashCost, PasswordHasher};
pub use session_token::{
    AuthRejection, SessionClaims, SigningSecret, TokenIssuer, TokenVerifier,
    SESSION_TOKEN_LIFETIME_SECS,
};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{
    validate_registration, AuthenticatedUser, ContentError, FavoriteState, LoginError,
    PlaylistWithSongs, RegisterError, UserManager,
};
pub use user_models::{NewUser, PublicUser, User, UserPlaylist};
pub use user_store::{
    CreateUserError, UserCredentialsStore, UserFavoritesStore, UserPlaylistStore, UserStore,
};
