pub mod config;
pub mod error;
mod favorite_routes;
mod http_layers;
mod playlist_routes;
pub mod server;
pub mod session;
mod song_routes;
pub mod state;
mod stream_song;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
