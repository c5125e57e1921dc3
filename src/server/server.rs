use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use tracing::info;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{
    error::ApiError,
    favorite_routes::{get_favorites, toggle_favorite},
    log_requests, make_cors_layer,
    playlist_routes::{add_song_to_playlist, create_playlist, get_playlist_songs, get_playlists},
    session::{require_session, Session},
    song_routes::{get_song, get_songs, upload_song},
    state::*,
    stream_song::stream_song,
};
use crate::user::{AuthenticatedUser, PublicUser};

#[derive(Serialize)]
struct HomeResponse {
    message: &'static str,
    uptime: String,
    version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    message: &'static str,
    token: String,
    user: PublicUser,
}

impl AuthResponse {
    fn new(message: &'static str, authenticated: AuthenticatedUser) -> Self {
        AuthResponse {
            message,
            token: authenticated.token,
            user: authenticated.user,
        }
    }
}

#[derive(Serialize)]
struct SessionResponse {
    user_id: usize,
    username: String,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HomeResponse {
        message: "Welcome to the Music Player API!",
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Runs a password-hashing call off the async workers.
async fn run_blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| anyhow!("Blocking task failed: {}", err))?
        .map_err(Into::into)
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let authenticated =
        run_blocking(move || user_manager.register(&body.username, &body.email, &body.password))
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(
            "user registered successfully",
            authenticated,
        )),
    )
        .into_response())
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let authenticated =
        run_blocking(move || user_manager.login(&body.username, &body.password)).await?;
    Ok(Json(AuthResponse::new("login successful", authenticated)).into_response())
}

async fn get_session(session: Session) -> impl IntoResponse {
    Json(SessionResponse {
        user_id: session.user_id,
        username: session.username,
    })
}

pub fn make_app(state: ServerState) -> Router {
    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(
            Router::new()
                .route("/session", get(get_session))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    require_session,
                )),
        )
        .with_state(state.clone());

    let song_routes: Router = Router::new()
        .route("/", get(get_songs).post(upload_song))
        .route("/{id}", get(get_song))
        .route("/{id}/play", get(stream_song))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state.clone());

    let playlist_routes: Router = Router::new()
        .route("/", get(get_playlists).post(create_playlist))
        .route("/add-song", post(add_song_to_playlist))
        .route("/{playlist_id}/songs", get(get_playlist_songs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state.clone());

    let favorite_routes: Router = Router::new()
        .route("/", get(get_favorites))
        .route("/{song_id}", post(toggle_favorite))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/auth", auth_routes)
        .nest("/songs", song_routes)
        .nest("/playlists", playlist_routes)
        .nest("/favorites", favorite_routes)
        .layer(make_cors_layer(&state.config.allowed_origins))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
