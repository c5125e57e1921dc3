use super::{error::ApiError, session::Session, state::GuardedUserManager};
use crate::library::Song;
use crate::user::{PlaylistWithSongs, UserPlaylist};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct CreatePlaylistBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AddSongToPlaylistBody {
    pub playlist_id: usize,
    pub song_id: usize,
}

#[derive(Serialize)]
struct AddSongResponse {
    message: &'static str,
    playlist: PlaylistWithSongs,
}

pub async fn get_playlists(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<Vec<UserPlaylist>>, ApiError> {
    Ok(Json(user_manager.get_playlists(session.user_id)?))
}

pub async fn create_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<CreatePlaylistBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let playlist = user_manager.create_playlist(
        session.user_id,
        body.name.trim(),
        body.description.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(playlist)).into_response())
}

pub async fn add_song_to_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<AddSongToPlaylistBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let playlist =
        user_manager.add_song_to_playlist(session.user_id, body.playlist_id, body.song_id)?;
    Ok(Json(AddSongResponse {
        message: "song added to playlist successfully",
        playlist,
    })
    .into_response())
}

pub async fn get_playlist_songs(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    playlist_id: Result<Path<usize>, PathRejection>,
) -> Result<Json<Vec<Song>>, ApiError> {
    let Path(playlist_id) = playlist_id?;
    Ok(Json(
        user_manager.get_playlist_songs(session.user_id, playlist_id)?,
    ))
}
