use super::{error::ApiError, session::Session, state::GuardedUserManager};
use crate::library::Song;
use crate::user::FavoriteState;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};

pub async fn get_favorites(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<Vec<Song>>, ApiError> {
    Ok(Json(user_manager.get_favorites(session.user_id)?))
}

pub async fn toggle_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    song_id: Result<Path<usize>, PathRejection>,
) -> Result<Json<FavoriteState>, ApiError> {
    let Path(song_id) = song_id?;
    Ok(Json(user_manager.toggle_favorite(session.user_id, song_id)?))
}
