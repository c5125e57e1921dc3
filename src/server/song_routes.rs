//! Song listing and upload routes.

use super::{
    error::ApiError,
    session::Session,
    state::{GuardedLibraryStore, GuardedMediaStorage},
};
use crate::library::{NewSong, Song};
use axum::{
    extract::{rejection::PathRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct SongUploadResponse {
    message: &'static str,
    song: Song,
}

/// Multipart fields of a song upload, gathered before anything is written.
#[derive(Default)]
struct SongUpload {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    genre: Option<String>,
    duration: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

impl SongUpload {
    async fn read(mut multipart: Multipart) -> Result<SongUpload, ApiError> {
        let mut upload = SongUpload::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or("").to_string();
                    let data = field.bytes().await?;
                    upload.file = Some((filename, data.to_vec()));
                }
                "title" => upload.title = Some(field.text().await?),
                "artist" => upload.artist = Some(field.text().await?),
                "album" => upload.album = Some(field.text().await?),
                "genre" => upload.genre = Some(field.text().await?),
                "duration" => upload.duration = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(upload)
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{} is required", field)))
}

fn parse_duration(value: Option<&str>) -> Result<u32, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ApiError::validation("invalid duration")),
    }
}

pub async fn get_songs(
    _session: Session,
    State(library): State<GuardedLibraryStore>,
) -> Result<Json<Vec<Song>>, ApiError> {
    Ok(Json(library.get_songs()?))
}

pub async fn get_song(
    _session: Session,
    State(library): State<GuardedLibraryStore>,
    id: Result<Path<usize>, PathRejection>,
) -> Result<Json<Song>, ApiError> {
    let Path(id) = id?;
    library
        .get_song(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("song not found"))
}

pub async fn upload_song(
    session: Session,
    State(library): State<GuardedLibraryStore>,
    State(media): State<GuardedMediaStorage>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = SongUpload::read(multipart).await?;

    let duration = parse_duration(upload.duration.as_deref())?;
    let (filename, data) = upload
        .file
        .ok_or_else(|| ApiError::validation("file is required"))?;
    let title = required_text(upload.title, "title")?;
    let artist = required_text(upload.artist, "artist")?;

    let stored = media.save_song(&filename, &data).await?;

    let new_song = NewSong {
        title,
        artist,
        album: upload.album.unwrap_or_default(),
        genre: upload.genre.unwrap_or_default(),
        duration,
        file_path: stored.path.to_string_lossy().into_owned(),
        file_size: stored.size,
    };
    let song = match library.create_song(new_song) {
        Ok(song) => song,
        Err(err) => {
            media.remove(&stored.path).await;
            return Err(err.into());
        }
    };
    info!(
        "User {} uploaded song {} ({})",
        session.user_id, song.id, stored.file_name
    );

    Ok((
        StatusCode::CREATED,
        Json(SongUploadResponse {
            message: "song uploaded successfully",
            song,
        }),
    )
        .into_response())
}
