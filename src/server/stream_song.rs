//! Audio streaming functionality

use super::{error::ApiError, session::Session, state::GuardedLibraryStore};
use axum::{
    body::Body,
    extract::{rejection::PathRejection, OptionalFromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::Path as FsPath;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, BufReader, SeekFrom},
};
use tokio_util::io::ReaderStream;
use tracing::debug;

const STREAM_BUFFER_SIZE: usize = 4096 * 16;

/// A single `Range: bytes=a-b` request. Either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start_inclusive: Option<u64>,
    end_inclusive: Option<u64>,
}

impl ByteRange {
    pub fn new(start_inclusive: Option<u64>, end_inclusive: Option<u64>) -> ByteRange {
        ByteRange {
            start_inclusive,
            end_inclusive,
        }
    }

    fn parse<S: AsRef<str>>(s: S) -> Option<ByteRange> {
        let v = s.as_ref().strip_prefix("bytes=")?;
        let (start, end) = v.split_once('-')?;
        if end.contains('-') || end.contains(',') {
            return None;
        }

        Some(ByteRange {
            start_inclusive: start.trim().parse::<u64>().ok(),
            end_inclusive: end.trim().parse::<u64>().ok(),
        })
    }

    /// Resolves the range against a file length into inclusive offsets.
    /// `None` means the range can't be satisfied. `bytes=-N` is the last N
    /// bytes.
    fn resolve(&self, file_length: u64) -> Option<(u64, u64)> {
        if file_length == 0 {
            return None;
        }
        let last = file_length - 1;
        let (start, end) = match (self.start_inclusive, self.end_inclusive) {
            (None, None) => (0, last),
            (Some(start), None) => (start, last),
            (Some(start), Some(end)) => (start, end.min(last)),
            (None, Some(0)) => return None,
            (None, Some(suffix)) => (file_length.saturating_sub(suffix), last),
        };
        if start > end {
            None
        } else {
            Some((start, end))
        }
    }
}

impl<S> OptionalFromRequestParts<S> for ByteRange
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts
            .headers
            .get(header::RANGE)
            .and_then(|x| x.to_str().ok())
            .and_then(ByteRange::parse))
    }
}

fn attachment_name(path: &str) -> String {
    FsPath::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("song.mp3")
        .replace('"', "_")
}

pub async fn stream_song(
    _session: Session,
    byte_range: Option<ByteRange>,
    State(library): State<GuardedLibraryStore>,
    id: Result<Path<usize>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let song = library
        .get_song(id)?
        .ok_or_else(|| ApiError::not_found("song not found"))?;
    debug!("Streaming song {} from {}", song.title, song.file_path);

    let mut file = File::open(&song.file_path).await.map_err(|err| {
        debug!("Song {} file unavailable: {}", song.id, err);
        ApiError::not_found("file not found")
    })?;
    let file_length = file
        .metadata()
        .await
        .map_err(|err| anyhow::Error::new(err).context("Failed to stat song file"))?
        .len();

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment_name(&song.file_path)),
        );

    let response = match byte_range {
        None => {
            let reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, file);
            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, file_length)
                .body(Body::from_stream(ReaderStream::with_capacity(
                    reader,
                    STREAM_BUFFER_SIZE,
                )))
        }
        Some(range) => {
            let Some((start, end)) = range.resolve(file_length) else {
                return Ok(Response::builder()
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .header(header::CONTENT_RANGE, format!("bytes */{}", file_length))
                    .body(Body::empty())
                    .map_err(anyhow::Error::new)?);
            };
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|err| anyhow::Error::new(err).context("Failed to seek song file"))?;
            let chunk_size = end - start + 1;
            let reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, file.take(chunk_size));
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_length),
                )
                .header(header::CONTENT_LENGTH, chunk_size)
                .body(Body::from_stream(ReaderStream::with_capacity(
                    reader,
                    STREAM_BUFFER_SIZE,
                )))
        }
    };

    Ok(response.map_err(anyhow::Error::new)?.into_response())
}
