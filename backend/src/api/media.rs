//! Local file streaming handler.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use std::fs::Metadata;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path as StdPath, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::resolver::is_allowed_extension;
use crate::state::AppState;

/// Cache policy sent with every served file when caching is enabled.
pub const CACHE_CONTROL_VALUE: &str = "private, max-age=3600";

type ApiError = (StatusCode, String);

fn reject(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, message.into())
}

/// Query parameters for serving a file.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// Absolute path of the file, percent-encoded in the URL
    pub q: Option<String>,
}

/// Content type for an allow-listed extension.
///
/// Some allow-listed extensions have no entry here; those are answered with
/// `415` instead of guessing.
pub fn mime_type(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        // Video
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "oga" => "audio/ogg",
        "weba" => "audio/webm",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "opus" => "audio/opus",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// Check that a requested path is absolute and free of `..` components.
fn validate_path(requested: &str) -> Result<PathBuf, ApiError> {
    let path = StdPath::new(requested);

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        warn!("Rejected path traversal attempt: {}", requested);
        return Err(reject(StatusCode::FORBIDDEN, "Path traversal not allowed"));
    }
    if !path.is_absolute() {
        warn!("Rejected relative path: {}", requested);
        return Err(reject(StatusCode::FORBIDDEN, "Path must be absolute"));
    }

    Ok(path.components().collect())
}

/// Entity tag built from modification time and size.
pub fn etag_for(metadata: &Metadata) -> String {
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("\"{:x}-{:x}\"", mtime, metadata.len())
}

fn matches_if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    value.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == etag
    })
}

/// Outcome of interpreting a `Range` header against a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range, send the whole file
    Full,
    /// Inclusive byte range
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

/// Interpret a single `bytes=` range. Malformed and multi-range headers are
/// treated as absent.
pub fn parse_range(value: &str, size: u64) -> ByteRange {
    let Some(range_set) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if range_set.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = range_set.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix range: the last `n` bytes
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Full,
        }
    };

    if start >= size {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial {
        start,
        end: end.map_or(size - 1, |end| end.min(size - 1)),
    }
}

/// Stream a local file named by the `q` query parameter.
pub async fn serve_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let requested = query.q.as_deref().map(str::trim).unwrap_or_default();
    if requested.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "File path not specified"));
    }

    let extension = StdPath::new(requested)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| is_allowed_extension(ext))
        .ok_or_else(|| {
            warn!("Rejected file type: {}", requested);
            reject(StatusCode::FORBIDDEN, "File type not allowed")
        })?;

    let path = validate_path(requested)?;

    let metadata = match fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("File not found: {}", path.display());
            return Err(reject(StatusCode::NOT_FOUND, "File not found"));
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            warn!("Permission denied: {}", path.display());
            return Err(reject(StatusCode::FORBIDDEN, "Access denied"));
        }
        Err(e) => {
            error!("Failed to read metadata of {}: {}", path.display(), e);
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read file metadata: {}", e),
            ));
        }
    };

    if !metadata.is_file() {
        warn!("Not a regular file: {}", path.display());
        return Err(reject(StatusCode::FORBIDDEN, "Not a regular file"));
    }

    let content_type = mime_type(&extension).ok_or_else(|| {
        reject(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Unsupported media type: .{}", extension),
        )
    })?;

    let size = metadata.len();
    let etag = etag_for(&metadata);
    let caching = state.enable_caching();

    if caching && matches_if_none_match(&headers, &etag) {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, &etag)
            .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
            .body(Body::empty())
            .map_err(build_error);
    }

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map_or(ByteRange::Full, |v| parse_range(v, size));

    if range == ByteRange::Unsatisfiable {
        return Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", size))
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from("Requested range not satisfiable"))
            .map_err(build_error);
    }

    let mut file = fs::File::open(&path).await.map_err(|e| {
        error!("Failed to open {}: {}", path.display(), e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to open file: {}", e),
        )
    })?;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes");
    if caching {
        builder = builder
            .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
            .header(header::ETAG, &etag);
    }

    let response = match range {
        ByteRange::Partial { start, end } => {
            file.seek(SeekFrom::Start(start)).await.map_err(|e| {
                error!("Failed to seek {}: {}", path.display(), e);
                reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to read file: {}", e),
                )
            })?;
            let len = end - start + 1;
            debug!("Serving {} bytes {}-{}/{}", path.display(), start, end, size);
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_LENGTH, len)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, size),
                )
                .body(Body::from_stream(ReaderStream::new(file.take(len))))
        }
        _ => {
            debug!("Serving {} ({} bytes)", path.display(), size);
            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size)
                .body(Body::from_stream(ReaderStream::new(file)))
        }
    };

    response.map_err(build_error)
}

fn build_error(e: axum::http::Error) -> ApiError {
    error!("Failed to build response: {}", e);
    reject(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to build response",
    )
}
