//! Integration tests for the media server API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use local_media::{create_app, resolver::encode_path, ServerConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

const CLIP: &[u8] = b"0123456789abcdefghij";

/// Helper to create a test app instance.
fn create_test_app(enable_caching: bool) -> Router {
    create_app(ServerConfig {
        port: 0,
        enable_caching,
    })
}

fn media_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("clip.mp4"), CLIP).unwrap();
    fs::write(dir.path().join("song one.mp3"), b"ID3").unwrap();
    fs::write(dir.path().join("Track #1.mp3"), b"ID3").unwrap();
    fs::write(dir.path().join("old.avi"), b"RIFF").unwrap();
    fs::write(dir.path().join("setup.exe"), b"MZ").unwrap();
    fs::create_dir(dir.path().join("folder.mp4")).unwrap();
    dir
}

fn file_uri(path: &Path) -> String {
    format!("/?q={}", encode_path(&path.to_string_lossy()))
}

async fn get(app: Router, uri: &str) -> Response {
    get_with(app, uri, &[]).await
}

async fn get_with(app: Router, uri: &str, headers: &[(header::HeaderName, &str)]) -> Response {
    let mut request = Request::builder().uri(uri);
    for (name, value) in headers {
        request = request.header(name.clone(), *value);
    }
    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_serve_file() {
    let dir = media_dir();
    let response = get(create_test_app(true), &file_uri(&dir.path().join("clip.mp4"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        CLIP.len().to_string().as_str()
    );
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(body_bytes(response).await, CLIP);
}

#[tokio::test]
async fn test_serve_file_with_encoded_space() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("song one.mp3"));
    assert!(uri.contains("song%20one.mp3"));

    let response = get(create_test_app(true), &uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
}

#[tokio::test]
async fn test_serve_file_with_hash_in_name() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("Track #1.mp3"));
    assert!(uri.ends_with("Track%20%231.mp3"));

    let response = get(create_test_app(true), &uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(body_bytes(response).await, b"ID3");
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let response = get(create_test_app(true), "/").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_text(response).await, "File path not specified");

    let response = get(create_test_app(true), "/?q=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disallowed_extension_is_forbidden() {
    let dir = media_dir();
    let response = get(create_test_app(true), &file_uri(&dir.path().join("setup.exe"))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let dir = media_dir();
    let name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
    let sneaky = format!("{}/../{}/clip.mp4", dir.path().display(), name);

    let response = get(create_test_app(true), &format!("/?q={}", encode_path(&sneaky))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_relative_path_is_forbidden() {
    let response = get(create_test_app(true), "/?q=videos%2Fclip.mp4").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = media_dir();
    let response = get(create_test_app(true), &file_uri(&dir.path().join("gone.mp4"))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directory_is_forbidden() {
    let dir = media_dir();
    let response = get(create_test_app(true), &file_uri(&dir.path().join("folder.mp4"))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unmapped_type_is_unsupported() {
    let dir = media_dir();
    let response = get(create_test_app(true), &file_uri(&dir.path().join("old.avi"))).await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_caching_headers_and_not_modified() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("clip.mp4"));

    let response = get(create_test_app(true), &uri).await;
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "private, max-age=3600"
    );
    let etag = response.headers()[header::ETAG].to_str().unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with(&format!("-{:x}\"", CLIP.len())));

    let response = get_with(create_test_app(true), &uri, &[(header::IF_NONE_MATCH, etag.as_str())]).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_caching_disabled() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("clip.mp4"));

    let response = get_with(create_test_app(false), &uri, &[(header::IF_NONE_MATCH, "*")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ETAG).is_none());
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
}

#[tokio::test]
async fn test_range_request() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("clip.mp4"));

    let response = get_with(create_test_app(true), &uri, &[(header::RANGE, "bytes=10-14")]).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 10-14/20");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
    assert_eq!(body_bytes(response).await, b"abcde");
}

#[tokio::test]
async fn test_suffix_range_request() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("clip.mp4"));

    let response = get_with(create_test_app(true), &uri, &[(header::RANGE, "bytes=-3")]).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, b"hij");
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let dir = media_dir();
    let uri = file_uri(&dir.path().join("clip.mp4"));

    let response = get_with(create_test_app(true), &uri, &[(header::RANGE, "bytes=100-")]).await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */20");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = get(create_test_app(true), "/api/flows").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
