//! API integration tests for verbatim asset retrieval and error handling.
//!
//! Tests verify:
//! - Byte-identical verbatim serving from any registered root
//! - Uniform 404 for every failure (bad index, escapes, missing files)
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use keepr_assets::server::RESIZED_HEADER;

use super::test_utils::{assert_not_found, get, AssetFixture};

// =============================================================================
// Verbatim Retrieval
// =============================================================================

#[tokio::test]
async fn test_verbatim_retrieval_success() {
    let fixture = AssetFixture::new(1);
    let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    fixture.write(0, "raw.bin", &data);

    let (status, headers, body) = get(fixture.router(), "/0/raw.bin").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], &data[..]);
    assert_eq!(headers[header::CONTENT_LENGTH], "10000");
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[RESIZED_HEADER], "false");
}

#[tokio::test]
async fn test_verbatim_from_second_root() {
    let fixture = AssetFixture::new(2);
    fixture.write(0, "sub/b.png", b"first root");
    fixture.write(1, "sub/b.png", b"second root");

    let (status, headers, body) = get(fixture.router(), "/1/sub/b.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"second root");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn test_verbatim_png_is_not_reencoded() {
    let fixture = AssetFixture::new(1);
    // Not a real PNG; a verbatim request must not try to decode it
    fixture.write(0, "fake.png", b"definitely not a png");

    let (status, _, body) = get(fixture.router(), "/0/fake.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"definitely not a png");
}

#[tokio::test]
async fn test_percent_encoded_path() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "summer 2024/beach #1.png", b"beach");

    let (status, _, body) = get(fixture.router(), "/0/summer%202024/beach%20%231.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"beach");
}

#[tokio::test]
async fn test_unknown_query_parameters_ignored() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.txt", b"hello");

    let (status, _, body) = get(fixture.router(), "/0/a.txt?cache=no&v=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"hello");
}

#[tokio::test]
async fn test_empty_file() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "empty.txt", b"");

    let (status, headers, body) = get(fixture.router(), "/0/empty.txt").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(headers[header::CONTENT_LENGTH], "0");
}

#[tokio::test]
async fn test_large_file_streamed_intact() {
    let fixture = AssetFixture::new(1);
    let data: Vec<u8> = (0..12 * 1024 * 1024u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
        .collect();
    fixture.write(0, "video/clip.mp4", &data);

    let (status, headers, body) = get(fixture.router(), "/0/video/clip.mp4").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_LENGTH], data.len().to_string().as_str());
    assert_eq!(headers[RESIZED_HEADER], "false");
    assert_eq!(body.len(), data.len());
    assert!(body[..] == data[..], "streamed body differs from file");
}

#[tokio::test]
async fn test_verbatim_range_and_head() {
    let fixture = AssetFixture::new(1);
    let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    fixture.write(0, "raw.bin", &data);
    let router = fixture.router();

    let request = Request::builder()
        .uri("/0/raw.bin")
        .header(header::RANGE, "bytes=100-199")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "100");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &data[100..200]);

    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/0/raw.bin")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "4096");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

// =============================================================================
// Not Found
// =============================================================================

#[tokio::test]
async fn test_index_out_of_range() {
    let fixture = AssetFixture::new(2);
    fixture.write(0, "a.png", b"a");

    for uri in ["/2/a.png", "/99/a.png", "/18446744073709551616/a.png"] {
        let (status, _, body) = get(fixture.router(), uri).await;
        assert_not_found(status, &body);
    }
}

#[tokio::test]
async fn test_non_numeric_index() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.png", b"a");

    for uri in ["/x/a.png", "/-1/a.png", "/+0/a.png", "/%200/a.png"] {
        let (status, _, body) = get(fixture.router(), uri).await;
        assert_not_found(status, &body);
    }
}

#[tokio::test]
async fn test_missing_file() {
    let fixture = AssetFixture::new(1);

    let (status, _, body) = get(fixture.router(), "/0/missing.png").await;
    assert_not_found(status, &body);
}

#[tokio::test]
async fn test_paths_without_extension() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "README", b"no extension");
    fixture.write(0, "sub/a.png", b"a");

    for uri in ["/", "/0", "/0/", "/0/README", "/0/sub"] {
        let (status, _, body) = get(fixture.router(), uri).await;
        assert_not_found(status, &body);
    }
}

#[tokio::test]
async fn test_directory_with_extension() {
    let fixture = AssetFixture::new(1);
    std::fs::create_dir(fixture.root(0).join("album.d")).unwrap();

    let (status, _, body) = get(fixture.router(), "/0/album.d").await;
    assert_not_found(status, &body);
}

// =============================================================================
// Containment
// =============================================================================

#[tokio::test]
async fn test_parent_escape_rejected() {
    let parent = tempfile::TempDir::new().unwrap();
    let root = parent.path().join("root");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(parent.path().join("secret.txt"), b"secret").unwrap();

    let registry = keepr_assets::DirectoryRegistry::new([root]).unwrap();
    let service = keepr_assets::AssetService::new(keepr_assets::RegistryHandle::new(registry));
    let router = keepr_assets::create_router(
        service,
        keepr_assets::RouterConfig::new().with_tracing(false),
    );

    for uri in [
        "/0/../secret.txt",
        "/0/%2e%2e/secret.txt",
        "/0/%2E%2E%2Fsecret.txt",
        "/0/sub/../../secret.txt",
        "/0/..%5Csecret.txt",
    ] {
        let (status, _, body) = get(router.clone(), uri).await;
        assert_not_found(status, &body);
        assert_ne!(&body[..], b"secret");
    }
}

#[tokio::test]
async fn test_inner_parent_segments_allowed() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "b.png", b"b");
    std::fs::create_dir(fixture.root(0).join("sub")).unwrap();

    let (status, _, body) = get(fixture.router(), "/0/sub/../b.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"b");
}

#[tokio::test]
async fn test_absolute_relative_path_rejected() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.txt", b"a");

    let (status, _, body) = get(fixture.router(), "/0/%2Fetc%2Fpasswd.txt").await;
    assert_not_found(status, &body);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = AssetFixture::new(3);

    let (status, headers, body) = get(fixture.router(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["directories"], 3);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
