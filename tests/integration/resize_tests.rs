//! Resize integration tests.
//!
//! Tests verify:
//! - Catmull-Rom resizing to the requested width
//! - Height truncation towards zero
//! - Content-Length and content type of resized responses
//! - 404 for bad widths and undecodable sources

use axum::http::{header, StatusCode};

use keepr_assets::server::RESIZED_HEADER;
use keepr_assets::target_height;

use super::test_utils::{assert_not_found, create_test_png, get, is_valid_png, png_dimensions, AssetFixture};

// =============================================================================
// Successful Resizes
// =============================================================================

#[tokio::test]
async fn test_resize_keeps_aspect_ratio() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.png", &create_test_png(40, 30));

    let (status, headers, body) = get(fixture.router(), "/0/a.png?width=20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[RESIZED_HEADER], "true");
    assert!(is_valid_png(&body));
    assert_eq!(png_dimensions(&body), (20, 15));
}

#[tokio::test]
async fn test_resize_content_length_matches_body() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "photo.png", &create_test_png(64, 48));

    let (status, headers, body) = get(fixture.router(), "/0/photo.png?width=32").await;

    assert_eq!(status, StatusCode::OK);
    let content_length: usize = headers[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(content_length, body.len());
}

#[tokio::test]
async fn test_resize_truncates_height() {
    let fixture = AssetFixture::new(1);
    // 33/100 * 50 = 16.5
    fixture.write(0, "wide.png", &create_test_png(100, 33));
    // 2/3 * 4 = 2.67
    fixture.write(0, "small.png", &create_test_png(3, 2));

    let (status, _, body) = get(fixture.router(), "/0/wide.png?width=50").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (50, 16));

    let (status, _, body) = get(fixture.router(), "/0/small.png?width=4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (4, 2));

    assert_eq!(target_height(100, 33, 50), 16);
    assert_eq!(target_height(3, 2, 4), 2);
}

#[tokio::test]
async fn test_resize_upscale() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "tiny.png", &create_test_png(4, 2));

    let (status, _, body) = get(fixture.router(), "/0/tiny.png?width=16").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (16, 8));
}

#[tokio::test]
async fn test_resize_same_width() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.png", &create_test_png(10, 10));

    let (status, headers, body) = get(fixture.router(), "/0/a.png?width=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[RESIZED_HEADER], "true");
    assert_eq!(png_dimensions(&body), (10, 10));
}

#[tokio::test]
async fn test_resize_first_width_wins() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.png", &create_test_png(40, 20));

    let (status, _, body) = get(fixture.router(), "/0/a.png?width=10&width=30").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (10, 5));
}

#[tokio::test]
async fn test_resize_from_nested_path_in_second_root() {
    let fixture = AssetFixture::new(2);
    fixture.write(1, "sub/b.png", &create_test_png(80, 60));

    let (status, _, body) = get(fixture.router(), "/1/sub/b.png?width=40").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (40, 30));
}

// =============================================================================
// Resize Failures
// =============================================================================

#[tokio::test]
async fn test_invalid_width_values() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.png", &create_test_png(8, 8));

    for width in ["", "0", "abc", "-5", "1.5", "%2B4", "99999999999"] {
        let uri = format!("/0/a.png?width={}", width);
        let (status, _, body) = get(fixture.router(), &uri).await;
        assert_not_found(status, &body);
    }
}

#[tokio::test]
async fn test_width_above_maximum() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "a.png", &create_test_png(8, 8));

    let service = fixture.service().with_max_width(64);
    let router = keepr_assets::create_router(
        service,
        keepr_assets::RouterConfig::new().with_tracing(false),
    );

    let (status, _, _) = get(router.clone(), "/0/a.png?width=64").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = get(router, "/0/a.png?width=65").await;
    assert_not_found(status, &body);
}

#[tokio::test]
async fn test_resize_non_png_source() {
    let fixture = AssetFixture::new(1);
    fixture.write(0, "notes.txt", b"plain text, not an image");
    fixture.write(0, "broken.png", b"\x89PNG\r\n\x1a\ntruncated");

    for uri in ["/0/notes.txt?width=10", "/0/broken.png?width=10"] {
        let (status, _, body) = get(fixture.router(), uri).await;
        assert_not_found(status, &body);
    }
}

#[tokio::test]
async fn test_resize_zero_height_target() {
    let fixture = AssetFixture::new(1);
    // 1/100 * 50 truncates to 0
    fixture.write(0, "strip.png", &create_test_png(100, 1));

    let (status, _, body) = get(fixture.router(), "/0/strip.png?width=50").await;
    assert_not_found(status, &body);

    let (status, _, body) = get(fixture.router(), "/0/strip.png?width=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (100, 1));
}

#[tokio::test]
async fn test_resize_oversized_target_height() {
    let fixture = AssetFixture::new(1);
    // 4000 / 1 * 8192 would be 32768000 rows
    fixture.write(0, "thread.png", &create_test_png(1, 4000));

    let (status, _, body) = get(fixture.router(), "/0/thread.png?width=8192").await;
    assert_not_found(status, &body);

    // The server keeps answering afterwards
    let (status, _, body) = get(fixture.router(), "/0/thread.png?width=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(png_dimensions(&body), (2, 8000));
}

#[tokio::test]
async fn test_resize_missing_file() {
    let fixture = AssetFixture::new(1);

    let (status, _, body) = get(fixture.router(), "/0/missing.png?width=10").await;
    assert_not_found(status, &body);
}
