//! HTTP request handlers for the asset API.
//!
//! This module contains the Axum handlers for serving assets, listing images
//! and health checks.
//!
//! # Endpoints
//!
//! - `GET /{index}/{path}[?width=N]` - Serve a file, optionally downscaled
//! - `GET /images` - List every addressable file
//! - `GET /health` - Health check endpoint

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info, warn};

use crate::asset::{AssetBody, AssetQuery, AssetResponse, AssetService};
use crate::enumerate::{enumerate_images, Enumeration};
use crate::error::AssetError;

/// Header reporting whether the body went through the resize pipeline.
pub const RESIZED_HEADER: &str = "X-Asset-Resized";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the asset service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState {
    /// The asset service for processing asset requests
    pub assets: Arc<AssetService>,
}

impl AppState {
    /// Create a new application state with the given asset service.
    pub fn new(assets: AssetService) -> Self {
        Self {
            assets: Arc::new(assets),
        }
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            assets: Arc::clone(&self.assets),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }

    /// The body sent for every failed asset request.
    pub fn not_found() -> Self {
        Self::with_status("not_found", "Asset not found", StatusCode::NOT_FOUND)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Number of registered root directories
    pub directories: usize,
}

/// One file in the `/images` listing.
#[derive(Debug, Serialize)]
pub struct ImageEntry {
    /// Root directory index
    pub directory: usize,

    /// `/`-separated path below the root
    pub path: String,

    /// Percent-encoded request path for this file
    pub url: String,
}

/// A root that could not be walked.
#[derive(Debug, Serialize)]
pub struct RootFailureEntry {
    /// Root directory index
    pub directory: usize,

    /// Root directory on disk
    pub root: String,

    /// Why the walk failed
    pub message: String,
}

/// Response from the `/images` endpoint.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    /// Every addressable file, grouped by root in index order
    pub images: Vec<ImageEntry>,

    /// Roots that were skipped
    pub failures: Vec<RootFailureEntry>,
}

impl From<Enumeration> for ImagesResponse {
    fn from(enumeration: Enumeration) -> Self {
        let images = enumeration
            .images
            .into_iter()
            .map(|image| ImageEntry {
                url: image.request_path(),
                directory: image.directory_index,
                path: image.relative_path,
            })
            .collect();

        let failures = enumeration
            .failures
            .into_iter()
            .map(|failure| RootFailureEntry {
                directory: failure.index,
                root: failure.root.display().to_string(),
                message: failure.message,
            })
            .collect();

        Self { images, failures }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert AssetError to HTTP response.
///
/// The client only ever sees a 404 with a fixed body; the stage and details
/// are logged by [`asset_handler`] before conversion.
impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found())).into_response()
    }
}

/// Log a failed asset request with its raw path and pipeline stage.
fn log_asset_error(raw_path: &str, err: &AssetError) {
    if err.is_processing_failure() {
        warn!(path = raw_path, stage = err.stage(), "Asset request failed: {}", err);
    } else {
        debug!(path = raw_path, stage = err.stage(), "Asset request failed: {}", err);
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle asset requests.
///
/// # Endpoint
///
/// `GET /{index}/{path}`
///
/// # Query Parameters
///
/// - `width`: Target width in pixels. When present the file is decoded as a
///   PNG, resampled with Catmull-Rom and re-encoded as PNG. The height keeps
///   the aspect ratio, truncated towards zero.
///
/// # Response
///
/// - `200 OK`: File bytes with `Content-Type`, `Content-Length` and
///   `X-Asset-Resized`. Verbatim files are streamed from disk, so `Range`
///   and conditional requests get `206` and `304` the usual way.
/// - `404 Not Found`: Any failure at all
///
/// # Example
///
/// ```text
/// GET /0/2024/beach.png
/// GET /1/renders/tower.png?width=320
/// ```
pub async fn asset_handler(State(state): State<AppState>, request: Request) -> Response {
    let uri = request.uri().clone();
    let raw_path = uri.path();
    let query = AssetQuery::parse(uri.query());

    info!(path = raw_path, query = %query, "Asset request");

    let result = match state.assets.fetch(raw_path, &query).await {
        Ok(asset) => match asset.body {
            AssetBody::File { ref path, .. } => {
                serve_file(request, path, asset.content_type).await
            }
            AssetBody::Bytes(_) => build_asset_response(asset),
        },
        Err(err) => Err(err),
    };

    match result {
        Ok(response) => response,
        Err(err) => {
            log_asset_error(raw_path, &err);
            err.into_response()
        }
    }
}

/// Stream a verbatim file from disk.
///
/// The file is opened per request and read in chunks as the client consumes
/// the body. A file that disappears or cannot be opened after the service
/// checked it still ends in the uniform 404.
async fn serve_file(
    request: Request,
    path: &Path,
    content_type: &'static str,
) -> Result<Response, AssetError> {
    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AssetError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if !status.is_success() && status != StatusCode::NOT_MODIFIED {
        return Err(AssetError::ReadFailure {
            path: path.to_path_buf(),
            message: format!("file service answered {}", status),
        });
    }

    let mut response = response.map(Body::new);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(RESIZED_HEADER, HeaderValue::from_static("false"));

    Ok(response)
}

/// Assemble the 200 response for an in-memory asset.
fn build_asset_response(asset: AssetResponse) -> Result<Response, AssetError> {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, asset.content_type)
        .header(header::CONTENT_LENGTH, asset.content_length())
        .header(RESIZED_HEADER, asset.resized.to_string());

    let body = match asset.body {
        AssetBody::Bytes(data) => Body::from(data),
        AssetBody::File { path, .. } => {
            return Err(AssetError::WriteFailure {
                message: format!("{} must be streamed, not buffered", path.display()),
            })
        }
    };

    builder.body(body).map_err(|e| AssetError::WriteFailure {
        message: e.to_string(),
    })
}

/// Health check endpoint.
///
/// Returns a simple JSON response indicating the service is running, plus the
/// number of registered directories.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        directories: state.assets.registry().snapshot().count(),
    })
}

/// List every addressable file under the current registry.
///
/// # Endpoint
///
/// `GET /images`
///
/// # Response
///
/// ```json
/// {
///   "images": [
///     {"directory": 0, "path": "sub/b.png", "url": "/0/sub/b.png"}
///   ],
///   "failures": []
/// }
/// ```
///
/// Roots that cannot be opened are listed under `failures` and contribute no
/// images; the request itself still succeeds.
pub async fn images_handler(State(state): State<AppState>) -> Response {
    let registry = state.assets.registry().snapshot();

    match tokio::task::spawn_blocking(move || enumerate_images(&registry)).await {
        Ok(enumeration) => Json(ImagesResponse::from(enumeration)).into_response(),
        Err(e) => {
            warn!("Image enumeration task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_status(
                    "internal_error",
                    "Image enumeration failed",
                    StatusCode::INTERNAL_SERVER_ERROR,
                )),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
