//! Asset Service for resolving and producing asset responses.
//!
//! The AssetService is the single entry point for asset requests. It runs:
//! - Request path parsing
//! - Directory lookup in the registry snapshot
//! - Path containment and existence checks
//! - Verbatim file handoff or the decode → resample → encode pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         AssetService                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                      fetch()                            │    │
//! │  │  1. Parse path        4. Stat file                      │    │
//! │  │  2. Snapshot registry 5. No width: hand back the path   │    │
//! │  │  3. Resolve in root   6. Width: resize on blocking pool │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌────────────┐     ┌────────────────┐    ┌──────────────┐    │
//! │    │ AssetPath  │     │ RegistryHandle │    │  PngResizer  │    │
//! │    └────────────┘     └────────────────┘    └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Verbatim files are never loaded here. The response carries the resolved
//! path and its length, and the HTTP layer streams the file from disk. Only
//! the resize pipeline reads a whole file, since the decoder needs it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::AssetError;
use crate::registry::{DirectoryRegistry, RegistryHandle};

use super::media_type::content_type_for;
use super::path::{AssetPath, AssetQuery};
use super::resize::{parse_width, PngResizer, DEFAULT_MAX_WIDTH, RESIZED_CONTENT_TYPE};

// =============================================================================
// Asset Response
// =============================================================================

/// Where the body of an asset response comes from.
#[derive(Debug, Clone)]
pub enum AssetBody {
    /// Regular file inside a registered root, streamed as-is
    File {
        /// Resolved absolute path
        path: PathBuf,

        /// File size when it was checked
        len: u64,
    },

    /// Encoded image held in memory
    Bytes(Bytes),
}

/// Body and headers for a successful asset request.
#[derive(Debug, Clone)]
pub struct AssetResponse {
    /// Response body
    pub body: AssetBody,

    /// Value for the `Content-Type` header
    pub content_type: &'static str,

    /// Whether the body went through the resize pipeline
    pub resized: bool,
}

impl AssetResponse {
    /// Exact body length, used for `Content-Length`.
    pub fn content_length(&self) -> u64 {
        match &self.body {
            AssetBody::File { len, .. } => *len,
            AssetBody::Bytes(data) => data.len() as u64,
        }
    }

    /// Collect the whole body into memory.
    ///
    /// Reads the file for verbatim responses. Meant for callers that need the
    /// bytes themselves rather than an HTTP body.
    pub async fn into_bytes(self) -> Result<Bytes, AssetError> {
        match self.body {
            AssetBody::File { path, .. } => read_file(&path).await,
            AssetBody::Bytes(data) => Ok(data),
        }
    }
}

// =============================================================================
// Asset Service
// =============================================================================

/// Service that turns request paths into file bytes.
///
/// The service holds no per-request state. Each call takes one snapshot of the
/// registry and resolves against it, so a concurrent reload never changes the
/// root a request already picked.
///
/// # Example
///
/// ```ignore
/// use keepr_assets::asset::{AssetQuery, AssetService};
/// use keepr_assets::registry::{DirectoryRegistry, RegistryHandle};
///
/// let registry = RegistryHandle::new(DirectoryRegistry::new(["/srv/photos"])?);
/// let service = AssetService::new(registry);
///
/// let response = service
///     .fetch("/0/beach.png", &AssetQuery::with_width("320"))
///     .await?;
///
/// println!("{} bytes of {}", response.content_length(), response.content_type);
/// ```
#[derive(Debug, Clone)]
pub struct AssetService {
    /// Current set of root directories
    registry: RegistryHandle,

    /// PNG resampler
    resizer: PngResizer,

    /// Largest accepted `width` parameter
    max_width: u32,
}

impl AssetService {
    /// Create a new asset service with the default maximum width.
    pub fn new(registry: RegistryHandle) -> Self {
        Self {
            registry,
            resizer: PngResizer::new(),
            max_width: DEFAULT_MAX_WIDTH,
        }
    }

    /// Set the largest width a client may request.
    ///
    /// Also bounds the height the resizer may derive from it.
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self.resizer = self.resizer.with_max_dimension(max_width);
        self
    }

    /// Get the largest accepted width.
    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Get a reference to the registry handle.
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Serve a request path against the current registry.
    ///
    /// `raw_path` is the percent-encoded URI path, e.g. `/0/sub/b.png`.
    ///
    /// # Errors
    ///
    /// Any [`AssetError`]; callers map all of them to not-found.
    pub async fn fetch(&self, raw_path: &str, query: &AssetQuery) -> Result<AssetResponse, AssetError> {
        let asset = AssetPath::from_uri_path(raw_path)?;
        let registry = self.registry.snapshot();
        self.fetch_in(&registry, &asset, query).await
    }

    /// Serve an already-parsed asset against a specific registry snapshot.
    pub async fn fetch_in(
        &self,
        registry: &DirectoryRegistry,
        asset: &AssetPath,
        query: &AssetQuery,
    ) -> Result<AssetResponse, AssetError> {
        let root = registry
            .root_at(asset.directory_index)
            .ok_or(AssetError::UnknownDirectoryIndex {
                index: asset.directory_index,
                count: registry.count(),
            })?;

        let file = asset.resolve(root)?;
        let len = regular_file_len(&file).await?;

        let width = query
            .width()
            .map(|value| parse_width(value, self.max_width))
            .transpose()?;

        match width {
            None => Ok(AssetResponse {
                content_type: content_type_for(&file),
                body: AssetBody::File { path: file, len },
                resized: false,
            }),
            Some(width) => {
                let data = read_file(&file).await?;
                let resizer = self.resizer.clone();
                let resized = tokio::task::spawn_blocking(move || resizer.resize(&data, width))
                    .await
                    .map_err(|e| AssetError::EncodeFailure {
                        message: format!("resize task failed: {}", e),
                    })??;

                Ok(AssetResponse {
                    body: AssetBody::Bytes(resized.data),
                    content_type: RESIZED_CONTENT_TYPE,
                    resized: true,
                })
            }
        }
    }
}

/// Size of `path`, failing unless it is a regular file (symlinks followed).
async fn regular_file_len(path: &Path) -> Result<u64, AssetError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(not_found(path)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(path)),
        Err(e) => Err(AssetError::ReadFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

async fn read_file(path: &Path) -> Result<Bytes, AssetError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Bytes::from(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(path)),
        Err(e) => Err(AssetError::ReadFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn not_found(path: &Path) -> AssetError {
    AssetError::FileNotFound {
        path: PathBuf::from(path),
    }
}

// =============================================================================
// Tests
// =============================================================================
