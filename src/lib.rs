//! # keepr-assets
//!
//! A loopback HTTP asset server for a set of registered image directories.
//!
//! Each registered root directory is addressed by its position in an ordered
//! registry, so `GET /1/sub/b.png` serves `sub/b.png` from the second root.
//! Adding `?width=N` decodes the file as a PNG, resamples it with Catmull-Rom
//! to `N` pixels wide (height keeps the aspect ratio, truncated) and returns a
//! freshly encoded PNG. Every failure is reported as a plain 404.
//!
//! ## Features
//!
//! - **Index-addressed roots**: the URL prefix is the directory's registry index
//! - **Contained paths**: `..` can never climb out of a root
//! - **On-the-fly thumbnails**: Catmull-Rom downscaling with exact `Content-Length`
//! - **Image enumeration**: recursive, best-effort listing of every root
//! - **Live reload**: the registry is swapped atomically, in-flight requests keep
//!   the snapshot they started with
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`registry`] - Ordered root directories and the swappable handle
//! - [`asset`] - Request parsing, containment, verbatim files and resizing
//! - [`enumerate`] - Recursive file discovery across all roots
//! - [`settings`] - JSON settings file and directory providers
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use keepr_assets::{create_router, AssetService, DirectoryRegistry, RegistryHandle, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = DirectoryRegistry::new(["/srv/photos", "/srv/renders"]).unwrap();
//!     let assets = AssetService::new(RegistryHandle::new(registry));
//!     let router = create_router(assets, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod asset;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod registry;
pub mod server;
pub mod settings;

// Re-export commonly used types
pub use asset::{
    content_type_for, parse_width, target_height, AssetBody, AssetPath, AssetQuery, AssetResponse,
    AssetService, PngResizer, ResizedImage, DEFAULT_MAX_WIDTH, RESIZED_CONTENT_TYPE,
};
pub use config::{AddDirConfig, Cli, Command, DirectoryArgs, ListConfig, ServeConfig};
pub use enumerate::{enumerate_images, enumerate_root, EnumeratedImage, Enumeration};
pub use error::{AssetError, ConfigError, RegistryError, RootWalkError};
pub use registry::{DirectoryRegistry, DirectorySource, RegistryHandle};
pub use server::{
    asset_handler, create_router, health_handler, images_handler, AppState, ErrorResponse,
    HealthResponse, ImagesResponse, RouterConfig,
};
pub use settings::{ConfiguredDirectories, Settings, SettingsStore};
