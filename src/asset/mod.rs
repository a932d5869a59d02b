//! Asset service layer.
//!
//! This module turns `/{index}/{relative_path}[?width=N]` requests into file
//! bytes, either verbatim or resampled.
//!
//! # Architecture
//!
//! The asset service sits between the HTTP layer and the directory registry:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Asset Service              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  AssetPath   │  │   PngResizer    │  │
//! │  │  (parse +    │  │  (decode →      │  │
//! │  │  containment)│  │ resample → enc) │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            RegistryHandle               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`AssetService`]: Main entry point, runs the whole request pipeline
//! - [`AssetPath`]: Parsed `(directory index, relative path)` identifier
//! - [`AssetQuery`]: Decoded query parameters
//! - [`PngResizer`]: Decodes, resamples with Catmull-Rom and re-encodes PNGs
//! - [`AssetResponse`]: Body source (file on disk or encoded bytes) plus content type
//!
//! # Example
//!
//! ```
//! use keepr_assets::asset::{target_height, AssetPath};
//! use std::path::Path;
//!
//! let asset = AssetPath::parse("/0/2024/beach.png").unwrap();
//! assert_eq!(asset.directory_index, 0);
//!
//! let file = asset.resolve(Path::new("/srv/photos")).unwrap();
//! assert_eq!(file, Path::new("/srv/photos/2024/beach.png"));
//!
//! // 4000x3000 source shrunk to 320 wide
//! assert_eq!(target_height(4000, 3000, 320), 240);
//! ```

mod media_type;
mod path;
mod resize;
mod service;

pub use media_type::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use path::{has_file_extension, AssetPath, AssetQuery};
pub use resize::{
    parse_width, target_height, PngResizer, ResizedImage, DEFAULT_MAX_WIDTH, RESIZED_CONTENT_TYPE,
};
pub use service::{AssetBody, AssetResponse, AssetService};
