//! Directory registry layer.
//!
//! The registry maps the integer prefix of an asset URL to a root directory on
//! disk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Asset Service / Image Enumerator    │
//! └────────────────────┬────────────────────┘
//!                      │ snapshot()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            RegistryHandle               │
//! │   (ArcSwap<DirectoryRegistry>)          │
//! └────────────────────┬────────────────────┘
//!                      │ reload_from()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         DirectorySource Trait           │
//! │  (settings file, command-line dirs)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use keepr_assets::registry::{DirectoryRegistry, RegistryHandle};
//!
//! let registry = DirectoryRegistry::new(["/srv/photos", "/srv/renders"]).unwrap();
//! let handle = RegistryHandle::new(registry);
//!
//! let snapshot = handle.snapshot();
//! assert_eq!(snapshot.count(), 2);
//! assert!(snapshot.root_at(1).is_some());
//! ```

mod directory;
mod handle;

pub use directory::{dedup_roots, DirectoryRegistry};
pub use handle::{DirectorySource, RegistryHandle};
