//! Recursive discovery of addressable files under every registered root.
//!
//! Enumeration is best-effort: entries that cannot be read are left out
//! silently, and a root that cannot be opened at all contributes nothing and is
//! reported in [`Enumeration::failures`]. Callers must be prepared for partial
//! results.

use std::path::{Component, Path};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::RootWalkError;
use crate::registry::DirectoryRegistry;

// =============================================================================
// Types
// =============================================================================

/// One discovered file: owning root index plus slash-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumeratedImage {
    /// Index of the root directory in the registry
    #[serde(rename = "directory")]
    pub directory_index: usize,

    /// Path below the root, always `/`-separated
    #[serde(rename = "path")]
    pub relative_path: String,
}

impl EnumeratedImage {
    /// Create a new entry.
    pub fn new(directory_index: usize, relative_path: impl Into<String>) -> Self {
        Self {
            directory_index,
            relative_path: relative_path.into(),
        }
    }

    /// Request path for this file, with each segment percent-encoded.
    ///
    /// `(0, "summer 2024/beach.png")` becomes `/0/summer%202024/beach.png`.
    pub fn request_path(&self) -> String {
        let mut path = format!("/{}", self.directory_index);
        for segment in self.relative_path.split('/') {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
        }
        path
    }
}

/// Result of walking every registered root.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Files found, grouped by root in registry order
    pub images: Vec<EnumeratedImage>,

    /// Roots that could not be walked
    pub failures: Vec<RootWalkError>,
}

impl Enumeration {
    /// Whether every root was walked.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Enumeration
// =============================================================================

/// Walk every root in `registry` and collect its files.
///
/// This does blocking filesystem I/O; call it from `spawn_blocking` inside the
/// async runtime.
pub fn enumerate_images(registry: &DirectoryRegistry) -> Enumeration {
    let mut enumeration = Enumeration::default();

    for (index, root) in registry.iter() {
        match enumerate_root(index, root) {
            Ok(mut images) => {
                debug!(index, root = %root.display(), count = images.len(), "Enumerated root");
                enumeration.images.append(&mut images);
            }
            Err(failure) => {
                warn!(
                    index,
                    root = %root.display(),
                    "Skipping root directory: {}",
                    failure.message
                );
                enumeration.failures.push(failure);
            }
        }
    }

    enumeration
}

/// Walk a single root.
///
/// Fails only when the root itself cannot be opened; errors on entries below
/// it are skipped.
pub fn enumerate_root(index: usize, root: &Path) -> Result<Vec<EnumeratedImage>, RootWalkError> {
    let mut images = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(RootWalkError {
                    index,
                    root: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                debug!(index, "Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(RootWalkError {
                    index,
                    root: root.to_path_buf(),
                    message: "not a directory".to_string(),
                });
            }
            continue;
        }

        if entry.file_type().is_dir() {
            continue;
        }

        // Follow symlinks here so dangling links and links to directories are
        // left out; only regular files are servable.
        match std::fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                debug!(index, path = %entry.path().display(), "Skipping unreadable entry: {}", e);
                continue;
            }
        }

        match relative_slash_path(root, entry.path()) {
            Some(relative) => images.push(EnumeratedImage::new(index, relative)),
            None => debug!(
                index,
                path = %entry.path().display(),
                "Skipping entry without a UTF-8 relative path"
            ),
        }
    }

    Ok(images)
}

/// `path` relative to `root`, joined with `/` whatever the host separator.
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

// =============================================================================
// Tests
// =============================================================================
