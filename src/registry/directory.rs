//! Ordered list of registered root directories.
//!
//! A [`DirectoryRegistry`] is an immutable snapshot: the position of a root in
//! the list is the identifier clients put in the first URL segment, so the list
//! is never edited in place. Changes are made by building a new registry and
//! swapping it in through a [`RegistryHandle`](super::RegistryHandle).

use std::path::{Component, Path, PathBuf};

use crate::error::RegistryError;

// =============================================================================
// DirectoryRegistry
// =============================================================================

/// Ordered, indexable set of absolute root directories.
///
/// Invariants:
/// - every root is an absolute path
/// - no two roots resolve to the same canonical directory
/// - indices are `0..count()` in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRegistry {
    roots: Vec<PathBuf>,
}

impl DirectoryRegistry {
    /// Build a registry from an ordered list of root directories.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotAbsolute`] if any path is relative
    /// - [`RegistryError::Duplicate`] if two paths resolve to the same directory
    pub fn new<I, P>(paths: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut roots: Vec<PathBuf> = Vec::new();
        let mut keys: Vec<PathBuf> = Vec::new();

        for path in paths {
            let path = path.into();
            if !path.is_absolute() {
                return Err(RegistryError::NotAbsolute(path));
            }

            let key = canonical_key(&path);
            if let Some(existing_index) = keys.iter().position(|k| *k == key) {
                return Err(RegistryError::Duplicate {
                    path,
                    existing_index,
                });
            }

            keys.push(key);
            roots.push(path);
        }

        Ok(Self { roots })
    }

    /// Create an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of registered roots.
    pub fn count(&self) -> usize {
        self.roots.len()
    }

    /// Whether no roots are registered.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Root directory registered at `index`, if any.
    pub fn root_at(&self, index: usize) -> Option<&Path> {
        self.roots.get(index).map(PathBuf::as_path)
    }

    /// Index of the root that resolves to the same directory as `path`.
    pub fn position_of(&self, path: &Path) -> Option<usize> {
        let key = canonical_key(path);
        self.roots.iter().position(|root| canonical_key(root) == key)
    }

    /// Iterate over `(index, root)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Path)> {
        self.roots
            .iter()
            .enumerate()
            .map(|(index, root)| (index, root.as_path()))
    }

    /// All roots in registration order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

// =============================================================================
// Path Helpers
// =============================================================================

/// Drop later entries that resolve to a directory already in the list.
pub fn dedup_roots<I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut keys: Vec<PathBuf> = Vec::new();
    let mut roots = Vec::new();

    for path in paths {
        let key = canonical_key(&path);
        if keys.contains(&key) {
            continue;
        }
        keys.push(key);
        roots.push(path);
    }

    roots
}

/// Key used to detect two registrations of the same directory.
///
/// Existing directories are canonicalized (symlinks resolved); directories that
/// cannot be resolved fall back to lexical normalization.
pub(crate) fn canonical_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| normalize_lexically(path))
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` never climbs above the filesystem root.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

// =============================================================================
// Tests
// =============================================================================
