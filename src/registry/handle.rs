//! Atomically swappable view of the directory registry.
//!
//! Requests read the registry through [`RegistryHandle::snapshot`], which hands
//! out an `Arc` to the registry that was current when the request started. A
//! reload builds a fresh [`DirectoryRegistry`] and swaps it in whole, so a
//! request that already holds a snapshot keeps resolving against the roots it
//! captured.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ConfigError;

use super::DirectoryRegistry;

// =============================================================================
// DirectorySource Trait
// =============================================================================

/// Configuration provider that owns the list of root directories.
///
/// The registry never persists anything itself; it only consumes the ordered
/// list this trait returns.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Ordered list of absolute root directories.
    async fn list_root_directories(&self) -> Result<Vec<PathBuf>, ConfigError>;

    /// Register a new root directory.
    ///
    /// Returns the index the directory will occupy after the next reload.
    async fn add_directory(&self, path: &Path) -> Result<usize, ConfigError>;
}

// =============================================================================
// RegistryHandle
// =============================================================================

/// Cloneable handle to the current registry snapshot.
#[derive(Clone)]
pub struct RegistryHandle {
    current: Arc<ArcSwap<DirectoryRegistry>>,
}

impl RegistryHandle {
    /// Create a handle holding the given registry.
    pub fn new(registry: DirectoryRegistry) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(registry)),
        }
    }

    /// The registry that is current right now.
    #[inline]
    pub fn snapshot(&self) -> Arc<DirectoryRegistry> {
        self.current.load_full()
    }

    /// Replace the whole registry.
    ///
    /// Returns the snapshot that was replaced.
    pub fn replace(&self, registry: DirectoryRegistry) -> Arc<DirectoryRegistry> {
        self.current.swap(Arc::new(registry))
    }

    /// Rebuild the registry from a configuration provider and swap it in.
    ///
    /// On error the current registry is left untouched.
    pub async fn reload_from<D>(&self, source: &D) -> Result<Arc<DirectoryRegistry>, ConfigError>
    where
        D: DirectorySource + ?Sized,
    {
        let roots = source.list_root_directories().await?;
        let registry = Arc::new(DirectoryRegistry::new(roots)?);

        let previous = self.current.swap(Arc::clone(&registry));
        debug!(
            previous = previous.count(),
            current = registry.count(),
            "Swapped directory registry"
        );
        info!("Directory registry reloaded: {} root(s)", registry.count());

        Ok(registry)
    }
}

impl std::fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("current", &self.current.load())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
