//! Settings file and directory providers.
//!
//! The settings file is a small JSON document:
//!
//! ```json
//! {
//!     "log_level": "info",
//!     "image_directories": [
//!         "/home/me/Pictures",
//!         "/mnt/renders"
//!     ]
//! }
//! ```
//!
//! Unknown keys are ignored, so files written by older desktop builds (which
//! also stored window geometry) still load. [`SettingsStore::open`] creates a
//! missing file with defaults; [`SettingsStore::open_existing`] never writes.
//!
//! Without `--config` the file lives at `<config dir>/StableKeepr/config.json`,
//! where the config dir is platform specific (`$XDG_CONFIG_HOME` or
//! `~/.config` on Linux, `~/Library/Application Support` on macOS,
//! `%APPDATA%` on Windows).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ConfigError, RegistryError};
use crate::registry::{dedup_roots, DirectoryRegistry, DirectorySource};

/// Log level written into new settings files.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Directory below the platform config dir that holds the settings file.
pub const SETTINGS_DIR_NAME: &str = "StableKeepr";

/// File name of the settings file.
pub const SETTINGS_FILE_NAME: &str = "config.json";

/// Settings file location used when `--config` is not given.
///
/// `None` when the platform has no per-user config directory.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
}

// =============================================================================
// Settings
// =============================================================================

/// Contents of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default tracing level when neither `RUST_LOG` nor `--verbose` is set
    pub log_level: String,

    /// Registered root directories, in index order
    pub image_directories: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            image_directories: Vec::new(),
        }
    }
}

impl Settings {
    /// Serialize with four-space indentation.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(buf)
    }
}

// =============================================================================
// SettingsStore
// =============================================================================

/// JSON settings file on disk.
pub struct SettingsStore {
    path: PathBuf,

    /// Serializes read-modify-write cycles from `add_directory`
    write_lock: Mutex<()>,
}

impl SettingsStore {
    fn at(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Open the settings file at `path`, creating it with defaults if missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let store = Self::at(path.into());

        match tokio::fs::metadata(&store.path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| io_error(parent, e))?;
                }
                store.save(&Settings::default()).await?;
                info!("Created settings file {}", store.path.display());
            }
            Err(e) => return Err(io_error(&store.path, e)),
        }

        Ok(store)
    }

    /// Open the settings file at `path` without creating anything.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file is missing or is not a regular file.
    pub async fn open_existing(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Self::at(path)),
            Ok(_) => Err(ConfigError::Io {
                path,
                message: "not a file".to_string(),
            }),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the settings file.
    pub async fn load(&self) -> Result<Settings, ConfigError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        serde_json::from_slice(&raw).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Write the settings file, replacing it atomically.
    pub async fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let json = settings.to_json().map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

#[async_trait]
impl DirectorySource for SettingsStore {
    async fn list_root_directories(&self) -> Result<Vec<PathBuf>, ConfigError> {
        Ok(self.load().await?.image_directories)
    }

    async fn add_directory(&self, path: &Path) -> Result<usize, ConfigError> {
        let _guard = self.write_lock.lock().await;

        let directory = canonical_directory(path).await?;
        let mut settings = self.load().await?;

        let current = DirectoryRegistry::new(settings.image_directories.iter().cloned())?;
        if let Some(existing_index) = current.position_of(&directory) {
            return Err(RegistryError::Duplicate {
                path: directory,
                existing_index,
            }
            .into());
        }

        settings.image_directories.push(directory.clone());
        self.save(&settings).await?;

        let index = settings.image_directories.len() - 1;
        info!(index, "Registered directory {}", directory.display());
        Ok(index)
    }
}

// =============================================================================
// ConfiguredDirectories
// =============================================================================

/// Directories from an optional settings file followed by command-line ones.
///
/// Settings-file directories keep their indices; command-line directories are
/// appended after them, skipping any that are already registered.
pub struct ConfiguredDirectories {
    store: Option<SettingsStore>,
    extra: Vec<PathBuf>,
}

impl ConfiguredDirectories {
    /// Open the settings file (if any), creating it when missing, and
    /// canonicalize the extra directories.
    pub async fn open(settings: Option<&Path>, extra: &[PathBuf]) -> Result<Self, ConfigError> {
        let store = match settings {
            Some(path) => Some(SettingsStore::open(path).await?),
            None => None,
        };
        Self::with_extra(store, extra).await
    }

    /// Like [`ConfiguredDirectories::open`], but fails instead of creating a
    /// missing settings file.
    pub async fn open_existing(
        settings: Option<&Path>,
        extra: &[PathBuf],
    ) -> Result<Self, ConfigError> {
        let store = match settings {
            Some(path) => Some(SettingsStore::open_existing(path).await?),
            None => None,
        };
        Self::with_extra(store, extra).await
    }

    async fn with_extra(store: Option<SettingsStore>, extra: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut canonical = Vec::with_capacity(extra.len());
        for dir in extra {
            canonical.push(canonical_directory(dir).await?);
        }

        Ok(Self {
            store,
            extra: canonical,
        })
    }

    /// Build from parts without touching the filesystem.
    pub fn from_parts(store: Option<SettingsStore>, extra: Vec<PathBuf>) -> Self {
        Self { store, extra }
    }

    /// The backing settings file, if one was given.
    pub fn store(&self) -> Option<&SettingsStore> {
        self.store.as_ref()
    }

    /// Log level from the settings file, if one was given.
    pub async fn log_level(&self) -> Option<String> {
        match &self.store {
            Some(store) => store.load().await.ok().map(|s| s.log_level),
            None => None,
        }
    }
}

#[async_trait]
impl DirectorySource for ConfiguredDirectories {
    async fn list_root_directories(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut roots = match &self.store {
            Some(store) => store.list_root_directories().await?,
            None => Vec::new(),
        };
        roots.extend(self.extra.iter().cloned());
        Ok(dedup_roots(roots))
    }

    async fn add_directory(&self, path: &Path) -> Result<usize, ConfigError> {
        match &self.store {
            Some(store) => store.add_directory(path).await,
            None => Err(ConfigError::ReadOnly(
                "no settings file configured; pass --config to persist directories".to_string(),
            )),
        }
    }
}

/// Absolute, symlink-free form of an existing directory.
async fn canonical_directory(path: &Path) -> Result<PathBuf, ConfigError> {
    let canonical = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| io_error(path, e))?;

    let meta = tokio::fs::metadata(&canonical)
        .await
        .map_err(|e| io_error(&canonical, e))?;
    if !meta.is_dir() {
        return Err(ConfigError::Io {
            path: canonical,
            message: "not a directory".to_string(),
        });
    }

    Ok(canonical)
}

fn io_error(path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
