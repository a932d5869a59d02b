use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while serving a single asset request.
///
/// Every variant is reported to the client as a plain 404; the variant itself
/// only exists so the failure can be logged with the stage that produced it.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// Request path could not be split into `/{index}/{relative_path}`
    #[error("Malformed request path {path:?}: {reason}")]
    MalformedRequestPath { path: String, reason: &'static str },

    /// Directory index is past the end of the registry
    #[error("Unknown directory index {index} (registry has {count} directories)")]
    UnknownDirectoryIndex { index: usize, count: usize },

    /// Relative path resolves outside its root directory
    #[error("Path escapes root directory: {path:?}")]
    PathEscapesRoot { path: String },

    /// Resolved path does not exist or is not a regular file
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// File exists but could not be read
    #[error("Failed to read {}: {message}", path.display())]
    ReadFailure { path: PathBuf, message: String },

    /// `width` query parameter is not a usable positive integer
    #[error("Invalid width parameter: {value:?}")]
    InvalidWidth { value: String },

    /// Source bytes are not a decodable PNG
    #[error("Failed to decode image: {message}")]
    DecodeFailure { message: String },

    /// Resized image could not be produced or encoded
    #[error("Failed to encode image: {message}")]
    EncodeFailure { message: String },

    /// HTTP response could not be assembled
    #[error("Failed to write response: {message}")]
    WriteFailure { message: String },
}

impl AssetError {
    /// Name of the pipeline stage that produced this error, for logging.
    pub fn stage(&self) -> &'static str {
        match self {
            AssetError::MalformedRequestPath { .. } | AssetError::InvalidWidth { .. } => "parse",
            AssetError::UnknownDirectoryIndex { .. } => "lookup",
            AssetError::PathEscapesRoot { .. } | AssetError::FileNotFound { .. } => "resolve",
            AssetError::ReadFailure { .. } => "read",
            AssetError::DecodeFailure { .. } => "decode",
            AssetError::EncodeFailure { .. } => "encode",
            AssetError::WriteFailure { .. } => "write",
        }
    }

    /// Whether this failure points at a broken file or codec rather than a bad request.
    pub fn is_processing_failure(&self) -> bool {
        matches!(
            self,
            AssetError::ReadFailure { .. }
                | AssetError::DecodeFailure { .. }
                | AssetError::EncodeFailure { .. }
                | AssetError::WriteFailure { .. }
        )
    }
}

/// Errors raised while building a directory registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Root directories must be absolute paths
    #[error("Root directory must be an absolute path: {}", .0.display())]
    NotAbsolute(PathBuf),

    /// Two entries resolve to the same canonical directory
    #[error("Directory {} is already registered at index {existing_index}", path.display())]
    Duplicate { path: PathBuf, existing_index: usize },
}

/// Errors from the configuration layer that supplies root directories.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Settings file could not be read, created or written
    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// Settings file is not valid JSON for the expected schema
    #[error("Invalid settings file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Directory list was rejected by the registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The provider has no backing store to persist new directories into
    #[error("Directory source is read-only: {0}")]
    ReadOnly(String),
}

/// A registered root that could not be walked at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to walk root directory {index} ({}): {message}", root.display())]
pub struct RootWalkError {
    pub index: usize,
    pub root: PathBuf,
    pub message: String,
}
