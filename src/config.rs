//! Configuration management for keepr-assets.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `KEEPR_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use keepr_assets::config::{Cli, Command};
//!
//! // Parse from command line and environment
//! let cli = Cli::parse();
//!
//! if let Command::Serve(config) = cli.command {
//!     println!("Listening on {}", config.bind_address());
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `KEEPR_HOST` - Server bind address, must be loopback (default: 127.0.0.1)
//! - `KEEPR_PORT` - Server port (default: 3000)
//! - `KEEPR_CONFIG` - Settings file listing root directories
//!   (default: `<config dir>/StableKeepr/config.json`)
//! - `KEEPR_DIRS` - Extra root directories (comma-separated)
//! - `KEEPR_MAX_WIDTH` - Largest accepted `width` parameter (default: 8192)
//! - `KEEPR_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::asset::DEFAULT_MAX_WIDTH;
use crate::settings::default_settings_path;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// keepr-assets - A loopback asset server for image directories.
///
/// Serves files from registered root directories as `/{index}/{path}`, with
/// optional `?width=N` PNG downscaling.
#[derive(Parser, Debug, Clone)]
#[command(name = "keepr-assets")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the CLI and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the asset server.
    Serve(ServeConfig),

    /// Print every addressable file under the registered directories.
    List(ListConfig),

    /// Register a directory in the settings file.
    AddDir(AddDirConfig),
}

/// Where the list of root directories comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct DirectoryArgs {
    /// Settings file (JSON) listing root directories.
    ///
    /// Defaults to `StableKeepr/config.json` in the platform config directory.
    /// `serve` creates it with defaults if it does not exist.
    #[arg(long, env = "KEEPR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ignore the default settings file and use only `--dir`.
    #[arg(long, default_value_t = false, conflicts_with = "config")]
    pub no_default_config: bool,

    /// Extra root directory, appended after those in the settings file.
    ///
    /// May be given several times.
    #[arg(long = "dir", env = "KEEPR_DIRS", value_delimiter = ',')]
    pub dirs: Vec<PathBuf>,
}

impl DirectoryArgs {
    /// Settings file to use: `--config`, else the platform default.
    pub fn settings_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None if self.no_default_config => None,
            None => default_settings_path(),
        }
    }

    /// Whether `--config` named the settings file explicitly.
    pub fn has_explicit_config(&self) -> bool {
        self.config.is_some()
    }

    /// Whether any directory source is available.
    pub fn has_source(&self) -> bool {
        self.settings_path().is_some() || !self.dirs.is_empty()
    }
}

// =============================================================================
// Serve
// =============================================================================

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to (loopback only).
    #[arg(long, default_value = DEFAULT_HOST, env = "KEEPR_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "KEEPR_PORT")]
    pub port: u16,

    // =========================================================================
    // Directory Configuration
    // =========================================================================
    #[command(flatten)]
    pub directories: DirectoryArgs,

    // =========================================================================
    // Resize Configuration
    // =========================================================================
    /// Largest `width` a client may request.
    #[arg(long, default_value_t = DEFAULT_MAX_WIDTH, env = "KEEPR_MAX_WIDTH")]
    pub max_width: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "KEEPR_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !is_loopback_host(&self.host) {
            return Err(format!(
                "Host '{}' is not a loopback address. The asset server only binds to \
                 127.0.0.1, ::1 or localhost",
                self.host
            ));
        }

        if self.max_width == 0 {
            return Err("max_width must be greater than 0".to_string());
        }

        if !self.directories.has_source() {
            return Err(
                "No directories configured and no default settings location. \
                 Set --config (KEEPR_CONFIG) or --dir (KEEPR_DIRS)"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Whether `host` names the local machine.
pub fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

// =============================================================================
// List
// =============================================================================

/// Options for `list`.
#[derive(Args, Debug, Clone)]
pub struct ListConfig {
    #[command(flatten)]
    pub directories: DirectoryArgs,

    /// Print JSON instead of one request path per line.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ListConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.directories.has_source() {
            return Err(
                "No directories configured and no default settings location. \
                 Set --config (KEEPR_CONFIG) or --dir (KEEPR_DIRS)"
                    .to_string(),
            );
        }
        Ok(())
    }
}

// =============================================================================
// AddDir
// =============================================================================

/// Options for `add-dir`.
#[derive(Args, Debug, Clone)]
pub struct AddDirConfig {
    /// Settings file to add the directory to.
    ///
    /// Defaults to `StableKeepr/config.json` in the platform config directory.
    #[arg(long, env = "KEEPR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to register.
    pub path: PathBuf,
}

impl AddDirConfig {
    /// Settings file to write: `--config`, else the platform default.
    pub fn settings_path(&self) -> Result<PathBuf, String> {
        self.config
            .clone()
            .or_else(default_settings_path)
            .ok_or_else(|| {
                "No default settings location on this platform. Set --config (KEEPR_CONFIG)"
                    .to_string()
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
