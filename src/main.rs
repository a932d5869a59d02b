//! keepr-assets - A loopback asset server for image directories.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keepr_assets::{
    config::{AddDirConfig, Cli, Command, DirectoryArgs, ListConfig, ServeConfig},
    enumerate::enumerate_images,
    registry::{DirectoryRegistry, DirectorySource, RegistryHandle},
    server::{create_router, ImagesResponse, RouterConfig},
    settings::{ConfiguredDirectories, SettingsStore, DEFAULT_LOG_LEVEL},
    AssetService, ConfigError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::List(config) => run_list(config).await,
        Command::AddDir(config) => run_add_dir(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        init_logging(config.verbose, None);
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let directories =
        match open_directories(&config.directories, config.verbose, SettingsMode::Create).await {
            Some(directories) => Arc::new(directories),
            None => return ExitCode::FAILURE,
        };

    print_banner();

    info!("Configuration:");
    if let Some(store) = directories.store() {
        info!("  Settings file: {}", store.path().display());
    }
    info!("  Max width: {}", config.max_width);

    // Load the registry
    let registry = RegistryHandle::new(DirectoryRegistry::empty());
    let snapshot = match registry.reload_from(directories.as_ref()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to load directories: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for (index, root) in snapshot.iter() {
        info!("  /{} -> {}", index, root.display());
    }
    if snapshot.is_empty() {
        warn!("  No directories registered; every asset request will 404");
        warn!("  Register one with: keepr-assets add-dir <dir>");
    }

    log_enumeration(Arc::clone(&snapshot)).await;

    #[cfg(unix)]
    spawn_reload_on_sighup(registry.clone(), Arc::clone(&directories));

    let assets = AssetService::new(registry).with_max_width(config.max_width);
    let router = create_router(assets, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/images", addr);
    info!("    curl http://{}/0/<path>?width=320", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██╗  ██╗███████╗███████╗██████╗ ██████╗ ");
    info!("██║ ██╔╝██╔════╝██╔════╝██╔══██╗██╔══██╗");
    info!("█████╔╝ █████╗  █████╗  ██████╔╝██████╔╝");
    info!("██╔═██╗ ██╔══╝  ██╔══╝  ██╔═══╝ ██╔══██╗");
    info!("██║  ██╗███████╗███████╗██║     ██║  ██║");
    info!("╚═╝  ╚═╝╚══════╝╚══════╝╚═╝     ╚═╝  ╚═╝");
    info!("");
    info!("                 assets v{}", version);
}

/// Walk every root once and log what was found.
async fn log_enumeration(snapshot: Arc<DirectoryRegistry>) {
    match tokio::task::spawn_blocking(move || enumerate_images(&snapshot)).await {
        Ok(enumeration) => {
            info!("  Found {} file(s)", enumeration.images.len());
            if !enumeration.is_complete() {
                warn!(
                    "  {} root(s) could not be read",
                    enumeration.failures.len()
                );
            }
        }
        Err(e) => warn!("Image enumeration task failed: {}", e),
    }
}

/// Reload the registry whenever the process receives SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_sighup(registry: RegistryHandle, directories: Arc<ConfiguredDirectories>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("SIGHUP reload unavailable: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading directories");
            match registry.reload_from(directories.as_ref()).await {
                Ok(snapshot) => log_enumeration(snapshot).await,
                Err(e) => error!("Reload failed, keeping previous directories: {}", e),
            }
        }
    });
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// List Command
// =============================================================================

async fn run_list(config: ListConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let directories =
        match open_directories(&config.directories, config.verbose, SettingsMode::ReadOnly).await {
            Some(directories) => directories,
            None => return ExitCode::FAILURE,
        };

    let roots = match directories.list_root_directories().await {
        Ok(roots) => roots,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let registry = match DirectoryRegistry::new(roots) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let enumeration =
        match tokio::task::spawn_blocking(move || enumerate_images(&registry)).await {
            Ok(enumeration) => enumeration,
            Err(e) => {
                eprintln!("Error: enumeration failed: {}", e);
                return ExitCode::FAILURE;
            }
        };

    if config.json {
        match serde_json::to_string_pretty(&ImagesResponse::from(enumeration)) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for image in &enumeration.images {
            println!("{}", image.request_path());
        }
        for failure in &enumeration.failures {
            eprintln!("warning: {}", failure);
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// AddDir Command
// =============================================================================

async fn run_add_dir(config: AddDirConfig) -> ExitCode {
    let path = match config.settings_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match SettingsStore::open(&path).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match store.add_directory(&config.path).await {
        Ok(index) => {
            println!("{}", index);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Shared Setup
// =============================================================================

/// How a command treats a missing settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsMode {
    /// Create it with defaults (`serve`)
    Create,

    /// Never write. A missing `--config` file is an error; a missing default
    /// file is skipped (`list`)
    ReadOnly,
}

/// Open the directory sources and initialise logging from them.
///
/// Logging is configured here because the settings file may carry the
/// default log level.
async fn open_directories(
    args: &DirectoryArgs,
    verbose: bool,
    mode: SettingsMode,
) -> Option<ConfiguredDirectories> {
    let settings = args.settings_path();

    let opened: Result<ConfiguredDirectories, ConfigError> = match mode {
        SettingsMode::Create => ConfiguredDirectories::open(settings.as_deref(), &args.dirs).await,
        SettingsMode::ReadOnly => {
            let settings = match settings {
                Some(path) if !args.has_explicit_config() => {
                    match tokio::fs::try_exists(&path).await {
                        Ok(true) => Some(path),
                        _ => None,
                    }
                }
                other => other,
            };
            ConfiguredDirectories::open_existing(settings.as_deref(), &args.dirs).await
        }
    };

    let level = match &opened {
        Ok(directories) => directories.log_level().await,
        Err(_) => None,
    };
    init_logging(verbose, level.as_deref());

    match opened {
        Ok(directories) => Some(directories),
        Err(e) => {
            error!("Failed to open directory configuration: {}", e);
            None
        }
    }
}

/// Initialize the tracing/logging subsystem.
///
/// `RUST_LOG` wins, then `--verbose`, then the settings file's level.
fn init_logging(verbose: bool, settings_level: Option<&str>) {
    let env_filter = if verbose {
        "keepr_assets=debug,tower_http=debug".to_string()
    } else {
        let level = settings_level.unwrap_or(DEFAULT_LOG_LEVEL);
        format!("keepr_assets={0},tower_http={0}", level)
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&env_filter))
        .unwrap_or_else(|_| "keepr_assets=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
