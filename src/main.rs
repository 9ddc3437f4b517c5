//! City API server
//!
//! ```sh
//! # Run with default config (~/.config/city-api/config.toml)
//! city-api
//!
//! # Custom config path, in-memory storage
//! city-api --config ./config.toml --backend memory
//!
//! # Validate config and storage without serving
//! city-api --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use city_api::config::{AppConfig, StorageBackend};
use city_api::server::{init_tracing, open_store, ServerHandle, ServerOptions};

/// REST API for managing cities.
#[derive(Parser, Debug)]
#[command(
    name = "city-api",
    version,
    about = "City management REST API",
    long_about = "CRUD, search, filtering, sorting and pagination over city records.\n\n\
                  Default config: ~/.config/city-api/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "CITY_API_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the storage backend (memory, sqlite).
    #[arg(short, long)]
    backend: Option<StorageBackend>,

    /// Validate the configuration and storage, then exit without serving.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(city_api::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    config.apply_env_overrides()?;

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        open_store(&config, !cli.no_migrate).await?;
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Address     : {}", config.server.address());
        println!("   Storage     : {}", config.storage.backend);
        if config.storage.backend == StorageBackend::Sqlite {
            println!("   Database    : {}", config.storage.url);
        }
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
