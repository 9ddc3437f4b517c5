//! Reusable City API server runtime.
//!
//! [`ServerHandle`] owns the full server lifecycle: storage backend
//! selection, migrations, the REST API, metrics and graceful shutdown.

use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{CityRepository, CityUseCase};
use crate::config::{AppConfig, StorageBackend};
use crate::domain::CityStore;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, DatabaseConfig, InMemoryCityStore, SeaOrmCityStore};
use crate::interfaces::http::create_api_router;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the City API.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (sqlite backend only).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running City API server.
///
/// ```rust,no_run
/// use city_api::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub usecase: Arc<CityUseCase>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the API is bound to; the port is real even when configured as 0.
    pub local_addr: std::net::SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Start the server with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus metrics recorder
    /// 2. Open the storage backend (and migrate it, for sqlite)
    /// 3. Bind the REST API (with Swagger UI) and serve it in the background
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;

        info!("Starting City API...");

        let prometheus_handle = prometheus_handle();

        let (store, db) = open_store(&app_cfg, opts.auto_migrate).await?;
        let backend = app_cfg.storage.backend;

        let usecase = Arc::new(CityUseCase::new(CityRepository::new(store)));

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let api_router = create_api_router(usecase.clone(), backend.as_str(), prometheus_handle);

        let api_addr = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/api-docs/", local_addr);

        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            shutdown_signal.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            usecase,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown without waiting for it.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop once shutdown has been triggered.
    ///
    /// In-flight requests get `shutdown_timeout` seconds to drain.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(|| async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task panicked: {}", e),
                }
            })
            .await;
        if !drained {
            warn!("REST API server did not drain in time");
        }

        if let Some(db) = db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("City API shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down City API...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process, so restarts reuse it.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                error!("Failed to install Prometheus metrics recorder: {}", e);
                None
            }
        })
        .clone()
}

/// Open the configured storage backend.
///
/// The connection is returned alongside the store so it can be closed on shutdown.
pub async fn open_store(
    config: &AppConfig,
    auto_migrate: bool,
) -> Result<(Arc<dyn CityStore>, Option<DatabaseConnection>), Box<dyn std::error::Error>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Storage: in-memory (data is lost on exit)");
            Ok((Arc::new(InMemoryCityStore::new()), None))
        }
        StorageBackend::Sqlite => {
            let db = init_database(&DatabaseConfig::new(config.storage.url.clone())).await?;
            if auto_migrate {
                info!("Running database migrations...");
                Migrator::up(&db, None).await?;
                info!("Migrations completed");
            }
            Ok((Arc::new(SeaOrmCityStore::new(db.clone())), Some(db)))
        }
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::NewCity;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.server.shutdown_timeout = 5;
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[tokio::test]
    async fn starts_and_shuts_down_with_memory_backend() {
        let handle = ServerHandle::start(ServerOptions {
            config: memory_config(),
            auto_migrate: false,
        })
        .await
        .unwrap();

        assert_ne!(handle.local_addr.port(), 0);
        assert!(handle.is_running());

        tokio::time::timeout(Duration::from_secs(10), handle.shutdown())
            .await
            .expect("server should stop");
    }

    #[tokio::test]
    async fn sqlite_store_is_migrated_on_open() {
        let mut config = memory_config();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.url = "sqlite::memory:".to_string();

        let (store, db) = open_store(&config, true).await.unwrap();
        assert!(db.is_some());

        let usecase = CityUseCase::new(CityRepository::new(store));
        let city = usecase
            .create(NewCity {
                name: "Oslo".into(),
                population: 709_037,
                country: "Norway".into(),
                latitude: 59.9139,
                longitude: 10.7522,
            })
            .await
            .unwrap();
        assert_eq!(usecase.get(&city.id).await.unwrap().name, "Oslo");
    }
}
