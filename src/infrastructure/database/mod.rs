pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::SeaOrmCityStore;

use std::str::FromStr;
use std::time::Duration;

use sea_orm::{DatabaseConnection, DbErr, SqlxSqliteConnector};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./cities.db?mode=rwc";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./cities.db?mode=rwc")
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Private in-memory database; one pooled connection so every query sees the same data.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Initialize the database connection with the `REGEXP` operator registered.
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    info!("Connecting to database: {}", config.url);

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DbErr::Custom(format!("Invalid database URL '{}': {}", config.url, e)))?
        .with_regexp();

    let mut pool = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));
    if config.is_memory() {
        pool = pool
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }

    let pool = pool
        .connect_with(options)
        .await
        .map_err(|e| DbErr::Custom(format!("Failed to connect: {}", e)))?;

    info!("Database connected successfully");
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}
