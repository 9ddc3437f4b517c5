//! # City API
//!
//! REST service for managing city records: create, update, delete and
//! list with free-text search, Mongo-style filters, sorting, projection
//! and pagination.
//!
//! ## Architecture
//!
//! - **domain**: the `City` entity, the query AST and the `CityStore` port
//! - **application**: the repository facade and the city use case
//! - **infrastructure**: in-memory and SQLite (SeaORM) stores
//! - **interfaces**: axum HTTP layer with OpenAPI documentation
//! - **shared**: pagination helpers and graceful shutdown
//! - **server**: runtime bootstrap shared by the binary and tests

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig, InMemoryCityStore, SeaOrmCityStore};

pub use interfaces::http::create_api_router;
