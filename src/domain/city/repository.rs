//! City store interface

use async_trait::async_trait;

use super::model::{City, CityPatch};
use crate::domain::query::{Document, FindOptions, Query};
use crate::domain::DomainResult;

/// Persistence port for cities.
///
/// Implementations enforce name uniqueness and report a clash as
/// `DomainError::DuplicateName`.
#[async_trait]
pub trait CityStore: Send + Sync {
    async fn insert(&self, city: City) -> DomainResult<City>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<City>>;
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<City>>;
    /// Returns the updated record, or `None` when `id` is unknown.
    async fn update(&self, id: &str, patch: CityPatch) -> DomainResult<Option<City>>;
    /// Returns the removed record, or `None` when `id` is unknown.
    async fn delete(&self, id: &str) -> DomainResult<Option<City>>;
    async fn count(&self, query: &Query) -> DomainResult<u64>;
    async fn find(&self, query: &Query, options: &FindOptions) -> DomainResult<Vec<Document>>;
    async fn ping(&self) -> DomainResult<()>;
}
