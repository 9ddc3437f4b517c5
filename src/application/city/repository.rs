//! Query composition over the city store
//!
//! Builds the effective query from the explicit filter and the free-text
//! search term, counts, fetches and attaches pagination metadata.

use std::sync::Arc;

use tracing::debug;

use crate::domain::city::{fields, City, CityPatch, CityStore};
use crate::domain::query::{
    build_search_query, Document, FindOptions, Projection, Query, Sort, SortOrder,
};
use crate::domain::DomainResult;
use crate::shared::types::pagination::{paginate, resolve_limit, PaginationMetadata};

/// Caller-supplied listing parameters.
///
/// `page` and `limit` stay raw so that integer-prefix parsing and the
/// fallback defaults are applied in one place.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search_key: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub filter: Option<Query>,
    pub projection: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListResult {
    pub data: Vec<Document>,
    /// Present only when both page and limit were supplied
    pub metadata: Option<PaginationMetadata>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl ListQuery {
    /// Explicit filter with the search disjunction merged over it.
    pub fn effective_query(&self) -> Query {
        let filter = self.filter.clone().unwrap_or_default();
        match present(&self.search_key) {
            Some(term) => filter.merge(build_search_query(term, &City::schema())),
            None => filter,
        }
    }

    fn sort(&self) -> Sort {
        let field = present(&self.sort_by).unwrap_or(fields::NAME);
        Sort::new(field, SortOrder::parse(self.order.as_deref()))
    }
}

/// City repository: CRUD delegation plus composed listing
#[derive(Clone)]
pub struct CityRepository {
    store: Arc<dyn CityStore>,
}

impl CityRepository {
    pub fn new(store: Arc<dyn CityStore>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self, params: ListQuery) -> DomainResult<ListResult> {
        let query = params.effective_query();
        debug!(query = %query, "Listing cities");

        let total_items = self.store.count(&query).await?;

        let page = present(&params.page);
        let limit = present(&params.limit);

        let metadata = match (page, limit) {
            (Some(_), Some(_)) => Some(paginate(Vec::<()>::new(), page, limit, total_items, false).metadata),
            _ => None,
        };

        let (skip, limit) = match (metadata, limit) {
            (Some(meta), _) => (meta.offset(), meta.items_per_page),
            (None, Some(raw)) => (0, resolve_limit(Some(raw))),
            (None, None) => (0, 0),
        };

        let options = FindOptions {
            sort: Some(params.sort()),
            skip,
            limit,
            projection: params.projection.clone(),
        };
        let data = self.store.find(&query, &options).await?;

        Ok(ListResult { data, metadata })
    }

    pub async fn create(&self, city: City) -> DomainResult<City> {
        self.store.insert(city).await
    }

    pub async fn find_by_name(&self, name: &str) -> DomainResult<Option<City>> {
        self.store.find_by_name(name).await
    }

    pub async fn find_by_id(&self, id: &str) -> DomainResult<Option<City>> {
        self.store.find_by_id(id).await
    }

    pub async fn update(&self, id: &str, patch: CityPatch) -> DomainResult<Option<City>> {
        self.store.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> DomainResult<Option<City>> {
        self.store.delete(id).await
    }

    pub async fn ping(&self) -> DomainResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewCity;
    use crate::infrastructure::storage::InMemoryCityStore;
    use chrono::Utc;
    use serde_json::{json, Value};

    async fn seeded() -> CityRepository {
        let store = Arc::new(InMemoryCityStore::new());
        let repo = CityRepository::new(store);
        let rows = [
            ("Tokyo", 37_400_068, "Japan", 35.6895, 139.6917),
            ("Osaka", 19_281_000, "Japan", 34.6937, 135.5023),
            ("Paris", 11_017_000, "France", 48.8566, 2.3522),
            ("Lyon", 42, "France", 45.764, 4.8357),
            ("Berlin", 3_645_000, "Germany", 52.52, 13.405),
        ];
        for (i, (name, population, country, latitude, longitude)) in rows.into_iter().enumerate() {
            let city = NewCity {
                name: name.into(),
                population,
                country: country.into(),
                latitude,
                longitude,
            }
            .into_city(format!("id-{i}"), Utc::now());
            repo.create(city).await.unwrap();
        }
        repo
    }

    fn names(result: &ListResult) -> Vec<&str> {
        result
            .data
            .iter()
            .filter_map(|d| d.get("name").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn search_overrides_filter_on_collision() {
        let params = ListQuery {
            search_key: Some("to".into()),
            filter: Some(Query::from_json(&json!({"$or": [{"country": "France"}], "country": "Japan"})).unwrap()),
            ..Default::default()
        };
        let q = params.effective_query();
        assert_eq!(
            q.to_json(),
            json!({
                "country": "Japan",
                "$or": [{"name": {"$regex": "to", "$options": "i"}}, {"country": {"$regex": "to", "$options": "i"}}],
            })
        );
    }

    #[test]
    fn empty_search_key_is_ignored() {
        let params = ListQuery {
            search_key: Some(String::new()),
            ..Default::default()
        };
        assert!(params.effective_query().is_empty());
    }

    #[tokio::test]
    async fn lists_everything_sorted_by_name_without_metadata() {
        let repo = seeded().await;
        let result = repo.get_all(ListQuery::default()).await.unwrap();
        assert_eq!(names(&result), ["Berlin", "Lyon", "Osaka", "Paris", "Tokyo"]);
        assert_eq!(result.metadata, None);
    }

    #[tokio::test]
    async fn paginates_with_metadata() {
        let repo = seeded().await;
        let result = repo
            .get_all(ListQuery {
                page: Some("2".into()),
                limit: Some("2".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&result), ["Osaka", "Paris"]);
        assert_eq!(result.metadata, Some(PaginationMetadata::new(2, 2, 5)));
    }

    #[tokio::test]
    async fn limit_alone_caps_without_metadata() {
        let repo = seeded().await;
        let result = repo
            .get_all(ListQuery {
                limit: Some("3".into()),
                sort_by: Some("population".into()),
                order: Some("desc".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&result), ["Tokyo", "Osaka", "Paris"]);
        assert_eq!(result.metadata, None);
    }

    #[tokio::test]
    async fn invalid_page_values_use_defaults() {
        let repo = seeded().await;
        let result = repo
            .get_all(ListQuery {
                page: Some("-3".into()),
                limit: Some("abc".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.data.len(), 5);
        assert_eq!(result.metadata, Some(PaginationMetadata::new(1, 10, 5)));
    }

    #[tokio::test]
    async fn numeric_search_hits_number_fields() {
        let repo = seeded().await;
        let result = repo
            .get_all(ListQuery {
                search_key: Some("42".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&result), ["Lyon"]);
    }

    #[tokio::test]
    async fn filter_search_and_projection_compose() {
        let repo = seeded().await;
        let result = repo
            .get_all(ListQuery {
                search_key: Some("a".into()),
                filter: Some(Query::from_json(&json!({"country": "Japan"})).unwrap()),
                projection: Projection::from_json(&json!({"name": 1, "_id": 0})).unwrap(),
                page: Some("1".into()),
                limit: Some("5".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            result.data.into_iter().map(Value::Object).collect::<Vec<_>>(),
            vec![json!({"name": "Osaka"}), json!({"name": "Tokyo"})]
        );
        assert_eq!(result.metadata.map(|m| m.total_items), Some(2));
    }
}
