//! In-memory city store

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::matcher::{compare_fields, CompiledQuery};
use crate::domain::city::{City, CityPatch, CityStore, ENTITY};
use crate::domain::query::{Document, FindOptions, Query, SortOrder};
use crate::domain::{DomainError, DomainResult};

struct Stored {
    seq: u64,
    city: City,
}

/// In-memory storage for development and testing.
///
/// A name index gives atomic uniqueness; insertion sequence numbers give a
/// stable natural order and break sort ties.
pub struct InMemoryCityStore {
    cities: DashMap<String, Stored>,
    names: DashMap<String, String>,
    sequence: AtomicU64,
}

impl InMemoryCityStore {
    pub fn new() -> Self {
        Self {
            cities: DashMap::new(),
            names: DashMap::new(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    fn matching(&self, query: &Query) -> DomainResult<Vec<(u64, Document)>> {
        let compiled = CompiledQuery::compile(query)?;
        Ok(self
            .cities
            .iter()
            .map(|entry| (entry.seq, entry.city.to_document()))
            .filter(|(_, doc)| compiled.matches(doc))
            .collect())
    }
}

impl Default for InMemoryCityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CityStore for InMemoryCityStore {
    async fn insert(&self, city: City) -> DomainResult<City> {
        match self.names.entry(city.name.clone()) {
            Entry::Occupied(_) => return Err(DomainError::duplicate_name(ENTITY, city.name)),
            Entry::Vacant(slot) => {
                slot.insert(city.id.clone());
            }
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.cities.insert(
            city.id.clone(),
            Stored {
                seq,
                city: city.clone(),
            },
        );
        Ok(city)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<City>> {
        Ok(self.cities.get(id).map(|s| s.city.clone()))
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<City>> {
        let Some(id) = self.names.get(name).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn update(&self, id: &str, patch: CityPatch) -> DomainResult<Option<City>> {
        let Some(mut stored) = self.cities.get_mut(id) else {
            return Ok(None);
        };

        if let Some(new_name) = patch.name.as_ref().filter(|n| **n != stored.city.name) {
            match self.names.entry(new_name.clone()) {
                Entry::Occupied(_) => return Err(DomainError::duplicate_name(ENTITY, new_name.clone())),
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
            self.names.remove(&stored.city.name);
        }

        stored.city.apply(patch, Utc::now().trunc_subsecs(3));
        Ok(Some(stored.city.clone()))
    }

    async fn delete(&self, id: &str) -> DomainResult<Option<City>> {
        let Some((_, stored)) = self.cities.remove(id) else {
            return Ok(None);
        };
        self.names.remove(&stored.city.name);
        Ok(Some(stored.city))
    }

    async fn count(&self, query: &Query) -> DomainResult<u64> {
        Ok(self.matching(query)?.len() as u64)
    }

    async fn find(&self, query: &Query, options: &FindOptions) -> DomainResult<Vec<Document>> {
        let mut rows = self.matching(query)?;

        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            let by_field = options.sort.as_ref().map(|sort| {
                let ord = compare_fields(a.get(&sort.field), b.get(&sort.field));
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
            by_field
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(seq_a.cmp(seq_b))
        });

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = match options.limit {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, doc)| match &options.projection {
                Some(projection) => projection.apply(doc),
                None => doc,
            })
            .collect())
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{Projection, Sort};
    use crate::domain::NewCity;
    use serde_json::{json, Value};

    fn city(id: &str, name: &str, population: i64) -> City {
        NewCity {
            name: name.into(),
            population,
            country: "X".into(),
            latitude: 0.0,
            longitude: 0.0,
        }
        .into_city(id.into(), Utc::now())
    }

    async fn store_with(rows: &[(&str, &str, i64)]) -> InMemoryCityStore {
        let store = InMemoryCityStore::new();
        for (id, name, population) in rows {
            store.insert(city(id, name, *population)).await.unwrap();
        }
        store
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().filter_map(|d| d.get("_id").and_then(Value::as_str)).collect()
    }

    #[tokio::test]
    async fn name_index_rejects_duplicates() {
        let store = store_with(&[("1", "Tokyo", 1)]).await;
        let err = store.insert(city("2", "Tokyo", 2)).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateName { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rename_moves_the_name_index() {
        let store = store_with(&[("1", "Tokyo", 1), ("2", "Paris", 2)]).await;

        let patch = CityPatch {
            name: Some("Kyoto".into()),
            ..Default::default()
        };
        let updated = store.update("1", patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Kyoto");
        assert!(store.find_by_name("Tokyo").await.unwrap().is_none());
        assert_eq!(store.find_by_name("Kyoto").await.unwrap().unwrap().id, "1");

        let clash = CityPatch {
            name: Some("Paris".into()),
            ..Default::default()
        };
        assert!(store.update("1", clash).await.is_err());
        assert_eq!(store.find_by_id("1").await.unwrap().unwrap().name, "Kyoto");
    }

    #[tokio::test]
    async fn delete_frees_the_name() {
        let store = store_with(&[("1", "Tokyo", 1)]).await;
        assert_eq!(store.delete("1").await.unwrap().unwrap().id, "1");
        assert!(store.delete("1").await.unwrap().is_none());
        assert!(store.is_empty());
        store.insert(city("3", "Tokyo", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn update_unknown_id_returns_none() {
        let store = InMemoryCityStore::new();
        assert!(store.update("nope", CityPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_sorts_skips_limits_and_projects() {
        let store = store_with(&[("a", "A", 30), ("b", "B", 10), ("c", "C", 20), ("d", "D", 20)]).await;

        let options = FindOptions {
            sort: Some(Sort::new("population", SortOrder::Desc)),
            skip: 1,
            limit: 2,
            projection: Projection::from_json(&json!({"population": 1})).unwrap(),
        };
        let docs = store.find(&Query::new(), &options).await.unwrap();
        assert_eq!(ids(&docs), ["c", "d"]);
        assert_eq!(Value::Object(docs[0].clone()), json!({"_id": "c", "population": 20}));
    }

    #[tokio::test]
    async fn count_and_find_agree_on_filters() {
        let store = store_with(&[("a", "Alpha", 5), ("b", "Beta", 50), ("c", "Gamma", 500)]).await;
        let query = Query::from_json(&json!({"population": {"$gte": 50}})).unwrap();
        assert_eq!(store.count(&query).await.unwrap(), 2);
        let docs = store.find(&query, &FindOptions::default()).await.unwrap();
        assert_eq!(ids(&docs), ["b", "c"]);
    }

    #[tokio::test]
    async fn invalid_regex_is_malformed_input() {
        let store = store_with(&[("a", "Alpha", 5)]).await;
        let query = Query::from_json(&json!({"name": {"$regex": "["}})).unwrap();
        assert!(matches!(
            store.count(&query).await,
            Err(DomainError::MalformedInput(_))
        ));
    }
}
