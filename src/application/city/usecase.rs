//! City use cases: uniqueness and existence rules around the repository

use chrono::{SubsecRound, Utc};
use tracing::info;
use uuid::Uuid;

use super::repository::{CityRepository, ListQuery, ListResult};
use crate::domain::city::{City, CityPatch, NewCity, ENTITY};
use crate::domain::{DomainError, DomainResult};

fn record_write(op: &'static str) {
    metrics::counter!("city_writes_total", "op" => op).increment(1);
}

/// City service. HTTP handlers are thin wrappers over these operations.
pub struct CityUseCase {
    repo: CityRepository,
}

impl CityUseCase {
    pub fn new(repo: CityRepository) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: NewCity) -> DomainResult<City> {
        if self.repo.find_by_name(&input.name).await?.is_some() {
            return Err(DomainError::duplicate_name(ENTITY, input.name));
        }

        let now = Utc::now().trunc_subsecs(3);
        let city = self
            .repo
            .create(input.into_city(Uuid::new_v4().to_string(), now))
            .await?;

        record_write("create");
        info!(id = %city.id, name = %city.name, "City created");
        Ok(city)
    }

    pub async fn update(&self, id: &str, patch: CityPatch) -> DomainResult<City> {
        let Some(current) = self.repo.find_by_id(id).await? else {
            return Err(DomainError::not_found(ENTITY, id));
        };

        match patch.name.as_deref() {
            Some(new_name) if new_name != current.name => {
                if self.repo.find_by_name(new_name).await?.is_some() {
                    return Err(DomainError::duplicate_name(ENTITY, new_name));
                }
            }
            _ => {}
        }

        let city = self
            .repo
            .update(id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))?;

        record_write("update");
        info!(id = %city.id, "City updated");
        Ok(city)
    }

    pub async fn delete(&self, id: &str) -> DomainResult<City> {
        if self.repo.find_by_id(id).await?.is_none() {
            return Err(DomainError::not_found(ENTITY, id));
        }

        let city = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))?;

        record_write("delete");
        info!(id = %city.id, "City deleted");
        Ok(city)
    }

    pub async fn get(&self, id: &str) -> DomainResult<City> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))
    }

    pub async fn list(&self, params: ListQuery) -> DomainResult<ListResult> {
        self.repo.get_all(params).await
    }

    /// Storage liveness probe for health checks
    pub async fn ping(&self) -> DomainResult<()> {
        self.repo.ping().await
    }
}
