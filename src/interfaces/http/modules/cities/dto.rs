//! City DTOs

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::ListQuery;
use crate::domain::city::{City, CityPatch, NewCity};
use crate::domain::query::{parse_json_param, Projection, Query};
use crate::domain::DomainResult;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CityDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub population: i64,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<City> for CityDto {
    fn from(c: City) -> Self {
        Self {
            id: c.id,
            name: c.name,
            population: c.population,
            country: c.country,
            latitude: c.latitude,
            longitude: c.longitude,
            created_at: c.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: c.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCityRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Head count; fractional values are rejected
    #[validate(range(min = 0))]
    pub population: i64,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl From<CreateCityRequest> for NewCity {
    fn from(r: CreateCityRequest) -> Self {
        Self {
            name: r.name,
            population: r.population,
            country: r.country,
            latitude: r.latitude,
            longitude: r.longitude,
        }
    }
}

/// Partial update; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCityRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub population: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl From<UpdateCityRequest> for CityPatch {
    fn from(r: UpdateCityRequest) -> Self {
        Self {
            name: r.name,
            population: r.population,
            country: r.country,
            latitude: r.latitude,
            longitude: r.longitude,
        }
    }
}

/// Listing parameters; `page` and `limit` are kept raw and resolved leniently
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListCitiesParams {
    /// Free-text term matched against every string and number field
    pub search_key: Option<String>,
    /// Page number, 1-based (default 1)
    pub page: Option<String>,
    /// Items per page (default 10)
    pub limit: Option<String>,
    /// Field to sort by (default `name`)
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub order: Option<String>,
    /// JSON filter, e.g. `{"country":"Japan","population":{"$gt":1000000}}`
    pub filter: Option<String>,
    /// JSON projection, e.g. `{"name":1,"country":1}` or `"name -_id"`
    pub projection: Option<String>,
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

impl ListCitiesParams {
    pub fn into_list_query(self) -> DomainResult<ListQuery> {
        let filter = match non_empty(&self.filter) {
            Some(raw) => Some(Query::from_json(&parse_json_param("filter", raw)?)?),
            None => None,
        };
        let projection = match non_empty(&self.projection) {
            Some(raw) => Projection::from_json(&parse_json_param("projection", raw)?)?,
            None => None,
        };

        Ok(ListQuery {
            search_key: self.search_key,
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by,
            order: self.order,
            filter,
            projection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn parses_filter_and_projection() {
        let params = ListCitiesParams {
            filter: Some(r#"{"country":"Japan"}"#.into()),
            projection: Some(r#"{"name":1}"#.into()),
            ..Default::default()
        };
        let query = params.into_list_query().unwrap();
        assert_eq!(query.filter.map(|q| q.len()), Some(1));
        assert!(query.projection.is_some());
    }

    #[test]
    fn empty_strings_are_absent() {
        let params = ListCitiesParams {
            filter: Some(String::new()),
            projection: Some(String::new()),
            ..Default::default()
        };
        let query = params.into_list_query().unwrap();
        assert!(query.filter.is_none());
        assert!(query.projection.is_none());
    }

    #[test]
    fn malformed_json_is_malformed_input() {
        let params = ListCitiesParams {
            filter: Some("{country:".into()),
            ..Default::default()
        };
        assert!(matches!(
            params.into_list_query(),
            Err(DomainError::MalformedInput(_))
        ));
    }

    #[test]
    fn update_validation_checks_present_fields_only() {
        assert!(UpdateCityRequest::default().validate().is_ok());
        let bad = UpdateCityRequest {
            longitude: Some(200.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
