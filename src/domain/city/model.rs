//! City domain entity

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::domain::query::{Document, FieldType, Schema};

pub const ENTITY: &str = "City";

/// Document field names
pub mod fields {
    pub const ID: &str = "_id";
    pub const NAME: &str = "name";
    pub const POPULATION: &str = "population";
    pub const COUNTRY: &str = "country";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// A stored city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub population: i64,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Fixed-width RFC 3339 so lexical order equals chronological order.
fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl City {
    /// Declared field types, in document order
    pub fn schema() -> Schema {
        Schema::new()
            .field(fields::ID, FieldType::Other)
            .field(fields::NAME, FieldType::String)
            .field(fields::POPULATION, FieldType::Number)
            .field(fields::COUNTRY, FieldType::String)
            .field(fields::LATITUDE, FieldType::Number)
            .field(fields::LONGITUDE, FieldType::Number)
            .field(fields::CREATED_AT, FieldType::Other)
            .field(fields::UPDATED_AT, FieldType::Other)
    }

    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }

    /// Apply the present fields of `patch` and bump `updated_at`.
    pub fn apply(&mut self, patch: CityPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(population) = patch.population {
            self.population = population;
        }
        if let Some(country) = patch.country {
            self.country = country;
        }
        if let Some(latitude) = patch.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            self.longitude = longitude;
        }
        self.updated_at = now;
    }
}

/// Fields required to create a city
#[derive(Debug, Clone, PartialEq)]
pub struct NewCity {
    pub name: String,
    pub population: i64,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewCity {
    pub fn into_city(self, id: String, now: DateTime<Utc>) -> City {
        City {
            id,
            name: self.name,
            population: self.population,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityPatch {
    pub name: Option<String>,
    pub population: Option<i64>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
