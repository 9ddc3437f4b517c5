//! City entity for database

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::domain::city::{fields, City};

/// City model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique across the table
    #[sea_orm(unique)]
    pub name: String,

    pub population: i64,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// How a column's values are bound and compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Timestamp,
}

impl Column {
    /// Column backing a document field, if any.
    pub fn for_field(field: &str) -> Option<Self> {
        Some(match field {
            fields::ID => Self::Id,
            fields::NAME => Self::Name,
            fields::POPULATION => Self::Population,
            fields::COUNTRY => Self::Country,
            fields::LATITUDE => Self::Latitude,
            fields::LONGITUDE => Self::Longitude,
            fields::CREATED_AT => Self::CreatedAt,
            fields::UPDATED_AT => Self::UpdatedAt,
            _ => return None,
        })
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Self::Id | Self::Name | Self::Country => ColumnKind::Text,
            Self::Population => ColumnKind::Integer,
            Self::Latitude | Self::Longitude => ColumnKind::Real,
            Self::CreatedAt | Self::UpdatedAt => ColumnKind::Timestamp,
        }
    }
}

impl From<Model> for City {
    fn from(m: Model) -> Self {
        City {
            id: m.id,
            name: m.name,
            population: m.population,
            country: m.country,
            latitude: m.latitude,
            longitude: m.longitude,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<City> for ActiveModel {
    fn from(c: City) -> Self {
        ActiveModel {
            id: Set(c.id),
            name: Set(c.name),
            population: Set(c.population),
            country: Set(c.country),
            latitude: Set(c.latitude),
            longitude: Set(c.longitude),
            created_at: Set(c.created_at),
            updated_at: Set(c.updated_at),
        }
    }
}
