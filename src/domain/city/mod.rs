//! City aggregate
//!
//! Contains the City entity, its searchable schema and the store interface.

pub mod model;
pub mod repository;

pub use model::{fields, City, CityPatch, NewCity, ENTITY};
pub use repository::CityStore;

pub const MSG_CREATED: &str = "City added successfully";
pub const MSG_UPDATED: &str = "City updated successfully";
pub const MSG_DELETED: &str = "City deleted successfully";
pub const MSG_RETRIEVED: &str = "City retrieved successfully";
