pub mod city;
pub mod error;
pub mod query;

pub use city::{City, CityPatch, CityStore, NewCity};
pub use error::{DomainError, DomainResult};
