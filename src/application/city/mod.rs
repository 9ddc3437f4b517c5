//! City application services

pub mod repository;
pub mod usecase;

pub use repository::{CityRepository, ListQuery, ListResult};
pub use usecase::CityUseCase;
