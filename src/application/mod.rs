pub mod city;

pub use city::{CityRepository, CityUseCase, ListQuery, ListResult};
