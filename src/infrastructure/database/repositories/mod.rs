//! Database repository implementations

pub mod city_store;

pub use city_store::SeaOrmCityStore;
