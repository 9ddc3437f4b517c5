//! SeaORM entities

pub mod city;
