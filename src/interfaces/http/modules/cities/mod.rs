//! Cities module: CRUD, search, filter, sort, projection and pagination

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
