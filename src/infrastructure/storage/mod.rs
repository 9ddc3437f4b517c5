//! In-memory storage backend

mod matcher;
mod memory;

pub use matcher::CompiledQuery;
pub use memory::InMemoryCityStore;
