//! In-memory adapter for the repository ports

mod store;

pub use store::InMemoryStore;
