//! # study-db
//!
//! Database layer implementing the `study-core` repository ports.
//!
//! ## Overview
//!
//! - Connection pool management and migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - PostgreSQL repository implementations
//! - An in-memory store with the same guarantees, for tests and offline use
//!
//! ## Usage
//!
//! ```rust,ignore
//! use study_db::pool::{create_pool, DatabaseConfig};
//! use study_db::repositories::PgInviteRepository;
//! use study_core::traits::InviteRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env();
//!     let pool = create_pool(&config).await?;
//!     let invites = PgInviteRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::InMemoryStore;
pub use pool::{create_pool, create_pool_from_env, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgGroupRepository, PgInviteRepository, PgMemberRepository, PgProfileRepository,
};
