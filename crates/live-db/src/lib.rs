//! # live-db
//!
//! Storage adapters for the repository ports defined in `live-core`.
//!
//! - [`repositories`]: PostgreSQL via SQLx, used in deployment
//! - [`memory`]: process-local maps, used by tests and single-node setups
//!
//! ## Usage
//!
//! ```rust,ignore
//! use live_db::{create_pool, run_migrations, PgMessageRepository};
//!
//! async fn example(config: &live_common::DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let messages = PgMessageRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{InMemoryMessageRepository, InMemorySessionRepository};
pub use pool::{create_pool, run_migrations, PgPool, MIGRATIONS_DIR};
pub use repositories::{PgMessageRepository, PgSessionRepository};
