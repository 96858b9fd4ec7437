//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations translate between Diesel rows and domain
//! types; the workflow rules stay in the domain. Row structs (`models.rs`)
//! and table definitions (`schema.rs`) never leave this module.
//!
//! ```no_run
//! use logistics::outbound::persistence::{DbPool, DieselTransferRepository, PoolConfig};
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/logistics")).await?;
//! let transfers = DieselTransferRepository::new(pool);
//! # let _ = transfers;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_inventory_repository;
mod diesel_lookups;
mod diesel_transfer_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_inventory_repository::DieselInventoryRepository;
pub use diesel_transfer_repository::DieselTransferRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
