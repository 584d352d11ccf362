//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Implements the user bootstrap port against PostgreSQL via Diesel with
//! async support through `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapter**: the repository only translates between Diesel rows and
//!   domain types. The bootstrap decisions live in the domain service.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Diesel and pool failures are mapped to
//!   `UserBootstrapRepositoryError` variants.
//!
//! # Example
//!
//! ```rust,no_run
//! use seed_backend::outbound::persistence::{DbPool, DieselUserBootstrapRepository, PoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/seed")).await?;
//! let repository = DieselUserBootstrapRepository::new(pool);
//! # let _ = repository;
//! # Ok(())
//! # }
//! ```

mod diesel_error_mapping;
mod diesel_user_bootstrap_repository;
mod models;
mod pool;
mod schema;

pub use diesel_user_bootstrap_repository::DieselUserBootstrapRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
