//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod user_bootstrap_repository;

#[cfg(test)]
pub use user_bootstrap_repository::MockUserBootstrapRepository;
pub use user_bootstrap_repository::{
    NewUserRecord, Relation, UserBootstrapRepository, UserBootstrapRepositoryError,
};
