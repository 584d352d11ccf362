//! Idempotent user seeding.
//!
//! - [`domain`] holds the user record tree, the bootstrap service and its
//!   storage port.
//! - [`outbound`] provides PostgreSQL and in-memory store adapters.
//! - [`seeding`] wires configuration, snapshot loading and a seed run.

pub mod domain;
pub mod outbound;
pub mod seeding;
