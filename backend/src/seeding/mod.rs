//! Seed run wiring: configuration and orchestration.

mod config;
mod run;

pub use config::{DATABASE_URL_ENV, SeedSettings};
pub use run::{SeedRunError, connect, load_snapshot, run_seed, seed_with, snapshot_request};
