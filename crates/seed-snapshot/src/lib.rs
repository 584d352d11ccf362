//! Desired dataset snapshots for idempotent user bootstrap seeding.
//!
//! A snapshot names one user by its identity key (email) together with the
//! attributes, profile and ordered posts that a seed run should establish.
//! The crate is independent of backend domain and persistence types so it can
//! be shared by tooling without pulling in the database stack.
//!
//! # Overview
//!
//! The crate supports:
//!
//! - Parsing snapshots from JSON strings or files
//! - Validating identity keys and display names before any store is touched
//! - A built-in snapshot describing the default test user
//!
//! # Example
//!
//! ```
//! use seed_snapshot::SeedSnapshot;
//!
//! let json = r#"{
//!     "version": 1,
//!     "user": {"email": "a@x.com", "name": "A", "password": "secret"},
//!     "profile": {"bio": "hi"},
//!     "posts": [{"title": "P1"}, {"title": "P2"}]
//! }"#;
//!
//! let snapshot = SeedSnapshot::from_json(json).expect("valid snapshot");
//! assert_eq!(snapshot.user().email(), "a@x.com");
//! assert_eq!(snapshot.posts().len(), 2);
//! ```

mod error;
mod snapshot;
mod validation;

pub use error::SnapshotError;
pub use snapshot::{PostSeed, ProfileSeed, SNAPSHOT_VERSION, SeedSnapshot, UserSeed};
pub use validation::{is_valid_display_name, is_valid_identity_key};
