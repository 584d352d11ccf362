//! Domain primitives, services and ports.
//!
//! Purpose: Define the user record tree and the idempotent bootstrap service
//! that creates it. Storage is reached only through the
//! [`ports::UserBootstrapRepository`] port.
//!
//! Public surface:
//! - IdentityKey, DisplayName, Credential: validated user value types.
//! - ProfileDraft, PostDraft: dependent records created with a new user.
//! - StoredUser: a persisted user with its profile and posts.
//! - UserBootstrapService: the `ensure` operation and its error taxonomy.

pub mod bootstrap;
pub mod ports;
pub mod user;

pub use self::bootstrap::{
    BootstrapAction, BootstrapError, BootstrapOutcome, BootstrapRequest, BootstrapStage,
    UserBootstrapService,
};
pub use self::user::{
    Credential, DisplayName, IdentityKey, PostDraft, ProfileDraft, StoredPost, StoredProfile,
    StoredUser, UserAttributes, UserId, UserValidationError,
};
