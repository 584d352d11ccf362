//! Port abstraction for the store behind user bootstrapping.
//!
//! Adapters own durability and constraint enforcement: the identity key is
//! unique across users, profiles and posts cannot outlive their user, and a
//! user tree is created atomically. The bootstrap service relies on these
//! guarantees instead of re-checking them.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{IdentityKey, PostDraft, ProfileDraft, StoredUser, UserAttributes};

use super::define_port_error;

/// Dependent record kind named in relation insert failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The user's profile row.
    Profile,
    /// One of the user's post rows.
    Post,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Profile => "profile",
            Self::Post => "post",
        })
    }
}

define_port_error! {
    /// Persistence errors raised by user bootstrap repository adapters.
    pub enum UserBootstrapRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
        /// A user with the same identity key was committed first.
        DuplicateIdentity { identity_key: String } =>
            "user with identity key {identity_key} already exists",
        /// A profile or post insert failed and the creation was rolled back.
        RelationInsert { relation: Relation, message: String } =>
            "{relation} insert failed: {message}",
        /// No user exists for the identity key.
        Missing { identity_key: String } => "no user with identity key {identity_key}",
    }
}

/// Payload for creating a user and its dependents in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    /// Unique identity key for the new user.
    pub identity_key: IdentityKey,
    /// Initial attributes.
    pub attributes: UserAttributes,
    /// Creation timestamp, also used as the initial update timestamp.
    pub created_at: DateTime<Utc>,
    /// Profile to attach, if any.
    pub profile: Option<ProfileDraft>,
    /// Posts to attach, in insertion order.
    pub posts: Vec<PostDraft>,
}

/// Store operations needed by the bootstrap service.
///
/// Implementations must:
/// - Return `Ok(None)` from [`find_by_identity`](Self::find_by_identity) only
///   when no user exists; every other failure is an error.
/// - Create the user, profile and posts atomically, reporting
///   [`UserBootstrapRepositoryError::DuplicateIdentity`] when the identity
///   key is already taken and
///   [`UserBootstrapRepositoryError::RelationInsert`] when a dependent row
///   fails. Neither failure may leave rows behind.
/// - Update only the user's attribute columns in
///   [`update_user_attributes`](Self::update_user_attributes), never its
///   profile or posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserBootstrapRepository: Send + Sync {
    /// Fetch a user and its owned records by identity key.
    async fn find_by_identity(
        &self,
        identity_key: &IdentityKey,
    ) -> Result<Option<StoredUser>, UserBootstrapRepositoryError>;

    /// Create a user together with its profile and posts.
    async fn create_user_with_relations(
        &self,
        record: NewUserRecord,
    ) -> Result<StoredUser, UserBootstrapRepositoryError>;

    /// Overwrite the non-key attributes of an existing user.
    ///
    /// Returns [`UserBootstrapRepositoryError::Missing`] when no user has the
    /// identity key.
    async fn update_user_attributes(
        &self,
        identity_key: &IdentityKey,
        attributes: &UserAttributes,
        updated_at: DateTime<Utc>,
    ) -> Result<StoredUser, UserBootstrapRepositoryError>;
}
