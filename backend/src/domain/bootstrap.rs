//! Idempotent user bootstrapping.
//!
//! [`UserBootstrapService::ensure`] brings the store to a state where a user
//! with the requested identity key exists. The first run creates the user,
//! its profile and its posts in one transaction. Later runs only overwrite
//! the user's attributes; profile and posts are never touched again.

use std::fmt;
use std::sync::Arc;

use mockable::Clock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    NewUserRecord, Relation, UserBootstrapRepository, UserBootstrapRepositoryError,
};
use crate::domain::{
    Credential, DisplayName, IdentityKey, PostDraft, ProfileDraft, StoredUser, UserAttributes,
    UserValidationError,
};

/// Point in the bootstrap procedure at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    /// Request validation, before any store call.
    Validate,
    /// Initial lookup by identity key.
    Lookup,
    /// Transactional creation of the user tree.
    Create,
    /// Attribute update of an existing user.
    Update,
    /// Re-read after losing a creation race.
    ConflictReread,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::Lookup => "lookup",
            Self::Create => "create",
            Self::Update => "update",
            Self::ConflictReread => "conflict_reread",
        })
    }
}

/// Errors surfaced by [`UserBootstrapService::ensure`].
///
/// Every variant carries the identity key and the stage that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    /// The request was rejected before any store call.
    #[error("invalid bootstrap request for {identity_key:?}: {source}")]
    ValidationFailure {
        /// Identity key as supplied by the caller.
        identity_key: String,
        /// Validation rule that failed.
        #[source]
        source: UserValidationError,
    },
    /// The identity key is taken but the existing record could not be read.
    #[error("identity key {identity_key} conflicts with an unreadable record during {stage}")]
    DuplicateIdentityConflict {
        /// Identity key of the conflicting user.
        identity_key: String,
        /// Stage that observed the conflict.
        stage: BootstrapStage,
    },
    /// A profile or post insert failed and the creation was rolled back.
    #[error("{relation} creation failed for {identity_key} during {stage}: {message}")]
    RelationCreationFailure {
        /// Identity key of the user being created.
        identity_key: String,
        /// Stage that failed.
        stage: BootstrapStage,
        /// Dependent record kind that failed.
        relation: Relation,
        /// Store diagnostic.
        message: String,
    },
    /// The store could not be reached.
    #[error("store unavailable for {identity_key} during {stage}: {message}")]
    StoreUnavailable {
        /// Identity key being bootstrapped.
        identity_key: String,
        /// Stage that failed.
        stage: BootstrapStage,
        /// Store diagnostic.
        message: String,
    },
    /// The store rejected a query for another reason.
    #[error("store failure for {identity_key} during {stage}: {message}")]
    StoreFailure {
        /// Identity key being bootstrapped.
        identity_key: String,
        /// Stage that failed.
        stage: BootstrapStage,
        /// Store diagnostic.
        message: String,
    },
}

impl BootstrapError {
    /// Identity key the failed invocation was working on.
    pub fn identity_key(&self) -> &str {
        match self {
            Self::ValidationFailure { identity_key, .. }
            | Self::DuplicateIdentityConflict { identity_key, .. }
            | Self::RelationCreationFailure { identity_key, .. }
            | Self::StoreUnavailable { identity_key, .. }
            | Self::StoreFailure { identity_key, .. } => identity_key,
        }
    }

    /// Stage at which the invocation failed.
    pub fn stage(&self) -> BootstrapStage {
        match self {
            Self::ValidationFailure { .. } => BootstrapStage::Validate,
            Self::DuplicateIdentityConflict { stage, .. }
            | Self::RelationCreationFailure { stage, .. }
            | Self::StoreUnavailable { stage, .. }
            | Self::StoreFailure { stage, .. } => *stage,
        }
    }
}

/// Desired state for one user tree.
///
/// Raw strings are validated by [`UserBootstrapService::ensure`] so callers
/// can pass untrusted input straight through.
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    /// Identity key to deduplicate on.
    pub identity_key: String,
    /// Desired display name.
    pub display_name: String,
    /// Desired credential material.
    pub credential: Credential,
    /// Profile created alongside a new user.
    pub profile: Option<ProfileDraft>,
    /// Posts created alongside a new user, in order.
    pub posts: Vec<PostDraft>,
}

impl BootstrapRequest {
    /// Request for a user without profile or posts.
    ///
    /// # Examples
    /// ```
    /// use seed_backend::domain::{BootstrapRequest, Credential, PostDraft};
    ///
    /// let request = BootstrapRequest::new("a@x.com", "A", Credential::new("secret"))
    ///     .with_posts(vec![PostDraft::titled("P1")]);
    /// assert!(request.profile.is_none());
    /// assert_eq!(request.posts.len(), 1);
    /// ```
    pub fn new(
        identity_key: impl Into<String>,
        display_name: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            identity_key: identity_key.into(),
            display_name: display_name.into(),
            credential,
            profile: None,
            posts: Vec::new(),
        }
    }

    /// Attach a profile.
    pub fn with_profile(mut self, profile: ProfileDraft) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Attach posts in insertion order.
    pub fn with_posts(mut self, posts: Vec<PostDraft>) -> Self {
        self.posts = posts;
        self
    }

    fn validate(&self) -> Result<(IdentityKey, UserAttributes), BootstrapError> {
        let invalid = |source| BootstrapError::ValidationFailure {
            identity_key: self.identity_key.clone(),
            source,
        };
        let identity_key = IdentityKey::new(self.identity_key.as_str()).map_err(invalid)?;
        let display_name = DisplayName::new(self.display_name.as_str()).map_err(invalid)?;
        Ok((
            identity_key,
            UserAttributes {
                display_name,
                credential: self.credential.clone(),
            },
        ))
    }
}

/// Which path produced a [`BootstrapOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapAction {
    /// The user tree was created.
    Created,
    /// An existing user's attributes were updated.
    Updated,
    /// Creation lost a race and the winner's record was updated instead.
    RecoveredFromConflict,
}

impl fmt::Display for BootstrapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::RecoveredFromConflict => "recovered_from_conflict",
        })
    }
}

/// Successful result of [`UserBootstrapService::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// User as persisted after the call.
    pub user: StoredUser,
    /// Path that produced the user.
    pub action: BootstrapAction,
}

/// Service ensuring a user tree exists.
#[derive(Clone)]
pub struct UserBootstrapService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> UserBootstrapService<R> {
    /// Create a service over the given store and clock.
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use mockable::DefaultClock;
    /// use seed_backend::domain::UserBootstrapService;
    /// use seed_backend::outbound::memory::InMemoryUserStore;
    ///
    /// let service = UserBootstrapService::new(
    ///     Arc::new(InMemoryUserStore::new()),
    ///     Arc::new(DefaultClock),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

impl<R> UserBootstrapService<R>
where
    R: UserBootstrapRepository,
{
    /// Ensure the requested user exists with the requested attributes.
    ///
    /// Store failures are surfaced without retrying.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] when validation or any store call fails.
    /// A lost creation race is recovered and is not an error unless the
    /// winning record cannot be read back.
    pub async fn ensure(
        &self,
        request: BootstrapRequest,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let (identity_key, attributes) = request.validate()?;

        let existing = self
            .repository
            .find_by_identity(&identity_key)
            .await
            .map_err(|err| map_repository_error(err, &identity_key, BootstrapStage::Lookup))?;

        let outcome = match existing {
            Some(_) => {
                let user = self
                    .update(&identity_key, &attributes)
                    .await
                    .map_err(|err| map_repository_error(err, &identity_key, BootstrapStage::Update))?;
                BootstrapOutcome {
                    user,
                    action: BootstrapAction::Updated,
                }
            }
            None => {
                let BootstrapRequest { profile, posts, .. } = request;
                self.create(identity_key.clone(), attributes, profile, posts)
                    .await?
            }
        };

        info!(
            identity_key = %identity_key,
            action = %outcome.action,
            post_count = outcome.user.posts.len(),
            "user bootstrap complete"
        );
        Ok(outcome)
    }

    async fn create(
        &self,
        identity_key: IdentityKey,
        attributes: UserAttributes,
        profile: Option<ProfileDraft>,
        posts: Vec<PostDraft>,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let record = NewUserRecord {
            identity_key: identity_key.clone(),
            attributes: attributes.clone(),
            created_at: self.clock.utc(),
            profile,
            posts,
        };

        match self.repository.create_user_with_relations(record).await {
            Ok(user) => Ok(BootstrapOutcome {
                user,
                action: BootstrapAction::Created,
            }),
            Err(UserBootstrapRepositoryError::DuplicateIdentity { .. }) => {
                warn!(
                    identity_key = %identity_key,
                    "user created concurrently; applying attributes to existing record"
                );
                self.recover_from_conflict(&identity_key, &attributes)
                    .await
            }
            Err(err) => Err(map_repository_error(
                err,
                &identity_key,
                BootstrapStage::Create,
            )),
        }
    }

    async fn recover_from_conflict(
        &self,
        identity_key: &IdentityKey,
        attributes: &UserAttributes,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        match self.update(identity_key, attributes).await {
            Ok(user) => Ok(BootstrapOutcome {
                user,
                action: BootstrapAction::RecoveredFromConflict,
            }),
            Err(UserBootstrapRepositoryError::Missing { .. }) => {
                Err(BootstrapError::DuplicateIdentityConflict {
                    identity_key: identity_key.to_string(),
                    stage: BootstrapStage::ConflictReread,
                })
            }
            Err(err) => Err(map_repository_error(
                err,
                identity_key,
                BootstrapStage::ConflictReread,
            )),
        }
    }

    async fn update(
        &self,
        identity_key: &IdentityKey,
        attributes: &UserAttributes,
    ) -> Result<StoredUser, UserBootstrapRepositoryError> {
        self.repository
            .update_user_attributes(identity_key, attributes, self.clock.utc())
            .await
    }
}

fn map_repository_error(
    error: UserBootstrapRepositoryError,
    identity_key: &IdentityKey,
    stage: BootstrapStage,
) -> BootstrapError {
    debug!(identity_key = %identity_key, %stage, error = %error, "user store call failed");
    let identity_key = identity_key.to_string();
    match error {
        UserBootstrapRepositoryError::Connection { message } => BootstrapError::StoreUnavailable {
            identity_key,
            stage,
            message,
        },
        UserBootstrapRepositoryError::RelationInsert { relation, message } => {
            BootstrapError::RelationCreationFailure {
                identity_key,
                stage,
                relation,
                message,
            }
        }
        UserBootstrapRepositoryError::DuplicateIdentity { .. } => {
            BootstrapError::DuplicateIdentityConflict {
                identity_key,
                stage,
            }
        }
        UserBootstrapRepositoryError::Query { message } => BootstrapError::StoreFailure {
            identity_key,
            stage,
            message,
        },
        missing @ UserBootstrapRepositoryError::Missing { .. } => BootstrapError::StoreFailure {
            identity_key,
            stage,
            message: missing.to_string(),
        },
    }
}
