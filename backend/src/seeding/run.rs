//! Seed run orchestration: load a snapshot, connect, ensure the user.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use ortho_config::OrthoError;
use seed_snapshot::{SeedSnapshot, SnapshotError};
use thiserror::Error;
use tracing::info;

use crate::domain::ports::UserBootstrapRepository;
use crate::domain::{
    BootstrapError, BootstrapOutcome, BootstrapRequest, Credential, PostDraft, ProfileDraft,
    UserBootstrapService,
};
use crate::outbound::persistence::{DbPool, DieselUserBootstrapRepository, PoolError};
use crate::seeding::config::SeedSettings;

/// Errors returned while executing a seed run.
#[derive(Debug, Error)]
pub enum SeedRunError {
    /// Configuration files or `SEED_*` variables could not be loaded.
    #[error("seed configuration error: {0}")]
    Config(#[from] Arc<OrthoError>),
    /// Snapshot could not be loaded or failed validation.
    #[error("seed snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    /// No database URL was configured.
    #[error("database URL missing: set --database-url, SEED_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,
    /// The connection pool could not be built.
    #[error("database pool error: {0}")]
    Pool(#[from] PoolError),
    /// The bootstrap procedure failed.
    #[error("user bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),
}

impl SeedRunError {
    /// Process exit code for this failure.
    ///
    /// | Code | Failure |
    /// |------|---------|
    /// | 2 | invalid snapshot, request or configuration |
    /// | 3 | store unavailable |
    /// | 4 | profile or post creation failed |
    /// | 5 | identity conflict could not be recovered |
    /// | 6 | other store failure |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_)
            | Self::Snapshot(_)
            | Self::MissingDatabaseUrl
            | Self::Bootstrap(BootstrapError::ValidationFailure { .. }) => 2,
            Self::Pool(_) | Self::Bootstrap(BootstrapError::StoreUnavailable { .. }) => 3,
            Self::Bootstrap(BootstrapError::RelationCreationFailure { .. }) => 4,
            Self::Bootstrap(BootstrapError::DuplicateIdentityConflict { .. }) => 5,
            Self::Bootstrap(BootstrapError::StoreFailure { .. }) => 6,
        }
    }
}

/// Load the configured snapshot, or the built-in one when none is set.
///
/// # Errors
///
/// Returns [`SeedRunError::Snapshot`] when the file cannot be read or parsed.
pub fn load_snapshot(settings: &SeedSettings) -> Result<SeedSnapshot, SeedRunError> {
    match settings.snapshot_path.as_deref() {
        Some(path) => Ok(SeedSnapshot::from_file(path)?),
        None => Ok(SeedSnapshot::builtin()),
    }
}

/// Convert a snapshot into a bootstrap request.
pub fn snapshot_request(snapshot: SeedSnapshot) -> BootstrapRequest {
    let (user, profile, posts) = snapshot.into_parts();
    let request = BootstrapRequest::new(
        user.email(),
        user.name(),
        Credential::new(user.password()),
    )
    .with_posts(
        posts
            .into_iter()
            .map(|post| PostDraft {
                title: post.title,
                content: post.content,
                published: post.published,
            })
            .collect(),
    );
    match profile {
        Some(profile) => request.with_profile(ProfileDraft {
            bio: profile.bio,
            avatar: profile.avatar,
        }),
        None => request,
    }
}

/// Apply `snapshot` through the given store.
///
/// # Errors
///
/// Returns [`SeedRunError::Bootstrap`] when the bootstrap procedure fails.
pub async fn seed_with<R>(
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    snapshot: SeedSnapshot,
) -> Result<BootstrapOutcome, SeedRunError>
where
    R: UserBootstrapRepository,
{
    let service = UserBootstrapService::new(repository, clock);
    let outcome = service.ensure(snapshot_request(snapshot)).await?;
    info!(
        identity_key = %outcome.user.identity_key,
        user_id = %outcome.user.id,
        action = %outcome.action,
        post_count = outcome.user.posts.len(),
        has_profile = outcome.user.profile.is_some(),
        "seed run applied"
    );
    Ok(outcome)
}

/// Build a connection pool from `settings`.
///
/// # Errors
///
/// Returns [`SeedRunError::MissingDatabaseUrl`] when no URL is configured or
/// [`SeedRunError::Pool`] when the pool cannot be built.
pub async fn connect(settings: &SeedSettings) -> Result<DbPool, SeedRunError> {
    let database_url = settings
        .database_url()
        .ok_or(SeedRunError::MissingDatabaseUrl)?;
    Ok(DbPool::new(settings.pool_config(database_url)).await?)
}

/// Run the configured seed against PostgreSQL.
///
/// # Examples
///
/// ```rust,no_run
/// use seed_backend::seeding::{SeedSettings, connect, run_seed};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = SeedSettings {
///     database_url: Some("postgres://localhost/seed".to_owned()),
///     ..SeedSettings::default()
/// };
/// let pool = connect(&settings).await?;
/// let outcome = run_seed(&settings, &pool).await?;
/// println!("{} {}", outcome.action, outcome.user.identity_key);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`SeedRunError`] when the snapshot or the bootstrap fails.
pub async fn run_seed(
    settings: &SeedSettings,
    pool: &DbPool,
) -> Result<BootstrapOutcome, SeedRunError> {
    let snapshot = load_snapshot(settings)?;
    let repository = DieselUserBootstrapRepository::new(pool.clone());
    seed_with(Arc::new(repository), Arc::new(DefaultClock), snapshot).await
}
