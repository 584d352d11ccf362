//! PostgreSQL-backed user bootstrap adapter.
//!
//! This adapter implements the `UserBootstrapRepository` port. A new user,
//! its profile and its posts are written in a single transaction; the user
//! insert uses `ON CONFLICT (email) DO NOTHING` so a concurrent winner is
//! reported as a duplicate instead of aborting with a constraint error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    NewUserRecord, Relation, UserBootstrapRepository, UserBootstrapRepositoryError,
};
use crate::domain::{
    Credential, DisplayName, IdentityKey, PostDraft, StoredPost, StoredProfile, StoredUser,
    UserAttributes, UserId,
};

use super::diesel_error_mapping::{
    is_identity_conflict, map_diesel_error, map_pool_error, map_relation_error,
};
use super::models::{
    NewPostRow, NewProfileRow, NewUserRow, PostRow, ProfileRow, UserAttributesUpdate, UserRow,
};
use super::pool::DbPool;
use super::schema::{posts, profiles, users};

/// Diesel-backed implementation of the user bootstrap repository.
#[derive(Clone)]
pub struct DieselUserBootstrapRepository {
    pool: DbPool,
}

impl DieselUserBootstrapRepository {
    /// Create a new repository with the given connection pool.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use seed_backend::outbound::persistence::{
    ///     DbPool, DieselUserBootstrapRepository, PoolConfig,
    /// };
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = DbPool::new(PoolConfig::new("postgres://localhost")).await?;
    /// let repository = DieselUserBootstrapRepository::new(pool);
    /// # let _ = repository;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failures inside the creation transaction, kept apart so relation inserts
/// can be reported against their relation.
enum CreateError {
    DuplicateIdentity,
    Profile(DieselError),
    Posts(DieselError),
    Database(DieselError),
}

impl From<DieselError> for CreateError {
    fn from(error: DieselError) -> Self {
        Self::Database(error)
    }
}

fn map_post_rows(
    user_id: Uuid,
    drafts: &[PostDraft],
    created_at: DateTime<Utc>,
) -> Result<Vec<NewPostRow<'_>>, UserBootstrapRepositoryError> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let position = i32::try_from(index)
                .map_err(|_| UserBootstrapRepositoryError::query("post position overflow"))?;
            Ok(NewPostRow {
                id: Uuid::new_v4(),
                user_id,
                position,
                title: draft.title.as_str(),
                content: draft.content.as_deref(),
                published: draft.published,
                created_at,
            })
        })
        .collect()
}

fn stored_error(field: &str, detail: impl std::fmt::Display) -> UserBootstrapRepositoryError {
    UserBootstrapRepositoryError::query(format!("stored {field} is invalid: {detail}"))
}

fn assemble_user(
    row: UserRow,
    profile: Option<ProfileRow>,
    mut post_rows: Vec<PostRow>,
) -> Result<StoredUser, UserBootstrapRepositoryError> {
    let identity_key = IdentityKey::new(row.email).map_err(|err| stored_error("email", err))?;
    let display_name =
        DisplayName::new(row.display_name).map_err(|err| stored_error("display name", err))?;

    post_rows.sort_by_key(|post| post.position);
    let posts = post_rows
        .into_iter()
        .map(|post| {
            let position =
                u32::try_from(post.position).map_err(|err| stored_error("post position", err))?;
            Ok(StoredPost {
                id: post.id,
                position,
                title: post.title,
                content: post.content,
                published: post.published,
                created_at: post.created_at,
            })
        })
        .collect::<Result<Vec<_>, UserBootstrapRepositoryError>>()?;

    Ok(StoredUser {
        id: UserId::from_uuid(row.id),
        identity_key,
        attributes: UserAttributes {
            display_name,
            credential: Credential::new(row.credential),
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
        profile: profile.map(|profile| StoredProfile {
            id: profile.id,
            bio: profile.bio,
            avatar: profile.avatar,
        }),
        posts,
    })
}

/// Load the profile and posts owned by `row` and assemble the user tree.
async fn load_user_tree<C>(
    conn: &mut C,
    row: UserRow,
) -> Result<StoredUser, UserBootstrapRepositoryError>
where
    C: AsyncConnection<Backend = Pg> + Send,
{
    let profile: Option<ProfileRow> = profiles::table
        .filter(profiles::user_id.eq(row.id))
        .select(ProfileRow::as_select())
        .first(conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

    let post_rows: Vec<PostRow> = posts::table
        .filter(posts::user_id.eq(row.id))
        .order(posts::position.asc())
        .select(PostRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    assemble_user(row, profile, post_rows)
}

#[async_trait]
impl UserBootstrapRepository for DieselUserBootstrapRepository {
    async fn find_by_identity(
        &self,
        identity_key: &IdentityKey,
    ) -> Result<Option<StoredUser>, UserBootstrapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(identity_key.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match row {
            Some(row) => load_user_tree(&mut conn, row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn create_user_with_relations(
        &self,
        record: NewUserRecord,
    ) -> Result<StoredUser, UserBootstrapRepositoryError> {
        let NewUserRecord {
            identity_key,
            attributes,
            created_at,
            profile,
            posts: post_drafts,
        } = record;
        let user_id = Uuid::new_v4();
        let user_row = NewUserRow {
            id: user_id,
            email: identity_key.as_str(),
            display_name: attributes.display_name.as_str(),
            credential: attributes.credential.expose(),
            created_at,
            updated_at: created_at,
        };
        let profile_row = profile.as_ref().map(|profile| NewProfileRow {
            id: Uuid::new_v4(),
            user_id,
            bio: profile.bio.as_deref(),
            avatar: profile.avatar.as_deref(),
        });
        let post_rows = map_post_rows(user_id, &post_drafts, created_at)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result = conn
            .transaction(|conn| {
                async move {
                    let inserted: Option<UserRow> = diesel::insert_into(users::table)
                        .values(&user_row)
                        .on_conflict(users::email)
                        .do_nothing()
                        .returning(UserRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;

                    let Some(user) = inserted else {
                        return Err(CreateError::DuplicateIdentity);
                    };

                    let profile = match profile_row {
                        Some(row) => Some(
                            diesel::insert_into(profiles::table)
                                .values(&row)
                                .returning(ProfileRow::as_returning())
                                .get_result(conn)
                                .await
                                .map_err(CreateError::Profile)?,
                        ),
                        None => None,
                    };

                    let stored_posts: Vec<PostRow> = if post_rows.is_empty() {
                        Vec::new()
                    } else {
                        diesel::insert_into(posts::table)
                            .values(&post_rows)
                            .returning(PostRow::as_returning())
                            .get_results(conn)
                            .await
                            .map_err(CreateError::Posts)?
                    };

                    Ok((user, profile, stored_posts))
                }
                .scope_boxed()
            })
            .await;

        match result {
            Ok((user, profile, stored_posts)) => assemble_user(user, profile, stored_posts),
            Err(CreateError::DuplicateIdentity) => Err(
                UserBootstrapRepositoryError::duplicate_identity(identity_key.as_str()),
            ),
            Err(CreateError::Profile(err)) => Err(map_relation_error(Relation::Profile, err)),
            Err(CreateError::Posts(err)) => Err(map_relation_error(Relation::Post, err)),
            Err(CreateError::Database(err)) if is_identity_conflict(&err) => Err(
                UserBootstrapRepositoryError::duplicate_identity(identity_key.as_str()),
            ),
            Err(CreateError::Database(err)) => Err(map_diesel_error(err)),
        }
    }

    async fn update_user_attributes(
        &self,
        identity_key: &IdentityKey,
        attributes: &UserAttributes,
        updated_at: DateTime<Utc>,
    ) -> Result<StoredUser, UserBootstrapRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let changes = UserAttributesUpdate {
            display_name: attributes.display_name.as_str(),
            credential: attributes.credential.expose(),
            updated_at,
        };
        let row: Option<UserRow> = diesel::update(users::table)
            .filter(users::email.eq(identity_key.as_str()))
            .set(&changes)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let row = row.ok_or_else(|| UserBootstrapRepositoryError::missing(identity_key.as_str()))?;
        load_user_tree(&mut conn, row).await
    }
}
