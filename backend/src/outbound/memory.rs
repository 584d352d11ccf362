//! In-process user store.
//!
//! `InMemoryUserStore` honours the same contract as the PostgreSQL adapter:
//! identity keys are unique, a user tree is committed all at once or not at
//! all, and attribute updates leave profile and posts alone. It also exposes
//! failure injection and call counters so behaviour around outages, rollback
//! and lost races can be exercised without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;

use crate::domain::ports::{
    NewUserRecord, Relation, UserBootstrapRepository, UserBootstrapRepositoryError,
};
use crate::domain::{IdentityKey, StoredPost, StoredProfile, StoredUser, UserAttributes, UserId};

const UNAVAILABLE_MESSAGE: &str = "in-memory store marked unavailable";

struct Rendezvous {
    barrier: Arc<Barrier>,
    remaining: usize,
}

/// Mutex-guarded user store keyed by identity key.
///
/// # Examples
///
/// ```rust
/// use seed_backend::outbound::memory::InMemoryUserStore;
///
/// let store = InMemoryUserStore::new();
/// assert_eq!(store.user_count(), 0);
/// ```
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<IdentityKey, StoredUser>>,
    unavailable: AtomicBool,
    fail_post_at: Mutex<Option<usize>>,
    rendezvous: Mutex<Option<Rendezvous>>,
    lookup_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl InMemoryUserStore {
    /// Create an empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the post insert at `index` for every subsequent creation.
    ///
    /// Pass `None` to clear the injected failure.
    pub fn fail_post_insert_at(&self, index: Option<usize>) {
        *lock(&self.fail_post_at) = index;
    }

    /// Hold the next `participants` lookups until all of them have read.
    ///
    /// Each held lookup reads the store first and then waits, so every
    /// participant observes the same state before any of them writes. This
    /// forces concurrent first runs to race on creation.
    pub fn hold_lookups(&self, participants: usize) {
        *lock(&self.rendezvous) = (participants > 0).then(|| Rendezvous {
            barrier: Arc::new(Barrier::new(participants)),
            remaining: participants,
        });
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        lock(&self.users).len()
    }

    /// Snapshot of the stored user with the given identity key.
    pub fn get(&self, identity_key: &str) -> Option<StoredUser> {
        lock(&self.users)
            .values()
            .find(|user| user.identity_key.as_str() == identity_key)
            .cloned()
    }

    /// Number of lookups attempted.
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Number of creations attempted.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of attribute updates attempted.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), UserBootstrapRepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UserBootstrapRepositoryError::connection(UNAVAILABLE_MESSAGE));
        }
        Ok(())
    }

    fn take_rendezvous(&self) -> Option<Arc<Barrier>> {
        let mut slot = lock(&self.rendezvous);
        let rendezvous = slot.as_mut()?;
        let barrier = Arc::clone(&rendezvous.barrier);
        rendezvous.remaining -= 1;
        if rendezvous.remaining == 0 {
            *slot = None;
        }
        Some(barrier)
    }

    fn build_user(&self, record: NewUserRecord) -> Result<StoredUser, UserBootstrapRepositoryError> {
        let NewUserRecord {
            identity_key,
            attributes,
            created_at,
            profile,
            posts,
        } = record;
        let fail_post_at = *lock(&self.fail_post_at);

        let profile = profile.map(|draft| StoredProfile {
            id: Uuid::new_v4(),
            bio: draft.bio,
            avatar: draft.avatar,
        });

        let mut stored_posts = Vec::with_capacity(posts.len());
        for (index, draft) in posts.into_iter().enumerate() {
            if fail_post_at == Some(index) {
                return Err(UserBootstrapRepositoryError::relation_insert(
                    Relation::Post,
                    format!("injected failure at position {index}"),
                ));
            }
            // Mirrors the posts_title_not_empty check constraint.
            if draft.title.is_empty() {
                return Err(UserBootstrapRepositoryError::relation_insert(
                    Relation::Post,
                    format!("empty title at position {index}"),
                ));
            }
            let position = u32::try_from(index)
                .map_err(|_| UserBootstrapRepositoryError::query("post position overflow"))?;
            stored_posts.push(StoredPost {
                id: Uuid::new_v4(),
                position,
                title: draft.title,
                content: draft.content,
                published: draft.published,
                created_at,
            });
        }

        Ok(StoredUser {
            id: UserId::from_uuid(Uuid::new_v4()),
            identity_key,
            attributes,
            created_at,
            updated_at: created_at,
            profile,
            posts: stored_posts,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl UserBootstrapRepository for InMemoryUserStore {
    async fn find_by_identity(
        &self,
        identity_key: &IdentityKey,
    ) -> Result<Option<StoredUser>, UserBootstrapRepositoryError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        let found = lock(&self.users).get(identity_key).cloned();

        if let Some(barrier) = self.take_rendezvous() {
            barrier.wait().await;
        }
        Ok(found)
    }

    async fn create_user_with_relations(
        &self,
        record: NewUserRecord,
    ) -> Result<StoredUser, UserBootstrapRepositoryError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let mut users = lock(&self.users);
        if users.contains_key(&record.identity_key) {
            return Err(UserBootstrapRepositoryError::duplicate_identity(
                record.identity_key.as_str(),
            ));
        }
        let user = self.build_user(record)?;
        users.insert(user.identity_key.clone(), user.clone());
        Ok(user)
    }

    async fn update_user_attributes(
        &self,
        identity_key: &IdentityKey,
        attributes: &UserAttributes,
        updated_at: DateTime<Utc>,
    ) -> Result<StoredUser, UserBootstrapRepositoryError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let mut users = lock(&self.users);
        let user = users
            .get_mut(identity_key)
            .ok_or_else(|| UserBootstrapRepositoryError::missing(identity_key.as_str()))?;
        user.attributes = attributes.clone();
        user.updated_at = updated_at;
        Ok(user.clone())
    }
}
