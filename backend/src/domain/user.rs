//! User record tree: the user root, its profile and its posts.
//!
//! A user is addressed by its [`IdentityKey`] and exclusively owns at most
//! one profile and an ordered list of posts. Drafts describe records that do
//! not exist yet; `Stored*` types describe records read back from a store.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Validation errors raised when constructing user value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    /// Identity key was empty.
    #[error("identity key must not be empty")]
    EmptyIdentityKey,
    /// Identity key carried leading or trailing whitespace.
    #[error("identity key must not have surrounding whitespace")]
    IdentityKeyWhitespace,
    /// Display name was blank once trimmed.
    #[error("display name must not be empty")]
    EmptyDisplayName,
}

/// Unique identity key used to deduplicate users, usually an email address.
///
/// ## Invariants
/// - Non-empty.
/// - No leading or trailing whitespace.
///
/// Format is not validated here.
///
/// # Examples
/// ```
/// use seed_backend::domain::IdentityKey;
///
/// let key = IdentityKey::new("a@x.com").unwrap();
/// assert_eq!(key.as_str(), "a@x.com");
/// assert!(IdentityKey::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Validate and construct an identity key.
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(UserValidationError::EmptyIdentityKey);
        }
        if value.trim() != value {
            return Err(UserValidationError::IdentityKeyWhitespace);
        }
        Ok(Self(value))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human readable name for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a display name.
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        Ok(Self(value))
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque credential material stored alongside the user.
///
/// The value is never validated, hashed or inspected by this crate; it is
/// passed to the store unchanged. `Debug` output is redacted and the buffer
/// is zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Wrap raw credential material.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Expose the raw material for persistence.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Stable user identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap a UUID produced by a store adapter.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Mutable, non-key user attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttributes {
    /// Name shown for the user.
    pub display_name: DisplayName,
    /// Opaque credential material.
    pub credential: Credential,
}

/// Profile payload attached when a user is first created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    /// Biography text.
    pub bio: Option<String>,
    /// Avatar reference.
    pub avatar: Option<String>,
}

/// Post payload attached when a user is first created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    /// Post title; titles need not be unique.
    pub title: String,
    /// Body text.
    pub content: Option<String>,
    /// Whether the post is published.
    pub published: bool,
}

impl PostDraft {
    /// Unpublished post with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: None,
            published: false,
        }
    }
}

/// Persisted profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    /// Profile identifier.
    pub id: Uuid,
    /// Biography text.
    pub bio: Option<String>,
    /// Avatar reference.
    pub avatar: Option<String>,
}

/// Persisted post row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPost {
    /// Post identifier.
    pub id: Uuid,
    /// Zero-based insertion position within the owning user's posts.
    pub position: u32,
    /// Post title.
    pub title: String,
    /// Body text.
    pub content: Option<String>,
    /// Whether the post is published.
    pub published: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Persisted user together with its owned records.
///
/// ## Invariants
/// - `posts` is ordered by `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Unique identity key.
    pub identity_key: IdentityKey,
    /// Current attributes.
    pub attributes: UserAttributes,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last attribute update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Owned profile, if one was created.
    pub profile: Option<StoredProfile>,
    /// Owned posts in insertion order.
    pub posts: Vec<StoredPost>,
}

impl StoredUser {
    /// Titles of the user's posts in insertion order.
    pub fn post_titles(&self) -> Vec<&str> {
        self.posts.iter().map(|post| post.title.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for user value types.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyIdentityKey)]
    #[case(" a@x.com", UserValidationError::IdentityKeyWhitespace)]
    #[case("a@x.com\t", UserValidationError::IdentityKeyWhitespace)]
    fn identity_key_rejects_invalid_input(
        #[case] raw: &str,
        #[case] expected: UserValidationError,
    ) {
        assert_eq!(IdentityKey::new(raw), Err(expected));
    }

    #[rstest]
    fn identity_key_accepts_non_email_shapes() {
        let key = IdentityKey::new("not-an-email").expect("format is not validated");
        assert_eq!(key.to_string(), "not-an-email");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn display_name_rejects_blank(#[case] raw: &str) {
        assert_eq!(
            DisplayName::new(raw),
            Err(UserValidationError::EmptyDisplayName)
        );
    }

    #[rstest]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("hashedpassword123");

        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
        assert_eq!(credential.expose(), "hashedpassword123");
    }
}
