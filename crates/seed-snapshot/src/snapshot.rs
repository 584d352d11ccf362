//! Seed snapshot types and JSON parsing.
//!
//! A snapshot is the desired state of one user record tree: the user's
//! identity key and attributes, an optional profile, and an ordered list of
//! posts. Snapshots are loaded from JSON and validated before use.

use std::fmt;
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::validation::{is_valid_display_name, is_valid_identity_key};

/// Current supported snapshot version.
pub const SNAPSHOT_VERSION: u32 = 1;

const BUILTIN_EMAIL: &str = "test@example.com";
const BUILTIN_NAME: &str = "Test User";
const BUILTIN_PASSWORD: &str = "hashedpassword123";
const BUILTIN_BIO: &str = "This is a test user profile";
const BUILTIN_AVATAR: &str = "https://github.com/shadcn.png";

/// Desired user attributes keyed by email.
///
/// The password is opaque credential material; it is carried through to the
/// store unchanged and never printed by [`fmt::Debug`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSeed {
    email: String,
    name: String,
    password: String,
}

impl UserSeed {
    /// Creates a user seed without validating it.
    ///
    /// Validation happens when the seed is wrapped in a [`SeedSnapshot`].
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password: password.into(),
        }
    }

    /// Returns the identity key.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the opaque credential material.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for UserSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSeed")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Desired profile attached to the user on first creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSeed {
    /// Biography text.
    #[serde(default)]
    pub bio: Option<String>,
    /// Avatar reference, usually a URL.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Desired post attached to the user on first creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostSeed {
    /// Post title. Titles are not required to be unique.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub content: Option<String>,
    /// Whether the post is published.
    #[serde(default)]
    pub published: bool,
}

impl PostSeed {
    /// Creates an unpublished post with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: None,
            published: false,
        }
    }
}

/// A validated seed snapshot.
///
/// # Example
///
/// ```
/// use seed_snapshot::SeedSnapshot;
///
/// let snapshot = SeedSnapshot::builtin();
/// assert_eq!(snapshot.user().email(), "test@example.com");
/// assert!(snapshot.profile().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSnapshot {
    user: UserSeed,
    profile: Option<ProfileSeed>,
    posts: Vec<PostSeed>,
}

impl SeedSnapshot {
    /// Builds a snapshot from its parts, validating the user seed.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidIdentityKey`] or
    /// [`SnapshotError::BlankDisplayName`] when the user seed is invalid.
    pub fn new(
        user: UserSeed,
        profile: Option<ProfileSeed>,
        posts: Vec<PostSeed>,
    ) -> Result<Self, SnapshotError> {
        if !is_valid_identity_key(&user.email) {
            return Err(SnapshotError::InvalidIdentityKey {
                value: user.email.clone(),
            });
        }
        if !is_valid_display_name(&user.name) {
            return Err(SnapshotError::BlankDisplayName);
        }
        Ok(Self {
            user,
            profile,
            posts,
        })
    }

    /// Returns the built-in default snapshot: a test user with a profile, one
    /// published post and one draft.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            user: UserSeed::new(BUILTIN_EMAIL, BUILTIN_NAME, BUILTIN_PASSWORD),
            profile: Some(ProfileSeed {
                bio: Some(BUILTIN_BIO.to_owned()),
                avatar: Some(BUILTIN_AVATAR.to_owned()),
            }),
            posts: vec![
                PostSeed {
                    title: "First Post".to_owned(),
                    content: Some("This is my first post using Prisma with UUID!".to_owned()),
                    published: true,
                },
                PostSeed {
                    title: "Draft Post".to_owned(),
                    content: Some("This is a draft post".to_owned()),
                    published: false,
                },
            ],
        }
    }

    /// Parses a snapshot from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if:
    /// - The JSON is malformed or has unknown fields
    /// - The version is unsupported
    /// - The user email or name is invalid
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: RawSeedSnapshot =
            serde_json::from_str(json).map_err(|e| SnapshotError::ParseError {
                message: e.to_string(),
            })?;

        if raw.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                expected: SNAPSHOT_VERSION,
                actual: raw.version,
            });
        }

        Self::new(raw.user, raw.profile, raw.posts)
    }

    /// Loads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::IoError`] if the file cannot be read, or any
    /// error from [`SeedSnapshot::from_json`].
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let io_error = |message: String| SnapshotError::IoError {
            path: path.to_path_buf(),
            message,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| io_error("snapshot path must be a file".to_owned()))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|e| io_error(e.to_string()))?;
        let contents = dir
            .read_to_string(Path::new(file_name))
            .map_err(|e| io_error(e.to_string()))?;

        Self::from_json(&contents)
    }

    /// Returns the desired user attributes.
    #[must_use]
    pub const fn user(&self) -> &UserSeed {
        &self.user
    }

    /// Returns the desired profile, if any.
    #[must_use]
    pub const fn profile(&self) -> Option<&ProfileSeed> {
        self.profile.as_ref()
    }

    /// Returns the desired posts in insertion order.
    #[must_use]
    pub fn posts(&self) -> &[PostSeed] {
        &self.posts
    }

    /// Consumes the snapshot, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (UserSeed, Option<ProfileSeed>, Vec<PostSeed>) {
        (self.user, self.profile, self.posts)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSeedSnapshot {
    version: u32,
    user: UserSeed,
    #[serde(default)]
    profile: Option<ProfileSeed>,
    #[serde(default)]
    posts: Vec<PostSeed>,
}
