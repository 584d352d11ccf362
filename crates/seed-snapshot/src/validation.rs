//! Snapshot validation rules mirroring backend constraints.
//!
//! These checks match the backend's `IdentityKey` and `DisplayName` value
//! types so a snapshot that parses here is always accepted by the bootstrap
//! service. Email format is deliberately not checked.

/// Validates an identity key.
///
/// The key must be non-empty and must not carry leading or trailing
/// whitespace.
///
/// # Examples
///
/// ```
/// use seed_snapshot::is_valid_identity_key;
///
/// assert!(is_valid_identity_key("test@example.com"));
/// assert!(is_valid_identity_key("not-an-email"));
/// assert!(!is_valid_identity_key(""));
/// assert!(!is_valid_identity_key(" test@example.com"));
/// ```
#[must_use]
pub fn is_valid_identity_key(value: &str) -> bool {
    !value.is_empty() && value.trim() == value
}

/// Validates a display name.
///
/// # Examples
///
/// ```
/// use seed_snapshot::is_valid_display_name;
///
/// assert!(is_valid_display_name("Test User"));
/// assert!(!is_valid_display_name("   "));
/// ```
#[must_use]
pub fn is_valid_display_name(value: &str) -> bool {
    !value.trim().is_empty()
}
