//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When the
//! migrations change, regenerate with `diesel print-schema` or update by
//! hand.

diesel::table! {
    /// User accounts keyed by a unique email identity key.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Identity key; unique across all users.
        email -> Text,
        /// Human-readable display name.
        display_name -> Text,
        /// Opaque credential material, stored as supplied.
        credential -> Text,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last attribute update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// At most one profile per user; deleted with its user.
    profiles (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Owning user; unique.
        user_id -> Uuid,
        /// Biography text.
        bio -> Nullable<Text>,
        /// Avatar reference.
        avatar -> Nullable<Text>,
    }
}

diesel::table! {
    /// Posts owned by a user, ordered by `position`; deleted with their user.
    posts (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Owning user.
        user_id -> Uuid,
        /// Zero-based insertion position, unique per user.
        position -> Int4,
        /// Post title; must not be empty.
        title -> Text,
        /// Body text.
        content -> Nullable<Text>,
        /// Whether the post is published.
        published -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(posts -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, profiles, posts);
