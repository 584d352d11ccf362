//! Diesel and pool error mapping for the user bootstrap repository.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{Relation, UserBootstrapRepositoryError};

use super::pool::PoolError;

const IDENTITY_CONSTRAINT: &str = "users_email_key";

/// Map pool errors to connection errors.
pub(super) fn map_pool_error(error: PoolError) -> UserBootstrapRepositoryError {
    UserBootstrapRepositoryError::connection(error.message())
}

fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = ?info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            error = %error,
            "diesel operation failed"
        ),
    }
}

fn is_connection_error(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
            | DieselError::BrokenTransactionManager
    )
}

/// Map Diesel errors raised outside relation inserts.
pub(super) fn map_diesel_error(error: DieselError) -> UserBootstrapRepositoryError {
    log_diesel_error(&error);

    match error {
        DieselError::NotFound => UserBootstrapRepositoryError::query("record not found"),
        ref err if is_connection_error(err) => {
            UserBootstrapRepositoryError::connection("database connection error")
        }
        DieselError::DatabaseError(_, info) => {
            UserBootstrapRepositoryError::query(info.message().to_owned())
        }
        other => UserBootstrapRepositoryError::query(other.to_string()),
    }
}

/// Map a failed profile or post insert.
///
/// Lost connections stay connection errors; everything else is reported
/// against the relation.
pub(super) fn map_relation_error(
    relation: Relation,
    error: DieselError,
) -> UserBootstrapRepositoryError {
    log_diesel_error(&error);

    if is_connection_error(&error) {
        return UserBootstrapRepositoryError::connection("database connection error");
    }
    let message = match &error {
        DieselError::DatabaseError(_, info) => info.message().to_owned(),
        other => other.to_string(),
    };
    UserBootstrapRepositoryError::relation_insert(relation, message)
}

/// Whether the error is a unique violation on the identity key.
pub(super) fn is_identity_conflict(error: &DieselError) -> bool {
    let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = error else {
        return false;
    };
    info.constraint_name() == Some(IDENTITY_CONSTRAINT)
        || info.message().contains(IDENTITY_CONSTRAINT)
}
