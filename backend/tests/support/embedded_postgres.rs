//! Shared embedded PostgreSQL helpers for integration tests.
//!
//! - Each test gets a database cloned from a template that has the embedded
//!   Diesel migrations applied; the template name tracks a hash of the
//!   migrations directory so schema changes get a fresh template.
//! - Raw inspection and fault injection use `postgres` rather than Diesel.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};
use seed_backend::domain::ports::UserBootstrapRepositoryError;
use uuid::Uuid;

use super::format_postgres_error;

/// Embedded migrations from the backend/migrations directory.
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "seed_template";
const TEMPLATE_PROVISION_RETRIES: usize = 5;
const TEMPLATE_PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, UserBootstrapRepositoryError> {
    let hash = hash_directory(migrations_dir())
        .map_err(|err| UserBootstrapRepositoryError::query(format!("hash migrations: {err}")))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Creates or reuses a template database with the latest migrations applied.
fn ensure_template_database(
    cluster: &ClusterHandle,
) -> Result<String, UserBootstrapRepositoryError> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| UserBootstrapRepositoryError::query(format!("template check: {err:?}")))?;

    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| {
                UserBootstrapRepositoryError::query(format!("create template: {err:?}"))
            })?;

        let url = cluster.connection().database_url(&template_name);
        migrate_schema(&url)?;
    }

    Ok(template_name)
}

/// Provisions a temporary database cloned from the migration template.
pub fn provision_template_database(
    cluster: &ClusterHandle,
) -> Result<TemporaryDatabase, UserBootstrapRepositoryError> {
    let mut last_error = None;
    for attempt in 1..=TEMPLATE_PROVISION_RETRIES {
        let provisioned = ensure_template_database(cluster).and_then(|template_name| {
            let db_name = format!("test_{}", Uuid::new_v4().simple());
            cluster
                .temporary_database_from_template(db_name.as_str(), template_name.as_str())
                .map_err(|err| {
                    UserBootstrapRepositoryError::query(format!(
                        "create database from template: attempt {attempt}/{TEMPLATE_PROVISION_RETRIES}: {err:?}"
                    ))
                })
        });
        match provisioned {
            Ok(database) => return Ok(database),
            Err(error) => last_error = Some(error),
        }
        if attempt < TEMPLATE_PROVISION_RETRIES {
            std::thread::sleep(TEMPLATE_PROVISION_RETRY_DELAY);
        }
    }

    Err(last_error.unwrap_or_else(|| {
        UserBootstrapRepositoryError::query("create database from template: exhausted retries")
    }))
}

/// Runs all pending Diesel migrations against the test database.
pub fn migrate_schema(url: &str) -> Result<(), UserBootstrapRepositoryError> {
    let mut conn = PgConnection::establish(url)
        .map_err(|err| UserBootstrapRepositoryError::connection(format!("{err:?}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| UserBootstrapRepositoryError::query(format!("migration: {err:?}")))?;
    Ok(())
}

fn connect(url: &str) -> Result<Client, UserBootstrapRepositoryError> {
    Client::connect(url, NoTls)
        .map_err(|err| UserBootstrapRepositoryError::connection(format_postgres_error(&err)))
}

/// Executes raw SQL against the given database.
pub fn execute_sql(url: &str, sql: &str) -> Result<(), UserBootstrapRepositoryError> {
    connect(url)?
        .batch_execute(sql)
        .map_err(|err| UserBootstrapRepositoryError::query(format_postgres_error(&err)))
}

/// Counts the rows of `table`.
pub fn count_rows(url: &str, table: &str) -> Result<i64, UserBootstrapRepositoryError> {
    let row = connect(url)?
        .query_one(format!("SELECT COUNT(*) FROM {table}").as_str(), &[])
        .map_err(|err| UserBootstrapRepositoryError::query(format_postgres_error(&err)))?;
    Ok(row.get(0))
}
