//! Seed run configuration loaded via OrthoConfig.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::persistence::PoolConfig;

/// Fallback environment variable for the database URL.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Default maximum number of pooled connections for a seed run.
const DEFAULT_POOL_MAX_SIZE: u32 = 2;
/// Default connection checkout timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration values controlling a seed run.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SEED")]
pub struct SeedSettings {
    /// PostgreSQL connection URL. Falls back to `DATABASE_URL` when unset.
    pub database_url: Option<String>,
    /// Snapshot file to apply. The built-in snapshot is used when unset.
    pub snapshot_path: Option<PathBuf>,
    /// Maximum number of pooled connections.
    #[ortho_config(default = DEFAULT_POOL_MAX_SIZE)]
    pub pool_max_size: u32,
    /// Connection checkout timeout in seconds.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            snapshot_path: None,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl SeedSettings {
    /// Return the configured database URL, falling back to `DATABASE_URL`.
    ///
    /// Blank values are treated as unset.
    pub fn database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .filter(|url| !url.trim().is_empty())
    }

    /// Return the configured checkout timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Build a pool configuration for `database_url`.
    pub fn pool_config(&self, database_url: impl Into<String>) -> PoolConfig {
        PoolConfig::new(database_url)
            .with_max_size(self.pool_max_size)
            .with_connection_timeout(self.connect_timeout())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for seed configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> SeedSettings {
        SeedSettings::load_from_iter([OsString::from("seed-users")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("SEED_DATABASE_URL", None::<String>),
            ("SEED_SNAPSHOT_PATH", None::<String>),
            ("SEED_POOL_MAX_SIZE", None::<String>),
            ("SEED_CONNECT_TIMEOUT_SECS", None::<String>),
            (DATABASE_URL_ENV, None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert!(settings.database_url().is_none());
        assert!(settings.snapshot_path.is_none());
        assert_eq!(settings.pool_max_size, PoolConfig::DEFAULT_MAX_SIZE);
        assert_eq!(
            settings.connect_timeout(),
            PoolConfig::DEFAULT_CONNECTION_TIMEOUT
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            (
                "SEED_DATABASE_URL",
                Some("postgres://seed@localhost/seed".to_owned()),
            ),
            ("SEED_SNAPSHOT_PATH", Some("/tmp/snapshot.json".to_owned())),
            ("SEED_POOL_MAX_SIZE", Some("4".to_owned())),
            ("SEED_CONNECT_TIMEOUT_SECS", Some("3".to_owned())),
            (DATABASE_URL_ENV, Some("postgres://other/db".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.database_url().as_deref(),
            Some("postgres://seed@localhost/seed")
        );
        assert_eq!(
            settings.snapshot_path,
            Some(PathBuf::from("/tmp/snapshot.json"))
        );
        let pool = settings.pool_config("postgres://seed@localhost/seed");
        assert_eq!(pool.max_size(), 4);
        assert_eq!(pool.connection_timeout(), Duration::from_secs(3));
    }

    #[rstest]
    #[case(None, Some("postgres://fallback/db"), Some("postgres://fallback/db"))]
    #[case(Some("  "), None, None)]
    fn database_url_falls_back_to_generic_variable(
        #[case] explicit: Option<&str>,
        #[case] fallback: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let _guard = lock_env([(DATABASE_URL_ENV, fallback.map(str::to_owned))]);
        let settings = SeedSettings {
            database_url: explicit.map(str::to_owned),
            ..SeedSettings::default()
        };

        assert_eq!(settings.database_url().as_deref(), expected);
    }
}
