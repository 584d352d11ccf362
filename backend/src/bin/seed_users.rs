//! Ensure the seed user, its profile and its posts exist.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use seed_backend::domain::BootstrapOutcome;
use seed_backend::outbound::memory::InMemoryUserStore;
use seed_backend::seeding::{SeedRunError, SeedSettings, connect, load_snapshot, run_seed, seed_with};
use tokio::runtime::Builder;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `seed-users` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seed-users",
    about = "Create or update the seed user with its profile and posts",
    version
)]
struct CliArgs {
    /// Database connection URL. Overrides `SEED_DATABASE_URL` and `DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Snapshot file to apply instead of the built-in snapshot.
    #[arg(long = "snapshot", value_name = "path")]
    snapshot_path: Option<PathBuf>,
    /// Apply the snapshot to an in-memory store and print the result.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(args)) {
        Ok(outcome) => {
            print_outcome(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "seed run failed");
            eprintln!("seed-users: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn async_main(args: CliArgs) -> Result<BootstrapOutcome, SeedRunError> {
    let settings = resolve_settings(args.clone())?;

    if args.dry_run {
        let snapshot = load_snapshot(&settings)?;
        return seed_with(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(DefaultClock),
            snapshot,
        )
        .await;
    }

    let pool = connect(&settings).await?;
    run_seed(&settings, &pool).await
}

/// Layer CLI flags over configuration files and `SEED_*` variables.
fn resolve_settings(args: CliArgs) -> Result<SeedSettings, SeedRunError> {
    let mut settings = SeedSettings::load_from_iter([OsString::from("seed-users")])?;
    if let Some(url) = args.database_url {
        if url.trim().is_empty() {
            return Err(SeedRunError::MissingDatabaseUrl);
        }
        settings.database_url = Some(url);
    }
    if args.snapshot_path.is_some() {
        settings.snapshot_path = args.snapshot_path;
    }
    Ok(settings)
}

fn print_outcome(outcome: &BootstrapOutcome) {
    let user = &outcome.user;
    println!("action={}", outcome.action);
    println!("user_id={}", user.id);
    println!("identity_key={}", user.identity_key);
    println!("display_name={}", user.attributes.display_name);
    println!("credential=<redacted>");
    println!("has_profile={}", user.profile.is_some());
    println!("post_titles={}", user.post_titles().join(","));
    println!("created_at={}", user.created_at.to_rfc3339());
    println!("updated_at={}", user.updated_at.to_rfc3339());
}
