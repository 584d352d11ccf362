//! Process-exit cleanup for the shared embedded PostgreSQL cluster.
//!
//! `shared_cluster_handle()` leaks its guard so the cluster lives for the
//! whole test binary. When each test binary runs as its own process, a
//! PostgreSQL left running blocks the next binary from starting on the same
//! data directory, so a `libc::atexit` handler stops it on exit.

#[cfg(unix)]
use std::path::PathBuf;
#[cfg(unix)]
use std::sync::OnceLock;
#[cfg(unix)]
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle};

const SHARED_CLUSTER_RETRIES: usize = 5;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);

#[cfg(unix)]
static PG_POSTMASTER_PID: AtomicI32 = AtomicI32::new(0);
#[cfg(unix)]
static PG_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the shared cluster handle, stopping PostgreSQL at process exit.
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    ensure_stable_password();
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => {
                #[cfg(unix)]
                register_process_exit_cleanup(handle);
                return Ok(handle);
            }
            Err(error) => {
                if attempt >= SHARED_CLUSTER_RETRIES {
                    return Err(error);
                }
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Pin `PG_PASSWORD` so a reused data directory keeps accepting logins.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster spawns threads; the shared cluster
        // singleton serialises bootstrap.
        unsafe {
            std::env::set_var("PG_PASSWORD", "seed_embedded_test");
        }
    }
}

#[cfg(unix)]
fn read_postmaster_pid(data_dir: &std::path::Path) -> Option<i32> {
    let dir = cap_std::fs::Dir::open_ambient_dir(data_dir, cap_std::ambient_authority()).ok()?;
    let content = dir.read_to_string("postmaster.pid").ok()?;
    content.lines().next()?.trim().parse().ok()
}

#[cfg(unix)]
extern "C" fn stop_postgres_on_exit() {
    let stored_pid = PG_POSTMASTER_PID.load(Ordering::Relaxed);
    if stored_pid <= 0 {
        return;
    }

    // Only signal when postmaster.pid still names the stored process.
    let pid = match PG_DATA_DIR.get().and_then(|dir| read_postmaster_pid(dir)) {
        Some(current_pid) if current_pid == stored_pid => current_pid,
        _ => return,
    };

    // SAFETY: `pid` was validated against the on-disk `postmaster.pid`.
    unsafe {
        if libc::kill(pid, libc::SIGTERM) != 0 {
            return;
        }
    }

    for _ in 0..50 {
        std::thread::sleep(Duration::from_millis(100));
        // SAFETY: signal 0 only probes whether the process exists.
        if unsafe { libc::kill(pid, 0) } != 0 {
            return;
        }
    }

    // SAFETY: same validated pid; graceful shutdown budget expired.
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
}

#[cfg(unix)]
fn register_process_exit_cleanup(handle: &ClusterHandle) {
    let data_dir = &handle.settings().data_dir;
    let Some(pid) = read_postmaster_pid(data_dir) else {
        return;
    };

    if PG_POSTMASTER_PID
        .compare_exchange(0, pid, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }
    let _ = PG_DATA_DIR.set(data_dir.clone());

    // SAFETY: `stop_postgres_on_exit` is an `extern "C"` fn without
    // preconditions beyond the pid recorded above.
    let rc = unsafe { libc::atexit(stop_postgres_on_exit) };
    if rc != 0 {
        eprintln!("pg-embed: failed to register atexit handler (rc={rc}); PID {pid} may outlive the test binary");
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for atexit cleanup helpers.

    #[cfg(unix)]
    #[test]
    fn read_postmaster_pid_parses_first_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("postmaster.pid"), "12345\n/some/path\n5432\n")
            .expect("write");
        assert_eq!(super::read_postmaster_pid(dir.path()), Some(12345));
    }

    #[cfg(unix)]
    #[test]
    fn read_postmaster_pid_returns_none_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(super::read_postmaster_pid(dir.path()), None);
    }
}
