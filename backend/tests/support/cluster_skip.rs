//! Helpers for controlling embedded test cluster behaviour.
//!
//! Suites that need embedded PostgreSQL are skipped with a marker when the
//! cluster cannot start, unless `REQUIRE_TEST_CLUSTER` is truthy, in which
//! case setup failure fails the test so CI breakage is not masked.

/// Returns true when the `REQUIRE_TEST_CLUSTER` environment variable is set
/// to a truthy value.
///
/// Truthy values: "1", "true", "yes" (case-insensitive).
pub fn test_cluster_required() -> bool {
    std::env::var("REQUIRE_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles embedded cluster setup failures consistently across suites.
///
/// Prints a skip marker and returns `None`, or panics when the cluster is
/// required.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if test_cluster_required() {
        panic!("Test cluster setup failed: {reason}. Unset REQUIRE_TEST_CLUSTER to skip.");
    }
    eprintln!("SKIP-TEST-CLUSTER: {reason}");
    None
}
