//! Refresh policy hooks
//!
//! Test suites override these to declare which migrations their process
//! needs. The defaults are conservative: nothing migrates unless a suite
//! says so, or the migrate-everything environment switch is on.

use std::env;

/// Environment variable consulted by the default [`RefreshPolicy::migrate_all_files`].
pub const MIGRATE_ALL_ENV: &str = "ELIF_TEST_MIGRATE_ALL";

/// Per-suite migration policy.
pub trait RefreshPolicy {
    /// Migrate every migration file, root and modules alike, with one
    /// monolithic command. Defaults to the `ELIF_TEST_MIGRATE_ALL`
    /// environment setting.
    fn migrate_all_files(&self) -> bool {
        env_flag(MIGRATE_ALL_ENV)
    }

    /// Apply root-level migration files. Off by default.
    fn migrate_root_files(&self) -> bool {
        false
    }

    /// Modules whose migrations this suite needs, in application order.
    fn modules_to_migrate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Policy with every hook left at its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl RefreshPolicy for DefaultPolicy {}

pub(crate) fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}
