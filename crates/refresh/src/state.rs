//! Process-wide refresh state
//!
//! Tracks which expensive database-preparation steps have already executed in
//! the current test process. The whole point of this state is that it outlives
//! individual test cases: the first test pays for the wipe and the migrations,
//! every later test skips them.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

/// Which database-preparation steps have run in this process.
///
/// Every flag moves from `false` to `true` at most once per process; nothing
/// resets a flag short of restarting the test binary. A module absent from
/// the map counts as not yet migrated.
#[derive(Debug, Default)]
pub struct RefreshState {
    /// The database is fully migrated; set only by the migrate-everything
    /// path, after which the entire refresh block is skipped.
    pub(crate) migrated: bool,
    pub(crate) tables_dropped: bool,
    pub(crate) migration_schema_created: bool,
    pub(crate) root_migrated: bool,
    pub(crate) modules_migrated: HashMap<String, bool>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared instance for this test process.
    ///
    /// Constructed once, on first use, and shared by every test case in the
    /// binary. Suites that want full control can construct their own
    /// [`RefreshState`] instead and thread it through setup themselves.
    pub fn process() -> &'static Mutex<RefreshState> {
        static STATE: Lazy<Mutex<RefreshState>> = Lazy::new(|| Mutex::new(RefreshState::new()));
        &STATE
    }

    pub fn is_migrated(&self) -> bool {
        self.migrated
    }

    pub fn tables_dropped(&self) -> bool {
        self.tables_dropped
    }

    pub fn migration_schema_created(&self) -> bool {
        self.migration_schema_created
    }

    pub fn root_migrated(&self) -> bool {
        self.root_migrated
    }

    pub fn module_migrated(&self, module: &str) -> bool {
        self.modules_migrated.get(module).copied().unwrap_or(false)
    }
}
