//! Host capability traits
//!
//! The refresher never talks to a database directly; it drives these two
//! seams. [`DatabaseHost`] covers command execution, schema introspection,
//! and transaction control. [`ModuleMigrator`] is the per-module migration
//! operation each embedding suite supplies, injected explicitly rather than
//! inherited.

use async_trait::async_trait;

use crate::RefreshResult;

/// Database capabilities the refresher requires from its host.
#[async_trait]
pub trait DatabaseHost: Send + Sync {
    /// Drop every table in the application schema.
    async fn drop_all_tables(&self) -> RefreshResult<()>;

    async fn has_table(&self, table: &str) -> RefreshResult<bool>;

    async fn truncate_table(&self, table: &str) -> RefreshResult<()>;

    /// Name of the migration tracking table.
    fn migration_table(&self) -> &str;

    /// Create the migration tracking table, empty.
    async fn install_migration_table(&self) -> RefreshResult<()>;

    /// Apply every migration file known to the application.
    async fn migrate_all(&self) -> RefreshResult<()>;

    /// Apply only root-level migration files.
    async fn migrate_root(&self) -> RefreshResult<()>;

    /// Number of transactions left open by earlier setup steps.
    ///
    /// Returns `None` when the host cannot track transactions; the refresher
    /// treats that as "nothing to commit", not as an error.
    async fn open_transactions(&self) -> RefreshResult<Option<usize>>;

    async fn commit_open_transactions(&self) -> RefreshResult<()>;

    /// Begin the transaction wrapping the upcoming test case. The suite's
    /// teardown rolls it back so test writes never persist.
    async fn begin_test_transaction(&self) -> RefreshResult<()>;

    /// Roll the test transaction back; the teardown half of
    /// [`begin_test_transaction`](DatabaseHost::begin_test_transaction).
    async fn rollback_test_transaction(&self) -> RefreshResult<()>;
}

/// Applies the migrations of a single module.
///
/// The refresher calls this once per module per process, in the order the
/// policy lists the modules. Suites with bespoke per-module tooling implement
/// this themselves; [`PostgresHost`](crate::postgres::PostgresHost) provides
/// a directory-convention implementation.
#[async_trait]
pub trait ModuleMigrator: Send + Sync {
    async fn run_module_migration(&self, module: &str) -> RefreshResult<()>;
}
