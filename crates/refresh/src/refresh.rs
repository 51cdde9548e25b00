//! The migration state gate
//!
//! One entry point, [`DatabaseRefresher::prepare_for_test`], invoked at the
//! start of every test case. Each expensive preparation step is guarded by a
//! [`RefreshState`] flag so it executes at most once per test process; the
//! actual work is delegated to the host capabilities.

use tracing::{debug, info};

use crate::host::{DatabaseHost, ModuleMigrator};
use crate::policy::RefreshPolicy;
use crate::state::RefreshState;
use crate::RefreshResult;

/// Coordinates wipe and migration work across the test cases of one process.
pub struct DatabaseRefresher<'a, H, M, P>
where
    H: DatabaseHost,
    M: ModuleMigrator,
    P: RefreshPolicy,
{
    host: &'a H,
    modules: &'a M,
    policy: &'a P,
}

impl<'a, H, M, P> DatabaseRefresher<'a, H, M, P>
where
    H: DatabaseHost,
    M: ModuleMigrator,
    P: RefreshPolicy,
{
    pub fn new(host: &'a H, modules: &'a M, policy: &'a P) -> Self {
        Self {
            host,
            modules,
            policy,
        }
    }

    /// Prepare the database for the next test case.
    ///
    /// On the first call this wipes the database, sets up the migration
    /// tracking table, and runs whatever migrations the policy asks for;
    /// later calls skip the steps that already completed. Every call begins
    /// the test-scoped transaction and commits any transaction a prior setup
    /// step left open, so the test's own wrapper never nests.
    ///
    /// A failing host operation propagates immediately and leaves its flag
    /// unset, so only a fresh process retries it. If the failed command had
    /// already half-applied schema changes, that retry may hit "already
    /// exists" errors; recovering from such wreckage is up to the suite.
    pub async fn prepare_for_test(&self, state: &mut RefreshState) -> RefreshResult<()> {
        if !state.migrated {
            self.drop_all_database_tables(state).await?;
            self.create_empty_migration_schema(state).await?;
            self.run_migrations(state).await?;
        }

        self.host.begin_test_transaction().await?;

        if let Some(open) = self.host.open_transactions().await? {
            if open > 0 {
                debug!(open, "committing transactions left open by setup");
                self.host.commit_open_transactions().await?;
            }
        }

        Ok(())
    }

    async fn drop_all_database_tables(&self, state: &mut RefreshState) -> RefreshResult<()> {
        if state.tables_dropped {
            debug!("tables already dropped this process");
            return Ok(());
        }

        info!("dropping all database tables");
        self.host.drop_all_tables().await?;
        state.tables_dropped = true;
        Ok(())
    }

    async fn create_empty_migration_schema(&self, state: &mut RefreshState) -> RefreshResult<()> {
        if state.migration_schema_created {
            return Ok(());
        }

        let table = self.host.migration_table();
        if self.host.has_table(table).await? {
            info!(table, "truncating migration tracking table");
            self.host.truncate_table(table).await?;
        } else {
            info!(table, "installing migration tracking table");
            self.host.install_migration_table().await?;
        }

        state.migration_schema_created = true;
        Ok(())
    }

    async fn run_migrations(&self, state: &mut RefreshState) -> RefreshResult<()> {
        if self.policy.migrate_all_files() {
            return self.migrate_all_files(state).await;
        }

        self.migrate_root_files(state).await?;
        self.migrate_module_files(state).await
    }

    async fn migrate_all_files(&self, state: &mut RefreshState) -> RefreshResult<()> {
        info!("migrating all database files");
        self.host.migrate_all().await?;
        state.migrated = true;
        Ok(())
    }

    async fn migrate_root_files(&self, state: &mut RefreshState) -> RefreshResult<()> {
        if !self.policy.migrate_root_files() || state.root_migrated {
            return Ok(());
        }

        info!("migrating root database files");
        self.host.migrate_root().await?;
        state.root_migrated = true;
        Ok(())
    }

    async fn migrate_module_files(&self, state: &mut RefreshState) -> RefreshResult<()> {
        for module in self.policy.modules_to_migrate() {
            state.modules_migrated.entry(module.clone()).or_insert(false);

            if state.module_migrated(&module) {
                debug!(module = %module, "module already migrated this process");
                continue;
            }

            info!(module = %module, "migrating module");
            self.modules.run_module_migration(&module).await?;
            state.modules_migrated.insert(module, true);
        }

        Ok(())
    }
}
