//! # elif-refresh - Module-Aware Test Database Refresh
//!
//! Keeps expensive database preparation out of the per-test hot path for
//! elif.rs applications that are split into a root schema plus independently
//! migratable modules. Within one test process the destructive wipe, the
//! migration-tracking table setup, and each migration command run at most
//! once, no matter how many test cases call into the refresher.
//!
//! ## Features
//!
//! - **Migration state gate**: a process-wide [`RefreshState`] makes the
//!   wipe, schema-create, and migrate steps idempotent across test cases
//! - **Module awareness**: root migrations and per-module migrations are
//!   tracked independently, so each module migrates exactly once
//! - **Pluggable hosts**: [`DatabaseHost`] and [`ModuleMigrator`] seams with
//!   a sqlx/Postgres implementation included
//! - **Policy hooks**: per-suite overrides for migrate-all, migrate-root,
//!   and module selection
//!
//! ## Quick Start
//!
//! ```no_run
//! use elif_refresh::prelude::*;
//!
//! # async fn setup() -> RefreshResult<()> {
//! let host = PostgresHost::connect(RefreshConfig::default()).await?;
//! let policy = DefaultPolicy;
//! let refresher = DatabaseRefresher::new(&host, &host, &policy);
//!
//! let mut state = RefreshState::process().lock().await;
//! refresher.prepare_for_test(&mut state).await?;
//! # Ok(())
//! # }
//! ```

pub mod host;
pub mod migrations;
pub mod policy;
pub mod postgres;
pub mod refresh;
pub mod state;

// Re-export commonly used types
pub use host::{DatabaseHost, ModuleMigrator};
pub use migrations::{load_migrations, MigrationApplier, MigrationFile};
pub use policy::{DefaultPolicy, RefreshPolicy};
pub use postgres::{PostgresHost, RefreshConfig};
pub use refresh::DatabaseRefresher;
pub use state::RefreshState;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        host::{DatabaseHost, ModuleMigrator},
        policy::{DefaultPolicy, RefreshPolicy},
        postgres::{PostgresHost, RefreshConfig},
        refresh::DatabaseRefresher,
        state::RefreshState,
        RefreshError, RefreshResult,
    };
}

// Error handling
#[derive(thiserror::Error, Debug)]
pub enum RefreshError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Module '{module}' migration failed: {message}")]
    Module { module: String, message: String },

    #[error("Test setup error: {0}")]
    Setup(String),
}

pub type RefreshResult<T> = Result<T, RefreshError>;
