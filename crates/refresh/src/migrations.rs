//! Migration file loading and applying
//!
//! Loads `<timestamp>_<name>.sql` files from a directory and applies the
//! pending ones against the migration tracking table. Files may carry
//! `-- up` / `-- down` section markers; only the up section is executed, and
//! a file without markers is treated as entirely up-SQL.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::{RefreshError, RefreshResult};

/// A parsed migration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationFile {
    /// File stem (`<timestamp>_<name>`); the sort key and tracking id.
    pub id: String,
    /// Human-readable name derived from the filename.
    pub name: String,
    /// SQL applied when migrating.
    pub up_sql: String,
}

/// Load every `*.sql` file in `dir`, sorted by id.
///
/// A missing directory is treated as having no migrations.
pub fn load_migrations(dir: &Path) -> RefreshResult<Vec<MigrationFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        RefreshError::Migration(format!(
            "failed to read migrations directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| RefreshError::Migration(format!("failed to read directory entry: {}", e)))?;

        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "sql") {
            migrations.push(parse_migration_file(&path)?);
        }
    }

    migrations.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(migrations)
}

fn parse_migration_file(path: &Path) -> RefreshResult<MigrationFile> {
    let content = fs::read_to_string(path).map_err(|e| {
        RefreshError::Migration(format!(
            "failed to read migration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            RefreshError::Migration(format!("invalid migration filename: {}", path.display()))
        })?;

    let (_, name) = stem.split_once('_').ok_or_else(|| {
        RefreshError::Migration(format!(
            "migration filename must follow <timestamp>_<name>: {}",
            path.display()
        ))
    })?;

    Ok(MigrationFile {
        id: stem.to_string(),
        name: name.replace('_', " "),
        up_sql: up_section(&content),
    })
}

fn up_section(content: &str) -> String {
    enum Section {
        Preamble,
        Up,
        Down,
    }

    let mut section = Section::Preamble;
    let mut saw_marker = false;
    let mut up_lines = Vec::new();
    let mut all_lines = Vec::new();

    for line in content.lines() {
        let marker = line.trim().to_ascii_lowercase();
        if marker.starts_with("-- up") {
            section = Section::Up;
            saw_marker = true;
            continue;
        }
        if marker.starts_with("-- down") {
            section = Section::Down;
            saw_marker = true;
            continue;
        }

        if line.trim().is_empty() || line.trim_start().starts_with("--") {
            continue;
        }

        all_lines.push(line);
        if matches!(section, Section::Up) {
            up_lines.push(line);
        }
    }

    let lines = if saw_marker { up_lines } else { all_lines };
    lines.join("\n").trim().to_string()
}

/// Split migration SQL into executable statements.
///
/// Falls back to naive semicolon splitting when the SQL does not parse.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    match Parser::parse_sql(&GenericDialect {}, sql) {
        Ok(statements) => statements
            .into_iter()
            .map(|stmt| format!("{};", stmt))
            .collect(),
        Err(e) => {
            warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("{};", s))
                .collect()
        }
    }
}

/// Applies pending migration files and records them in the tracking table.
pub struct MigrationApplier<'a> {
    pool: &'a PgPool,
    table: &'a str,
}

impl<'a> MigrationApplier<'a> {
    pub fn new(pool: &'a PgPool, table: &'a str) -> Self {
        Self { pool, table }
    }

    /// Apply every pending migration under `dir`. Returns how many ran.
    pub async fn apply_dir(&self, dir: &Path) -> RefreshResult<usize> {
        let migrations = load_migrations(dir)?;
        if migrations.is_empty() {
            return Ok(0);
        }

        let applied = self.applied_ids().await?;
        let batch = self.next_batch().await?;
        let mut count = 0;

        for migration in migrations.iter().filter(|m| !applied.contains(&m.id)) {
            self.apply(migration, batch).await?;
            count += 1;
        }

        Ok(count)
    }

    /// Apply one migration in its own transaction and record it.
    async fn apply(&self, migration: &MigrationFile, batch: i32) -> RefreshResult<()> {
        info!(id = %migration.id, "applying migration");

        let mut transaction = self.pool.begin().await?;

        for statement in split_sql_statements(&migration.up_sql) {
            sqlx::query(&statement)
                .execute(&mut *transaction)
                .await
                .map_err(|e| {
                    RefreshError::Migration(format!(
                        "failed to execute migration {}: {}",
                        migration.id, e
                    ))
                })?;
        }

        sqlx::query(&format!(
            "INSERT INTO {} (id, applied_at, batch) VALUES ($1, $2, $3)",
            self.table
        ))
        .bind(&migration.id)
        .bind(Utc::now().naive_utc())
        .bind(batch)
        .execute(&mut *transaction)
        .await
        .map_err(|e| {
            RefreshError::Migration(format!("failed to record migration {}: {}", migration.id, e))
        })?;

        transaction.commit().await?;
        Ok(())
    }

    async fn applied_ids(&self) -> RefreshResult<HashSet<String>> {
        let rows = sqlx::query(&format!("SELECT id FROM {}", self.table))
            .fetch_all(self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get("id").map_err(RefreshError::from))
            .collect()
    }

    async fn next_batch(&self) -> RefreshResult<i32> {
        let row = sqlx::query(&format!("SELECT COALESCE(MAX(batch), 0) FROM {}", self.table))
            .fetch_one(self.pool)
            .await?;

        let latest: i32 = row.try_get(0).unwrap_or(0);
        Ok(latest + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_migration(dir: &Path, filename: &str, content: &str) {
        fs::write(dir.join(filename), content).unwrap();
    }

    #[test]
    fn test_missing_directory_has_no_migrations() {
        let migrations = load_migrations(Path::new("does/not/exist")).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_migrations_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        write_migration(dir.path(), "20240102_create_posts.sql", "CREATE TABLE posts (id INT);");
        write_migration(dir.path(), "20240101_create_users.sql", "CREATE TABLE users (id INT);");
        write_migration(dir.path(), "notes.txt", "not a migration");

        let migrations = load_migrations(dir.path()).unwrap();
        let ids: Vec<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["20240101_create_users", "20240102_create_posts"]);
        assert_eq!(migrations[0].name, "create users");
    }

    #[test]
    fn test_filename_without_timestamp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_migration(dir.path(), "users.sql", "CREATE TABLE users (id INT);");

        let result = load_migrations(dir.path());
        assert!(matches!(result, Err(RefreshError::Migration(_))));
    }

    #[test]
    fn test_up_section_extraction() {
        let content = "\
-- Migration: create users
-- up
CREATE TABLE users (id INT);

-- down
DROP TABLE users;
";
        assert_eq!(up_section(content), "CREATE TABLE users (id INT);");
    }

    #[test]
    fn test_file_without_markers_is_all_up_sql() {
        let content = "CREATE TABLE users (id INT);\nCREATE TABLE posts (id INT);";
        assert_eq!(up_section(content), content);
    }

    #[test]
    fn test_split_parses_multiple_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT)";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.ends_with(';')));
    }

    #[test]
    fn test_split_falls_back_on_unparsable_sql() {
        let sql = "INSERT INTO t VALUES ('unterminated";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].ends_with(';'));
    }
}
