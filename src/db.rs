//! SQLite connection for the search-history database.
//!
//! The CLI and `afl serve` may write to the same file at once, so the pool
//! runs in WAL mode and waits on a locked database instead of failing.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::Config;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }

    // `filename` takes the path as-is; a `sqlite:` URL would treat `?` and `#` specially.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open history database {}", db_path.display()))?;

    tracing::debug!(path = %db_path.display(), "history database opened");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_connect_creates_nested_directory() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = Config::minimal();
        cfg.db.path = tmp.path().join("a #1").join("b?x").join("afl.sqlite");

        let pool = connect(&cfg).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        pool.close().await;

        assert!(cfg.db.path.exists());
    }

    #[tokio::test]
    async fn test_connect_reports_unusable_path() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut cfg = Config::minimal();
        cfg.db.path = blocker.join("afl.sqlite");

        let err = connect(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("Failed to create database directory"), "{}", err);
    }
}
