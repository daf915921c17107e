use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and schema, then close the pool.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema setup on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_history (
            id TEXT PRIMARY KEY,
            search_type TEXT NOT NULL,
            search_params TEXT NOT NULL,
            result_found TEXT NOT NULL,
            result_data TEXT,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_search_history_timestamp ON search_history(timestamp DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
