//! SQLite-backed search-history store.
//!
//! JSON payloads (`search_params`, `result_data`) are stored as text.
//! Timestamps are RFC 3339 UTC with fixed microsecond precision so the
//! text column sorts chronologically.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use affiliate_lookup_core::history::{NewSearchHistory, SearchHistoryEntry, SearchType};

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist an entry with a fresh id and the current time.
    pub async fn add(&self, entry: NewSearchHistory) -> Result<SearchHistoryEntry> {
        let entry = entry.into_entry(Utc::now());

        let result_data = entry
            .result_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO search_history (id, search_type, search_params, result_found, result_data, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.search_type.as_str())
        .bind(serde_json::to_string(&entry.search_params)?)
        .bind(&entry.result_found)
        .bind(result_data)
        .bind(format_ts(&entry.timestamp))
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Up to `limit` entries, newest first.
    pub async fn list(&self, limit: i64) -> Result<Vec<SearchHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, search_type, search_params, result_found, result_data, timestamp
            FROM search_history
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn entry_from_row(row: &SqliteRow) -> Result<SearchHistoryEntry> {
    let id: String = row.get("id");
    let search_type: String = row.get("search_type");
    let search_params: String = row.get("search_params");
    let result_data: Option<String> = row.get("result_data");
    let timestamp: String = row.get("timestamp");

    Ok(SearchHistoryEntry {
        search_type: SearchType::parse(&search_type)
            .ok_or_else(|| anyhow!("unknown search_type '{}' in entry {}", search_type, id))?,
        search_params: serde_json::from_str(&search_params)
            .with_context(|| format!("corrupt search_params in entry {}", id))?,
        result_found: row.get("result_found"),
        result_data: result_data
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .with_context(|| format!("corrupt result_data in entry {}", id))?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .with_context(|| format!("corrupt timestamp in entry {}", id))?
            .with_timezone(&Utc),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use affiliate_lookup_core::search::SearchOutcome;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteHistoryStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::apply(&pool).await.unwrap();
        SqliteHistoryStore::new(pool)
    }

    #[tokio::test]
    async fn test_add_then_list_roundtrip() {
        let store = memory_store().await;
        let saved = store
            .add(NewSearchHistory::simple("123", &SearchOutcome::NotFound))
            .await
            .unwrap();

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert_eq!(listed[0].search_type, SearchType::Simple);
        assert_eq!(listed[0].result_found, "false");
        assert_eq!(listed[0].result_data, None);
        assert_eq!(listed[0].search_params["documento"], "123");
    }

    #[tokio::test]
    async fn test_list_newest_first_and_limited() {
        let store = memory_store().await;
        for doc in ["1", "2", "3"] {
            store
                .add(NewSearchHistory::simple(doc, &SearchOutcome::NotFound))
                .await
                .unwrap();
        }
        let listed = store.list(2).await.unwrap();
        let docs: Vec<&str> = listed
            .iter()
            .map(|e| e.search_params["documento"].as_str().unwrap())
            .collect();
        assert_eq!(docs, vec!["3", "2"]);
    }
}
