//! Fire-and-forget search history logging.
//!
//! Searches never wait on the history log. [`HistoryLogger::notify`] pushes
//! an entry onto an unbounded channel and returns immediately; a spawned
//! task drains the channel into a [`HistorySink`]. Delivery failures are
//! logged and dropped, so a broken database or unreachable server can
//! never change a search result.
//!
//! ```text
//!  search ──notify()──▶ mpsc ──▶ task ──▶ HistorySink
//!                                          ├─ SqliteHistoryStore (local DB)
//!                                          └─ HttpHistorySink   (POST /api/search-history)
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use affiliate_lookup_core::history::NewSearchHistory;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteHistoryStore;

/// How long [`HistoryLogger::shutdown`] waits for queued entries.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Destination for history entries.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Short label used in log output.
    fn name(&self) -> &str;

    async fn record(&self, entry: NewSearchHistory) -> Result<()>;
}

#[async_trait]
impl HistorySink for SqliteHistoryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record(&self, entry: NewSearchHistory) -> Result<()> {
        self.add(entry).await.map(|_| ())
    }
}

/// Posts entries to a remote history server.
pub struct HttpHistorySink {
    client: reqwest::Client,
    url: String,
}

impl HttpHistorySink {
    /// `endpoint` is the server's base URL, e.g. `http://127.0.0.1:7341`.
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/api/search-history", endpoint.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl HistorySink for HttpHistorySink {
    fn name(&self) -> &str {
        "http"
    }

    async fn record(&self, entry: NewSearchHistory) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&entry)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.url))?
            .error_for_status()?;
        Ok(())
    }
}

/// Handle for queuing history entries.
pub struct HistoryLogger {
    tx: Option<mpsc::UnboundedSender<NewSearchHistory>>,
    worker: Option<JoinHandle<usize>>,
}

impl HistoryLogger {
    /// Start a background task that forwards entries to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn HistorySink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<NewSearchHistory>();
        let worker = tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(entry) = rx.recv().await {
                match sink.record(entry).await {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::warn!(sink = sink.name(), error = %e, "failed to record search history"),
                }
            }
            delivered
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// A logger that discards every entry.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            worker: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue an entry. Never blocks and never fails.
    pub fn notify(&self, entry: NewSearchHistory) {
        if let Some(tx) = &self.tx {
            if tx.send(entry).is_err() {
                tracing::debug!("history worker has stopped; entry dropped");
            }
        }
    }

    /// Close the queue and wait (bounded) for pending entries to flush.
    ///
    /// Returns the number of entries the sink accepted.
    pub async fn shutdown(mut self) -> usize {
        drop(self.tx.take());
        let Some(worker) = self.worker.take() else {
            return 0;
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, worker).await {
            Ok(Ok(delivered)) => delivered,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "history worker panicked");
                0
            }
            Err(_) => {
                tracing::warn!("timed out flushing search history");
                0
            }
        }
    }
}

/// Build a logger from `[history]` settings.
///
/// A remote `endpoint` wins over the local database. If the database
/// cannot be opened the logger is disabled with a warning rather than
/// failing the caller.
pub async fn logger_from_config(config: &Config) -> HistoryLogger {
    if !config.history.enabled {
        return HistoryLogger::disabled();
    }

    if let Some(endpoint) = &config.history.endpoint {
        return HistoryLogger::spawn(Arc::new(HttpHistorySink::new(endpoint)));
    }

    match open_local_store(config).await {
        Ok(store) => HistoryLogger::spawn(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "search history disabled: could not open database");
            HistoryLogger::disabled()
        }
    }
}

async fn open_local_store(config: &Config) -> Result<SqliteHistoryStore> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    Ok(SqliteHistoryStore::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_lookup_core::search::SearchOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        seen: Mutex<Vec<NewSearchHistory>>,
    }

    #[async_trait]
    impl HistorySink for CollectingSink {
        fn name(&self) -> &str {
            "collect"
        }

        async fn record(&self, entry: NewSearchHistory) -> Result<()> {
            self.seen.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl HistorySink for FailingSink {
        fn name(&self) -> &str {
            "fail"
        }

        async fn record(&self, _entry: NewSearchHistory) -> Result<()> {
            anyhow::bail!("unreachable")
        }
    }

    #[tokio::test]
    async fn test_entries_delivered_in_order() {
        let sink = Arc::new(CollectingSink::default());
        let logger = HistoryLogger::spawn(sink.clone());
        logger.notify(NewSearchHistory::simple("1", &SearchOutcome::NotFound));
        logger.notify(NewSearchHistory::simple("2", &SearchOutcome::NotFound));
        assert_eq!(logger.shutdown().await, 2);

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen[0].search_params["documento"], "1");
        assert_eq!(seen[1].search_params["documento"], "2");
    }

    #[tokio::test]
    async fn test_sink_failures_are_swallowed() {
        let logger = HistoryLogger::spawn(Arc::new(FailingSink));
        logger.notify(NewSearchHistory::simple("1", &SearchOutcome::NotFound));
        assert_eq!(logger.shutdown().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_logger_discards() {
        let logger = HistoryLogger::disabled();
        assert!(!logger.is_enabled());
        logger.notify(NewSearchHistory::simple("1", &SearchOutcome::NotFound));
        assert_eq!(logger.shutdown().await, 0);
    }

    #[tokio::test]
    async fn test_minimal_config_gives_disabled_logger() {
        let logger = logger_from_config(&Config::minimal()).await;
        assert!(!logger.is_enabled());
    }
}
