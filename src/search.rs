//! `afl search` and `afl find`: load a file, run one query, print it.
//!
//! Each invocation loads the dataset fresh, queries it once, and queues a
//! history entry. Invalid queries are rejected before any search runs and
//! are not logged.

use anyhow::{Context, Result};
use std::path::Path;

use affiliate_lookup_core::history::NewSearchHistory;
use affiliate_lookup_core::search::{exact_search, fuzzy_search, FuzzyQuery};

use crate::config::Config;
use crate::history::logger_from_config;
use crate::ingest::load_store;
use crate::present::{render_outcome, select};

pub async fn run_search(config: &Config, file: &Path, document_id: &str) -> Result<()> {
    let store = load_store(file, config)?;
    let dataset = store.dataset().context("no dataset loaded")?;

    let outcome = exact_search(dataset, document_id)?;
    print!("{}", render_outcome(&outcome));

    let logger = logger_from_config(config).await;
    logger.notify(NewSearchHistory::simple(document_id, &outcome));
    logger.shutdown().await;
    Ok(())
}

pub async fn run_find(
    config: &Config,
    file: &Path,
    query: FuzzyQuery,
    selection: Option<usize>,
) -> Result<()> {
    let store = load_store(file, config)?;
    let dataset = store.dataset().context("no dataset loaded")?;

    let outcome = fuzzy_search(dataset, &query)?;
    let entry = NewSearchHistory::advanced(&query, &outcome);

    let shown = match selection {
        Some(n) => select(outcome, n)?,
        None => outcome,
    };
    print!("{}", render_outcome(&shown));

    let logger = logger_from_config(config).await;
    logger.notify(entry);
    logger.shutdown().await;
    Ok(())
}
