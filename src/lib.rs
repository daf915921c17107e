//! # Affiliate Lookup
//!
//! Load an affiliate spreadsheet, find members by document number or by a
//! combination of name, phone, provider, and category, and keep an audit
//! log of every search.
//!
//! The search core (record model, schema validation, record store, and
//! search engine) lives in [`affiliate_lookup_core`], re-exported here.
//! This crate adds everything with I/O: file decoding, the SQLite
//! history store, the background history logger, the HTTP history server,
//! and the `afl` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌───────────────┐
//! │ .xlsx/.csv/  │──▶│  extract   │──▶│ schema +      │
//! │ .json file   │   │ (rows)     │   │ RecordStore   │
//! └──────────────┘   └────────────┘   └───────┬───────┘
//!                                             │ exact / fuzzy
//!                                             ▼
//!                      ┌──────────┐     ┌──────────┐
//!                      │ present  │◀────│  search  │
//!                      └──────────┘     └────┬─────┘
//!                                            │ notify (mpsc)
//!                                            ▼
//!                               ┌──────────────────────────┐
//!                               │ HistoryLogger            │
//!                               │  → SQLite | HTTP server  │
//!                               └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! afl init                                   # create the history database
//! afl inspect afiliados.xlsx                 # check the columns
//! afl search afiliados.xlsx 1077123456       # exact lookup
//! afl find afiliados.xlsx --names ana --provider centro
//! afl export afiliados.xlsx 1077123456 --admission 2024-03-07
//! afl history --limit 5
//! afl serve                                  # history REST API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Spreadsheet decoding into rows |
//! | [`ingest`] | File → validated dataset → record store |
//! | [`search`] | `search` / `find` commands |
//! | [`present`] | Terminal rendering of outcomes |
//! | [`export`] | Printable proof and JSON export |
//! | [`history`] | Fire-and-forget history logger |
//! | [`sqlite_store`] | SQLite history persistence |
//! | [`server`] | History HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logging`] | `tracing` subscriber setup |

pub use affiliate_lookup_core;

pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod present;
pub mod search;
pub mod server;
pub mod sqlite_store;
