//! # Affiliate Lookup Core
//!
//! Pure, I/O-free logic for Affiliate Lookup: the affiliate record model,
//! dataset schema validation, the single-dataset record store, the exact and
//! fuzzy search engine, and the search-history payload types shared by the
//! CLI and the history server.
//!
//! This crate contains no tokio, sqlx, or filesystem dependencies. Every
//! operation here is a synchronous call over data already in memory.
//!
//! ```rust
//! use affiliate_lookup_core::models::Row;
//! use affiliate_lookup_core::schema::validate;
//! use affiliate_lookup_core::search::{exact_search, SearchOutcome};
//! use affiliate_lookup_core::store::RecordStore;
//! use serde_json::json;
//!
//! let row: Row = serde_json::from_value(json!({
//!     "TIP_DOC": "CC", "DOC": "123", "PRIMER_APE": "Mena", "SEGUNDO_APE": "",
//!     "PRIMER_NOM": "Ana", "SEGUNDO_NOM": "", "FEC_NAC": "1990-01-01", "EDAD": 34,
//!     "SEXO": "F", "TELEFONO": "3001234567", "PRESTADOR": "Hospital Centro",
//!     "CATEGORIA": "A", "CUOTA MOD": "1"
//! })).unwrap();
//!
//! let mut store = RecordStore::new();
//! store.load(validate(vec![row]).unwrap());
//!
//! let dataset = store.dataset().unwrap();
//! let outcome = exact_search(dataset, "123").unwrap();
//! assert!(matches!(outcome, SearchOutcome::Single(r) if r.first_name1 == "Ana"));
//! ```

pub mod history;
pub mod models;
pub mod schema;
pub mod search;
pub mod store;
