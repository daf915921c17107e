//! Single-dataset record store.
//!
//! A [`RecordStore`] owns at most one [`Dataset`]. Loading replaces the
//! previous dataset wholesale; there is no merge and no per-record update.
//! The store is an explicit value handed to callers, never process-wide
//! state.
//!
//! While a new file is being decoded the store is marked as ingesting and
//! [`RecordStore::is_searchable`] reports `false`, so frontends can gate
//! search input without holding a lock.

use crate::models::AffiliateRecord;

/// Ordered, immutable collection of records from one loaded source.
///
/// Order is the source row order and is never changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    records: Vec<AffiliateRecord>,
}

impl Dataset {
    pub fn new(records: Vec<AffiliateRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AffiliateRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AffiliateRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[AffiliateRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a AffiliateRecord;
    type IntoIter = std::slice::Iter<'a, AffiliateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Holder for the current session's dataset.
#[derive(Debug, Default)]
pub struct RecordStore {
    dataset: Option<Dataset>,
    ingesting: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any existing dataset. Also ends an in-flight ingest.
    pub fn load(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
        self.ingesting = false;
    }

    pub fn clear(&mut self) {
        self.dataset = None;
    }

    pub fn size(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::len)
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Mark the start of a new ingest; search is disabled until it finishes.
    pub fn begin_ingest(&mut self) {
        self.ingesting = true;
    }

    /// Finish an ingest. A successful result replaces the dataset; a failed
    /// one leaves the store empty.
    pub fn finish_ingest<E>(&mut self, result: Result<Dataset, E>) -> Result<usize, E> {
        self.ingesting = false;
        match result {
            Ok(dataset) => {
                let n = dataset.len();
                self.load(dataset);
                Ok(n)
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    pub fn is_ingesting(&self) -> bool {
        self.ingesting
    }

    /// True when a dataset is loaded and no ingest is in flight.
    pub fn is_searchable(&self) -> bool {
        self.is_loaded() && !self.ingesting
    }
}
