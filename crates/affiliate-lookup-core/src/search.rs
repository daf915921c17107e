//! Exact and fuzzy search over a [`Dataset`].
//!
//! Both operations are pure functions of `(dataset, query)`: no shared
//! state, no side effects, no clock. Results always come back in dataset
//! order.
//!
//! # Exact search
//!
//! Trimmed document id equality, case-sensitive. The first matching record
//! wins, so exact search yields [`SearchOutcome::Single`] or
//! [`SearchOutcome::NotFound`], never `Multiple`, even when ids repeat.
//!
//! # Fuzzy search
//!
//! Each non-empty field of a [`FuzzyQuery`] must be a case-insensitive
//! substring of the corresponding record field(s); all present criteria
//! are AND-ed. Absent or empty criteria do not constrain the result. A
//! whitespace-only value is still a criterion, but a query made only of
//! whitespace is rejected as having no criteria.
//!
//! | Query field | Matched against |
//! |-------------|-----------------|
//! | `document_id` | `DOC` |
//! | `full_name_given` | `"{PRIMER_NOM} {SEGUNDO_NOM}"` |
//! | `full_name_family` | `"{PRIMER_APE} {SEGUNDO_APE}"` |
//! | `phone` | `TELEFONO` |
//! | `provider` | `PRESTADOR` |
//! | `category` | `CATEGORIA` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AffiliateRecord;
use crate::store::Dataset;

/// A query that carries no usable criteria. No search is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidQueryError {
    #[error("a document number is required")]
    EmptyDocumentId,
    #[error("at least one search field must be filled in")]
    NoCriteria,
}

/// Exact lookup by document id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExactQuery {
    pub document_id: String,
}

/// Multi-field substring query. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FuzzyQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name_given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Which record field(s) a fuzzy criterion is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyField {
    DocumentId,
    FullNameGiven,
    FullNameFamily,
    Phone,
    Provider,
    Category,
}

impl FuzzyField {
    pub fn name(self) -> &'static str {
        match self {
            FuzzyField::DocumentId => "document_id",
            FuzzyField::FullNameGiven => "full_name_given",
            FuzzyField::FullNameFamily => "full_name_family",
            FuzzyField::Phone => "phone",
            FuzzyField::Provider => "provider",
            FuzzyField::Category => "category",
        }
    }

    fn haystack(self, record: &AffiliateRecord) -> String {
        match self {
            FuzzyField::DocumentId => record.document_id.to_lowercase(),
            FuzzyField::FullNameGiven => record.given_names().to_lowercase(),
            FuzzyField::FullNameFamily => record.family_names().to_lowercase(),
            FuzzyField::Phone => record.phone.to_lowercase(),
            FuzzyField::Provider => record.provider.to_lowercase(),
            FuzzyField::Category => record.category.to_lowercase(),
        }
    }
}

impl FuzzyQuery {
    /// Non-empty criteria paired with the field they constrain.
    ///
    /// Values are returned untrimmed, so `"  "` constrains a match.
    pub fn criteria(&self) -> Vec<(FuzzyField, &str)> {
        [
            (FuzzyField::DocumentId, &self.document_id),
            (FuzzyField::FullNameGiven, &self.full_name_given),
            (FuzzyField::FullNameFamily, &self.full_name_family),
            (FuzzyField::Phone, &self.phone),
            (FuzzyField::Provider, &self.provider),
            (FuzzyField::Category, &self.category),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
        .collect()
    }

    /// True when every field is absent, empty, or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.criteria().iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Tagged search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    Exact(ExactQuery),
    Fuzzy(FuzzyQuery),
}

/// Result of a well-formed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<'a> {
    NotFound,
    Single(&'a AffiliateRecord),
    /// Two or more records, in dataset order.
    Multiple(Vec<&'a AffiliateRecord>),
}

impl<'a> SearchOutcome<'a> {
    fn from_matches(mut matches: Vec<&'a AffiliateRecord>) -> Self {
        match matches.len() {
            0 => SearchOutcome::NotFound,
            1 => SearchOutcome::Single(matches.remove(0)),
            _ => SearchOutcome::Multiple(matches),
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, SearchOutcome::NotFound)
    }

    pub fn len(&self) -> usize {
        match self {
            SearchOutcome::NotFound => 0,
            SearchOutcome::Single(_) => 1,
            SearchOutcome::Multiple(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First record in dataset order, if any.
    pub fn first(&self) -> Option<&'a AffiliateRecord> {
        match self {
            SearchOutcome::NotFound => None,
            SearchOutcome::Single(record) => Some(*record),
            SearchOutcome::Multiple(records) => records.first().copied(),
        }
    }

    pub fn records(&self) -> Vec<&'a AffiliateRecord> {
        match self {
            SearchOutcome::NotFound => Vec::new(),
            SearchOutcome::Single(record) => vec![*record],
            SearchOutcome::Multiple(records) => records.clone(),
        }
    }
}

/// Look up the first record whose trimmed document id equals the trimmed
/// input.
pub fn exact_search<'a>(
    dataset: &'a Dataset,
    document_id: &str,
) -> Result<SearchOutcome<'a>, InvalidQueryError> {
    let key = document_id.trim();
    if key.is_empty() {
        return Err(InvalidQueryError::EmptyDocumentId);
    }

    Ok(dataset
        .iter()
        .find(|record| record.document_id.trim() == key)
        .map_or(SearchOutcome::NotFound, SearchOutcome::Single))
}

/// Return every record matching all non-empty criteria, in dataset order.
pub fn fuzzy_search<'a>(
    dataset: &'a Dataset,
    query: &FuzzyQuery,
) -> Result<SearchOutcome<'a>, InvalidQueryError> {
    if query.is_blank() {
        return Err(InvalidQueryError::NoCriteria);
    }
    let criteria: Vec<(FuzzyField, String)> = query
        .criteria()
        .into_iter()
        .map(|(field, value)| (field, value.to_lowercase()))
        .collect();

    let matches: Vec<&AffiliateRecord> = dataset
        .iter()
        .filter(|record| {
            criteria
                .iter()
                .all(|(field, needle)| field.haystack(record).contains(needle.as_str()))
        })
        .collect();

    Ok(SearchOutcome::from_matches(matches))
}

/// Dispatch a [`SearchQuery`] to the matching operation.
pub fn search<'a>(
    dataset: &'a Dataset,
    query: &SearchQuery,
) -> Result<SearchOutcome<'a>, InvalidQueryError> {
    match query {
        SearchQuery::Exact(q) => exact_search(dataset, &q.document_id),
        SearchQuery::Fuzzy(q) => fuzzy_search(dataset, q),
    }
}
