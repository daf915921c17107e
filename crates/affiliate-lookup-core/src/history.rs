//! Search-history payloads.
//!
//! Shared by the CLI (which builds entries from search outcomes) and the
//! history server (which validates incoming bodies). Field names on the
//! wire are camelCase: `searchType`, `searchParams`, `resultFound`,
//! `resultData`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::search::{FuzzyQuery, SearchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Simple,
    Advanced,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Simple => "simple",
            SearchType::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(SearchType::Simple),
            "advanced" => Some(SearchType::Advanced),
            _ => None,
        }
    }
}

/// Rejection reasons for an incoming history body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryValidationError {
    #[error("body must be a JSON object")]
    NotAnObject,
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A history entry before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSearchHistory {
    pub search_type: SearchType,
    pub search_params: Value,
    /// `"true"` or `"false"`.
    pub result_found: String,
    #[serde(default)]
    pub result_data: Option<Value>,
}

/// A persisted history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub id: String,
    pub search_type: SearchType,
    pub search_params: Value,
    pub result_found: String,
    pub result_data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl NewSearchHistory {
    /// Entry for an exact search. `input` is the document number as typed.
    pub fn simple(input: &str, outcome: &SearchOutcome<'_>) -> Self {
        Self::from_outcome(SearchType::Simple, json!({ "documento": input }), outcome)
    }

    /// Entry for a fuzzy search: the non-empty criteria plus the match count.
    pub fn advanced(query: &FuzzyQuery, outcome: &SearchOutcome<'_>) -> Self {
        let mut params = Map::new();
        for (field, value) in query.criteria() {
            params.insert(field.name().to_string(), Value::String(value.to_string()));
        }
        params.insert("resultCount".to_string(), json!(outcome.len()));
        Self::from_outcome(SearchType::Advanced, Value::Object(params), outcome)
    }

    fn from_outcome(
        search_type: SearchType,
        search_params: Value,
        outcome: &SearchOutcome<'_>,
    ) -> Self {
        Self {
            search_type,
            search_params,
            result_found: outcome.is_found().to_string(),
            result_data: outcome
                .first()
                .and_then(|record| serde_json::to_value(record).ok()),
        }
    }

    /// Validate an untyped request body.
    pub fn from_json(body: Value) -> Result<Self, HistoryValidationError> {
        let obj = body.as_object().ok_or(HistoryValidationError::NotAnObject)?;

        let search_type = obj
            .get("searchType")
            .and_then(Value::as_str)
            .and_then(SearchType::parse)
            .ok_or_else(|| HistoryValidationError::InvalidField {
                field: "searchType",
                reason: "expected \"simple\" or \"advanced\"".to_string(),
            })?;

        let search_params = match obj.get("searchParams") {
            Some(v @ Value::Object(_)) => v.clone(),
            _ => {
                return Err(HistoryValidationError::InvalidField {
                    field: "searchParams",
                    reason: "expected an object".to_string(),
                })
            }
        };

        let result_found = match obj.get("resultFound").and_then(Value::as_str) {
            Some(s @ ("true" | "false")) => s.to_string(),
            _ => {
                return Err(HistoryValidationError::InvalidField {
                    field: "resultFound",
                    reason: "expected \"true\" or \"false\"".to_string(),
                })
            }
        };

        let result_data = match obj.get("resultData") {
            None | Some(Value::Null) => None,
            Some(v @ Value::Object(_)) => Some(v.clone()),
            Some(_) => {
                return Err(HistoryValidationError::InvalidField {
                    field: "resultData",
                    reason: "expected an object or null".to_string(),
                })
            }
        };

        Ok(Self {
            search_type,
            search_params,
            result_found,
            result_data,
        })
    }

    /// Assign a fresh id and the given timestamp.
    pub fn into_entry(self, timestamp: DateTime<Utc>) -> SearchHistoryEntry {
        SearchHistoryEntry {
            id: Uuid::new_v4().to_string(),
            search_type: self.search_type,
            search_params: self.search_params,
            result_found: self.result_found,
            result_data: self.result_data,
            timestamp,
        }
    }
}
