//! Affiliate record model and column naming.
//!
//! Source spreadsheets use fixed Spanish column headers. [`AffiliateRecord`]
//! maps each header onto a typed field; serialization uses the same
//! header names, so exported records and history payloads keep the shape
//! of the spreadsheet row.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// One decoded spreadsheet row: column header → raw cell value.
pub type Row = serde_json::Map<String, Value>;

pub const COL_DOCUMENT_TYPE: &str = "TIP_DOC";
pub const COL_DOCUMENT_ID: &str = "DOC";
pub const COL_LAST_NAME1: &str = "PRIMER_APE";
pub const COL_LAST_NAME2: &str = "SEGUNDO_APE";
pub const COL_FIRST_NAME1: &str = "PRIMER_NOM";
pub const COL_FIRST_NAME2: &str = "SEGUNDO_NOM";
pub const COL_BIRTH_DATE: &str = "FEC_NAC";
pub const COL_AGE: &str = "EDAD";
pub const COL_SEX: &str = "SEXO";
pub const COL_PHONE: &str = "TELEFONO";
pub const COL_PROVIDER: &str = "PRESTADOR";
pub const COL_CATEGORY: &str = "CATEGORIA";
pub const COL_COPAY_TIER: &str = "CUOTA MOD";

/// Columns that must appear in a dataset's first row for it to be accepted.
pub const REQUIRED_FIELDS: [&str; 13] = [
    COL_DOCUMENT_TYPE,
    COL_DOCUMENT_ID,
    COL_LAST_NAME1,
    COL_LAST_NAME2,
    COL_FIRST_NAME1,
    COL_FIRST_NAME2,
    COL_BIRTH_DATE,
    COL_AGE,
    COL_SEX,
    COL_PHONE,
    COL_PROVIDER,
    COL_CATEGORY,
    COL_COPAY_TIER,
];

/// A single member entry.
///
/// Text fields hold `""` when the source cell was empty or missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AffiliateRecord {
    #[serde(rename = "TIP_DOC")]
    pub document_type: String,
    /// Primary lookup key. Always text, so leading zeros survive.
    #[serde(rename = "DOC")]
    pub document_id: String,
    #[serde(rename = "PRIMER_APE")]
    pub last_name1: String,
    #[serde(rename = "SEGUNDO_APE")]
    pub last_name2: String,
    #[serde(rename = "PRIMER_NOM")]
    pub first_name1: String,
    #[serde(rename = "SEGUNDO_NOM")]
    pub first_name2: String,
    /// Expected `YYYY-MM-DD`, not validated.
    #[serde(rename = "FEC_NAC")]
    pub birth_date: String,
    #[serde(rename = "EDAD", serialize_with = "serialize_age")]
    pub age: Option<i64>,
    #[serde(rename = "SEXO")]
    pub sex: String,
    #[serde(rename = "TELEFONO")]
    pub phone: String,
    #[serde(rename = "PRESTADOR")]
    pub provider: String,
    #[serde(rename = "CATEGORIA")]
    pub category: String,
    #[serde(rename = "CUOTA MOD")]
    pub copay_tier: String,
}

impl AffiliateRecord {
    /// Given names joined by a single space, without trimming.
    ///
    /// Missing parts contribute `""`, so the result may carry a leading,
    /// trailing, or doubled space. Fuzzy matching runs against this exact
    /// string.
    pub fn given_names(&self) -> String {
        format!("{} {}", self.first_name1, self.first_name2)
    }

    /// Family names joined by a single space, without trimming.
    pub fn family_names(&self) -> String {
        format!("{} {}", self.last_name1, self.last_name2)
    }

    /// Display name: given names then family names, whitespace collapsed.
    pub fn full_name(&self) -> String {
        [
            self.first_name1.as_str(),
            self.first_name2.as_str(),
            self.last_name1.as_str(),
            self.last_name2.as_str(),
        ]
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

fn serialize_age<S: Serializer>(age: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match age {
        Some(n) => serializer.serialize_i64(*n),
        None => serializer.serialize_str(""),
    }
}

/// Convert a raw cell value to its text form.
///
/// Integral floats print without a fractional part (`123.0` → `"123"`),
/// matching how spreadsheet readers surface numeric document ids.
pub fn cell_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                        format!("{}", f as i64)
                    }
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Parse an age cell leniently: numbers and numeric strings yield a value,
/// anything else yields `None`.
pub fn cell_to_age(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}
