//! Dataset schema validation.
//!
//! [`validate`] is the only place untyped rows become [`AffiliateRecord`]s.
//! Only the first row's key set is checked against [`REQUIRED_FIELDS`];
//! later rows are trusted to share its structure and any cell they lack is
//! coerced to an empty value instead of failing the load.

use thiserror::Error;

use crate::models::{
    cell_to_age, cell_to_text, AffiliateRecord, Row, COL_AGE, COL_BIRTH_DATE, COL_CATEGORY,
    COL_COPAY_TIER, COL_DOCUMENT_ID, COL_DOCUMENT_TYPE, COL_FIRST_NAME1, COL_FIRST_NAME2,
    COL_LAST_NAME1, COL_LAST_NAME2, COL_PHONE, COL_PROVIDER, COL_SEX, REQUIRED_FIELDS,
};
use crate::store::Dataset;

/// Reasons a decoded dataset is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("dataset contains no rows")]
    Empty,
    #[error("missing required columns: {}", .missing.join(", "))]
    MissingFields { missing: Vec<String> },
}

impl SchemaError {
    /// Required columns absent from the dataset, in required-field order.
    ///
    /// An empty dataset has no key set at all, so every column is reported.
    pub fn missing_fields(&self) -> Vec<String> {
        match self {
            SchemaError::Empty => REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
            SchemaError::MissingFields { missing } => missing.clone(),
        }
    }
}

/// Validate decoded rows and coerce them into a [`Dataset`].
///
/// Succeeds iff `rows` is non-empty and the first row contains every
/// required column. Row order is preserved.
pub fn validate(rows: Vec<Row>) -> Result<Dataset, SchemaError> {
    let first = rows.first().ok_or(SchemaError::Empty)?;

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !first.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingFields { missing });
    }

    let records = rows.iter().map(coerce_row).collect();
    Ok(Dataset::new(records))
}

/// Lenient row → record conversion. Missing cells become `""` (or `None`
/// for age); no type re-validation happens here.
pub fn coerce_row(row: &Row) -> AffiliateRecord {
    let text = |col: &str| row.get(col).map(cell_to_text).unwrap_or_default();

    AffiliateRecord {
        document_type: text(COL_DOCUMENT_TYPE),
        document_id: text(COL_DOCUMENT_ID),
        last_name1: text(COL_LAST_NAME1),
        last_name2: text(COL_LAST_NAME2),
        first_name1: text(COL_FIRST_NAME1),
        first_name2: text(COL_FIRST_NAME2),
        birth_date: text(COL_BIRTH_DATE),
        age: row.get(COL_AGE).and_then(cell_to_age),
        sex: text(COL_SEX),
        phone: text(COL_PHONE),
        provider: text(COL_PROVIDER),
        category: text(COL_CATEGORY),
        copay_tier: text(COL_COPAY_TIER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_row(doc: &str) -> Row {
        let v = json!({
            "TIP_DOC": "CC", "DOC": doc, "PRIMER_APE": "Mena", "SEGUNDO_APE": "Rivas",
            "PRIMER_NOM": "Ana", "SEGUNDO_NOM": "Lucia", "FEC_NAC": "1990-01-01",
            "EDAD": 34, "SEXO": "F", "TELEFONO": "3001234567",
            "PRESTADOR": "Hospital Centro", "CATEGORIA": "A", "CUOTA MOD": "1"
        });
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_valid_rows_preserve_length_and_order() {
        let rows = vec![full_row("1"), full_row("2"), full_row("3")];
        let ds = validate(rows).unwrap();
        assert_eq!(ds.len(), 3);
        let ids: Vec<&str> = ds.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_rows_rejected() {
        let err = validate(Vec::new()).unwrap_err();
        assert_eq!(err, SchemaError::Empty);
        assert_eq!(err.missing_fields().len(), 13);
    }

    #[test]
    fn test_missing_fields_listed_exactly() {
        let mut row = full_row("1");
        row.remove("TELEFONO");
        row.remove("CUOTA MOD");
        let err = validate(vec![row]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingFields {
                missing: vec!["TELEFONO".to_string(), "CUOTA MOD".to_string()]
            }
        );
        assert!(err.to_string().contains("TELEFONO, CUOTA MOD"));
    }

    #[test]
    fn test_extra_columns_accepted() {
        let mut row = full_row("1");
        row.insert("OBSERVACIONES".into(), json!("x"));
        assert!(validate(vec![row]).is_ok());
    }

    #[test]
    fn test_empty_age_cell_passes_and_coerces() {
        let mut row = full_row("1");
        row.insert("EDAD".into(), json!(""));
        let ds = validate(vec![row]).unwrap();
        assert_eq!(ds.get(0).unwrap().age, None);
    }

    /// Only the first row's keys are checked; later rows missing columns
    /// are coerced to empty values rather than rejected.
    #[test]
    fn test_relaxed_validation_only_checks_first_row() {
        let mut sparse = Row::new();
        sparse.insert("DOC".into(), json!(456));
        let ds = validate(vec![full_row("1"), sparse]).unwrap();
        let second = ds.get(1).unwrap();
        assert_eq!(second.document_id, "456");
        assert_eq!(second.first_name1, "");
        assert_eq!(second.copay_tier, "");
        assert_eq!(second.age, None);
    }

    #[test]
    fn test_first_row_missing_key_fails_even_if_later_rows_complete() {
        let mut first = full_row("1");
        first.remove("SEXO");
        let err = validate(vec![first, full_row("2")]).unwrap_err();
        assert_eq!(err.missing_fields(), vec!["SEXO".to_string()]);
    }

    #[test]
    fn test_numeric_document_id_coerced_to_text() {
        let mut row = full_row("x");
        row.insert("DOC".into(), json!(1077123456.0));
        let ds = validate(vec![row]).unwrap();
        assert_eq!(ds.get(0).unwrap().document_id, "1077123456");
    }
}
