//! Terminal rendering of search outcomes.
//!
//! | Outcome | Rendering |
//! |---------|-----------|
//! | `NotFound` | a single "not found" line |
//! | `Single` | labelled detail view |
//! | `Multiple` | numbered one-line summaries |
//!
//! Missing values display as `N/A`.

use anyhow::{bail, Result};

use affiliate_lookup_core::models::AffiliateRecord;
use affiliate_lookup_core::search::SearchOutcome;

const NOT_AVAILABLE: &str = "N/A";

pub fn render_outcome(outcome: &SearchOutcome<'_>) -> String {
    match outcome {
        SearchOutcome::NotFound => "Afiliado no encontrado.\n".to_string(),
        SearchOutcome::Single(record) => render_detail(record),
        SearchOutcome::Multiple(records) => render_list(records),
    }
}

fn or_na(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NOT_AVAILABLE
    } else {
        trimmed
    }
}

pub fn render_detail(record: &AffiliateRecord) -> String {
    let age = match record.age {
        Some(n) if n != 0 => format!("{} años", n),
        _ => NOT_AVAILABLE.to_string(),
    };
    let given = record.given_names();
    let family = record.family_names();
    let fields: [(&str, &str); 11] = [
        ("Tipo Doc", or_na(&record.document_type)),
        ("Documento", or_na(&record.document_id)),
        ("Nombres", or_na(&given)),
        ("Apellidos", or_na(&family)),
        ("Fecha Nacimiento", or_na(&record.birth_date)),
        ("Edad", &age),
        ("Sexo", or_na(&record.sex)),
        ("Teléfono", or_na(&record.phone)),
        ("Prestador", or_na(&record.provider)),
        ("Categoría", or_na(&record.category)),
        ("Cuota Moderadora", or_na(&record.copay_tier)),
    ];

    let mut out = String::new();
    for (label, value) in fields {
        out.push_str(&format!("  {:<18} {}\n", format!("{}:", label), value));
    }
    out
}

pub fn render_list(records: &[&AffiliateRecord]) -> String {
    let mut out = format!("{} afiliados encontrados:\n", records.len());
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {} {}  {}  {}\n",
            i + 1,
            or_na(&record.document_type),
            or_na(&record.document_id),
            or_na(&record.full_name()),
            or_na(&record.provider),
        ));
    }
    out
}

/// Pick item `n` (1-based) out of a `Multiple` outcome.
///
/// `Single` accepts `1`; `NotFound` has nothing to select.
pub fn select<'a>(outcome: SearchOutcome<'a>, n: usize) -> Result<SearchOutcome<'a>> {
    let len = outcome.len();
    if n == 0 || n > len {
        bail!("--select {} is out of range (1..={})", n, len);
    }
    Ok(SearchOutcome::Single(outcome.records()[n - 1]))
}
