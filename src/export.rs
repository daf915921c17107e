//! Export a single affiliate as a printable service proof or as JSON.
//!
//! The record is looked up with exact search. The text proof carries the
//! patient's name and document, the admission and discharge dates, a
//! diagnosis line, and signature lines. The JSON form is the record keyed
//! by its column names.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

use affiliate_lookup_core::models::AffiliateRecord;
use affiliate_lookup_core::search::exact_search;

use crate::config::Config;
use crate::ingest::load_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// Details filled in by the operator, not taken from the dataset.
#[derive(Debug, Clone, Default)]
pub struct ProofDetails {
    /// `YYYY-MM-DD`
    pub admission: String,
    /// `YYYY-MM-DD`
    pub discharge: String,
    pub diagnosis: String,
}

const PROOF_TITLE: &str =
    "FORMATO DE PRESTACIÓN DE SERVICIOS DE SALUD SEGÚN RESOLUCIÓN 3047 DE 2008";
const PROOF_INTRO: &str = "Por medio del presente documento se certifica que en la IPS se \
prestaron los servicios de salud al paciente relacionado a continuación:";
const PROOF_CLOSING: &str = "Así se da cumplimiento al trámite definido en el Decreto 4747 \
de 2007 y a la reglamentación definida en la Resolución 3047 de 2008.";
const SIGNATURE_LINE: &str = "________________________________________";

/// `YYYY-MM-DD` → `DD/MM/YYYY`. Empty stays empty; anything else is
/// returned unchanged.
pub fn format_date_for_display(date: &str) -> String {
    let date = date.trim();
    let parts: Vec<&str> = date.split('-').collect();
    match parts.as_slice() {
        [year, month, day] => format!("{}/{}/{}", day, month, year),
        _ => date.to_string(),
    }
}

/// `afiliado-<DOC>.<ext>`. Characters other than ASCII letters, digits,
/// `-` and `_` become `_`, so the name never leaves the working directory.
pub fn default_file_name(record: &AffiliateRecord, format: ExportFormat) -> String {
    let doc: String = record
        .document_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("afiliado-{}.{}", doc, format.extension())
}

pub fn render_proof(record: &AffiliateRecord, details: &ProofDetails) -> String {
    let mut out = String::new();
    out.push_str(PROOF_TITLE);
    out.push_str("\n\n");
    out.push_str(PROOF_INTRO);
    out.push_str("\n\n");
    out.push_str(&format!("Nombre Completo: {}\n", record.full_name()));
    out.push_str(&format!(
        "Documento de Identificación No: {}\n\n",
        record.document_id.trim()
    ));
    out.push_str(&format!(
        "Fecha de ingreso: {}\n",
        format_date_for_display(&details.admission)
    ));
    out.push_str(&format!(
        "Fecha de egreso:  {}\n",
        format_date_for_display(&details.discharge)
    ));
    out.push_str(&format!("Diagnóstico: {}\n\n", details.diagnosis.trim()));
    out.push_str(PROOF_CLOSING);
    out.push_str("\n\n");
    for label in [
        "Firma del paciente o del responsable:",
        "Parentesco:",
        "Facturación:",
    ] {
        out.push_str(SIGNATURE_LINE);
        out.push('\n');
        out.push_str(label);
        out.push('\n');
        if label.starts_with("Firma") {
            out.push_str("No. de identificación:\n");
        }
        out.push('\n');
    }
    out
}

pub fn render_json(record: &AffiliateRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// `afl export`.
///
/// `output` of `-` writes to stdout; no output writes
/// `afiliado-<DOC>.<ext>` in the current directory.
pub fn run_export(
    config: &Config,
    file: &Path,
    document_id: &str,
    format: ExportFormat,
    output: Option<&Path>,
    details: &ProofDetails,
) -> Result<()> {
    let store = load_store(file, config)?;
    let dataset = store.dataset().context("no dataset loaded")?;

    let Some(record) = exact_search(dataset, document_id)?.first() else {
        bail!("Afiliado no encontrado: {}", document_id.trim());
    };

    let body = match format {
        ExportFormat::Text => render_proof(record, details),
        ExportFormat::Json => render_json(record)?,
    };

    let path = match output {
        Some(p) if p == Path::new("-") => {
            println!("{}", body);
            return Ok(());
        }
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_file_name(record, format)),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Exported {} to {}", record.document_id.trim(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AffiliateRecord {
        AffiliateRecord {
            document_type: "CC".into(),
            document_id: "00123".into(),
            first_name1: "Ana".into(),
            first_name2: " ".into(),
            last_name1: "Mena".into(),
            last_name2: "Paz".into(),
            age: Some(34),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_date_for_display() {
        assert_eq!(format_date_for_display("2024-03-07"), "07/03/2024");
        assert_eq!(format_date_for_display(""), "");
        assert_eq!(format_date_for_display("07/03/2024"), "07/03/2024");
    }

    #[test]
    fn test_default_file_name() {
        assert_eq!(default_file_name(&record(), ExportFormat::Text), "afiliado-00123.txt");
        assert_eq!(default_file_name(&record(), ExportFormat::Json), "afiliado-00123.json");
    }

    #[test]
    fn test_default_file_name_is_a_single_component() {
        for doc in ["../x/1", "..\\evil", "/etc/passwd", "a b.c"] {
            let record = AffiliateRecord {
                document_id: doc.into(),
                ..record()
            };
            let name = default_file_name(&record, ExportFormat::Text);
            assert!(!name.contains('/') && !name.contains('\\'), "{}", name);
            assert!(!name.contains(".."), "{}", name);
            assert_eq!(Path::new(&name).components().count(), 1);
        }
        let record = AffiliateRecord {
            document_id: "../x/1".into(),
            ..record()
        };
        assert_eq!(default_file_name(&record, ExportFormat::Text), "afiliado-___x_1.txt");
    }

    #[test]
    fn test_proof_contents() {
        let details = ProofDetails {
            admission: "2024-03-07".into(),
            discharge: String::new(),
            diagnosis: "J06.9".into(),
        };
        let text = render_proof(&record(), &details);
        assert!(text.starts_with(PROOF_TITLE));
        assert!(text.contains("Nombre Completo: Ana Mena Paz\n"));
        assert!(text.contains("Documento de Identificación No: 00123\n"));
        assert!(text.contains("Fecha de ingreso: 07/03/2024\n"));
        assert!(text.contains("Fecha de egreso:  \n"));
        assert!(text.contains("Diagnóstico: J06.9\n"));
        assert!(text.contains("Parentesco:"));
    }

    #[test]
    fn test_json_uses_column_names() {
        let value: serde_json::Value = serde_json::from_str(&render_json(&record()).unwrap()).unwrap();
        assert_eq!(value["DOC"], "00123");
        assert_eq!(value["PRIMER_NOM"], "Ana");
        assert_eq!(value["EDAD"], 34);
    }
}
