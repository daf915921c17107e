//! Loading a spreadsheet file into the record store.
//!
//! ```text
//! file ──read──▶ bytes ──decode_rows()──▶ Vec<Row> ──validate()──▶ Dataset ──▶ RecordStore
//! ```
//!
//! The store's ingest gate is held for the whole pipeline. Any failure
//! (I/O, decoding, or schema) leaves the store empty.

use anyhow::{Context, Result};
use std::path::Path;

use affiliate_lookup_core::models::Row;
use affiliate_lookup_core::schema::{self, SchemaError};
use affiliate_lookup_core::store::{Dataset, RecordStore};

use crate::config::Config;
use crate::extract::{decode_rows, SheetFormat};

/// Read and decode `path` into untyped rows.
pub fn read_rows(path: &Path, config: &Config) -> Result<Vec<Row>> {
    let format = SheetFormat::from_path(path)?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let rows = decode_rows(&bytes, format, config.ingest.delimiter_byte())
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?format, rows = rows.len(), "decoded sheet");
    Ok(rows)
}

/// Ingest `path` into `store`, replacing whatever it held.
///
/// Returns the number of records loaded.
pub fn load_into(store: &mut RecordStore, path: &Path, config: &Config) -> Result<usize> {
    store.begin_ingest();
    let dataset =
        read_rows(path, config).and_then(|rows| schema::validate(rows).map_err(Into::into));
    let count = store.finish_ingest(dataset)?;
    tracing::info!(path = %path.display(), records = count, "dataset loaded");
    Ok(count)
}

/// Convenience for one-shot commands: a fresh store holding `path`.
pub fn load_store(path: &Path, config: &Config) -> Result<RecordStore> {
    let mut store = RecordStore::new();
    load_into(&mut store, path, config)?;
    Ok(store)
}

/// `afl inspect`: validate a file and report what would be loaded.
pub fn run_inspect(config: &Config, path: &Path) -> Result<()> {
    let rows = read_rows(path, config)?;
    let total_rows = rows.len();
    match schema::validate(rows) {
        Ok(dataset) => {
            print_summary(path, &dataset);
            Ok(())
        }
        Err(SchemaError::Empty) => {
            println!("{}: no data rows", path.display());
            Err(SchemaError::Empty.into())
        }
        Err(err) => {
            println!("{}: {} rows, schema rejected", path.display(), total_rows);
            println!("  missing fields:");
            for field in err.missing_fields() {
                println!("    {}", field);
            }
            Err(err.into())
        }
    }
}

fn print_summary(path: &Path, dataset: &Dataset) {
    println!("{}", path.display());
    println!("  records: {}", dataset.len());
    let with_phone = dataset.iter().filter(|r| !r.phone.trim().is_empty()).count();
    let with_age = dataset.iter().filter(|r| r.age.is_some()).count();
    println!("  with phone: {}", with_phone);
    println!("  with age: {}", with_age);
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "TIP_DOC,DOC,PRIMER_APE,SEGUNDO_APE,PRIMER_NOM,SEGUNDO_NOM,FEC_NAC,EDAD,SEXO,TELEFONO,PRESTADOR,CATEGORIA,CUOTA MOD";

    fn csv_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_into_replaces_dataset() {
        let config = Config::minimal();
        let first = csv_file(&format!(
            "{}\nCC,1,Mena,,Ana,,1990-01-01,34,F,300,Centro,A,1\nCC,2,Rios,,Luis,,1980-02-02,44,M,301,Norte,B,2\n",
            HEADER
        ));
        let second = csv_file(&format!(
            "{}\nCC,9,Paz,,Eva,,2000-03-03,24,F,302,Sur,A,1\n",
            HEADER
        ));

        let mut store = RecordStore::new();
        assert_eq!(load_into(&mut store, first.path(), &config).unwrap(), 2);
        assert_eq!(load_into(&mut store, second.path(), &config).unwrap(), 1);
        assert_eq!(store.size(), 1);
        assert!(store.is_searchable());
    }

    #[test]
    fn test_failed_load_empties_store() {
        let config = Config::minimal();
        let good = csv_file(&format!(
            "{}\nCC,1,Mena,,Ana,,1990-01-01,34,F,300,Centro,A,1\n",
            HEADER
        ));
        let bad = csv_file("DOC,PRIMER_NOM\n1,Ana\n");

        let mut store = RecordStore::new();
        load_into(&mut store, good.path(), &config).unwrap();
        let err = load_into(&mut store, bad.path(), &config).unwrap_err();

        let schema_err = err.downcast_ref::<SchemaError>().unwrap();
        assert!(schema_err.missing_fields().contains(&"TIP_DOC".to_string()));
        assert!(!store.is_loaded());
        assert!(!store.is_ingesting());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".xls").tempfile().unwrap();
        let mut store = RecordStore::new();
        assert!(load_into(&mut store, file.path(), &Config::minimal()).is_err());
        assert!(!store.is_loaded());
    }
}
