//! Spreadsheet decoding: bytes → header-keyed rows.
//!
//! Supported inputs:
//!
//! | Extension | Reader |
//! |-----------|--------|
//! | `.xlsx` | OOXML workbook via `zip` + `quick-xml`; first worksheet only |
//! | `.csv` | `csv` reader, flexible record lengths |
//! | `.json` | array of objects |
//!
//! The first row of a sheet is the header row. Every later row becomes a
//! [`Row`] with one entry per header; cells that are empty or missing
//! hold `""`. Rows with no cells at all are skipped.

use std::io::Read;
use std::path::Path;

use serde_json::{Number, Value};
use thiserror::Error;

use affiliate_lookup_core::models::Row;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 100 * 1024 * 1024;

/// Worksheets end at column `XFD`.
const MAX_COLUMNS: usize = 16_384;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type: {0} (expected .xlsx, .csv or .json)")]
    UnsupportedFormat(String),
    #[error("the file does not contain any sheet")]
    NoSheet,
    #[error("xlsx decoding failed: {0}")]
    Xlsx(String),
    #[error("csv decoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Csv,
    Json,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(SheetFormat::Xlsx),
            "csv" => Ok(SheetFormat::Csv),
            "json" => Ok(SheetFormat::Json),
            _ => Err(IngestError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Decode `bytes` into rows. `csv_delimiter` is only used for CSV input.
pub fn decode_rows(
    bytes: &[u8],
    format: SheetFormat,
    csv_delimiter: u8,
) -> Result<Vec<Row>, IngestError> {
    match format {
        SheetFormat::Xlsx => decode_xlsx(bytes),
        SheetFormat::Csv => decode_csv(bytes, csv_delimiter),
        SheetFormat::Json => Ok(serde_json::from_slice::<Vec<Row>>(bytes)?),
    }
}

fn decode_csv(bytes: &[u8], delimiter: u8) -> Result<Vec<Row>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoSheet);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<(usize, Value)> = record
            .iter()
            .enumerate()
            .map(|(i, v)| (i, Value::String(v.to_string())))
            .collect();
        if let Some(row) = build_row(&headers, cells) {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Map positional cells onto headers. Returns `None` for blank rows.
fn build_row(headers: &[String], cells: Vec<(usize, Value)>) -> Option<Row> {
    let blank = cells.iter().all(|(_, v)| match v {
        Value::String(s) => s.is_empty(),
        Value::Null => true,
        _ => false,
    });
    if blank {
        return None;
    }

    let mut row = Row::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        row.insert(header.clone(), Value::String(String::new()));
    }
    for (col, value) in cells {
        if let Some(header) = headers.get(col).filter(|h| !h.is_empty()) {
            row.insert(header.clone(), value);
        }
    }
    Some(row)
}

// ============ xlsx ============

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, IngestError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| IngestError::Xlsx(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| IngestError::Xlsx(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(IngestError::Xlsx(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn decode_xlsx(bytes: &[u8]) -> Result<Vec<Row>, IngestError> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| IngestError::Xlsx(e.to_string()))?;

    let first_sheet = first_worksheet_name(&archive).ok_or(IngestError::NoSheet)?;
    let shared_strings = if archive.file_names().any(|n| n == SHARED_STRINGS) {
        let xml = read_zip_entry_bounded(&mut archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;
        parse_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let sheet_xml = read_zip_entry_bounded(&mut archive, &first_sheet, MAX_XML_ENTRY_BYTES)?;
    let mut sheet_rows = parse_sheet(&sheet_xml, &shared_strings)?.into_iter();

    let Some(header_cells) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let width = header_cells.iter().map(|(c, _)| c + 1).max().unwrap_or(0);
    let mut headers = vec![String::new(); width];
    for (col, value) in header_cells {
        headers[col] = affiliate_lookup_core::models::cell_to_text(&value);
    }

    Ok(sheet_rows.filter_map(|cells| build_row(&headers, cells)).collect())
}

/// Worksheets are ordered by their numeric suffix (`sheet1.xml`, `sheet2.xml`, ...).
fn first_worksheet_name(archive: &Archive<'_>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with(WORKSHEET_PREFIX) && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches(WORKSHEET_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(|s| s.to_string())
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = current.is_some(),
                _ => {}
            },
            Ok(quick_xml::events::Event::Empty(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(|e| IngestError::Xlsx(e.to_string()))?);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                // Rich-text runs (<r><t>..</t></r>) concatenate into one string.
                b"t" => in_t = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(IngestError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Zero-based column index from a cell reference such as `"AB12"`.
///
/// `Ok(None)` when the reference has no column letters. References past
/// column `XFD` are rejected.
fn column_index(cell_ref: &str) -> Result<Option<usize>, IngestError> {
    let mut n = 0usize;
    let mut seen = false;
    for b in cell_ref.bytes().take_while(|b| b.is_ascii_alphabetic()) {
        seen = true;
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        n = n
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|n| *n <= MAX_COLUMNS)
            .ok_or_else(|| column_out_of_range(cell_ref))?;
    }
    Ok(seen.then(|| n - 1))
}

fn column_out_of_range(cell_ref: &str) -> IngestError {
    IngestError::Xlsx(format!(
        "cell reference {} is beyond the last column (XFD)",
        cell_ref
    ))
}

#[derive(Default)]
struct CellState {
    col: usize,
    kind: Option<String>,
    text: Option<String>,
}

impl CellState {
    fn into_value(self, shared_strings: &[String]) -> Option<(usize, Value)> {
        let text = self.text?;
        let value = match self.kind.as_deref() {
            Some("s") => Value::String(
                text.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| shared_strings.get(i).cloned())
                    .unwrap_or_default(),
            ),
            Some("b") => Value::Bool(text.trim() == "1"),
            Some("str") | Some("inlineStr") | Some("e") => Value::String(text),
            _ => numeric_value(&text).unwrap_or(Value::String(text)),
        };
        Some((self.col, value))
    }
}

fn numeric_value(text: &str) -> Option<Value> {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    t.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

/// Parse a worksheet into rows of `(column, value)` cells, in sheet order.
fn parse_sheet(
    xml: &[u8],
    shared_strings: &[String],
) -> Result<Vec<Vec<(usize, Value)>>, IngestError> {
    let mut rows: Vec<Vec<(usize, Value)>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut row: Option<Vec<(usize, Value)>> = None;
    let mut cell: Option<CellState> = None;
    let mut next_col = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_col = 0;
                }
                b"c" => {
                    let mut state = CellState {
                        col: next_col,
                        ..Default::default()
                    };
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| IngestError::Xlsx(e.to_string()))?;
                        match attr.key.local_name().as_ref() {
                            b"r" => {
                                if let Some(col) = column_index(&value)? {
                                    state.col = col;
                                }
                            }
                            b"t" => state.kind = Some(value.into_owned()),
                            _ => {}
                        }
                    }
                    if state.col >= MAX_COLUMNS {
                        return Err(column_out_of_range(&format!("#{}", state.col + 1)));
                    }
                    next_col = state.col + 1;
                    cell = Some(state);
                }
                b"v" | b"t" => in_text = cell.is_some(),
                _ => {}
            },
            Ok(quick_xml::events::Event::Empty(e)) => {
                if e.local_name().as_ref() == b"c" {
                    // Styled but empty cell: still advances the column cursor.
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"r" {
                            if let Ok(value) = attr.unescape_value() {
                                if let Some(col) = column_index(&value)? {
                                    next_col = col;
                                }
                            }
                        }
                    }
                    next_col = (next_col + 1).min(MAX_COLUMNS);
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text => {
                if let Some(state) = cell.as_mut() {
                    let text = te.unescape().map_err(|e| IngestError::Xlsx(e.to_string()))?;
                    state.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_text = false,
                b"c" => {
                    if let (Some(state), Some(cells)) = (cell.take(), row.as_mut()) {
                        cells.extend(state.into_value(shared_strings));
                    }
                }
                b"row" => {
                    if let Some(cells) = row.take() {
                        rows.push(cells);
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(IngestError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}
