use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use thiserror::Error;

use super::model::{CellValue, RawTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Cell texts read as missing, the usual NA spellings of spreadsheet exports.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Text encodings
// ---------------------------------------------------------------------------

/// A candidate text encoding for uploaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 preceded by a byte-order mark.
    Utf8Sig,
    /// Windows code page 932 (Shift_JIS with vendor extensions).
    Cp932,
}

/// Encodings tried in order; the first one that yields a table wins.
pub const ENCODING_CANDIDATES: [TextEncoding; 3] =
    [TextEncoding::Utf8, TextEncoding::Utf8Sig, TextEncoding::Cp932];

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Cp932 => "cp932",
        }
    }

    /// Strict decode: malformed input is an error, never replaced.
    fn decode(self, bytes: &[u8]) -> Result<Cow<'_, str>> {
        match self {
            TextEncoding::Utf8 => {
                if bytes.starts_with(UTF8_BOM) {
                    bail!("input starts with a byte-order mark");
                }
                decode_strict(UTF_8, bytes)
            }
            TextEncoding::Utf8Sig => {
                decode_strict(UTF_8, bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))
            }
            // encoding_rs' Shift_JIS is the WHATWG definition, i.e. Windows-31J.
            TextEncoding::Cp932 => decode_strict(SHIFT_JIS, bytes),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_strict<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .with_context(|| format!("invalid {} byte sequence", encoding.name()))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One failed decode-and-parse attempt.
#[derive(Debug, Clone)]
pub struct EncodingAttempt {
    pub encoding: TextEncoding,
    pub reason: String,
}

/// Why an upload could not be turned into a [`RawTable`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0} (expected .csv)")]
    UnsupportedExtension(String),

    #[error("could not read the CSV with any supported encoding ({})", describe_attempts(.attempts))]
    Undecodable { attempts: Vec<EncodingAttempt> },
}

fn describe_attempts(attempts: &[EncodingAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.encoding, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// A parsed upload and the encoding that decoded it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RawTable,
    pub encoding: TextEncoding,
}

/// Load a CSV file from disk.  Only `.csv` is accepted.
pub fn load_file(path: &Path) -> Result<LoadedTable, LoadError> {
    check_extension(path)?;
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_bytes(&bytes)
}

/// Load bytes handed over without a readable path (e.g. a dropped file).
pub fn load_upload(name: &str, bytes: &[u8]) -> Result<LoadedTable, LoadError> {
    check_extension(Path::new(name))?;
    load_bytes(bytes)
}

fn check_extension(path: &Path) -> Result<(), LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "csv" {
        return Err(LoadError::UnsupportedExtension(ext));
    }
    Ok(())
}

/// Parse uploaded bytes, trying each of [`ENCODING_CANDIDATES`] in turn.
pub fn load_bytes(bytes: &[u8]) -> Result<LoadedTable, LoadError> {
    let mut attempts = Vec::with_capacity(ENCODING_CANDIDATES.len());

    for encoding in ENCODING_CANDIDATES {
        match decode_and_parse(bytes, encoding) {
            Ok(table) => {
                log::info!(
                    "Parsed {} rows with columns {:?} as {encoding}",
                    table.len(),
                    table.column_names()
                );
                return Ok(LoadedTable { table, encoding });
            }
            Err(e) => {
                log::debug!("CSV attempt with {encoding} failed: {e:#}");
                attempts.push(EncodingAttempt {
                    encoding,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    Err(LoadError::Undecodable { attempts })
}

fn decode_and_parse(bytes: &[u8], encoding: TextEncoding) -> Result<RawTable> {
    let text = encoding.decode(bytes)?;
    parse_csv(&text)
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Header row with column names, then one record per line.
/// Short records are padded with missing cells; long ones are rejected.
fn parse_csv(text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().context("reading CSV headers")?;
    if headers.is_empty() {
        bail!("no columns to parse from file");
    }
    let columns = normalize_headers(headers.iter());
    let width = columns.len();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        if record.len() > width {
            bail!(
                "CSV row {}: expected {width} fields, saw {}",
                row_no + 1,
                record.len()
            );
        }
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable::new(columns, rows))
}

/// Blank names become `Unnamed: <i>`; repeats get `.1`, `.2`, … suffixes.
fn normalize_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let raw: Vec<String> = headers
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut used: HashSet<String> = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(raw.len());

    for base in raw {
        let mut name = base.clone();
        while used.contains(&name) {
            let n = repeats.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{base}.{n}");
        }
        used.insert(name.clone());
        columns.push(name);
    }
    columns
}

fn guess_cell_type(s: &str) -> CellValue {
    let t = s.trim();
    if NA_MARKERS.contains(&t) {
        return CellValue::Null;
    }
    if let Ok(i) = t.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = t.parse::<f64>() {
        if f.is_nan() {
            return CellValue::Null;
        }
        return CellValue::Float(f);
    }
    match t {
        "true" | "True" | "TRUE" => CellValue::Bool(true),
        "false" | "False" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JP_CSV: &str = "日時,筋電,活動\n\
                          2024-05-01 10:00:00,0.12,安静\n\
                          2024-05-01 10:00:01,0.85,握る\n\
                          2024-05-01 10:00:02,0.40,離す\n";

    #[test]
    fn parses_header_and_typed_cells() {
        let loaded = load_bytes(b"time,emg,label\n2024-01-01 00:00:00,1.5,grip\n2024-01-01 00:00:01,2,\n")
            .unwrap();
        assert_eq!(loaded.encoding, TextEncoding::Utf8);

        let table = loaded.table;
        assert_eq!(table.column_names(), ["time", "emg", "label"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][1], CellValue::Float(1.5));
        assert_eq!(table.rows()[0][2], CellValue::String("grip".into()));
        assert_eq!(table.rows()[1][1], CellValue::Integer(2));
        assert_eq!(table.rows()[1][2], CellValue::Null);
    }

    #[test]
    fn bom_prefixed_file_uses_utf8_sig() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"time,emg\n1,2\n");

        let loaded = load_bytes(&bytes).unwrap();
        assert_eq!(loaded.encoding, TextEncoding::Utf8Sig);
        assert_eq!(loaded.table.column_names(), ["time", "emg"]);
    }

    #[test]
    fn cp932_file_matches_utf8_file() {
        let (sjis, _, had_errors) = SHIFT_JIS.encode(JP_CSV);
        assert!(!had_errors);
        assert!(std::str::from_utf8(&sjis).is_err());

        let from_sjis = load_bytes(&sjis).unwrap();
        let from_utf8 = load_bytes(JP_CSV.as_bytes()).unwrap();

        assert_eq!(from_sjis.encoding, TextEncoding::Cp932);
        assert_eq!(from_utf8.encoding, TextEncoding::Utf8);
        assert_eq!(from_sjis.table, from_utf8.table);
        assert_eq!(from_sjis.table.column_names(), ["日時", "筋電", "活動"]);
    }

    #[test]
    fn empty_upload_fails_every_encoding() {
        match load_bytes(b"") {
            Err(LoadError::Undecodable { attempts }) => {
                let tried: Vec<_> = attempts.iter().map(|a| a.encoding).collect();
                assert_eq!(tried, ENCODING_CANDIDATES);
            }
            other => panic!("expected Undecodable, got {other:?}"),
        }
    }

    #[test]
    fn overlong_row_is_rejected() {
        let err = load_bytes(b"a,b\n1,2,3\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected 2 fields, saw 3"), "{msg}");
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let table = load_bytes(b"a,b,c\n1\n").unwrap().table;
        assert_eq!(
            table.rows()[0],
            vec![CellValue::Integer(1), CellValue::Null, CellValue::Null]
        );
    }

    #[test]
    fn duplicate_and_blank_headers_are_made_unique() {
        let table = load_bytes(b"emg,,emg,emg\n1,2,3,4\n").unwrap().table;
        assert_eq!(table.column_names(), ["emg", "Unnamed: 1", "emg.1", "emg.2"]);
    }

    #[test]
    fn na_markers_become_missing() {
        for marker in ["NA", "N/A", "NaN", "null", "None", "#N/A", "  "] {
            assert_eq!(guess_cell_type(marker), CellValue::Null, "{marker:?}");
        }
        assert_eq!(guess_cell_type("TRUE"), CellValue::Bool(true));
        assert_eq!(guess_cell_type(" 3.25 "), CellValue::Float(3.25));
        assert_eq!(guess_cell_type("rest"), CellValue::String("rest".into()));
    }

    #[test]
    fn non_csv_extension_is_rejected_before_reading() {
        let err = load_file(Path::new("recording.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension(ref e) if e == "xlsx"));

        let err = load_upload("notes.txt", b"a,b\n1,2\n").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension(_)));
        assert!(load_upload("Session.CSV", b"a,b\n1,2\n").is_ok());
    }
}
