//! Format parser: bytes plus a declared format become an untyped table.
//!
//! The parser never interprets values. Counts stay strings and the
//! suppression sentinel [`SUPPRESSION_SENTINEL`] survives unchanged, so the
//! normalizer can tell "suppressed" from "zero" from "blank".

mod archive;
mod delimited;
mod error;
mod fixed_width;
mod spreadsheet;

pub use error::ParseError;

use std::borrow::Cow;

use tracing::{debug, instrument};

use crate::source::FileFormat;

/// Marker the publisher substitutes for small-cell counts.
pub const SUPPRESSION_SENTINEL: &str = "*";

/// Returns true when a raw cell is the suppression sentinel.
#[must_use]
pub fn is_suppressed(value: &str) -> bool {
    value.trim() == SUPPRESSION_SENTINEL
}

/// Untyped table: header names and string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table. Callers guarantee every row has `headers.len()` cells.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, matched case-insensitively on trimmed names.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    /// Index of the first of several alternative column names present.
    #[must_use]
    pub fn first_column_index(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.column_index(name))
    }
}

/// Parses `bytes` according to `format`.
///
/// # Errors
///
/// Returns [`ParseError`] for undecodable text, column-count mismatches,
/// short fixed-width lines, unreadable workbooks or archives, and files
/// without a header row.
#[instrument(skip(bytes), fields(format = format.name(), bytes = bytes.len()))]
pub fn parse(bytes: &[u8], format: &FileFormat) -> Result<RawTable, ParseError> {
    let table = match format {
        FileFormat::Delimited { delimiter } => delimited::parse(&decode_text(bytes)?, *delimiter)?,
        FileFormat::FixedWidth(columns) => fixed_width::parse(bytes, columns)?,
        FileFormat::ZipArchive { delimiter } => {
            let member = archive::extract_data_member(bytes)?;
            delimited::parse(&decode_text(&member)?, *delimiter)?
        }
        FileFormat::Spreadsheet => spreadsheet::parse(bytes)?,
    };
    debug!(
        columns = table.headers().len(),
        rows = table.len(),
        "parsed raw table"
    );
    Ok(table)
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Decodes publisher text.
///
/// UTF-8 (with or without BOM) and BOM-marked UTF-16 are decoded as such.
/// Anything else is read as Windows-1252/Latin-1, which every byte sequence
/// decodes under; older files use it for accented school names.
pub(crate) fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return std::str::from_utf8(rest)
            .map(Cow::Borrowed)
            .map_err(|e| ParseError::Encoding {
                detail: format!("invalid UTF-8 after byte-order mark: {e}"),
            });
    }
    if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes).map(Cow::Owned);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes).map(Cow::Owned);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(Cow::Borrowed(text)),
        Err(_) => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, ParseError> {
    if bytes.len() % 2 != 0 {
        return Err(ParseError::Encoding {
            detail: "UTF-16 text has an odd number of bytes".to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| ParseError::Encoding {
        detail: format!("invalid UTF-16: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::LEGACY_ENROLLMENT_COLUMNS;

    #[test]
    fn test_is_suppressed() {
        assert!(is_suppressed("*"));
        assert!(is_suppressed(" * "));
        assert!(!is_suppressed("0"));
        assert!(!is_suppressed(""));
        assert!(!is_suppressed("**"));
    }

    #[test]
    fn test_parse_dispatches_delimited() {
        let table = parse(b"A\tB\n1\t*\n", &FileFormat::Delimited { delimiter: b'\t' }).unwrap();
        assert_eq!(table.headers(), ["A", "B"]);
        assert_eq!(table.rows()[0], ["1", "*"]);
    }

    #[test]
    fn test_parse_dispatches_fixed_width() {
        let line = format!("{:<102}", "01611190130229G");
        let format = FileFormat::FixedWidth(LEGACY_ENROLLMENT_COLUMNS);
        let table = parse(line.as_bytes(), &format).unwrap();
        assert_eq!(table.headers()[0], "CDS_CODE");
        assert_eq!(table.rows()[0][0], "01611190130229");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"SCHOOL\nCa\xf1ada\n";
        let text = decode_text(bytes).unwrap();
        assert!(text.contains("Cañada"));
    }

    #[test]
    fn test_decode_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "A\tB".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes).unwrap(), "A\tB");
    }

    #[test]
    fn test_decode_odd_utf16_is_encoding_error() {
        let err = decode_text(&[0xFF, 0xFE, 0x41]).unwrap_err();
        assert!(matches!(err, ParseError::Encoding { .. }));
    }

    #[test]
    fn test_column_index_is_case_insensitive() {
        let table = RawTable::new(vec!["CDS_CODE".into(), " Ethnic ".into()], vec![]);
        assert_eq!(table.column_index("ethnic"), Some(1));
        assert_eq!(table.first_column_index(&["Charter", "cds_code"]), Some(0));
        assert_eq!(table.column_index("missing"), None);
    }
}
