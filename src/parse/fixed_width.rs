//! Fixed-width records with caller-supplied column layout and no header.

use super::{ParseError, RawTable, decode_text};
use crate::source::FixedColumn;

/// Parses fixed-width records. Byte ranges come from `columns`; headers are
/// the column names. Only the last column may be cut short by trailing
/// whitespace trimming, so every line must reach its start.
pub(super) fn parse(bytes: &[u8], columns: &[FixedColumn]) -> Result<RawTable, ParseError> {
    let required = columns.last().map_or(0, |c| c.start);
    let mut rows = Vec::new();

    for (index, raw_line) in bytes.split(|&b| b == b'\n').enumerate() {
        let line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let line_number = index as u64 + 1;
        if line.len() < required {
            return Err(ParseError::LineTooShort {
                line: line_number,
                length: line.len(),
                required,
            });
        }

        let mut cells = Vec::with_capacity(columns.len());
        for column in columns {
            let start = column.start.min(line.len());
            let end = column.end.min(line.len());
            cells.push(decode_text(&line[start..end])?.trim().to_string());
        }
        rows.push(cells);
    }

    let headers = columns.iter().map(|c| c.name.to_string()).collect();
    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const COLUMNS: &[FixedColumn] = &[
        FixedColumn { name: "ID", start: 0, end: 4 },
        FixedColumn { name: "CODE", start: 4, end: 5 },
        FixedColumn { name: "N", start: 5, end: 9 },
    ];

    #[test]
    fn test_fixed_width_slices_columns() {
        let table = parse(b"0001A  12\n0002B   *\n", COLUMNS).unwrap();
        assert_eq!(table.headers(), ["ID", "CODE", "N"]);
        assert_eq!(table.rows()[0], ["0001", "A", "12"]);
        assert_eq!(table.rows()[1], ["0002", "B", "*"]);
    }

    #[test]
    fn test_fixed_width_trimmed_last_column() {
        let table = parse(b"0001A\r\n", COLUMNS).unwrap();
        assert_eq!(table.rows()[0], ["0001", "A", ""]);
    }

    #[test]
    fn test_fixed_width_short_line_is_error() {
        let err = parse(b"0001A  12\n00\n", COLUMNS).unwrap_err();
        assert!(matches!(err, ParseError::LineTooShort { line: 2, length: 2, required: 5 }));
    }
}
