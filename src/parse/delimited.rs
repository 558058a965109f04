//! Delimited text (tab, caret, comma) with a header row.

use csv::{ReaderBuilder, StringRecord};

use super::{ParseError, RawTable};

/// Parses delimited text. Quoting is honoured only for commas; the tab and
/// caret files carry literal quote characters in school names.
pub(super) fn parse(text: &str, delimiter: u8) -> Result<RawTable, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(delimiter == b',')
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(ParseError::csv)?;
        if is_blank(&record) {
            continue;
        }
        let line = record.position().map_or(0, csv::Position::line);

        let Some(expected) = headers.as_ref().map(Vec::len) else {
            headers = Some(trimmed_cells(&record, record.len()));
            continue;
        };

        let width = significant_width(&record, expected);
        if width != expected {
            return Err(ParseError::ColumnCount {
                row: line,
                expected,
                found: width,
            });
        }
        rows.push(trimmed_cells(&record, expected));
    }

    let headers = headers.ok_or(ParseError::Empty)?;
    Ok(RawTable::new(headers, rows))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Field count after dropping empty trailing fields beyond `expected`.
fn significant_width(record: &StringRecord, expected: usize) -> usize {
    let mut width = record.len();
    while width > expected && record.get(width - 1).is_some_and(|f| f.trim().is_empty()) {
        width -= 1;
    }
    width
}

fn trimmed_cells(record: &StringRecord, width: usize) -> Vec<String> {
    record
        .iter()
        .take(width)
        .map(|field| field.trim().to_string())
        .collect()
}
