//! Excel workbooks (`.xlsx`, `.xls`) via calamine. The first sheet is read
//! and the first row with at least two non-empty cells is the header.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use super::{ParseError, RawTable};

pub(super) fn parse(bytes: &[u8]) -> Result<RawTable, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|source| ParseError::Spreadsheet { source })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoWorksheet)?
        .map_err(|source| ParseError::Spreadsheet { source })?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());

    let headers = rows
        .by_ref()
        .find(|cells| cells.iter().filter(|c| !c.is_empty()).count() >= 2)
        .ok_or(ParseError::Empty)?;
    let width = headers.iter().rposition(|h| !h.is_empty()).map_or(0, |i| i + 1);
    let headers: Vec<String> = headers.into_iter().take(width).collect();

    let body = rows
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|mut cells| {
            cells.resize(width, String::new());
            cells
        })
        .collect();

    Ok(RawTable::new(headers, body))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_formats_whole_floats_without_fraction() {
        assert_eq!(cell_text(&Data::Float(12.0)), "12");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String(" * ".to_string())), "*");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_garbage_is_spreadsheet_error() {
        assert!(parse(b"not a workbook").is_err());
    }
}
