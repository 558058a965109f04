//! CSV and JSON export.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use thiserror::Error;

use super::{Record, Rows, Table, for_each_rows};

/// Export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected csv or json)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

/// Export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON write failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Table {
    /// Writes the table in `format`. CSV output has one column per named
    /// cell across all rows; cells a row lacks are written empty.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if serialization or the writer fails.
    pub fn write_to<W: Write>(&self, format: OutputFormat, writer: W) -> Result<(), ExportError> {
        match format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(writer, self)?;
                Ok(())
            }
            OutputFormat::Csv => write_csv(self.rows(), writer),
        }
    }
}

fn write_csv<W: Write>(rows: &Rows, writer: W) -> Result<(), ExportError> {
    let cells: Vec<Vec<(String, String)>> =
        for_each_rows!(rows, records => records.iter().map(Record::cells).collect());

    let mut header: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for row in &cells {
        for (name, _) in row {
            if !positions.contains_key(name) {
                positions.insert(name.clone(), header.len());
                header.push(name.clone());
            }
        }
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&header)?;
    for row in cells {
        let mut line = vec![String::new(); header.len()];
        for (name, value) in row {
            if let Some(&index) = positions.get(&name) {
                line[index] = value;
            }
        }
        out.write_record(&line)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::codes::{GradeLevel, Subgroup};
    use crate::identifier::{AggregationLevel, CdsCode};
    use crate::table::{EnrollmentRecord, Entity};

    fn record(grades: &[(GradeLevel, Option<u64>)]) -> EnrollmentRecord {
        EnrollmentRecord {
            entity: Entity::new(2024, CdsCode::state(), AggregationLevel::State, None),
            subgroup: Subgroup::Total,
            grades: grades.iter().copied().collect::<BTreeMap<_, _>>(),
            total: None,
        }
    }

    #[test]
    fn test_csv_header_is_union_and_missing_cells_empty() {
        let table = Table::new(
            Rows::Enrollment(vec![
                record(&[(GradeLevel::Kindergarten, Some(4))]),
                record(&[(GradeLevel::Kindergarten, None), (GradeLevel::Grade1, Some(2))]),
            ]),
            Vec::new(),
        );
        let mut buffer = Vec::new();
        table.write_to(OutputFormat::Csv, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("end_year,cds_code,"));
        assert!(lines[0].contains("grade_K"));
        assert!(lines[0].ends_with("grade_01"));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",4,,"), "{}", lines[1]);
        assert!(lines[2].ends_with(",,,2"), "{}", lines[2]);
    }

    #[test]
    fn test_json_export_parses() {
        let table = Table::new(Rows::Enrollment(vec![record(&[])]), Vec::new());
        let mut buffer = Vec::new();
        table.write_to(OutputFormat::Json, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["rows"]["kind"], "enrollment");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
