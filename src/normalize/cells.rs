//! Column claiming and cell readers shared by the per-dataset mappings.

use crate::identifier::is_missing;
use crate::parse::{ParseError, RawTable, is_suppressed};
use crate::quality::{SuppressionTally, WarningCollector, WarningKind};
use crate::source::Layout;

use super::NormalizeError;

/// Tracks which source columns a mapping has accounted for. Every non-empty
/// header must be claimed (used or explicitly ignored) before
/// [`Columns::finish`] succeeds, so a new column fails loudly.
pub(super) struct Columns<'a> {
    raw: &'a RawTable,
    layout: Layout,
    claimed: Vec<bool>,
}

impl<'a> Columns<'a> {
    pub(super) fn new(raw: &'a RawTable, layout: Layout) -> Self {
        Self {
            raw,
            layout,
            claimed: vec![false; raw.headers().len()],
        }
    }

    /// Index of the first alias present; the column is claimed.
    pub(super) fn optional(&mut self, aliases: &[&str]) -> Option<usize> {
        let index = self.raw.first_column_index(aliases)?;
        self.claimed[index] = true;
        Some(index)
    }

    /// Like [`Columns::optional`] but the column must exist.
    pub(super) fn require(&mut self, aliases: &[&'static str]) -> Result<usize, NormalizeError> {
        self.optional(aliases)
            .ok_or_else(|| NormalizeError::MissingColumn {
                layout: self.layout,
                column: aliases.first().copied().unwrap_or_default(),
            })
    }

    /// Claims known columns that carry nothing the canonical shape keeps.
    pub(super) fn ignore(&mut self, names: &[&str]) {
        for name in names {
            if let Some(index) = self.raw.column_index(name) {
                self.claimed[index] = true;
            }
        }
    }

    /// Claims every unclaimed column for which `classify` returns a value.
    pub(super) fn claim_matching<T>(
        &mut self,
        mut classify: impl FnMut(&str) -> Option<T>,
    ) -> Vec<(usize, T)> {
        let mut found = Vec::new();
        for (index, header) in self.raw.headers().iter().enumerate() {
            if self.claimed[index] {
                continue;
            }
            if let Some(value) = classify(header.trim()) {
                self.claimed[index] = true;
                found.push((index, value));
            }
        }
        found
    }

    /// Fails on the first unclaimed, non-empty header.
    pub(super) fn finish(self) -> Result<(), NormalizeError> {
        for (index, header) in self.raw.headers().iter().enumerate() {
            if !self.claimed[index] && !header.trim().is_empty() {
                return Err(NormalizeError::UnrecognizedColumn {
                    layout: self.layout,
                    column: header.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Per-row cell reader that knows its row number for error messages.
pub(super) struct RowReader<'a> {
    pub(super) raw: &'a RawTable,
    pub(super) cells: &'a [String],
    /// 1-based data row.
    pub(super) row: u64,
}

impl<'a> RowReader<'a> {
    pub(super) fn new(raw: &'a RawTable, index: usize) -> Self {
        Self {
            raw,
            cells: &raw.rows()[index],
            row: index as u64 + 1,
        }
    }

    pub(super) fn text(&self, index: usize) -> &'a str {
        self.cells.get(index).map_or("", String::as_str)
    }

    pub(super) fn opt_text(&self, index: Option<usize>) -> Option<&'a str> {
        index.map(|i| self.text(i)).filter(|v| !is_missing(v))
    }

    fn column(&self, index: usize) -> String {
        self.raw
            .headers()
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub(super) fn malformed(&self, index: usize, reason: &str) -> NormalizeError {
        NormalizeError::Malformed(ParseError::MalformedValue {
            row: self.row,
            column: self.column(index),
            value: self.text(index).to_string(),
            reason: reason.to_string(),
        })
    }

    pub(super) fn unrecognized(&self, layout: Layout, index: usize) -> NormalizeError {
        NormalizeError::UnrecognizedCode {
            layout,
            column: self.column(index),
            value: self.text(index).to_string(),
            row: self.row,
        }
    }

    /// Reads a count. Suppressed and blank cells are `None`, never zero.
    pub(super) fn count(
        &self,
        index: usize,
        tally: &mut SuppressionTally,
    ) -> Result<Option<u64>, NormalizeError> {
        let value = self.text(index).trim();
        if is_suppressed(value) {
            tally.record(true);
            return Ok(None);
        }
        if is_missing(value) {
            return Ok(None);
        }
        tally.record(false);
        let digits: String = value.chars().filter(|c| *c != ',').collect();
        if let Ok(count) = digits.parse::<u64>() {
            return Ok(Some(count));
        }
        match digits.parse::<f64>() {
            Ok(number) if number.is_finite() && number < 0.0 => {
                Err(self.malformed(index, "negative count"))
            }
            Ok(number) if number.is_finite() && number.fract() == 0.0 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                Ok(Some(number as u64))
            }
            _ => Err(self.malformed(index, "not a count")),
        }
    }

    /// Reads a percentage in [0, 100]. Out-of-range values are clamped and
    /// recorded as a data-quality warning.
    pub(super) fn percent(
        &self,
        index: usize,
        warnings: &mut WarningCollector,
    ) -> Result<Option<f64>, NormalizeError> {
        let value = self.text(index).trim();
        if is_suppressed(value) || is_missing(value) {
            return Ok(None);
        }
        let number: f64 = value
            .trim_end_matches('%')
            .trim()
            .parse()
            .map_err(|_| self.malformed(index, "not a percentage"))?;
        if !number.is_finite() {
            return Err(self.malformed(index, "non-finite percentage"));
        }
        Ok(Some(clamp_percent(number, warnings, || {
            format!("data row {}, column {}: {value}", self.row, self.column(index))
        })))
    }

    /// Reads a non-negative decimal (scale scores).
    pub(super) fn decimal(&self, index: usize) -> Result<Option<f64>, NormalizeError> {
        let value = self.text(index).trim();
        if is_suppressed(value) || is_missing(value) {
            return Ok(None);
        }
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() && number >= 0.0 => Ok(Some(number)),
            _ => Err(self.malformed(index, "not a non-negative number")),
        }
    }

    /// Reads a `Y`/`N`/`All` slice flag.
    pub(super) fn slice_flag(
        &self,
        layout: Layout,
        index: Option<usize>,
    ) -> Result<Option<bool>, NormalizeError> {
        let Some(index) = index else {
            return Ok(None);
        };
        let value = self.text(index).trim();
        match value.to_ascii_uppercase().as_str() {
            "Y" | "YES" => Ok(Some(true)),
            "N" | "NO" => Ok(Some(false)),
            "ALL" => Ok(None),
            _ if is_missing(value) => Ok(None),
            _ => Err(self.unrecognized(layout, index)),
        }
    }
}

/// Clamps a percentage into [0, 100], recording a warning when it was out.
pub(crate) fn clamp_percent(
    value: f64,
    warnings: &mut WarningCollector,
    detail: impl FnOnce() -> String,
) -> f64 {
    if (0.0..=100.0).contains(&value) {
        value
    } else {
        warnings.record(WarningKind::PercentOutOfRange, detail);
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(headers: &[&str], row: &[&str]) -> RawTable {
        RawTable::new(
            headers.iter().map(ToString::to_string).collect(),
            vec![row.iter().map(ToString::to_string).collect()],
        )
    }

    // ==================== Count Tests ====================

    #[test]
    fn test_count_suppressed_is_none_not_zero() {
        let raw = table(&["N", "Z"], &["*", "0"]);
        let reader = RowReader::new(&raw, 0);
        let mut tally = SuppressionTally::default();
        assert_eq!(reader.count(0, &mut tally).unwrap(), None);
        assert_eq!(reader.count(1, &mut tally).unwrap(), Some(0));
        assert_eq!(tally.suppressed, 1);
        assert_eq!(tally.cells, 2);
    }

    #[test]
    fn test_count_accepts_thousands_and_integral_floats() {
        let raw = table(&["A", "B"], &["1,234", "12.0"]);
        let reader = RowReader::new(&raw, 0);
        let mut tally = SuppressionTally::default();
        assert_eq!(reader.count(0, &mut tally).unwrap(), Some(1234));
        assert_eq!(reader.count(1, &mut tally).unwrap(), Some(12));
    }

    #[test]
    fn test_count_rejects_negative_and_text() {
        let raw = table(&["A", "B", "C"], &["-3", "abc", "1.5"]);
        let reader = RowReader::new(&raw, 0);
        let mut tally = SuppressionTally::default();
        for index in 0..3 {
            let err = reader.count(index, &mut tally).unwrap_err();
            assert!(matches!(
                err,
                NormalizeError::Malformed(ParseError::MalformedValue { row: 1, .. })
            ));
        }
    }

    // ==================== Percent Tests ====================

    #[test]
    fn test_percent_clamps_and_warns() {
        let raw = table(&["P", "Q", "R"], &["104.5", "55.5%", "*"]);
        let reader = RowReader::new(&raw, 0);
        let mut warnings = WarningCollector::new(2024);
        assert_eq!(reader.percent(0, &mut warnings).unwrap(), Some(100.0));
        assert_eq!(reader.percent(1, &mut warnings).unwrap(), Some(55.5));
        assert_eq!(reader.percent(2, &mut warnings).unwrap(), None);
        let warnings = warnings.finish();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::PercentOutOfRange);
    }

    #[test]
    fn test_percent_rejects_nan() {
        let raw = table(&["P"], &["NaN"]);
        let reader = RowReader::new(&raw, 0);
        let mut warnings = WarningCollector::new(2024);
        assert!(reader.percent(0, &mut warnings).is_err());
    }

    // ==================== Column Tests ====================

    #[test]
    fn test_columns_fail_on_unclaimed_header() {
        let raw = table(&["CDS_CODE", "SURPRISE", ""], &["1", "2", ""]);
        let mut columns = Columns::new(&raw, Layout::EnrollmentHistorical);
        columns.require(&["CDS_CODE"]).unwrap();
        let err = columns.finish().unwrap_err();
        let NormalizeError::UnrecognizedColumn { column, .. } = &err else {
            panic!("expected unrecognized column, got {err:?}");
        };
        assert_eq!(column, "SURPRISE");
        assert!(err.is_mapping_gap());
    }

    #[test]
    fn test_columns_require_reports_first_alias() {
        let raw = table(&["A"], &["1"]);
        let mut columns = Columns::new(&raw, Layout::GraduationAcgr);
        let err = columns.require(&["CharterSchool", "Charter"]).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingColumn { column: "CharterSchool", .. }));
    }

    #[test]
    fn test_slice_flag_values() {
        let raw = table(&["Charter"], &["All"]);
        let reader = RowReader::new(&raw, 0);
        assert_eq!(reader.slice_flag(Layout::EnrollmentCensus, Some(0)).unwrap(), None);
        let raw = table(&["Charter"], &["Maybe"]);
        let reader = RowReader::new(&raw, 0);
        assert!(reader.slice_flag(Layout::EnrollmentCensus, Some(0)).is_err());
    }
}
