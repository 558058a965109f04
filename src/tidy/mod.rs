//! Tidy transformer: canonical wide tables become long tables with one
//! observation per row, level flags and percentage columns.

mod assessment;
mod bands;
mod enrollment;
mod graduation;
mod percent;

pub use bands::grade_bands;
pub use percent::Denominator;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::dataset::Dataset;
use crate::quality::{DataQualityWarning, WarningCollector};
use crate::table::{Rows, Shape, Table};

/// Errors reshaping a table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TidyError {
    /// The input is not in the shape this step consumes.
    #[error("expected {expected} rows, got {actual} {dataset} rows")]
    WrongShape {
        dataset: Dataset,
        expected: Shape,
        actual: Shape,
    },

    /// Grade bands exist for enrollment only.
    #[error("grade bands are only defined for enrollment, not {dataset}")]
    NotEnrollment { dataset: Dataset },
}

/// One warning collector per end year.
#[derive(Debug, Default)]
pub(crate) struct YearWarnings {
    collectors: BTreeMap<u16, WarningCollector>,
}

impl YearWarnings {
    pub(crate) fn year(&mut self, end_year: u16) -> &mut WarningCollector {
        self.collectors
            .entry(end_year)
            .or_insert_with(|| WarningCollector::new(end_year))
    }

    pub(crate) fn finish(self, mut existing: Vec<DataQualityWarning>) -> Vec<DataQualityWarning> {
        for collector in self.collectors.into_values() {
            existing.extend(collector.finish());
        }
        existing
    }
}

/// Pivots a wide table into its tidy form. Warnings already attached to
/// `table` are kept.
///
/// # Errors
///
/// Returns [`TidyError::WrongShape`] when `table` is not wide.
#[instrument(skip(table), fields(dataset = %table.dataset(), rows = table.len()))]
pub fn tidy(table: &Table) -> Result<Table, TidyError> {
    let mut warnings = YearWarnings::default();
    let rows = match table.rows() {
        Rows::Enrollment(records) => Rows::EnrollmentTidy(enrollment::tidy(records, &mut warnings)),
        Rows::Graduation(records) => Rows::GraduationTidy(graduation::tidy(records, &mut warnings)),
        Rows::Assessment(records) => Rows::AssessmentTidy(assessment::tidy(records)),
        other => {
            return Err(TidyError::WrongShape {
                dataset: other.dataset(),
                expected: Shape::Wide,
                actual: other.shape(),
            });
        }
    };
    debug!(tidy_rows = rows.len(), "pivoted to tidy");
    Ok(Table::new(rows, warnings.finish(table.warnings().to_vec())))
}
