//! Result tables: typed rows for one dataset and shape, plus warnings.

mod entity;
mod export;
mod records;

pub use entity::{Entity, LevelFlags};
pub use export::{ExportError, OutputFormat};
pub use records::{
    AssessmentRecord, AssessmentTidyRecord, EnrollmentRecord, EnrollmentTidyRecord, GradeBand,
    GradeBandRecord, GraduationRecord, GraduationTidyRecord, OutcomeCell, Record,
};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::Dataset;
use crate::quality::DataQualityWarning;

/// Shape of a table's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Canonical wide records.
    Wide,
    /// Long records, one observation per row.
    Tidy,
    /// Grade-band aggregates of tidy enrollment.
    GradeBands,
}

impl Shape {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wide => "wide",
            Self::Tidy => "tidy",
            Self::GradeBands => "grade_bands",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed rows of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum Rows {
    Enrollment(Vec<EnrollmentRecord>),
    EnrollmentTidy(Vec<EnrollmentTidyRecord>),
    GradeBands(Vec<GradeBandRecord>),
    Graduation(Vec<GraduationRecord>),
    GraduationTidy(Vec<GraduationTidyRecord>),
    Assessment(Vec<AssessmentRecord>),
    AssessmentTidy(Vec<AssessmentTidyRecord>),
}

macro_rules! for_each_rows {
    ($rows:expr, $records:ident => $body:expr) => {
        match $rows {
            Rows::Enrollment($records) => $body,
            Rows::EnrollmentTidy($records) => $body,
            Rows::GradeBands($records) => $body,
            Rows::Graduation($records) => $body,
            Rows::GraduationTidy($records) => $body,
            Rows::Assessment($records) => $body,
            Rows::AssessmentTidy($records) => $body,
        }
    };
}

pub(crate) use for_each_rows;

impl Rows {
    #[must_use]
    pub fn dataset(&self) -> Dataset {
        match self {
            Self::Enrollment(_) | Self::EnrollmentTidy(_) | Self::GradeBands(_) => {
                Dataset::Enrollment
            }
            Self::Graduation(_) | Self::GraduationTidy(_) => Dataset::Graduation,
            Self::Assessment(_) | Self::AssessmentTidy(_) => Dataset::Assessment,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Enrollment(_) | Self::Graduation(_) | Self::Assessment(_) => Shape::Wide,
            Self::EnrollmentTidy(_) | Self::GraduationTidy(_) | Self::AssessmentTidy(_) => {
                Shape::Tidy
            }
            Self::GradeBands(_) => Shape::GradeBands,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        for_each_rows!(self, records => records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn years(&self) -> BTreeSet<u16> {
        for_each_rows!(self, records => records.iter().map(|r| r.entity().end_year).collect())
    }

    /// Appends `other`, which must hold the same variant.
    fn append(&mut self, other: Rows) -> Result<(), TableError> {
        match (self, other) {
            (Self::Enrollment(a), Self::Enrollment(b)) => a.extend(b),
            (Self::EnrollmentTidy(a), Self::EnrollmentTidy(b)) => a.extend(b),
            (Self::GradeBands(a), Self::GradeBands(b)) => a.extend(b),
            (Self::Graduation(a), Self::Graduation(b)) => a.extend(b),
            (Self::GraduationTidy(a), Self::GraduationTidy(b)) => a.extend(b),
            (Self::Assessment(a), Self::Assessment(b)) => a.extend(b),
            (Self::AssessmentTidy(a), Self::AssessmentTidy(b)) => a.extend(b),
            (left, right) => {
                return Err(TableError::Mismatch {
                    left: format!("{} {}", left.dataset(), left.shape()),
                    right: format!("{} {}", right.dataset(), right.shape()),
                });
            }
        }
        Ok(())
    }

    fn empty_like(&self) -> Self {
        match self {
            Self::Enrollment(_) => Self::Enrollment(Vec::new()),
            Self::EnrollmentTidy(_) => Self::EnrollmentTidy(Vec::new()),
            Self::GradeBands(_) => Self::GradeBands(Vec::new()),
            Self::Graduation(_) => Self::Graduation(Vec::new()),
            Self::GraduationTidy(_) => Self::GraduationTidy(Vec::new()),
            Self::Assessment(_) => Self::Assessment(Vec::new()),
            Self::AssessmentTidy(_) => Self::AssessmentTidy(Vec::new()),
        }
    }
}

/// Error combining tables.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("cannot concatenate {left} rows with {right} rows")]
    Mismatch { left: String, right: String },
    #[error("cannot concatenate an empty list of tables")]
    NoTables,
}

/// Rows for one dataset and shape, with the data-quality warnings raised
/// while producing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Rows,
    warnings: Vec<DataQualityWarning>,
}

impl Table {
    #[must_use]
    pub fn new(rows: Rows, warnings: Vec<DataQualityWarning>) -> Self {
        Self { rows, warnings }
    }

    #[must_use]
    pub fn dataset(&self) -> Dataset {
        self.rows.dataset()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.rows.shape()
    }

    #[must_use]
    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Rows {
        self.rows
    }

    #[must_use]
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct end years present in the rows.
    #[must_use]
    pub fn years(&self) -> BTreeSet<u16> {
        self.rows.years()
    }

    /// An empty table of the same dataset and shape.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new(self.rows.empty_like(), Vec::new())
    }

    /// Concatenates tables in order, keeping every warning.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Mismatch`] when datasets or shapes differ and
    /// [`TableError::NoTables`] for an empty input.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Result<Table, TableError> {
        let mut tables = tables.into_iter();
        let mut combined = tables.next().ok_or(TableError::NoTables)?;
        for table in tables {
            combined.rows.append(table.rows)?;
            combined.warnings.extend(table.warnings);
        }
        Ok(combined)
    }
}
