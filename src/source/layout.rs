//! Era layouts and file formats.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column layout of one era of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// 1982-1992 fixed-width school files, letter ethnic codes.
    EnrollmentLegacy,
    /// 1993-2008 tab-delimited school files, ethnic codes `0`-`8`.
    EnrollmentHistorical,
    /// 2009-2023 tab-delimited school files, ethnic codes `0`-`7`, `9`.
    EnrollmentHistoricalRevised,
    /// 2024+ census day files with all aggregation levels included.
    EnrollmentCensus,
    /// Adjusted cohort graduation rate files.
    GraduationAcgr,
    /// 2015-2019 Smarter Balanced research files.
    AssessmentSbacOriginal,
    /// 2021+ Smarter Balanced research files with renamed columns.
    AssessmentSbacRevised,
}

impl Layout {
    /// Container and encoding of files in this era.
    #[must_use]
    pub fn file_format(self) -> FileFormat {
        match self {
            Self::EnrollmentLegacy => FileFormat::FixedWidth(LEGACY_ENROLLMENT_COLUMNS),
            Self::EnrollmentHistorical
            | Self::EnrollmentHistoricalRevised
            | Self::EnrollmentCensus
            | Self::GraduationAcgr => FileFormat::Delimited { delimiter: b'\t' },
            Self::AssessmentSbacOriginal | Self::AssessmentSbacRevised => {
                FileFormat::ZipArchive { delimiter: b'^' }
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnrollmentLegacy => "enrollment_legacy",
            Self::EnrollmentHistorical => "enrollment_historical",
            Self::EnrollmentHistoricalRevised => "enrollment_historical_revised",
            Self::EnrollmentCensus => "enrollment_census",
            Self::GraduationAcgr => "graduation_acgr",
            Self::AssessmentSbacOriginal => "assessment_sbac_original",
            Self::AssessmentSbacRevised => "assessment_sbac_revised",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a fixed-width layout, as a half-open byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedColumn {
    pub name: &'static str,
    pub start: usize,
    pub end: usize,
}

const fn col(name: &'static str, start: usize, end: usize) -> FixedColumn {
    FixedColumn { name, start, end }
}

/// Record layout of the 1982-1992 school enrollment files.
pub const LEGACY_ENROLLMENT_COLUMNS: &[FixedColumn] = &[
    col("CDS_CODE", 0, 14),
    col("ETHNIC", 14, 15),
    col("GENDER", 15, 16),
    col("KDGN", 16, 21),
    col("GR_1", 21, 26),
    col("GR_2", 26, 31),
    col("GR_3", 31, 36),
    col("GR_4", 36, 41),
    col("GR_5", 41, 46),
    col("GR_6", 46, 51),
    col("GR_7", 51, 56),
    col("GR_8", 56, 61),
    col("GR_9", 61, 66),
    col("GR_10", 66, 71),
    col("GR_11", 71, 76),
    col("GR_12", 76, 81),
    col("UNGR_ELM", 81, 86),
    col("UNGR_SEC", 86, 91),
    col("ENR_TOTAL", 91, 97),
    col("ADULT", 97, 102),
];

/// Container and encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Fixed-width text records.
    FixedWidth(&'static [FixedColumn]),
    /// Delimited text with a header row.
    Delimited { delimiter: u8 },
    /// Zip archive holding one delimited text member.
    ZipArchive { delimiter: u8 },
    /// Excel workbook; the first sheet is read.
    Spreadsheet,
}

impl FileFormat {
    /// Short name used in logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedWidth(_) => "fixed-width",
            Self::Delimited { .. } => "delimited",
            Self::ZipArchive { .. } => "zip",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}
