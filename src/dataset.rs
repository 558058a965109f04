//! Dataset identifiers accepted by the public API and CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A published statistics family. Each dataset has its own URL templates,
/// file layouts and canonical record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Fall enrollment by grade and student subgroup.
    Enrollment,
    /// Four-year adjusted cohort graduation outcomes.
    Graduation,
    /// CAASPP Smarter Balanced ELA and mathematics results.
    Assessment,
}

/// Returned when a dataset name is not recognized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown dataset '{name}' (expected one of: enrollment, graduation, assessment)")]
pub struct UnknownDataset {
    /// The name that failed to parse.
    pub name: String,
}

impl Dataset {
    /// Every dataset, in display order.
    pub const ALL: [Dataset; 3] = [Self::Enrollment, Self::Graduation, Self::Assessment];

    /// Returns the stable lowercase name used in cache paths and CLI arguments.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::Graduation => "graduation",
            Self::Assessment => "assessment",
        }
    }

    /// Supported end years for this dataset, ascending.
    #[must_use]
    pub fn available_years(self) -> Vec<u16> {
        crate::source::available_years(self)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = UnknownDataset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enrollment" | "enr" | "enroll" => Ok(Self::Enrollment),
            "graduation" | "grad" | "acgr" => Ok(Self::Graduation),
            "assessment" | "caaspp" | "sbac" => Ok(Self::Assessment),
            _ => Err(UnknownDataset {
                name: s.to_string(),
            }),
        }
    }
}
