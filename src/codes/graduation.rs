//! Four-year adjusted cohort outcome columns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cohort outcome reported as a `(Count)` / `(Rate)` column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraduationOutcome {
    RegularDiploma,
    MetUcCsuRequirements,
    SealOfBiliteracy,
    GoldenStateSeal,
    ChspeCompleter,
    AdultEdDiploma,
    SpedCertificate,
    GedCompleter,
    OtherTransfer,
    Dropout,
    StillEnrolled,
}

impl GraduationOutcome {
    /// All outcomes in publication column order.
    pub const ALL: [GraduationOutcome; 11] = [
        Self::RegularDiploma,
        Self::MetUcCsuRequirements,
        Self::SealOfBiliteracy,
        Self::GoldenStateSeal,
        Self::ChspeCompleter,
        Self::AdultEdDiploma,
        Self::SpedCertificate,
        Self::GedCompleter,
        Self::OtherTransfer,
        Self::Dropout,
        Self::StillEnrolled,
    ];

    /// Column prefix used by the publisher, before ` (Count)` / ` (Rate)`.
    #[must_use]
    pub fn column_prefix(self) -> &'static str {
        match self {
            Self::RegularDiploma => "Regular HS Diploma Graduates",
            Self::MetUcCsuRequirements => "Met UC/CSU Grad Req's",
            Self::SealOfBiliteracy => "Seal of Biliteracy",
            Self::GoldenStateSeal => "Golden State Seal Merit Diploma",
            Self::ChspeCompleter => "CHSPE Completer",
            Self::AdultEdDiploma => "Adult Ed. HS Diploma",
            Self::SpedCertificate => "SPED Certificate",
            Self::GedCompleter => "GED Completer",
            Self::OtherTransfer => "Other Transfer",
            Self::Dropout => "Dropout",
            Self::StillEnrolled => "Still Enrolled",
        }
    }

    /// Looks up an outcome by its column prefix, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_column_prefix(prefix: &str) -> Option<Self> {
        let wanted = prefix.trim();
        Self::ALL
            .into_iter()
            .find(|outcome| outcome.column_prefix().eq_ignore_ascii_case(wanted))
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::RegularDiploma => "regular_diploma",
            Self::MetUcCsuRequirements => "met_uc_csu_requirements",
            Self::SealOfBiliteracy => "seal_of_biliteracy",
            Self::GoldenStateSeal => "golden_state_seal",
            Self::ChspeCompleter => "chspe_completer",
            Self::AdultEdDiploma => "adult_ed_diploma",
            Self::SpedCertificate => "sped_certificate",
            Self::GedCompleter => "ged_completer",
            Self::OtherTransfer => "other_transfer",
            Self::Dropout => "dropout",
            Self::StillEnrolled => "still_enrolled",
        }
    }
}

impl fmt::Display for GraduationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
