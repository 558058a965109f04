//! CAASPP research file codes: student groups, tests, grades and
//! achievement levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{GradeLevel, Subgroup};

/// What a CAASPP student group id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentGroupCode {
    /// A group with a canonical subgroup.
    Group(Subgroup),
    /// A cross-tabulation (for example race × economic status). These ids are
    /// recognized and deliberately not carried into the canonical shape,
    /// because they overlap the single-dimension groups.
    CrossTabulated,
}

/// Id ranges of cross-tabulated groups.
const CROSS_TABULATED_RANGES: &[std::ops::RangeInclusive<u16>] = &[200..=227, 300..=314];

/// Looks up a CAASPP student group id.
#[must_use]
pub fn student_group(id: &str) -> Option<StudentGroupCode> {
    let id: u16 = id.trim().parse().ok()?;
    let subgroup = match id {
        1 => Subgroup::Total,
        3 => Subgroup::Male,
        4 => Subgroup::Female,
        6 => Subgroup::FluentEnglishProficient,
        7 => Subgroup::InitialFluentEnglishProficient,
        8 => Subgroup::ReclassifiedFluentEnglishProficient,
        28 => Subgroup::Migrant,
        29 => Subgroup::NotMigrant,
        31 => Subgroup::SocioeconomicallyDisadvantaged,
        74 => Subgroup::Black,
        75 => Subgroup::NativeAmerican,
        76 => Subgroup::Asian,
        77 => Subgroup::Filipino,
        78 => Subgroup::Hispanic,
        79 => Subgroup::PacificIslander,
        80 => Subgroup::White,
        90 => Subgroup::ParentNotHighSchoolGraduate,
        91 => Subgroup::ParentHighSchoolGraduate,
        92 => Subgroup::ParentSomeCollege,
        93 => Subgroup::ParentCollegeGraduate,
        94 => Subgroup::ParentGraduateSchool,
        99 => Subgroup::NoReportedDisability,
        111 => Subgroup::NotSocioeconomicallyDisadvantaged,
        120 => Subgroup::EnglishLearnerUnder12Months,
        121 => Subgroup::ParentEducationDeclined,
        128 => Subgroup::StudentsWithDisabilities,
        142 => Subgroup::EnglishLearner12MonthsOrMore,
        144 => Subgroup::Multiracial,
        160 => Subgroup::EnglishLearner,
        170 => Subgroup::EverEnglishLearner,
        180 => Subgroup::EnglishOnly,
        190 => Subgroup::Foster,
        240 => Subgroup::Homeless,
        250 => Subgroup::NotHomeless,
        other if CROSS_TABULATED_RANGES.iter().any(|r| r.contains(&other)) => {
            return Some(StudentGroupCode::CrossTabulated);
        }
        _ => return None,
    };
    Some(StudentGroupCode::Group(subgroup))
}

/// Tested subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSubject {
    Ela,
    Math,
}

impl TestSubject {
    /// Looks up a research-file test id.
    #[must_use]
    pub fn from_test_id(id: &str) -> Option<Self> {
        match id.trim() {
            "1" | "01" => Some(Self::Ela),
            "2" | "02" => Some(Self::Math),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ela => "ela",
            Self::Math => "math",
        }
    }
}

impl fmt::Display for TestSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tested grade. `13` means all tested grades combined.
#[must_use]
pub fn tested_grade(code: &str) -> Option<GradeLevel> {
    match code.trim().parse::<u8>().ok()? {
        n @ 3..=8 | n @ 11 => GradeLevel::numbered(n),
        13 => Some(GradeLevel::Total),
        _ => None,
    }
}

/// Smarter Balanced achievement level bands reported as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    StandardExceeded,
    StandardMet,
    StandardMetAndAbove,
    StandardNearlyMet,
    StandardNotMet,
}

impl PerformanceLevel {
    pub const ALL: [PerformanceLevel; 5] = [
        Self::StandardExceeded,
        Self::StandardMet,
        Self::StandardMetAndAbove,
        Self::StandardNearlyMet,
        Self::StandardNotMet,
    ];

    /// Research-file column holding this level's percentage.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::StandardExceeded => "Percentage Standard Exceeded",
            Self::StandardMet => "Percentage Standard Met",
            Self::StandardMetAndAbove => "Percentage Standard Met and Above",
            Self::StandardNearlyMet => "Percentage Standard Nearly Met",
            Self::StandardNotMet => "Percentage Standard Not Met",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::StandardExceeded => "standard_exceeded",
            Self::StandardMet => "standard_met",
            Self::StandardMetAndAbove => "standard_met_and_above",
            Self::StandardNearlyMet => "standard_nearly_met",
            Self::StandardNotMet => "standard_not_met",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
