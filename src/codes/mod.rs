//! Static code-to-label tables.
//!
//! Every era of every dataset uses its own codes for grades and student
//! subgroups. The tables here translate those source codes into one stable
//! vocabulary ([`GradeLevel`], [`Subgroup`]). The tables are plain `match`
//! expressions over `&'static` data: immutable, loaded with the binary, and
//! never mutated at runtime.
//!
//! A label's meaning never changes once published; a new source code gets a
//! new table entry rather than a reinterpretation of an existing one.

pub mod assessment;
pub mod enrollment;
pub mod graduation;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Grade level of a count.
///
/// [`GradeLevel::Total`] only appears in tidy output, where the wide
/// `total` column becomes a row of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "TK")]
    TransitionalKindergarten,
    #[serde(rename = "K")]
    Kindergarten,
    #[serde(rename = "01")]
    Grade1,
    #[serde(rename = "02")]
    Grade2,
    #[serde(rename = "03")]
    Grade3,
    #[serde(rename = "04")]
    Grade4,
    #[serde(rename = "05")]
    Grade5,
    #[serde(rename = "06")]
    Grade6,
    #[serde(rename = "07")]
    Grade7,
    #[serde(rename = "08")]
    Grade8,
    #[serde(rename = "09")]
    Grade9,
    #[serde(rename = "10")]
    Grade10,
    #[serde(rename = "11")]
    Grade11,
    #[serde(rename = "12")]
    Grade12,
    /// Ungraded elementary.
    #[serde(rename = "UE")]
    UngradedElementary,
    /// Ungraded secondary.
    #[serde(rename = "US")]
    UngradedSecondary,
    /// Adults enrolled in K-12 schools.
    #[serde(rename = "AD")]
    Adult,
    #[serde(rename = "TOTAL")]
    Total,
}

impl GradeLevel {
    /// Grades 1 through 12 in order.
    pub const NUMBERED: [GradeLevel; 12] = [
        Self::Grade1,
        Self::Grade2,
        Self::Grade3,
        Self::Grade4,
        Self::Grade5,
        Self::Grade6,
        Self::Grade7,
        Self::Grade8,
        Self::Grade9,
        Self::Grade10,
        Self::Grade11,
        Self::Grade12,
    ];

    /// Returns the grade for a number 1..=12.
    #[must_use]
    pub fn numbered(n: u8) -> Option<Self> {
        match n {
            1..=12 => Some(Self::NUMBERED[usize::from(n) - 1]),
            _ => None,
        }
    }

    /// Stable short label (`TK`, `K`, `01`..`12`, `UE`, `US`, `AD`, `TOTAL`).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::TransitionalKindergarten => "TK",
            Self::Kindergarten => "K",
            Self::Grade1 => "01",
            Self::Grade2 => "02",
            Self::Grade3 => "03",
            Self::Grade4 => "04",
            Self::Grade5 => "05",
            Self::Grade6 => "06",
            Self::Grade7 => "07",
            Self::Grade8 => "08",
            Self::Grade9 => "09",
            Self::Grade10 => "10",
            Self::Grade11 => "11",
            Self::Grade12 => "12",
            Self::UngradedElementary => "UE",
            Self::UngradedSecondary => "US",
            Self::Adult => "AD",
            Self::Total => "TOTAL",
        }
    }

    /// Parses a stable label back into a grade.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "TK" => Some(Self::TransitionalKindergarten),
            "K" | "KN" => Some(Self::Kindergarten),
            "UE" => Some(Self::UngradedElementary),
            "US" => Some(Self::UngradedSecondary),
            "AD" => Some(Self::Adult),
            "TOTAL" => Some(Self::Total),
            other => other.parse::<u8>().ok().and_then(Self::numbered),
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Family a subgroup belongs to. Subgroups within one taxonomy do not
/// overlap, so their counts approximately sum to the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    Total,
    RaceEthnicity,
    Gender,
    StudentGroup,
    EnglishLanguage,
    ParentEducation,
}

/// Canonical student subgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subgroup {
    Total,

    Hispanic,
    White,
    Black,
    Asian,
    Filipino,
    NativeAmerican,
    PacificIslander,
    Multiracial,
    RaceNotReported,

    Female,
    Male,
    NonBinary,
    GenderMissing,

    StudentsWithDisabilities,
    NoReportedDisability,
    SocioeconomicallyDisadvantaged,
    NotSocioeconomicallyDisadvantaged,
    Foster,
    Homeless,
    NotHomeless,
    Migrant,
    NotMigrant,

    EnglishLearner,
    EnglishOnly,
    FluentEnglishProficient,
    InitialFluentEnglishProficient,
    ReclassifiedFluentEnglishProficient,
    EverEnglishLearner,
    #[serde(rename = "english_learner_under_12_months")]
    EnglishLearnerUnder12Months,
    #[serde(rename = "english_learner_12_months_or_more")]
    EnglishLearner12MonthsOrMore,

    ParentNotHighSchoolGraduate,
    ParentHighSchoolGraduate,
    ParentSomeCollege,
    ParentCollegeGraduate,
    ParentGraduateSchool,
    ParentEducationDeclined,
}

impl Subgroup {
    pub const ALL: [Subgroup; 37] = [
        Self::Total,
        Self::Hispanic,
        Self::White,
        Self::Black,
        Self::Asian,
        Self::Filipino,
        Self::NativeAmerican,
        Self::PacificIslander,
        Self::Multiracial,
        Self::RaceNotReported,
        Self::Female,
        Self::Male,
        Self::NonBinary,
        Self::GenderMissing,
        Self::StudentsWithDisabilities,
        Self::NoReportedDisability,
        Self::SocioeconomicallyDisadvantaged,
        Self::NotSocioeconomicallyDisadvantaged,
        Self::Foster,
        Self::Homeless,
        Self::NotHomeless,
        Self::Migrant,
        Self::NotMigrant,
        Self::EnglishLearner,
        Self::EnglishOnly,
        Self::FluentEnglishProficient,
        Self::InitialFluentEnglishProficient,
        Self::ReclassifiedFluentEnglishProficient,
        Self::EverEnglishLearner,
        Self::EnglishLearnerUnder12Months,
        Self::EnglishLearner12MonthsOrMore,
        Self::ParentNotHighSchoolGraduate,
        Self::ParentHighSchoolGraduate,
        Self::ParentSomeCollege,
        Self::ParentCollegeGraduate,
        Self::ParentGraduateSchool,
        Self::ParentEducationDeclined,
    ];

    /// Taxonomy this subgroup partitions.
    #[must_use]
    pub fn taxonomy(self) -> Taxonomy {
        match self {
            Self::Total => Taxonomy::Total,
            Self::Hispanic
            | Self::White
            | Self::Black
            | Self::Asian
            | Self::Filipino
            | Self::NativeAmerican
            | Self::PacificIslander
            | Self::Multiracial
            | Self::RaceNotReported => Taxonomy::RaceEthnicity,
            Self::Female | Self::Male | Self::NonBinary | Self::GenderMissing => Taxonomy::Gender,
            Self::StudentsWithDisabilities
            | Self::NoReportedDisability
            | Self::SocioeconomicallyDisadvantaged
            | Self::NotSocioeconomicallyDisadvantaged
            | Self::Foster
            | Self::Homeless
            | Self::NotHomeless
            | Self::Migrant
            | Self::NotMigrant => Taxonomy::StudentGroup,
            Self::EnglishLearner
            | Self::EnglishOnly
            | Self::FluentEnglishProficient
            | Self::InitialFluentEnglishProficient
            | Self::ReclassifiedFluentEnglishProficient
            | Self::EverEnglishLearner
            | Self::EnglishLearnerUnder12Months
            | Self::EnglishLearner12MonthsOrMore => Taxonomy::EnglishLanguage,
            Self::ParentNotHighSchoolGraduate
            | Self::ParentHighSchoolGraduate
            | Self::ParentSomeCollege
            | Self::ParentCollegeGraduate
            | Self::ParentGraduateSchool
            | Self::ParentEducationDeclined => Taxonomy::ParentEducation,
        }
    }

    /// Stable snake_case label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Hispanic => "hispanic",
            Self::White => "white",
            Self::Black => "black",
            Self::Asian => "asian",
            Self::Filipino => "filipino",
            Self::NativeAmerican => "native_american",
            Self::PacificIslander => "pacific_islander",
            Self::Multiracial => "multiracial",
            Self::RaceNotReported => "race_not_reported",
            Self::Female => "female",
            Self::Male => "male",
            Self::NonBinary => "non_binary",
            Self::GenderMissing => "gender_missing",
            Self::StudentsWithDisabilities => "students_with_disabilities",
            Self::NoReportedDisability => "no_reported_disability",
            Self::SocioeconomicallyDisadvantaged => "socioeconomically_disadvantaged",
            Self::NotSocioeconomicallyDisadvantaged => "not_socioeconomically_disadvantaged",
            Self::Foster => "foster",
            Self::Homeless => "homeless",
            Self::NotHomeless => "not_homeless",
            Self::Migrant => "migrant",
            Self::NotMigrant => "not_migrant",
            Self::EnglishLearner => "english_learner",
            Self::EnglishOnly => "english_only",
            Self::FluentEnglishProficient => "fluent_english_proficient",
            Self::InitialFluentEnglishProficient => "initial_fluent_english_proficient",
            Self::ReclassifiedFluentEnglishProficient => "reclassified_fluent_english_proficient",
            Self::EverEnglishLearner => "ever_english_learner",
            Self::EnglishLearnerUnder12Months => "english_learner_under_12_months",
            Self::EnglishLearner12MonthsOrMore => "english_learner_12_months_or_more",
            Self::ParentNotHighSchoolGraduate => "parent_not_high_school_graduate",
            Self::ParentHighSchoolGraduate => "parent_high_school_graduate",
            Self::ParentSomeCollege => "parent_some_college",
            Self::ParentCollegeGraduate => "parent_college_graduate",
            Self::ParentGraduateSchool => "parent_graduate_school",
            Self::ParentEducationDeclined => "parent_education_declined",
        }
    }
}

impl fmt::Display for Subgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
