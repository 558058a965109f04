//! Canonical wide and tidy record shapes per dataset.
//!
//! Wide records keep one map entry per measured grade, outcome or
//! performance level. A key absent from the map was not measured that year;
//! a key mapped to `None` was measured and suppressed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, LevelFlags, optional, optional_bool, push};
use crate::codes::assessment::{PerformanceLevel, TestSubject};
use crate::codes::graduation::GraduationOutcome;
use crate::codes::{GradeLevel, Subgroup};

/// Common access for export and concatenation.
pub trait Record {
    fn entity(&self) -> &Entity;

    /// Named cells in column order.
    fn cells(&self) -> Vec<(String, String)>;
}

// ==================== Enrollment ====================

/// One entity × subgroup with counts per grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    #[serde(flatten)]
    pub entity: Entity,
    pub subgroup: Subgroup,
    pub grades: BTreeMap<GradeLevel, Option<u64>>,
    pub total: Option<u64>,
}

impl Record for EnrollmentRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        push(&mut out, "subgroup", self.subgroup.to_string());
        for (grade, count) in &self.grades {
            push(&mut out, &format!("grade_{grade}"), optional(*count));
        }
        push(&mut out, "total", optional(self.total));
        out
    }
}

/// One entity × subgroup × grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentTidyRecord {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(flatten)]
    pub flags: LevelFlags,
    pub subgroup: Subgroup,
    pub grade_level: GradeLevel,
    pub n_students: Option<u64>,
    /// Share of the entity's total-subgroup count for the same grade, 0-100.
    pub pct: Option<f64>,
}

impl Record for EnrollmentTidyRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        self.flags.push_cells(&mut out);
        push(&mut out, "subgroup", self.subgroup.to_string());
        push(&mut out, "grade_level", self.grade_level.to_string());
        push(&mut out, "n_students", optional(self.n_students));
        push(&mut out, "pct", optional(self.pct));
        out
    }
}

/// Grade bands used by grade-band aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    /// TK through 5.
    Elementary,
    /// 6 through 8.
    Middle,
    /// 9 through 12.
    High,
    /// TK through 12, ungraded and adult excluded.
    K12,
}

impl GradeBand {
    pub const ALL: [GradeBand; 4] = [Self::Elementary, Self::Middle, Self::High, Self::K12];

    /// Grades summed into this band.
    #[must_use]
    pub fn grades(self) -> &'static [GradeLevel] {
        use GradeLevel::{
            Grade1, Grade2, Grade3, Grade4, Grade5, Grade6, Grade7, Grade8, Grade9, Grade10,
            Grade11, Grade12, Kindergarten, TransitionalKindergarten,
        };
        match self {
            Self::Elementary => &[
                TransitionalKindergarten,
                Kindergarten,
                Grade1,
                Grade2,
                Grade3,
                Grade4,
                Grade5,
            ],
            Self::Middle => &[Grade6, Grade7, Grade8],
            Self::High => &[Grade9, Grade10, Grade11, Grade12],
            Self::K12 => &[
                TransitionalKindergarten,
                Kindergarten,
                Grade1,
                Grade2,
                Grade3,
                Grade4,
                Grade5,
                Grade6,
                Grade7,
                Grade8,
                Grade9,
                Grade10,
                Grade11,
                Grade12,
            ],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::Middle => "middle",
            Self::High => "high",
            Self::K12 => "k12",
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sum of a band's grades for one entity × subgroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeBandRecord {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(flatten)]
    pub flags: LevelFlags,
    pub subgroup: Subgroup,
    pub band: GradeBand,
    /// Sum of available contributors; `None` only when all are missing.
    pub n_students: Option<u64>,
    /// True when at least one contributing grade was missing.
    pub partial: bool,
    pub missing_grades: Vec<GradeLevel>,
}

impl Record for GradeBandRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        self.flags.push_cells(&mut out);
        push(&mut out, "subgroup", self.subgroup.to_string());
        push(&mut out, "band", self.band.to_string());
        push(&mut out, "n_students", optional(self.n_students));
        push(&mut out, "partial", self.partial.to_string());
        let missing: Vec<&str> = self.missing_grades.iter().map(|g| g.label()).collect();
        push(&mut out, "missing_grades", missing.join(";"));
        out
    }
}

// ==================== Graduation ====================

/// Count and rate for one cohort outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeCell {
    pub count: Option<u64>,
    /// Reported rate, 0-100.
    pub rate: Option<f64>,
}

/// One entity × subgroup with cohort size and outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraduationRecord {
    #[serde(flatten)]
    pub entity: Entity,
    /// Dashboard Alternative School Status slice; `None` covers both.
    pub is_dass: Option<bool>,
    pub subgroup: Subgroup,
    pub cohort_students: Option<u64>,
    pub outcomes: BTreeMap<GraduationOutcome, OutcomeCell>,
}

impl Record for GraduationRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        push(&mut out, "is_dass", optional_bool(self.is_dass));
        push(&mut out, "subgroup", self.subgroup.to_string());
        push(&mut out, "cohort_students", optional(self.cohort_students));
        for (outcome, cell) in &self.outcomes {
            push(&mut out, &format!("{outcome}_count"), optional(cell.count));
            push(&mut out, &format!("{outcome}_rate"), optional(cell.rate));
        }
        out
    }
}

/// One entity × subgroup × outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraduationTidyRecord {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(flatten)]
    pub flags: LevelFlags,
    pub is_dass: Option<bool>,
    pub subgroup: Subgroup,
    pub outcome: GraduationOutcome,
    pub cohort_students: Option<u64>,
    pub n_students: Option<u64>,
    pub pct: Option<f64>,
}

impl Record for GraduationTidyRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        self.flags.push_cells(&mut out);
        push(&mut out, "is_dass", optional_bool(self.is_dass));
        push(&mut out, "subgroup", self.subgroup.to_string());
        push(&mut out, "outcome", self.outcome.to_string());
        push(&mut out, "cohort_students", optional(self.cohort_students));
        push(&mut out, "n_students", optional(self.n_students));
        push(&mut out, "pct", optional(self.pct));
        out
    }
}

// ==================== Assessment ====================

/// One entity × subgroup × test × grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(flatten)]
    pub entity: Entity,
    pub subgroup: Subgroup,
    pub test: TestSubject,
    pub grade_level: GradeLevel,
    pub students_enrolled: Option<u64>,
    pub students_tested: Option<u64>,
    pub students_with_scores: Option<u64>,
    pub mean_scale_score: Option<f64>,
    pub levels: BTreeMap<PerformanceLevel, Option<f64>>,
}

impl Record for AssessmentRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        push(&mut out, "subgroup", self.subgroup.to_string());
        push(&mut out, "test", self.test.to_string());
        push(&mut out, "grade_level", self.grade_level.to_string());
        push(&mut out, "students_enrolled", optional(self.students_enrolled));
        push(&mut out, "students_tested", optional(self.students_tested));
        push(&mut out, "students_with_scores", optional(self.students_with_scores));
        push(&mut out, "mean_scale_score", optional(self.mean_scale_score));
        for (level, pct) in &self.levels {
            push(&mut out, &format!("pct_{level}"), optional(*pct));
        }
        out
    }
}

/// One entity × subgroup × test × grade × performance level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentTidyRecord {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(flatten)]
    pub flags: LevelFlags,
    pub subgroup: Subgroup,
    pub test: TestSubject,
    pub grade_level: GradeLevel,
    pub performance_level: PerformanceLevel,
    pub students_with_scores: Option<u64>,
    pub pct: Option<f64>,
    /// Estimated from `pct` and `students_with_scores`.
    pub n_students: Option<u64>,
}

impl Record for AssessmentTidyRecord {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.entity.push_cells(&mut out);
        self.flags.push_cells(&mut out);
        push(&mut out, "subgroup", self.subgroup.to_string());
        push(&mut out, "test", self.test.to_string());
        push(&mut out, "grade_level", self.grade_level.to_string());
        push(&mut out, "performance_level", self.performance_level.to_string());
        push(&mut out, "students_with_scores", optional(self.students_with_scores));
        push(&mut out, "pct", optional(self.pct));
        push(&mut out, "n_students", optional(self.n_students));
        out
    }
}
