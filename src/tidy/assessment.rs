//! Assessment: one row per entity × subgroup × test × grade × level.

use crate::table::{AssessmentRecord, AssessmentTidyRecord};

/// Students at a level, estimated from the level's percentage.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn estimate(pct: Option<f64>, students: Option<u64>) -> Option<u64> {
    let pct = pct?;
    let students = students? as f64;
    Some((pct / 100.0 * students).round().max(0.0) as u64)
}

pub(super) fn tidy(records: &[AssessmentRecord]) -> Vec<AssessmentTidyRecord> {
    let mut out = Vec::with_capacity(records.len() * 5);
    for record in records {
        let flags = record.entity.flags();
        for (level, pct) in &record.levels {
            out.push(AssessmentTidyRecord {
                entity: record.entity.clone(),
                flags,
                subgroup: record.subgroup,
                test: record.test,
                grade_level: record.grade_level,
                performance_level: *level,
                students_with_scores: record.students_with_scores,
                pct: *pct,
                n_students: estimate(*pct, record.students_with_scores),
            });
        }
    }
    out
}
