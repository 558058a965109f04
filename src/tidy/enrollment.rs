//! Enrollment: one row per entity × subgroup × grade, including `TOTAL`.

use std::collections::HashMap;

use super::YearWarnings;
use super::percent::{Denominator, share};
use crate::codes::{GradeLevel, Subgroup};
use crate::identifier::CdsCode;
use crate::table::{EnrollmentRecord, EnrollmentTidyRecord};

type EntityKey<'a> = (u16, &'a CdsCode, Option<bool>);

fn key(record: &EnrollmentRecord) -> EntityKey<'_> {
    (
        record.entity.end_year,
        &record.entity.cds_code,
        record.entity.is_charter,
    )
}

fn count_for(record: &EnrollmentRecord, grade: GradeLevel) -> Option<Option<u64>> {
    if grade == GradeLevel::Total {
        Some(record.total)
    } else {
        record.grades.get(&grade).copied()
    }
}

pub(super) fn tidy(
    records: &[EnrollmentRecord],
    warnings: &mut YearWarnings,
) -> Vec<EnrollmentTidyRecord> {
    let totals: HashMap<EntityKey<'_>, &EnrollmentRecord> = records
        .iter()
        .filter(|record| record.subgroup == Subgroup::Total)
        .map(|record| (key(record), record))
        .collect();

    let mut out = Vec::with_capacity(records.len() * 16);
    for record in records {
        let total_row = totals.get(&key(record));
        let flags = record.entity.flags();
        let grades = record
            .grades
            .iter()
            .map(|(grade, count)| (*grade, *count))
            .chain(std::iter::once((GradeLevel::Total, record.total)));

        for (grade, n_students) in grades {
            let denominator = Denominator::from(total_row.and_then(|row| count_for(row, grade)));
            let pct = share(
                n_students,
                denominator,
                warnings.year(record.entity.end_year),
                || {
                    format!(
                        "{} {} grade {grade}: denominator is {}",
                        record.entity.cds_code,
                        record.subgroup,
                        match denominator {
                            Denominator::Absent => "not reported",
                            _ => "suppressed",
                        }
                    )
                },
            );
            out.push(EnrollmentTidyRecord {
                entity: record.entity.clone(),
                flags,
                subgroup: record.subgroup,
                grade_level: grade,
                n_students,
                pct,
            });
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::identifier::{AggregationLevel, parse_identifier};
    use crate::quality::WarningKind;
    use crate::table::Entity;

    fn record(cds: &str, subgroup: Subgroup, k: Option<u64>, g1: Option<u64>) -> EnrollmentRecord {
        let cds = parse_identifier(cds).unwrap();
        let level = cds.level();
        EnrollmentRecord {
            entity: Entity::new(2024, cds, level, None),
            subgroup,
            grades: BTreeMap::from([(GradeLevel::Kindergarten, k), (GradeLevel::Grade1, g1)]),
            total: match (k, g1) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            },
        }
    }

    // ==================== Percentage Tests ====================

    #[test]
    fn test_suppressed_cell_and_zero_sibling() {
        let school = "01611190130229";
        let records = vec![
            record(school, Subgroup::Total, Some(20), Some(10)),
            record(school, Subgroup::Hispanic, None, Some(4)),
            record(school, Subgroup::White, Some(0), Some(0)),
        ];
        let mut warnings = YearWarnings::default();
        let rows = tidy(&records, &mut warnings);
        assert_eq!(rows.len(), 9);

        let find = |subgroup: Subgroup, grade: GradeLevel| {
            rows.iter()
                .find(|r| r.subgroup == subgroup && r.grade_level == grade)
                .unwrap()
        };
        let suppressed = find(Subgroup::Hispanic, GradeLevel::Kindergarten);
        assert_eq!(suppressed.n_students, None);
        assert_eq!(suppressed.pct, None);
        let zero = find(Subgroup::White, GradeLevel::Kindergarten);
        assert_eq!(zero.n_students, Some(0));
        assert_eq!(zero.pct, Some(0.0));
        assert_eq!(find(Subgroup::Hispanic, GradeLevel::Grade1).pct, Some(40.0));
        assert_eq!(find(Subgroup::Total, GradeLevel::Total).pct, Some(100.0));
        assert!(find(Subgroup::Total, GradeLevel::Total).flags.is_school);
        assert!(warnings.finish(Vec::new()).is_empty());
    }

    #[test]
    fn test_zero_total_gives_zero_percent() {
        let district = "01611190000000";
        let records = vec![
            record(district, Subgroup::Total, Some(0), Some(0)),
            record(district, Subgroup::Female, Some(0), Some(0)),
        ];
        let rows = tidy(&records, &mut YearWarnings::default());
        assert!(rows.iter().all(|r| r.pct == Some(0.0)));
        assert_eq!(rows[0].entity.aggregation_level, AggregationLevel::District);
    }

    #[test]
    fn test_missing_total_row_is_flagged() {
        let records = vec![record("01611190130229", Subgroup::Asian, Some(3), Some(4))];
        let mut warnings = YearWarnings::default();
        let rows = tidy(&records, &mut warnings);
        assert!(rows.iter().all(|r| r.pct.is_none()));
        let warnings = warnings.finish(Vec::new());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MissingDenominator);
        assert_eq!(warnings[0].occurrences, 3);
    }

    #[test]
    fn test_suppressed_total_is_flagged() {
        let school = "01611190130229";
        let records = vec![
            record(school, Subgroup::Total, None, Some(10)),
            record(school, Subgroup::Asian, Some(1), Some(2)),
        ];
        let mut warnings = YearWarnings::default();
        let rows = tidy(&records, &mut warnings);
        let asian_k = rows
            .iter()
            .find(|r| r.subgroup == Subgroup::Asian && r.grade_level == GradeLevel::Kindergarten)
            .unwrap();
        assert_eq!(asian_k.pct, None);
        let kinds: Vec<_> = warnings.finish(Vec::new()).into_iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::SuppressedDenominator]);
    }
}
