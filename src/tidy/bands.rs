//! Grade-band aggregation over tidy enrollment.
//!
//! A band sums its grades that were measured for the entity and subgroup.
//! Missing (suppressed) contributors are skipped and the band is marked
//! partial; the band is missing only when every contributor is missing. A
//! band with no measured grade at all is not emitted.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use super::{TidyError, tidy};
use crate::codes::{GradeLevel, Subgroup};
use crate::dataset::Dataset;
use crate::identifier::CdsCode;
use crate::table::{EnrollmentTidyRecord, GradeBand, GradeBandRecord, Rows, Shape, Table};

type GroupKey<'a> = (u16, &'a CdsCode, Option<bool>, Subgroup);

struct Group<'a> {
    first: &'a EnrollmentTidyRecord,
    grades: BTreeMap<GradeLevel, Option<u64>>,
}

/// Sums tidy enrollment into [`GradeBand`]s. Wide enrollment is pivoted
/// first.
///
/// # Errors
///
/// Returns [`TidyError::NotEnrollment`] for other datasets and
/// [`TidyError::WrongShape`] for grade-band input.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn grade_bands(table: &Table) -> Result<Table, TidyError> {
    match table.rows() {
        Rows::EnrollmentTidy(records) => Ok(Table::new(
            Rows::GradeBands(aggregate(records)),
            table.warnings().to_vec(),
        )),
        Rows::Enrollment(_) => grade_bands(&tidy(table)?),
        Rows::GradeBands(_) => Err(TidyError::WrongShape {
            dataset: Dataset::Enrollment,
            expected: Shape::Tidy,
            actual: Shape::GradeBands,
        }),
        other => Err(TidyError::NotEnrollment {
            dataset: other.dataset(),
        }),
    }
}

fn aggregate(records: &[EnrollmentTidyRecord]) -> Vec<GradeBandRecord> {
    let mut order: Vec<GroupKey<'_>> = Vec::new();
    let mut groups: HashMap<GroupKey<'_>, Group<'_>> = HashMap::new();
    for record in records {
        if record.grade_level == GradeLevel::Total {
            continue;
        }
        let key = (
            record.entity.end_year,
            &record.entity.cds_code,
            record.entity.is_charter,
            record.subgroup,
        );
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Group {
                    first: record,
                    grades: BTreeMap::new(),
                }
            })
            .grades
            .insert(record.grade_level, record.n_students);
    }

    let mut out = Vec::with_capacity(order.len() * GradeBand::ALL.len());
    for key in order {
        let Some(group) = groups.get(&key) else {
            continue;
        };
        for band in GradeBand::ALL {
            let contributors: Vec<(GradeLevel, Option<u64>)> = band
                .grades()
                .iter()
                .filter_map(|grade| group.grades.get(grade).map(|count| (*grade, *count)))
                .collect();
            if contributors.is_empty() {
                continue;
            }
            let missing_grades: Vec<GradeLevel> = contributors
                .iter()
                .filter(|(_, count)| count.is_none())
                .map(|(grade, _)| *grade)
                .collect();
            let n_students = if missing_grades.len() == contributors.len() {
                None
            } else {
                Some(contributors.iter().filter_map(|(_, count)| *count).sum())
            };
            out.push(GradeBandRecord {
                entity: group.first.entity.clone(),
                flags: group.first.flags,
                subgroup: group.first.subgroup,
                band,
                n_students,
                partial: !missing_grades.is_empty(),
                missing_grades,
            });
        }
    }
    debug!(bands = out.len(), "aggregated grade bands");
    out
}
