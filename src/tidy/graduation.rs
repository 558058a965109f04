//! Graduation: one row per entity × subgroup × outcome.

use super::YearWarnings;
use super::percent::{Denominator, share};
use crate::table::{GraduationRecord, GraduationTidyRecord};

/// The reported rate wins; otherwise the rate is derived from the outcome
/// count over the cohort.
pub(super) fn tidy(
    records: &[GraduationRecord],
    warnings: &mut YearWarnings,
) -> Vec<GraduationTidyRecord> {
    let mut out = Vec::with_capacity(records.len() * 11);
    for record in records {
        let flags = record.entity.flags();
        for (outcome, cell) in &record.outcomes {
            let pct = match cell.rate {
                Some(rate) => Some(rate),
                None => share(
                    cell.count,
                    Denominator::from(Some(record.cohort_students)),
                    warnings.year(record.entity.end_year),
                    || {
                        format!(
                            "{} {} {outcome}: cohort suppressed",
                            record.entity.cds_code, record.subgroup
                        )
                    },
                ),
            };
            out.push(GraduationTidyRecord {
                entity: record.entity.clone(),
                flags,
                is_dass: record.is_dass,
                subgroup: record.subgroup,
                outcome: *outcome,
                cohort_students: record.cohort_students,
                n_students: cell.count,
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
    use crate::codes::Subgroup;
    use crate::codes::graduation::GraduationOutcome;
    use crate::identifier::{AggregationLevel, CdsCode};
    use crate::table::{Entity, OutcomeCell};

    fn record(
        cohort: Option<u64>,
        outcomes: &[(GraduationOutcome, Option<u64>, Option<f64>)],
    ) -> GraduationRecord {
        GraduationRecord {
            entity: Entity::new(2023, CdsCode::state(), AggregationLevel::State, None),
            is_dass: None,
            subgroup: Subgroup::Total,
            cohort_students: cohort,
            outcomes: outcomes
                .iter()
                .map(|&(outcome, count, rate)| (outcome, OutcomeCell { count, rate }))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_reported_rate_is_kept() {
        let rows = tidy(
            &[record(Some(200), &[(GraduationOutcome::RegularDiploma, Some(170), Some(85.1))])],
            &mut YearWarnings::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pct, Some(85.1));
        assert_eq!(rows[0].n_students, Some(170));
        assert!(rows[0].flags.is_state);
    }

    #[test]
    fn test_missing_rate_is_derived_from_cohort() {
        let rows = tidy(
            &[record(Some(200), &[(GraduationOutcome::Dropout, Some(10), None)])],
            &mut YearWarnings::default(),
        );
        assert_eq!(rows[0].pct, Some(5.0));
    }

    #[test]
    fn test_suppressed_cohort_gives_missing_rate() {
        let mut warnings = YearWarnings::default();
        let rows = tidy(
            &[record(None, &[(GraduationOutcome::Dropout, Some(10), None)])],
            &mut warnings,
        );
        assert_eq!(rows[0].pct, None);
        assert_eq!(warnings.finish(Vec::new()).len(), 1);
    }
}
