//! Four-year adjusted cohort graduation rate files.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::cells::Columns;
use super::identity::{self, IdentityColumns};
use super::{Context, NormalizeError};
use crate::codes::graduation::GraduationOutcome;
use crate::parse::RawTable;
use crate::table::{GraduationRecord, OutcomeCell};

/// `<Outcome> (Count)` and `<Outcome> (Rate)` columns.
#[allow(clippy::expect_used)]
static OUTCOME_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(r"(?i)^(.*\S)\s*\((count|rate)\)$").expect("outcome regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    Count,
    Rate,
}

fn outcome_column(header: &str) -> Option<(GraduationOutcome, Measure)> {
    let captures = OUTCOME_COLUMN.captures(header)?;
    let outcome = GraduationOutcome::from_column_prefix(&captures[1])?;
    let measure = if captures[2].eq_ignore_ascii_case("count") {
        Measure::Count
    } else {
        Measure::Rate
    };
    Some((outcome, measure))
}

pub(super) fn normalize(
    raw: &RawTable,
    ctx: &mut Context,
) -> Result<Vec<GraduationRecord>, NormalizeError> {
    let mut columns = Columns::new(raw, ctx.layout);
    let identity = IdentityColumns::claim(&mut columns)?;
    let dass = columns.optional(&["DASS"]);
    let cohort = columns.require(&["CohortStudents", "Cohort Students"])?;
    let outcomes = columns.claim_matching(outcome_column);
    columns.finish()?;

    let mut records = Vec::with_capacity(raw.len());
    for row in identity::rows(raw) {
        let (entity, subgroup) = identity.read(&row, ctx)?;
        let is_dass = row.slice_flag(ctx.layout, dass)?;
        let cohort_students = row.count(cohort, &mut ctx.tally)?;

        let mut cells: BTreeMap<GraduationOutcome, OutcomeCell> = BTreeMap::new();
        for (index, (outcome, measure)) in &outcomes {
            let cell = cells.entry(*outcome).or_insert(OutcomeCell {
                count: None,
                rate: None,
            });
            match measure {
                Measure::Count => cell.count = row.count(*index, &mut ctx.tally)?,
                Measure::Rate => cell.rate = row.percent(*index, &mut ctx.warnings)?,
            }
        }

        records.push(GraduationRecord {
            entity,
            is_dass,
            subgroup,
            cohort_students,
            outcomes: cells,
        });
    }
    records.sort_by(|a, b| {
        (
            a.entity.aggregation_level,
            &a.entity.cds_code,
            a.entity.is_charter,
            a.is_dass,
            a.subgroup,
        )
            .cmp(&(
                b.entity.aggregation_level,
                &b.entity.cds_code,
                b.entity.is_charter,
                b.is_dass,
                b.subgroup,
            ))
    });
    Ok(records)
}
