//! Smarter Balanced research files (both column vocabularies).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::cells::Columns;
use super::identity;
use super::{Context, NormalizeError};
use crate::codes::assessment::{
    PerformanceLevel, StudentGroupCode, TestSubject, student_group, tested_grade,
};
use crate::identifier::CdsCode;
use crate::parse::{ParseError, RawTable};
use crate::quality::SuppressionTally;
use crate::table::{AssessmentRecord, Entity};

/// Columns carrying nothing the canonical shape keeps: claim-area breakdowns
/// and entity-level tested totals.
#[allow(clippy::expect_used)]
static DISCARDED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(concat!(
        r"(?i)^(?:(?:composite )?area \d+ percentage (?:above|near|below) standard",
        r"|total tested\b.*)$",
    ))
    .expect("discarded column regex is valid")
});

pub(super) fn normalize(
    raw: &RawTable,
    ctx: &mut Context,
) -> Result<Vec<AssessmentRecord>, NormalizeError> {
    let mut columns = Columns::new(raw, ctx.layout);
    let county = columns.require(&["County Code"])?;
    let district = columns.require(&["District Code"])?;
    let school = columns.require(&["School Code"])?;
    let group = columns.require(&["Student Group ID", "Subgroup ID"])?;
    let test = columns.require(&["Test ID"])?;
    let grade = columns.require(&["Grade"])?;
    let enrolled = columns.optional(&["Students Enrolled", "CAASPP Reported Enrollment"]);
    let tested = columns.optional(&["Students Tested"]);
    let with_scores = columns.optional(&["Students with Scores"]);
    let mean = columns.optional(&["Mean Scale Score"]);
    let levels: Vec<(PerformanceLevel, usize)> = PerformanceLevel::ALL
        .into_iter()
        .filter_map(|level| columns.optional(&[level.column()]).map(|index| (level, index)))
        .collect();
    // `Type ID` repeats the level implied by the CDS placeholders; assessment
    // records carry no charter slice.
    columns.ignore(&["Filler", "Test Year", "Test Type", "Type ID"]);
    columns.claim_matching(|header| DISCARDED_COLUMN.is_match(header).then_some(()));
    columns.finish()?;

    let mut records = Vec::with_capacity(raw.len());
    let mut cross_tabulated = 0_usize;
    for row in identity::rows(raw) {
        let subgroup = match student_group(row.text(group)) {
            Some(StudentGroupCode::Group(subgroup)) => subgroup,
            Some(StudentGroupCode::CrossTabulated) => {
                cross_tabulated += 1;
                continue;
            }
            None => return Err(row.unrecognized(ctx.layout, group)),
        };
        let subject = TestSubject::from_test_id(row.text(test))
            .ok_or_else(|| row.unrecognized(ctx.layout, test))?;
        let grade_level =
            tested_grade(row.text(grade)).ok_or_else(|| row.unrecognized(ctx.layout, grade))?;
        let cds = CdsCode::from_segments(
            Some(row.text(county)),
            Some(row.text(district)),
            Some(row.text(school)),
        )
        .map_err(|source| ParseError::Identifier {
            row: row.row,
            source,
        })?;
        let level = cds.level();

        let optional_count = |index: Option<usize>, tally: &mut SuppressionTally| match index {
            Some(index) => row.count(index, tally),
            None => Ok(None),
        };
        let students_enrolled = optional_count(enrolled, &mut ctx.tally)?;
        let students_tested = optional_count(tested, &mut ctx.tally)?;
        let students_with_scores = optional_count(with_scores, &mut ctx.tally)?;
        let mean_scale_score = match mean {
            Some(index) => row.decimal(index)?,
            None => None,
        };
        let mut percentages = BTreeMap::new();
        for (performance_level, index) in &levels {
            percentages.insert(*performance_level, row.percent(*index, &mut ctx.warnings)?);
        }

        records.push(AssessmentRecord {
            entity: Entity::new(ctx.end_year, cds, level, None),
            subgroup,
            test: subject,
            grade_level,
            students_enrolled,
            students_tested,
            students_with_scores,
            mean_scale_score,
            levels: percentages,
        });
    }
    if cross_tabulated > 0 {
        debug!(rows = cross_tabulated, "skipped cross-tabulated student groups");
    }

    records.sort_by(|a, b| {
        (
            a.entity.aggregation_level,
            &a.entity.cds_code,
            a.subgroup,
            a.test,
            a.grade_level,
        )
            .cmp(&(
                b.entity.aggregation_level,
                &b.entity.cds_code,
                b.subgroup,
                b.test,
                b.grade_level,
            ))
    });
    Ok(records)
}
