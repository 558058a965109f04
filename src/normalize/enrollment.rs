//! Enrollment mappings: school-file eras (1982-2023) and census day (2024+).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::cells::{Columns, RowReader};
use super::identity::{self, IdentityColumns};
use super::rollup::{GradeCounts, Rollup};
use super::{Context, NormalizeError};
use crate::codes::enrollment::{
    historical_ethnic, legacy_ethnic, revised_ethnic, school_file_gender,
};
use crate::codes::{GradeLevel, Subgroup};
use crate::identifier::{AggregationLevel, CdsCode, parse_identifier};
use crate::parse::{ParseError, RawTable};
use crate::quality::SuppressionTally;
use crate::source::Layout;
use crate::table::EnrollmentRecord;

/// Census grade columns: `GR_TK`, `GR_KN`, `GR_01`..`GR_12`.
#[allow(clippy::expect_used)]
static CENSUS_GRADE_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(r"(?i)^GR_(TK|KN|\d{1,2})$").expect("census grade regex is valid")
});

fn school_file_grade(header: &str) -> Option<GradeLevel> {
    match header.to_ascii_uppercase().as_str() {
        "KDGN" => Some(GradeLevel::Kindergarten),
        "UNGR_ELM" => Some(GradeLevel::UngradedElementary),
        "UNGR_SEC" => Some(GradeLevel::UngradedSecondary),
        "ADULT" => Some(GradeLevel::Adult),
        other => other
            .strip_prefix("GR_")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(GradeLevel::numbered),
    }
}

fn census_grade(header: &str) -> Option<GradeLevel> {
    let captures = CENSUS_GRADE_COLUMN.captures(header)?;
    GradeLevel::from_label(&captures[1])
}

fn read_counts(
    row: &RowReader<'_>,
    grades: &[(usize, GradeLevel)],
    total: usize,
    tally: &mut SuppressionTally,
) -> Result<GradeCounts, NormalizeError> {
    let mut counts = BTreeMap::new();
    for (index, grade) in grades {
        counts.insert(*grade, row.count(*index, tally)?);
    }
    Ok(GradeCounts {
        grades: counts,
        total: row.count(total, tally)?,
    })
}

/// School × ethnicity × gender files, rolled up to every level.
pub(super) fn normalize_school_file(
    raw: &RawTable,
    ctx: &mut Context,
) -> Result<Vec<EnrollmentRecord>, NormalizeError> {
    let mut columns = Columns::new(raw, ctx.layout);
    let cds = columns.require(&["CDS_CODE"])?;
    let ethnic = columns.require(&["ETHNIC"])?;
    let gender = columns.require(&["GENDER"])?;
    let total = columns.require(&["ENR_TOTAL"])?;
    let county_name = columns.optional(&["COUNTY"]);
    let district_name = columns.optional(&["DISTRICT"]);
    let school_name = columns.optional(&["SCHOOL"]);
    columns.ignore(&["YEAR"]);
    let grades = columns.claim_matching(school_file_grade);
    columns.finish()?;

    let ethnic_code: fn(&str) -> Option<Subgroup> = match ctx.layout {
        Layout::EnrollmentLegacy => legacy_ethnic,
        Layout::EnrollmentHistorical => historical_ethnic,
        _ => revised_ethnic,
    };

    let mut rollup = Rollup::new();
    for row in identity::rows(raw) {
        let code = parse_identifier(row.text(cds)).map_err(|source| ParseError::Identifier {
            row: row.row,
            source,
        })?;
        let race = ethnic_code(row.text(ethnic))
            .ok_or_else(|| row.unrecognized(ctx.layout, ethnic))?;
        let sex = school_file_gender(row.text(gender))
            .ok_or_else(|| row.unrecognized(ctx.layout, gender))?;
        let counts = read_counts(&row, &grades, total, &mut ctx.tally)?;
        rollup.record_names(
            &code,
            row.opt_text(county_name),
            row.opt_text(district_name),
            row.opt_text(school_name),
        );
        rollup.add(&code, &[Subgroup::Total, race, sex], &counts);
    }
    Ok(rollup.finish(ctx.end_year, &mut ctx.warnings))
}

/// Census day files: one row per entity × charter slice × reporting category.
pub(super) fn normalize_census(
    raw: &RawTable,
    ctx: &mut Context,
) -> Result<Vec<EnrollmentRecord>, NormalizeError> {
    let mut columns = Columns::new(raw, ctx.layout);
    let identity = IdentityColumns::claim(&mut columns)?;
    let total = columns.require(&["ENR_TOTAL"])?;
    let grades = columns.claim_matching(census_grade);
    columns.finish()?;

    let mut records = Vec::with_capacity(raw.len());
    for row in identity::rows(raw) {
        let (entity, subgroup) = identity.read(&row, ctx)?;
        let counts = read_counts(&row, &grades, total, &mut ctx.tally)?;
        records.push(EnrollmentRecord {
            entity,
            subgroup,
            grades: counts.grades,
            total: counts.total,
        });
    }
    records.sort_by(|a, b| order(a).cmp(&order(b)));
    Ok(records)
}

fn order(record: &EnrollmentRecord) -> (AggregationLevel, &CdsCode, Option<bool>, Subgroup) {
    (
        record.entity.aggregation_level,
        &record.entity.cds_code,
        record.entity.is_charter,
        record.subgroup,
    )
}
