//! Entity columns shared by census enrollment and ACGR files.

use crate::codes::Subgroup;
use crate::codes::enrollment::reporting_category;
use crate::identifier::{AggregationLevel, CdsCode};
use crate::parse::{ParseError, RawTable};
use crate::table::Entity;

use super::cells::{Columns, RowReader};
use super::{Context, NormalizeError};

pub(super) struct IdentityColumns {
    level: usize,
    county: usize,
    district: Option<usize>,
    school: Option<usize>,
    county_name: Option<usize>,
    district_name: Option<usize>,
    school_name: Option<usize>,
    charter: Option<usize>,
    category: usize,
}

impl IdentityColumns {
    pub(super) fn claim(columns: &mut Columns<'_>) -> Result<Self, NormalizeError> {
        columns.ignore(&["AcademicYear", "Academic Year"]);
        Ok(Self {
            level: columns.require(&["AggregateLevel", "Aggregate Level"])?,
            county: columns.require(&["CountyCode", "County Code"])?,
            district: columns.optional(&["DistrictCode", "District Code"]),
            school: columns.optional(&["SchoolCode", "School Code"]),
            county_name: columns.optional(&["CountyName", "County Name"]),
            district_name: columns.optional(&["DistrictName", "District Name"]),
            school_name: columns.optional(&["SchoolName", "School Name"]),
            charter: columns.optional(&["Charter", "CharterSchool", "Charter School"]),
            category: columns.require(&["ReportingCategory", "Reporting Category"])?,
        })
    }

    /// Reads the entity and subgroup of one row.
    pub(super) fn read(
        &self,
        row: &RowReader<'_>,
        ctx: &Context,
    ) -> Result<(Entity, Subgroup), NormalizeError> {
        let level = AggregationLevel::from_code(row.text(self.level))
            .ok_or_else(|| row.unrecognized(ctx.layout, self.level))?;
        let cds = CdsCode::for_level(
            level,
            Some(row.text(self.county)),
            row.opt_text(self.district),
            row.opt_text(self.school),
        )
        .map_err(|source| ParseError::Identifier {
            row: row.row,
            source,
        })?;
        let is_charter = row.slice_flag(ctx.layout, self.charter)?;
        let subgroup = reporting_category(row.text(self.category))
            .ok_or_else(|| row.unrecognized(ctx.layout, self.category))?;
        let entity = Entity::new(ctx.end_year, cds, level, is_charter).with_names(
            row.opt_text(self.county_name),
            row.opt_text(self.district_name),
            row.opt_text(self.school_name),
        );
        Ok((entity, subgroup))
    }
}

/// Row readers for every data row.
pub(super) fn rows(raw: &RawTable) -> impl Iterator<Item = RowReader<'_>> {
    (0..raw.len()).map(move |index| RowReader::new(raw, index))
}
