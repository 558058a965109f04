//! Reporting entity identity shared by every record shape.

use serde::{Deserialize, Serialize};

use crate::identifier::{AggregationLevel, CdsCode, is_missing};

/// Who a row describes: the jurisdiction, its names, its level and charter
/// slice, for one school year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub end_year: u16,
    pub cds_code: CdsCode,
    pub county_code: String,
    pub district_code: String,
    pub school_code: String,
    pub county_name: Option<String>,
    pub district_name: Option<String>,
    pub school_name: Option<String>,
    pub aggregation_level: AggregationLevel,
    /// `Some(true)` charter only, `Some(false)` non-charter only, `None` for
    /// rows covering both or eras that do not report charter status.
    pub is_charter: Option<bool>,
}

impl Entity {
    #[must_use]
    pub fn new(
        end_year: u16,
        cds_code: CdsCode,
        aggregation_level: AggregationLevel,
        is_charter: Option<bool>,
    ) -> Self {
        Self {
            end_year,
            county_code: cds_code.county().to_string(),
            district_code: cds_code.district().to_string(),
            school_code: cds_code.school().to_string(),
            cds_code,
            county_name: None,
            district_name: None,
            school_name: None,
            aggregation_level,
            is_charter,
        }
    }

    /// Sets names, keeping only those meaningful at this row's level.
    #[must_use]
    pub fn with_names(
        mut self,
        county: Option<&str>,
        district: Option<&str>,
        school: Option<&str>,
    ) -> Self {
        let level = self.aggregation_level;
        self.county_name = clean_name(county).filter(|_| level >= AggregationLevel::County);
        self.district_name = clean_name(district).filter(|_| level >= AggregationLevel::District);
        self.school_name = clean_name(school).filter(|_| level >= AggregationLevel::School);
        self
    }

    /// Boolean aggregation-level flags.
    #[must_use]
    pub fn flags(&self) -> LevelFlags {
        LevelFlags::from(self.aggregation_level)
    }

    pub(crate) fn push_cells(&self, out: &mut Vec<(String, String)>) {
        push(out, "end_year", self.end_year.to_string());
        push(out, "cds_code", self.cds_code.to_string());
        push(out, "county_code", self.county_code.clone());
        push(out, "district_code", self.district_code.clone());
        push(out, "school_code", self.school_code.clone());
        push(out, "county_name", self.county_name.clone().unwrap_or_default());
        push(out, "district_name", self.district_name.clone().unwrap_or_default());
        push(out, "school_name", self.school_name.clone().unwrap_or_default());
        push(out, "aggregation_level", self.aggregation_level.to_string());
        push(out, "is_charter", optional_bool(self.is_charter));
    }
}

/// One boolean per aggregation level; exactly one is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelFlags {
    pub is_state: bool,
    pub is_county: bool,
    pub is_district: bool,
    pub is_school: bool,
}

impl From<AggregationLevel> for LevelFlags {
    fn from(level: AggregationLevel) -> Self {
        Self {
            is_state: level == AggregationLevel::State,
            is_county: level == AggregationLevel::County,
            is_district: level == AggregationLevel::District,
            is_school: level == AggregationLevel::School,
        }
    }
}

impl LevelFlags {
    pub(crate) fn push_cells(self, out: &mut Vec<(String, String)>) {
        push(out, "is_state", self.is_state.to_string());
        push(out, "is_county", self.is_county.to_string());
        push(out, "is_district", self.is_district.to_string());
        push(out, "is_school", self.is_school.to_string());
    }
}

fn clean_name(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !is_missing(v))
        .map(|v| v.trim().to_string())
}

pub(crate) fn push(out: &mut Vec<(String, String)>, name: &str, value: String) {
    out.push((name.to_string(), value));
}

pub(crate) fn optional_bool(value: Option<bool>) -> String {
    value.map(|b| b.to_string()).unwrap_or_default()
}

pub(crate) fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
