//! CDS (county-district-school) identifiers.
//!
//! A CDS code is a 14-digit string: a 2-digit county segment, a 5-digit
//! district segment and a 7-digit school segment. Aggregate rows (state,
//! county, district) fill every segment below their level with an all-zero
//! placeholder of the segment's width.
//!
//! Missing segment values are substituted with the placeholder *before*
//! any padding happens, so a missing value can never leak into the code as
//! text (a `"NA"` segment padded to `"000NA"` is the failure this prevents).
//!
//! # Example
//!
//! ```
//! use caschool_core::identifier::{AggregationLevel, parse_identifier};
//!
//! let cds = parse_identifier("01611920000000").unwrap();
//! assert_eq!(cds.county(), "01");
//! assert_eq!(cds.district(), "61192");
//! assert_eq!(cds.school(), "0000000");
//! assert_eq!(cds.level(), AggregationLevel::District);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Width of the county segment.
pub const COUNTY_WIDTH: usize = 2;
/// Width of the district segment.
pub const DISTRICT_WIDTH: usize = 5;
/// Width of the school segment.
pub const SCHOOL_WIDTH: usize = 7;
/// Width of a full CDS code.
pub const CDS_WIDTH: usize = COUNTY_WIDTH + DISTRICT_WIDTH + SCHOOL_WIDTH;

/// County placeholder used by state rows.
pub const COUNTY_PLACEHOLDER: &str = "00";
/// District placeholder used by state and county rows.
pub const DISTRICT_PLACEHOLDER: &str = "00000";
/// School placeholder used by state, county and district rows.
pub const SCHOOL_PLACEHOLDER: &str = "0000000";

/// Source spellings of an absent code. Treated exactly like an empty cell.
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NULL", "."];

/// Granularity of a reporting row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLevel {
    State,
    County,
    District,
    School,
}

impl AggregationLevel {
    /// Parses the publisher's single-letter level code (`T`, `C`, `D`, `S`).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "T" => Some(Self::State),
            "C" => Some(Self::County),
            "D" => Some(Self::District),
            "S" => Some(Self::School),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::County => "county",
            Self::District => "district",
            Self::School => "school",
        }
    }
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which CDS segment an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    County,
    District,
    School,
}

impl Segment {
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::County => COUNTY_WIDTH,
            Self::District => DISTRICT_WIDTH,
            Self::School => SCHOOL_WIDTH,
        }
    }

    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::County => COUNTY_PLACEHOLDER,
            Self::District => DISTRICT_PLACEHOLDER,
            Self::School => SCHOOL_PLACEHOLDER,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::County => "county",
            Self::District => "district",
            Self::School => "school",
        })
    }
}

/// Errors building or parsing a CDS code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// Full code has the wrong length.
    #[error("CDS code '{value}' must be {CDS_WIDTH} digits, got {length}")]
    WrongLength {
        /// The offending input.
        value: String,
        /// Its length in characters.
        length: usize,
    },

    /// A segment contains something other than ASCII digits.
    #[error("{segment} code '{value}' contains non-digit characters")]
    NonDigit {
        /// Segment being built.
        segment: Segment,
        /// The offending input.
        value: String,
    },

    /// A segment value is wider than the segment.
    #[error("{segment} code '{value}' is wider than {width} digits")]
    TooWide {
        /// Segment being built.
        segment: Segment,
        /// The offending input.
        value: String,
        /// Maximum width.
        width: usize,
    },

    /// A segment required by the row's level is absent.
    #[error("{segment} code is required for a {level}-level row")]
    MissingSegment {
        /// Segment that was missing.
        segment: Segment,
        /// Level of the row.
        level: AggregationLevel,
    },

    /// A segment below the row's level carries a real code.
    #[error("{segment} code '{value}' is not allowed on a {level}-level row")]
    UnexpectedSegment {
        /// Segment that should have been a placeholder.
        segment: Segment,
        /// The offending value.
        value: String,
        /// Level of the row.
        level: AggregationLevel,
    },
}

/// A validated 14-digit CDS code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CdsCode {
    county: String,
    district: String,
    school: String,
}

/// Returns `true` if `value` is one of the source spellings of an absent code.
pub(crate) fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Zero-pads one CDS segment.
///
/// Absent values (`None`, blank cells, `NA`) become the segment's placeholder
/// without passing through the padding step.
///
/// # Errors
///
/// Returns [`IdentifierError::NonDigit`] or [`IdentifierError::TooWide`] for
/// values that cannot be a segment of this width.
pub fn pad_segment(value: Option<&str>, segment: Segment) -> Result<String, IdentifierError> {
    let Some(raw) = value.filter(|v| !is_missing(v)) else {
        return Ok(segment.placeholder().to_string());
    };
    let trimmed = raw.trim();
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentifierError::NonDigit {
            segment,
            value: trimmed.to_string(),
        });
    }
    let width = segment.width();
    if trimmed.len() > width {
        // Spreadsheet exports occasionally carry leading zeros beyond the width.
        let excess = trimmed.len() - width;
        if trimmed[..excess].bytes().all(|b| b == b'0') {
            return Ok(trimmed[excess..].to_string());
        }
        return Err(IdentifierError::TooWide {
            segment,
            value: trimmed.to_string(),
            width,
        });
    }
    Ok(format!("{trimmed:0>width$}"))
}

fn is_placeholder(value: &str) -> bool {
    value.bytes().all(|b| b == b'0')
}

impl CdsCode {
    /// The statewide aggregate code.
    #[must_use]
    pub fn state() -> Self {
        Self {
            county: COUNTY_PLACEHOLDER.to_string(),
            district: DISTRICT_PLACEHOLDER.to_string(),
            school: SCHOOL_PLACEHOLDER.to_string(),
        }
    }

    /// Builds a code for a row of the given level.
    ///
    /// Segments at or above `level` must be present; segments below it must be
    /// absent or already all zeros and are replaced with placeholders.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] when a required segment is missing, a
    /// segment below the level carries a real code, or a value is malformed.
    pub fn for_level(
        level: AggregationLevel,
        county: Option<&str>,
        district: Option<&str>,
        school: Option<&str>,
    ) -> Result<Self, IdentifierError> {
        let segment_for = |segment: Segment, value: Option<&str>, required: bool| {
            let present = value.filter(|v| !is_missing(v));
            if required && present.is_none() {
                return Err(IdentifierError::MissingSegment { segment, level });
            }
            let built = pad_segment(present, segment)?;
            if !required && !is_placeholder(&built) {
                return Err(IdentifierError::UnexpectedSegment {
                    segment,
                    value: built,
                    level,
                });
            }
            Ok(built)
        };

        Ok(Self {
            county: segment_for(Segment::County, county, level >= AggregationLevel::County)?,
            district: segment_for(
                Segment::District,
                district,
                level >= AggregationLevel::District,
            )?,
            school: segment_for(Segment::School, school, level >= AggregationLevel::School)?,
        })
    }

    /// Builds a code from three segments without level checks.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] for malformed segment values.
    pub fn from_segments(
        county: Option<&str>,
        district: Option<&str>,
        school: Option<&str>,
    ) -> Result<Self, IdentifierError> {
        Ok(Self {
            county: pad_segment(county, Segment::County)?,
            district: pad_segment(district, Segment::District)?,
            school: pad_segment(school, Segment::School)?,
        })
    }

    #[must_use]
    pub fn county(&self) -> &str {
        &self.county
    }

    #[must_use]
    pub fn district(&self) -> &str {
        &self.district
    }

    #[must_use]
    pub fn school(&self) -> &str {
        &self.school
    }

    /// Level implied by which segments are placeholders.
    #[must_use]
    pub fn level(&self) -> AggregationLevel {
        if is_placeholder(&self.county) {
            AggregationLevel::State
        } else if is_placeholder(&self.district) {
            AggregationLevel::County
        } else if is_placeholder(&self.school) {
            AggregationLevel::District
        } else {
            AggregationLevel::School
        }
    }

    /// The enclosing district's code.
    #[must_use]
    pub fn district_code(&self) -> Self {
        Self {
            county: self.county.clone(),
            district: self.district.clone(),
            school: SCHOOL_PLACEHOLDER.to_string(),
        }
    }

    /// The enclosing county's code.
    #[must_use]
    pub fn county_code(&self) -> Self {
        Self {
            county: self.county.clone(),
            district: DISTRICT_PLACEHOLDER.to_string(),
            school: SCHOOL_PLACEHOLDER.to_string(),
        }
    }
}

impl fmt::Display for CdsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.county, self.district, self.school)
    }
}

impl FromStr for CdsCode {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_identifier(s)
    }
}

impl Serialize for CdsCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CdsCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_identifier(&raw).map_err(serde::de::Error::custom)
    }
}

/// Splits a 14-digit CDS code into county, district and school segments.
///
/// # Errors
///
/// Returns [`IdentifierError::WrongLength`] or [`IdentifierError::NonDigit`]
/// when the input is not exactly 14 ASCII digits.
pub fn parse_identifier(id: &str) -> Result<CdsCode, IdentifierError> {
    let trimmed = id.trim();
    if trimmed.len() != CDS_WIDTH || !trimmed.is_ascii() {
        return Err(IdentifierError::WrongLength {
            value: trimmed.to_string(),
            length: trimmed.chars().count(),
        });
    }
    let (county, rest) = trimmed.split_at(COUNTY_WIDTH);
    let (district, school) = rest.split_at(DISTRICT_WIDTH);
    CdsCode::from_segments(Some(county), Some(district), Some(school)).map_err(|err| match err {
        IdentifierError::NonDigit { segment, .. } => IdentifierError::NonDigit {
            segment,
            value: trimmed.to_string(),
        },
        other => other,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifier_splits_segments() {
        let cds = parse_identifier("19647331932334").unwrap();
        assert_eq!(cds.county(), "19");
        assert_eq!(cds.district(), "64733");
        assert_eq!(cds.school(), "1932334");
        assert_eq!(cds.level(), AggregationLevel::School);
        assert_eq!(cds.to_string(), "19647331932334");
    }

    #[test]
    fn test_parse_identifier_rejects_wrong_length() {
        let err = parse_identifier("1964733").unwrap_err();
        assert!(matches!(err, IdentifierError::WrongLength { length: 7, .. }));
    }

    #[test]
    fn test_parse_identifier_rejects_na_text() {
        let err = parse_identifier("01611NA0000000").unwrap_err();
        assert!(matches!(err, IdentifierError::NonDigit { .. }));
    }

    #[test]
    fn test_pad_segment_missing_value_uses_placeholder() {
        assert_eq!(pad_segment(None, Segment::District).unwrap(), "00000");
        assert_eq!(pad_segment(Some("NA"), Segment::District).unwrap(), "00000");
        assert_eq!(pad_segment(Some("  "), Segment::School).unwrap(), "0000000");
    }

    #[test]
    fn test_pad_segment_pads_short_codes() {
        assert_eq!(pad_segment(Some("1"), Segment::County).unwrap(), "01");
        assert_eq!(pad_segment(Some("61192"), Segment::District).unwrap(), "61192");
        assert_eq!(pad_segment(Some("130229"), Segment::School).unwrap(), "0130229");
    }

    #[test]
    fn test_pad_segment_rejects_wide_or_non_digit() {
        assert!(matches!(
            pad_segment(Some("123456"), Segment::District),
            Err(IdentifierError::TooWide { .. })
        ));
        assert!(matches!(
            pad_segment(Some("12a"), Segment::District),
            Err(IdentifierError::NonDigit { .. })
        ));
    }

    #[test]
    fn test_pad_segment_strips_excess_leading_zeros() {
        assert_eq!(pad_segment(Some("001"), Segment::County).unwrap(), "01");
    }

    #[test]
    fn test_for_level_state_row_uses_placeholders() {
        let cds =
            CdsCode::for_level(AggregationLevel::State, Some("00"), None, Some("NA")).unwrap();
        assert_eq!(cds.to_string(), "00000000000000");
        assert_eq!(cds.level(), AggregationLevel::State);
    }

    #[test]
    fn test_for_level_county_row_never_contains_na() {
        let cds =
            CdsCode::for_level(AggregationLevel::County, Some("1"), Some("NA"), None).unwrap();
        assert_eq!(cds.district(), DISTRICT_PLACEHOLDER);
        assert_eq!(cds.school(), SCHOOL_PLACEHOLDER);
        assert!(cds.to_string().bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_for_level_school_row_requires_school_code() {
        let err = CdsCode::for_level(AggregationLevel::School, Some("01"), Some("61192"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            IdentifierError::MissingSegment {
                segment: Segment::School,
                ..
            }
        ));
    }

    #[test]
    fn test_for_level_rejects_real_code_below_level() {
        let err = CdsCode::for_level(
            AggregationLevel::District,
            Some("01"),
            Some("61192"),
            Some("0130229"),
        )
        .unwrap_err();
        assert!(matches!(err, IdentifierError::UnexpectedSegment { .. }));
    }

    #[test]
    fn test_parent_codes() {
        let cds = parse_identifier("19647331932334").unwrap();
        assert_eq!(cds.district_code().to_string(), "19647330000000");
        assert_eq!(cds.county_code().to_string(), "19000000000000");
        assert_eq!(cds.county_code().level(), AggregationLevel::County);
    }

    #[test]
    fn test_cds_serde_is_a_plain_string() {
        let cds = parse_identifier("01611920130229").unwrap();
        let json = serde_json::to_string(&cds).unwrap();
        assert_eq!(json, "\"01611920130229\"");
        let back: CdsCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cds);
    }

    #[test]
    fn test_aggregation_level_from_code() {
        assert_eq!(AggregationLevel::from_code("T"), Some(AggregationLevel::State));
        assert_eq!(AggregationLevel::from_code("c"), Some(AggregationLevel::County));
        assert_eq!(AggregationLevel::from_code("X"), None);
    }
}
