//! URL builder: maps (dataset, end year) to exactly one source file.
//!
//! Each dataset is split into eras. An era is a contiguous range of end years
//! sharing one URL template, one file format and one column layout
//! ([`Layout`]). Resolving a year selects its era once; everything downstream
//! dispatches on the returned [`SourceFile`]. Adding an era is one more entry
//! in [`ERAS`].
//!
//! Years outside every era, or inside a known gap (no 2020 CAASPP
//! administration), fail with [`UnsupportedYear`]. The builder never guesses a
//! filename for a year it does not know.
//!
//! # Example
//!
//! ```
//! use caschool_core::Dataset;
//! use caschool_core::source::{Layout, UrlBuilder};
//!
//! let builder = UrlBuilder::default();
//! let source = builder.source_for(Dataset::Enrollment, 2024).unwrap();
//! assert_eq!(source.layout, Layout::EnrollmentCensus);
//! assert!(source.url.ends_with("/demo-downloads/census/cdenroll2324-v2.txt"));
//!
//! assert!(builder.source_for(Dataset::Enrollment, 1900).is_err());
//! ```

mod layout;

pub use layout::{FileFormat, FixedColumn, LEGACY_ENROLLMENT_COLUMNS, Layout};

use std::fmt;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::dataset::Dataset;

/// Default host for DataQuest downloads.
pub const DEFAULT_DATAQUEST_BASE: &str = "https://dq.cde.ca.gov";
/// Default host for CDE demographic downloads.
pub const DEFAULT_DOWNLOADS_BASE: &str = "https://www3.cde.ca.gov";
/// Default host for CAASPP research files.
pub const DEFAULT_CAASPP_BASE: &str = "https://caaspp-elpac.ets.org";

/// No URL is known for the requested year.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no known URL for year {year}, dataset {dataset} (supported: {supported}){note}")]
pub struct UnsupportedYear {
    /// Requested dataset.
    pub dataset: Dataset,
    /// Requested end year.
    pub year: u16,
    /// Human-readable summary of supported years.
    pub supported: String,
    /// Extra context for known gaps, prefixed with `"; "` when present.
    pub note: String,
}

/// Error building a [`UrlBuilder`] from configured base URLs.
#[derive(Debug, Clone, Error)]
#[error("invalid base URL '{value}': {source}")]
pub struct InvalidBaseUrl {
    /// The rejected value.
    pub value: String,
    /// Parse failure.
    #[source]
    pub source: url::ParseError,
}

/// A resolved download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Dataset the file belongs to.
    pub dataset: Dataset,
    /// School-year end year.
    pub end_year: u16,
    /// Fully-qualified download URL.
    pub url: String,
    /// Container and encoding of the file.
    pub format: FileFormat,
    /// Column layout (era) of the file.
    pub layout: Layout,
}

/// How an era's filenames are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Template {
    /// DataQuest `dlfile.aspx` school-level enrollment download.
    DataQuestEnrollment,
    /// Census day enrollment text file.
    CensusDay,
    /// Adjusted cohort graduation rate text file.
    Acgr,
    /// CAASPP research file archive.
    CaasppResearch,
}

/// A contiguous range of end years sharing one template, format and layout.
#[derive(Debug, Clone, Copy)]
struct Era {
    dataset: Dataset,
    first: u16,
    last: u16,
    /// Years inside the range with no published file, with the reason.
    gaps: &'static [(u16, &'static str)],
    template: Template,
    layout: Layout,
}

/// Era registry, ordered by dataset then year.
const ERAS: &[Era] = &[
    Era {
        dataset: Dataset::Enrollment,
        first: 1982,
        last: 1992,
        gaps: &[],
        template: Template::DataQuestEnrollment,
        layout: Layout::EnrollmentLegacy,
    },
    Era {
        dataset: Dataset::Enrollment,
        first: 1993,
        last: 2008,
        gaps: &[],
        template: Template::DataQuestEnrollment,
        layout: Layout::EnrollmentHistorical,
    },
    Era {
        dataset: Dataset::Enrollment,
        first: 2009,
        last: 2023,
        gaps: &[],
        template: Template::DataQuestEnrollment,
        layout: Layout::EnrollmentHistoricalRevised,
    },
    Era {
        dataset: Dataset::Enrollment,
        first: 2024,
        last: 2025,
        gaps: &[],
        template: Template::CensusDay,
        layout: Layout::EnrollmentCensus,
    },
    Era {
        dataset: Dataset::Graduation,
        first: 2017,
        last: 2024,
        gaps: &[],
        template: Template::Acgr,
        layout: Layout::GraduationAcgr,
    },
    Era {
        dataset: Dataset::Assessment,
        first: 2015,
        last: 2019,
        gaps: &[],
        template: Template::CaasppResearch,
        layout: Layout::AssessmentSbacOriginal,
    },
    Era {
        dataset: Dataset::Assessment,
        first: 2020,
        last: 2024,
        gaps: &[(2020, "CAASPP was not administered in spring 2020")],
        template: Template::CaasppResearch,
        layout: Layout::AssessmentSbacRevised,
    },
];

/// Filenames of corrected re-releases that replace the regular pattern.
const FILE_OVERRIDES: &[(Dataset, u16, &str)] = &[
    (Dataset::Enrollment, 2024, "cdenroll2324-v2.txt"),
    (Dataset::Graduation, 2019, "acgr19-v2.txt"),
    (Dataset::Graduation, 2024, "acgr24-v2.txt"),
];

/// Published research-file version per CAASPP year. Every year in the
/// assessment eras must appear here or in a gap.
const CAASPP_VERSIONS: &[(u16, u8)] = &[
    (2015, 3),
    (2016, 3),
    (2017, 2),
    (2018, 3),
    (2019, 4),
    (2021, 2),
    (2022, 1),
    (2023, 1),
    (2024, 1),
];

fn era_for(dataset: Dataset, year: u16) -> Option<&'static Era> {
    ERAS.iter()
        .find(|era| era.dataset == dataset && (era.first..=era.last).contains(&year))
}

/// Supported end years for `dataset`, ascending and without gaps.
#[must_use]
pub fn available_years(dataset: Dataset) -> Vec<u16> {
    ERAS.iter()
        .filter(|era| era.dataset == dataset)
        .flat_map(|era| {
            (era.first..=era.last).filter(move |year| !era.gaps.iter().any(|(gap, _)| gap == year))
        })
        .collect()
}

/// Layout (era) of `dataset` in `year`, without building a URL.
///
/// # Errors
///
/// Returns [`UnsupportedYear`] for years outside every era or inside a gap.
pub fn layout_for(dataset: Dataset, year: u16) -> Result<Layout, UnsupportedYear> {
    let era = era_for(dataset, year).ok_or_else(|| unsupported(dataset, year, ""))?;
    if let Some((_, reason)) = era.gaps.iter().find(|(gap, _)| *gap == year) {
        return Err(unsupported(dataset, year, reason));
    }
    Ok(era.layout)
}

fn unsupported(dataset: Dataset, year: u16, reason: &str) -> UnsupportedYear {
    UnsupportedYear {
        dataset,
        year,
        supported: summarize_years(&available_years(dataset)),
        note: if reason.is_empty() {
            String::new()
        } else {
            format!("; {reason}")
        },
    }
}

/// Collapses a sorted year list into ranges, e.g. `2015-2019, 2021-2024`.
fn summarize_years(years: &[u16]) -> String {
    let mut ranges: Vec<(u16, u16)> = Vec::new();
    for &year in years {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == year => *end = year,
            _ => ranges.push((year, year)),
        }
    }
    ranges
        .iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// School year label used by DataQuest, e.g. `2008-09` for end year 2009.
#[must_use]
pub fn school_year_label(end_year: u16) -> String {
    format!("{}-{:02}", end_year - 1, end_year % 100)
}

/// Builds download URLs against configurable hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    dataquest_base: String,
    downloads_base: String,
    caaspp_base: String,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self {
            dataquest_base: DEFAULT_DATAQUEST_BASE.to_string(),
            downloads_base: DEFAULT_DOWNLOADS_BASE.to_string(),
            caaspp_base: DEFAULT_CAASPP_BASE.to_string(),
        }
    }
}

impl UrlBuilder {
    /// Creates a builder with explicit hosts (used for mirrors and tests).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBaseUrl`] when a base is not an absolute URL.
    pub fn with_bases(
        dataquest_base: &str,
        downloads_base: &str,
        caaspp_base: &str,
    ) -> Result<Self, InvalidBaseUrl> {
        Ok(Self {
            dataquest_base: normalize_base(dataquest_base)?,
            downloads_base: normalize_base(downloads_base)?,
            caaspp_base: normalize_base(caaspp_base)?,
        })
    }

    /// Creates a builder that sends every request to one host.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBaseUrl`] when `base` is not an absolute URL.
    pub fn with_single_base(base: &str) -> Result<Self, InvalidBaseUrl> {
        Self::with_bases(base, base, base)
    }

    /// Resolves the source file for `dataset` in `year`.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedYear`] when no file is known for that year.
    pub fn source_for(&self, dataset: Dataset, year: u16) -> Result<SourceFile, UnsupportedYear> {
        let layout = layout_for(dataset, year)?;
        let era = era_for(dataset, year).ok_or_else(|| unsupported(dataset, year, ""))?;

        let url = match era.template {
            Template::DataQuestEnrollment => format!(
                "{}/dataquest/dlfile/dlfile.aspx?cLevel=School&cYear={}\
                 &cCat=Enrollment&cPage=filesenr",
                self.dataquest_base,
                school_year_label(year)
            ),
            Template::CensusDay => {
                let file = file_override(dataset, year).map_or_else(
                    || format!("cdenroll{:02}{:02}.txt", (year - 1) % 100, year % 100),
                    str::to_string,
                );
                format!("{}/demo-downloads/census/{file}", self.downloads_base)
            }
            Template::Acgr => {
                let file = file_override(dataset, year)
                    .map_or_else(|| format!("acgr{:02}.txt", year % 100), str::to_string);
                format!("{}/demo-downloads/acgr/{file}", self.downloads_base)
            }
            Template::CaasppResearch => {
                let version = CAASPP_VERSIONS
                    .iter()
                    .find(|(y, _)| *y == year)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| {
                        unsupported(dataset, year, "no research file version on record")
                    })?;
                format!(
                    "{}/caaspp/researchfiles/sb_ca{year}_all_ascii_v{version}.zip",
                    self.caaspp_base
                )
            }
        };

        debug!(%dataset, year, %url, ?layout, "resolved source URL");
        Ok(SourceFile {
            dataset,
            end_year: year,
            url,
            format: layout.file_format(),
            layout,
        })
    }
}

fn file_override(dataset: Dataset, year: u16) -> Option<&'static str> {
    FILE_OVERRIDES
        .iter()
        .find(|(d, y, _)| *d == dataset && *y == year)
        .map(|(_, _, file)| *file)
}

fn normalize_base(value: &str) -> Result<String, InvalidBaseUrl> {
    let trimmed = value.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|source| InvalidBaseUrl {
        value: value.to_string(),
        source,
    })?;
    Ok(trimmed.to_string())
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.dataset, self.end_year, self.url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_every_available_year_resolves() {
        let builder = UrlBuilder::default();
        for dataset in Dataset::ALL {
            for year in available_years(dataset) {
                let source = builder.source_for(dataset, year).unwrap();
                assert!(source.url.starts_with("https://"), "{source}");
                assert_eq!(source.end_year, year);
            }
        }
    }

    #[test]
    fn test_unsupported_year_names_year_and_dataset() {
        let err = UrlBuilder::default()
            .source_for(Dataset::Enrollment, 1900)
            .unwrap_err();
        assert_eq!(err.year, 1900);
        assert_eq!(err.dataset, Dataset::Enrollment);
        let msg = err.to_string();
        assert!(msg.contains("1900"), "{msg}");
        assert!(msg.contains("enrollment"), "{msg}");
        assert!(msg.contains("1982-2025"), "{msg}");
    }

    #[test]
    fn test_caaspp_gap_year_is_unsupported_with_reason() {
        let err = UrlBuilder::default()
            .source_for(Dataset::Assessment, 2020)
            .unwrap_err();
        assert!(err.to_string().contains("not administered"));
        assert!(!available_years(Dataset::Assessment).contains(&2020));
    }

    #[test]
    fn test_historical_enrollment_uses_dataquest_year_label() {
        let source = UrlBuilder::default()
            .source_for(Dataset::Enrollment, 2009)
            .unwrap();
        assert_eq!(source.layout, Layout::EnrollmentHistoricalRevised);
        assert!(source.url.contains("cYear=2008-09"), "{}", source.url);
        assert!(source.url.starts_with(DEFAULT_DATAQUEST_BASE));
    }

    #[test]
    fn test_legacy_enrollment_is_fixed_width() {
        let source = UrlBuilder::default()
            .source_for(Dataset::Enrollment, 1985)
            .unwrap();
        assert_eq!(source.layout, Layout::EnrollmentLegacy);
        assert!(matches!(source.format, FileFormat::FixedWidth(_)));
    }

    #[test]
    fn test_census_version_suffix_and_regular_pattern() {
        let builder = UrlBuilder::default();
        let corrected = builder.source_for(Dataset::Enrollment, 2024).unwrap();
        assert!(corrected.url.ends_with("cdenroll2324-v2.txt"));
        let regular = builder.source_for(Dataset::Enrollment, 2025).unwrap();
        assert!(regular.url.ends_with("cdenroll2425.txt"));
    }

    #[test]
    fn test_acgr_overrides() {
        let builder = UrlBuilder::default();
        assert!(
            builder
                .source_for(Dataset::Graduation, 2019)
                .unwrap()
                .url
                .ends_with("/acgr/acgr19-v2.txt")
        );
        assert!(
            builder
                .source_for(Dataset::Graduation, 2018)
                .unwrap()
                .url
                .ends_with("/acgr/acgr18.txt")
        );
    }

    #[test]
    fn test_caaspp_versions() {
        let source = UrlBuilder::default()
            .source_for(Dataset::Assessment, 2019)
            .unwrap();
        assert!(source.url.ends_with("sb_ca2019_all_ascii_v4.zip"));
        assert!(matches!(source.format, FileFormat::ZipArchive { delimiter: b'^' }));
    }

    #[test]
    fn test_with_single_base_redirects_all_hosts() {
        let builder = UrlBuilder::with_single_base("http://127.0.0.1:9999/").unwrap();
        for dataset in Dataset::ALL {
            let year = *available_years(dataset).last().unwrap();
            let source = builder.source_for(dataset, year).unwrap();
            assert!(source.url.starts_with("http://127.0.0.1:9999/"), "{source}");
            assert!(!source.url.contains("9999//"), "{source}");
        }
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(UrlBuilder::with_single_base("not a url").is_err());
    }

    #[test]
    fn test_available_years_are_sorted_and_contiguous_per_era() {
        let years = available_years(Dataset::Enrollment);
        assert_eq!(years.first(), Some(&1982));
        assert_eq!(years.last(), Some(&2025));
        assert!(years.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_summarize_years() {
        assert_eq!(
            summarize_years(&[2015, 2016, 2017, 2019, 2021, 2022]),
            "2015-2017, 2019, 2021-2022"
        );
        assert_eq!(summarize_years(&[]), "");
    }

    #[test]
    fn test_school_year_label() {
        assert_eq!(school_year_label(2009), "2008-09");
        assert_eq!(school_year_label(2000), "1999-00");
    }
}
