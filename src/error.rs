//! Crate-level error taxonomy.
//!
//! Every fatal failure of a single-year pipeline is one [`Error`] variant
//! naming the dataset and year involved. Non-fatal conditions are
//! [`DataQualityWarning`](crate::quality::DataQualityWarning)s attached to
//! the returned table instead.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::dataset::Dataset;
use crate::fetch::FetchError;
use crate::normalize::NormalizeError;
use crate::parse::ParseError;
use crate::source::{InvalidBaseUrl, UnsupportedYear};
use crate::table::{ExportError, TableError};
use crate::tidy::TidyError;

/// Convenience alias used across the public API.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by [`SchoolDataClient`](crate::SchoolDataClient) and the
/// CLI.
#[derive(Debug, Error)]
pub enum Error {
    /// No URL or schema mapping exists for the year.
    #[error(transparent)]
    UnsupportedYear(#[from] UnsupportedYear),

    /// Connectivity failure or timeout. Retrying later may succeed.
    #[error("{dataset} {year}: transport failure: {source}")]
    Transport {
        dataset: Dataset,
        year: u16,
        #[source]
        source: FetchError,
    },

    /// Non-success status, block page or wrong file type.
    #[error("{dataset} {year}: upstream rejected the request: {source}")]
    UpstreamRejection {
        dataset: Dataset,
        year: u16,
        #[source]
        source: FetchError,
    },

    /// The file is structurally malformed.
    #[error("{dataset} {year}: malformed source file: {source}")]
    Parse {
        dataset: Dataset,
        year: u16,
        #[source]
        source: ParseError,
    },

    /// The file holds a column or code the era mapping does not know.
    #[error("{dataset} {year}: schema mapping gap: {source}")]
    SchemaMappingGap {
        dataset: Dataset,
        year: u16,
        #[source]
        source: NormalizeError,
    },

    #[error(transparent)]
    Tidy(#[from] TidyError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidBaseUrl(#[from] InvalidBaseUrl),

    /// The HTTP client could not be constructed.
    #[error("failed to initialize HTTP client: {source}")]
    HttpClient {
        #[source]
        source: FetchError,
    },

    /// A local file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking cache task panicked or was cancelled.
    #[error("background task failed: {source}")]
    Task {
        #[source]
        source: tokio::task::JoinError,
    },

    /// One or more years of a multi-year request failed.
    #[error("{}", MultiYearMessage { dataset: *dataset, failures })]
    MultiYear {
        dataset: Dataset,
        failures: Vec<YearFailure>,
    },
}

/// One failed year of a multi-year request.
#[derive(Debug)]
pub struct YearFailure {
    pub year: u16,
    pub error: Error,
}

impl fmt::Display for YearFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.year, self.error)
    }
}

struct MultiYearMessage<'a> {
    dataset: Dataset,
    failures: &'a [YearFailure],
}

impl fmt::Display for MultiYearMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let years: Vec<String> = self.failures.iter().map(|f| f.year.to_string()).collect();
        write!(
            f,
            "{} {} failed: {}",
            self.dataset,
            if self.failures.len() == 1 { "year" } else { "years" },
            years.join(", ")
        )
    }
}

impl Error {
    /// Classifies a fetch failure as transport or upstream rejection.
    #[must_use]
    pub fn from_fetch(dataset: Dataset, year: u16, source: FetchError) -> Self {
        if source.is_transport() {
            Self::Transport {
                dataset,
                year,
                source,
            }
        } else {
            Self::UpstreamRejection {
                dataset,
                year,
                source,
            }
        }
    }

    /// Splits normalizer failures into malformed input and mapping gaps.
    #[must_use]
    pub fn from_normalize(dataset: Dataset, year: u16, source: NormalizeError) -> Self {
        match source {
            NormalizeError::Malformed(source) => Self::Parse {
                dataset,
                year,
                source,
            },
            source => Self::SchemaMappingGap {
                dataset,
                year,
                source,
            },
        }
    }

    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// End year the error refers to, when it concerns a single year.
    #[must_use]
    pub fn year(&self) -> Option<u16> {
        match self {
            Self::UnsupportedYear(err) => Some(err.year),
            Self::Transport { year, .. }
            | Self::UpstreamRejection { year, .. }
            | Self::Parse { year, .. }
            | Self::SchemaMappingGap { year, .. } => Some(*year),
            _ => None,
        }
    }
}
