//! California school data library
//!
//! Downloads, parses and normalizes California Department of Education
//! enrollment, graduation-rate and CAASPP assessment files into consistent
//! tables spanning every published era.
//!
//! # Architecture
//!
//! Each year runs through a linear pipeline:
//! - [`source`] - URL builder: per-era templates, file formats and layouts
//! - [`fetch`] - HTTP fetcher with block-page detection and bounded retry
//! - [`parse`] - Fixed-width, delimited, zipped and spreadsheet parsers
//! - [`normalize`] - Per-era mapping onto the canonical wide shape
//! - [`tidy`] - Long shape, percentage-of-total and grade bands
//! - [`cache`] - On-disk cache keyed by dataset, year, shape and schema version
//!
//! [`SchoolDataClient`] drives the pipeline for one or many years.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod codes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod identifier;
pub mod normalize;
pub mod orchestrator;
pub mod parse;
pub mod quality;
pub mod source;
pub mod table;
pub mod tidy;
mod user_agent;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheError, CacheManager, CacheStatus, SCHEMA_VERSION};
pub use codes::{GradeLevel, Subgroup, Taxonomy};
pub use config::{Config, ConfigError};
pub use dataset::{Dataset, UnknownDataset};
pub use error::{Error, Result, YearFailure};
pub use fetch::{ClientSettings, FetchError, HttpClient, RetryPolicy};
pub use identifier::{AggregationLevel, CdsCode, IdentifierError, parse_identifier};
pub use normalize::{NormalizeError, NormalizeOptions};
pub use orchestrator::{FetchOptions, MultiYearResult, SchoolDataClient, SchoolDataClientBuilder};
pub use parse::{ParseError, RawTable};
pub use quality::{DataQualityWarning, WarningKind};
pub use source::{Layout, SourceFile, UnsupportedYear, UrlBuilder, available_years};
pub use table::{OutputFormat, Rows, Shape, Table};
pub use tidy::{TidyError, grade_bands, tidy};
