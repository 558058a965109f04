//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use caschool_core::{Dataset, OutputFormat};
use clap::{Parser, Subcommand};

/// Fetch and tidy California public school data.
///
/// Downloads enrollment, graduation-rate and CAASPP assessment files from the
/// California Department of Education, normalizes every era onto one schema
/// and writes CSV or JSON.
#[derive(Parser, Debug)]
#[command(name = "caschool")]
#[command(author, version, about)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Cache directory (overrides CASCHOOL_CACHE_DIR and the config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/caschool/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one or more years of a dataset
    Fetch {
        /// enrollment, graduation or assessment
        dataset: Dataset,

        /// End years (2024 = 2023-24), or ranges like 2019-2023
        #[arg(required = true, num_args = 1.., value_parser = parse_years)]
        years: Vec<YearSpec>,

        /// Keep the canonical wide shape instead of tidying
        #[arg(long, conflicts_with = "bands")]
        wide: bool,

        /// Ignore cached entries and refetch
        #[arg(long)]
        no_cache: bool,

        /// Aggregate enrollment into elementary, middle, high and K-12 bands
        #[arg(long)]
        bands: bool,

        /// Output format
        #[arg(short, long, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Maximum years fetched at once (1-32)
        #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=32))]
        concurrency: Option<u8>,
    },

    /// List the supported years of a dataset
    Years {
        dataset: Dataset,
    },

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Split a 14-digit CDS code into county, district and school
    ParseId {
        id: String,
    },

    /// Process a locally saved source file
    Import {
        dataset: Dataset,

        /// End year the file belongs to
        year: u16,

        /// Path to the saved file (.txt, .zip, .xlsx, ...)
        path: PathBuf,

        /// Keep the canonical wide shape instead of tidying
        #[arg(long)]
        wide: bool,

        #[arg(short, long, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cached entries
    Status,

    /// Remove cached entries of a dataset (all years unless YEAR is given)
    Clear {
        dataset: Dataset,
        year: Option<u16>,
    },

    /// Remove every cached entry
    Purge,
}

/// One year or an inclusive range of years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSpec(pub Vec<u16>);

/// Flattens year arguments in the order given.
pub fn expand_years(specs: &[YearSpec]) -> Vec<u16> {
    specs.iter().flat_map(|spec| spec.0.iter().copied()).collect()
}

/// Parses `2024` or an inclusive range `2019-2023`.
fn parse_years(value: &str) -> Result<YearSpec, String> {
    let parse_one = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| format!("invalid year '{}'", s.trim()))
    };
    match value.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse_one(start)?, parse_one(end)?);
            if start > end {
                return Err(format!("empty year range '{value}'"));
            }
            Ok(YearSpec((start..=end).collect()))
        }
        None => Ok(YearSpec(vec![parse_one(value)?])),
    }
}
