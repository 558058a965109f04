//! CLI entry point for caschool.

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use caschool_core::{
    Config, Dataset, FetchOptions, OutputFormat, SchoolDataClient, Table, grade_bands,
    parse_identifier,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, CacheCommand, Command, expand_years};

/// Process outcome mapped to the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    /// Some years failed, the rest were written.
    Partial,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(outcome: ProcessExit) -> Self {
        match outcome {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Partial => ExitCode::from(2),
        }
    }
}

fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info,caschool_core=debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    match args.command {
        Command::ParseId { id } => {
            let cds = parse_identifier(&id)?;
            println!("cds_code:    {cds}");
            println!("county:      {}", cds.county());
            println!("district:    {}", cds.district());
            println!("school:      {}", cds.school());
            println!("level:       {}", cds.level().as_str());
            Ok(ProcessExit::Success)
        }
        Command::Years { dataset } => {
            let years = caschool_core::available_years(dataset);
            for year in years {
                println!("{year}");
            }
            Ok(ProcessExit::Success)
        }
        Command::Cache { command } => {
            let client = build_client(args.config.as_deref(), args.cache_dir.as_deref(), None)?;
            match command {
                CacheCommand::Status => match client.cache_status().await? {
                    Some(status) => print!("{status}"),
                    None => println!("cache disabled: no cache directory could be resolved"),
                },
                CacheCommand::Clear { dataset, year } => {
                    let removed = client.clear_cache(dataset, year).await?;
                    if !args.quiet {
                        println!("removed {removed} cache entries");
                    }
                }
                CacheCommand::Purge => {
                    let removed = client.purge_cache().await?;
                    if !args.quiet {
                        println!("removed {removed} cache entries");
                    }
                }
            }
            Ok(ProcessExit::Success)
        }
        Command::Import {
            dataset,
            year,
            path,
            wide,
            format,
            output,
        } => {
            let client = build_client(args.config.as_deref(), args.cache_dir.as_deref(), None)?;
            let table = client.import_file(dataset, year, &path, !wide).await?;
            report_warnings(&table, args.quiet);
            write_table(&table, format, output.as_deref())?;
            Ok(ProcessExit::Success)
        }
        Command::Fetch {
            dataset,
            years,
            wide,
            no_cache,
            bands,
            format,
            output,
            concurrency,
        } => {
            if bands && dataset != Dataset::Enrollment {
                anyhow::bail!("--bands is only available for enrollment");
            }
            let client = build_client(
                args.config.as_deref(),
                args.cache_dir.as_deref(),
                concurrency.map(usize::from),
            )?;
            let mut years = expand_years(&years);
            years.sort_unstable();
            years.dedup();
            let options = FetchOptions {
                tidy: !wide,
                use_cache: !no_cache,
            };

            let progress = progress_bar(years.len(), args.quiet);
            let result = client
                .fetch_multi_with_progress(dataset, &years, options, |year, outcome| {
                    match outcome {
                        Ok(table) => debug!(%dataset, year, rows = table.len(), "year done"),
                        Err(_) => progress.println(format!("{dataset} {year}: failed")),
                    }
                    progress.inc(1);
                })
                .await;
            progress.finish_and_clear();

            for failure in &result.failures {
                eprintln!("failed {dataset} {failure}");
            }
            let outcome =
                determine_exit_outcome(years.len() - result.failures.len(), result.failures.len());

            if let Some(table) = &result.table {
                let table = if bands {
                    grade_bands(table)?
                } else {
                    table.clone()
                };
                report_warnings(&table, args.quiet);
                write_table(&table, format, output.as_deref())?;
            }
            info!(?outcome, "fetch finished");
            Ok(outcome)
        }
    }
}

fn build_client(
    config_path: Option<&Path>,
    cache_dir: Option<&Path>,
    concurrency: Option<usize>,
) -> Result<SchoolDataClient> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let mut builder = SchoolDataClient::builder().config(&config, cache_dir)?;
    if let Some(concurrency) = concurrency {
        builder = builder.concurrency(concurrency);
    }
    builder.build().context("failed to initialize client")
}

fn progress_bar(total: usize, quiet: bool) -> ProgressBar {
    if quiet || total < 2 || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_bar} {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

fn report_warnings(table: &Table, quiet: bool) {
    if quiet {
        return;
    }
    for warning in table.warnings() {
        warn!(
            year = warning.end_year,
            kind = %warning.kind,
            occurrences = warning.occurrences,
            "{}",
            warning.detail
        );
    }
}

fn write_table(table: &Table, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            table.write_to(format, &mut writer)?;
            writer.flush()?;
            info!(path = %path.display(), rows = table.len(), "wrote table");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            table.write_to(format, &mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}
