//! Multi-year fetches.

use std::collections::BTreeMap;

use tokio::task::JoinSet;
use tracing::{info, warn};

use super::{FetchOptions, SchoolDataClient};
use crate::dataset::Dataset;
use crate::error::{Error, Result, YearFailure};
use crate::table::Table;

/// Outcome of [`SchoolDataClient::fetch_multi`]: the concatenated table of
/// every year that succeeded plus an explicit record of every year that did
/// not.
#[derive(Debug)]
pub struct MultiYearResult {
    pub dataset: Dataset,
    /// Successful years in ascending order, or `None` when none succeeded.
    pub table: Option<Table>,
    /// Failed years in ascending order.
    pub failures: Vec<YearFailure>,
}

impl MultiYearResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Years that failed.
    #[must_use]
    pub fn failed_years(&self) -> Vec<u16> {
        self.failures.iter().map(|f| f.year).collect()
    }

    /// The table when every year succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MultiYear`] carrying the per-year manifest when any
    /// year failed.
    pub fn into_complete(self) -> Result<Table> {
        if !self.failures.is_empty() {
            return Err(Error::MultiYear {
                dataset: self.dataset,
                failures: self.failures,
            });
        }
        self.table.ok_or(Error::MultiYear {
            dataset: self.dataset,
            failures: Vec::new(),
        })
    }
}

pub(super) async fn run<F>(
    client: &SchoolDataClient,
    dataset: Dataset,
    years: &[u16],
    options: FetchOptions,
    mut progress: F,
) -> MultiYearResult
where
    F: FnMut(u16, std::result::Result<&Table, &Error>),
{
    let mut years = years.to_vec();
    years.sort_unstable();
    years.dedup();

    let mut tasks = JoinSet::new();
    let mut task_years = BTreeMap::new();
    for &year in &years {
        let client = client.clone();
        let semaphore = client.semaphore();
        let handle = tasks.spawn(async move {
            // Permit is released when the task finishes.
            let _permit = semaphore.acquire_owned().await;
            client.fetch(dataset, year, options).await
        });
        task_years.insert(handle.id(), year);
    }

    let mut tables = BTreeMap::new();
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        let (year, outcome) = match joined {
            Ok((id, outcome)) => (task_years.get(&id).copied(), outcome),
            Err(source) => (
                task_years.get(&source.id()).copied(),
                Err(Error::Task { source }),
            ),
        };
        let Some(year) = year else {
            continue;
        };
        progress(year, outcome.as_ref());
        match outcome {
            Ok(table) => {
                tables.insert(year, table);
            }
            Err(error) => {
                warn!(%dataset, year, %error, "year failed");
                failures.push(YearFailure { year, error });
            }
        }
    }

    let first_year = tables.keys().next().copied();
    let table = match first_year {
        None => None,
        Some(first_year) => match Table::concat(tables.into_values()) {
            Ok(table) => Some(table),
            Err(err) => {
                failures.push(YearFailure {
                    year: first_year,
                    error: err.into(),
                });
                None
            }
        },
    };
    failures.sort_by_key(|f| f.year);

    info!(
        %dataset,
        requested = years.len(),
        failed = failures.len(),
        rows = table.as_ref().map_or(0, Table::len),
        "multi-year fetch finished"
    );
    MultiYearResult {
        dataset,
        table,
        failures,
    }
}
