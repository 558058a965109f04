//! Fetch orchestrator: the public entry point.
//!
//! For one year the pipeline is linear: URL builder, fetcher, parser,
//! normalizer, optional tidy transform, cache. Several years run
//! concurrently as independent pipelines bounded by a semaphore; fetch and
//! store for one (dataset, year) are serialized by a per-key lock.

mod multi;

pub use multi::MultiYearResult;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};
use tracing::{debug, info, instrument};

use crate::cache::{CacheManager, CacheStatus};
use crate::config::{Config, DEFAULT_CONCURRENCY};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::fetch::{ClientSettings, ExpectedContent, HttpClient};
use crate::normalize::{NormalizeOptions, normalize};
use crate::parse::{self, RawTable};
use crate::source::{self, FileFormat, Layout, UrlBuilder};
use crate::table::{Shape, Table};
use crate::tidy;

/// Per-call switches for [`SchoolDataClient::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Return the tidy long shape instead of the canonical wide shape.
    pub tidy: bool,
    /// Serve from the cache when an entry exists. Fresh results are stored
    /// either way.
    pub use_cache: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            tidy: true,
            use_cache: true,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn shape(self) -> Shape {
        if self.tidy { Shape::Tidy } else { Shape::Wide }
    }
}

struct Inner {
    urls: UrlBuilder,
    http: HttpClient,
    cache: Option<CacheManager>,
    normalize: NormalizeOptions,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    key_locks: DashMap<(Dataset, u16), Arc<Mutex<()>>>,
}

/// Client for California school enrollment, graduation and assessment data.
///
/// Cheap to clone; clones share the HTTP connection pool, cache and locks.
///
/// ```no_run
/// use caschool_core::{Dataset, FetchOptions, SchoolDataClient};
///
/// # async fn example() -> caschool_core::Result<()> {
/// let client = SchoolDataClient::builder().build()?;
/// let table = client.fetch(Dataset::Enrollment, 2024, FetchOptions::default()).await?;
/// println!("{} rows, {} warnings", table.len(), table.warnings().len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SchoolDataClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SchoolDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchoolDataClient")
            .field("urls", &self.inner.urls)
            .field("cache", &self.inner.cache.as_ref().map(CacheManager::root))
            .field("concurrency", &self.inner.concurrency)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SchoolDataClient`].
#[derive(Debug, Clone, Default)]
pub struct SchoolDataClientBuilder {
    urls: Option<UrlBuilder>,
    settings: Option<ClientSettings>,
    cache: Option<CacheManager>,
    no_cache: bool,
    concurrency: Option<usize>,
    normalize: Option<NormalizeOptions>,
}

impl SchoolDataClientBuilder {
    /// Uses custom download hosts.
    #[must_use]
    pub fn url_builder(mut self, urls: UrlBuilder) -> Self {
        self.urls = Some(urls);
        self
    }

    #[must_use]
    pub fn client_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Stores processed tables under `dir`.
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = Some(CacheManager::new(dir));
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disables the on-disk cache entirely.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Maximum number of years fetched at once (at least 1).
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency.max(1));
        self
    }

    #[must_use]
    pub fn normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = Some(options);
        self
    }

    /// Applies every setting of a loaded [`Config`]; `cache_dir_override`
    /// takes precedence over the environment and the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBaseUrl`] when a configured host is invalid.
    pub fn config(mut self, config: &Config, cache_dir_override: Option<&Path>) -> Result<Self> {
        self.urls = Some(config.url_builder()?);
        self.settings = Some(config.client_settings());
        self.concurrency = Some(config.concurrency());
        self.normalize = Some(NormalizeOptions {
            suppression_threshold: config.suppression_threshold(),
        });
        if let Some(dir) = config.cache_dir(cache_dir_override) {
            self.cache = Some(CacheManager::new(dir));
        }
        Ok(self)
    }

    /// Builds the client. Without an explicit cache directory the default
    /// one is used when it can be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] when the HTTP client cannot be created.
    pub fn build(self) -> Result<SchoolDataClient> {
        let settings = self.settings.unwrap_or_default();
        let http =
            HttpClient::with_settings(&settings).map_err(|source| Error::HttpClient { source })?;
        let cache = if self.no_cache {
            None
        } else {
            self.cache
                .or_else(|| CacheManager::default_dir().map(CacheManager::new))
        };
        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        debug!(
            concurrency,
            cache = ?cache.as_ref().map(CacheManager::root),
            max_attempts = settings.retry.max_attempts(),
            "creating school data client"
        );
        Ok(SchoolDataClient {
            inner: Arc::new(Inner {
                urls: self.urls.unwrap_or_default(),
                http,
                cache,
                normalize: self.normalize.unwrap_or_default(),
                semaphore: Arc::new(Semaphore::new(concurrency)),
                concurrency,
                key_locks: DashMap::new(),
            }),
        })
    }
}

impl SchoolDataClient {
    #[must_use]
    pub fn builder() -> SchoolDataClientBuilder {
        SchoolDataClientBuilder::default()
    }

    /// Cache in use, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&CacheManager> {
        self.inner.cache.as_ref()
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Supported end years of `dataset`, ascending.
    #[must_use]
    pub fn available_years(&self, dataset: Dataset) -> Vec<u16> {
        source::available_years(dataset)
    }

    /// Fetches one year of `dataset`.
    ///
    /// An unsupported year fails before the cache or network is touched.
    ///
    /// # Errors
    ///
    /// Returns the [`Error`] of the first pipeline stage that failed.
    #[instrument(skip(self), fields(%dataset))]
    pub async fn fetch(&self, dataset: Dataset, year: u16, options: FetchOptions) -> Result<Table> {
        let source = self.inner.urls.source_for(dataset, year)?;
        let shape = options.shape();
        let _guard = self.lock_key(dataset, year).await;

        if options.use_cache {
            if let Some(table) = self.cache_get(dataset, year, shape).await? {
                info!(rows = table.len(), "served from cache");
                return Ok(table);
            }
            if shape == Shape::Tidy
                && let Some(wide) = self.cache_get(dataset, year, Shape::Wide).await?
            {
                let long = tidy::tidy(&wide)?;
                self.cache_put(dataset, year, &long).await?;
                info!(rows = long.len(), "tidied cached wide table");
                return Ok(long);
            }
        }

        info!(url = %source.url, layout = %source.layout, "fetching source file");
        let body = self
            .inner
            .http
            .fetch(&source.url, ExpectedContent::for_format(&source.format))
            .await
            .map_err(|err| Error::from_fetch(dataset, year, err))?;
        debug!(bytes = body.bytes.len(), final_url = %body.final_url, "downloaded");

        let wide = self
            .process(dataset, year, source.layout, source.format, body.bytes)
            .await?;
        self.cache_put(dataset, year, &wide).await?;
        if !options.tidy {
            info!(rows = wide.len(), warnings = wide.warnings().len(), "fetched");
            return Ok(wide);
        }
        let long = tidy::tidy(&wide)?;
        self.cache_put(dataset, year, &long).await?;
        info!(rows = long.len(), warnings = long.warnings().len(), "fetched");
        Ok(long)
    }

    /// Fetches several years and concatenates them. Failed years are
    /// reported in [`MultiYearResult::failures`], never dropped silently.
    #[instrument(skip(self, years), fields(%dataset, years = years.len()))]
    pub async fn fetch_multi(
        &self,
        dataset: Dataset,
        years: &[u16],
        options: FetchOptions,
    ) -> MultiYearResult {
        self.fetch_multi_with_progress(dataset, years, options, |_, _| {})
            .await
    }

    /// Like [`fetch_multi`](Self::fetch_multi), calling `progress` with each
    /// year and its outcome as it completes.
    pub async fn fetch_multi_with_progress<F>(
        &self,
        dataset: Dataset,
        years: &[u16],
        options: FetchOptions,
        progress: F,
    ) -> MultiYearResult
    where
        F: FnMut(u16, std::result::Result<&Table, &Error>),
    {
        multi::run(self, dataset, years, options, progress).await
    }

    /// Enrollment grade bands for one year.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or [`Error::Tidy`] for other datasets.
    pub async fn grade_bands(&self, year: u16, use_cache: bool) -> Result<Table> {
        let long = self
            .fetch(
                Dataset::Enrollment,
                year,
                FetchOptions {
                    tidy: true,
                    use_cache,
                },
            )
            .await?;
        Ok(tidy::grade_bands(&long)?)
    }

    /// Runs a locally saved source file through the pipeline. Spreadsheets
    /// (`.xlsx`, `.xls`) go through the spreadsheet parser; anything else is
    /// read in the era's published format. Results are not cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read, otherwise the
    /// error of the failing pipeline stage.
    #[instrument(skip(self), fields(%dataset, path = %path.display()))]
    pub async fn import_file(
        &self,
        dataset: Dataset,
        year: u16,
        path: &Path,
        as_tidy: bool,
    ) -> Result<Table> {
        let layout = source::layout_for(dataset, year)?;
        let format = import_format(path, layout);
        let bytes = tokio::fs::read(path).await.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(bytes = bytes.len(), format = format.name(), "importing local file");
        let wide = self.process(dataset, year, layout, format, bytes).await?;
        if as_tidy {
            Ok(tidy::tidy(&wide)?)
        } else {
            Ok(wide)
        }
    }

    /// Removes cached entries for `dataset` (one year or all). Returns the
    /// number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] when an entry cannot be removed.
    pub async fn clear_cache(&self, dataset: Dataset, year: Option<u16>) -> Result<usize> {
        let Some(cache) = self.inner.cache.clone() else {
            return Ok(0);
        };
        blocking(move || cache.clear(dataset, year)).await
    }

    /// Removes every cached entry of every dataset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] when an entry cannot be removed.
    pub async fn purge_cache(&self) -> Result<usize> {
        let Some(cache) = self.inner.cache.clone() else {
            return Ok(0);
        };
        blocking(move || cache.clear_all()).await
    }

    /// Summary of cached entries, or `None` when caching is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cache`] when the cache directory cannot be read.
    pub async fn cache_status(&self) -> Result<Option<CacheStatus>> {
        let Some(cache) = self.inner.cache.clone() else {
            return Ok(None);
        };
        blocking(move || cache.status()).await.map(Some)
    }

    async fn lock_key(&self, dataset: Dataset, year: u16) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .key_locks
            .entry((dataset, year))
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn cache_get(&self, dataset: Dataset, year: u16, shape: Shape) -> Result<Option<Table>> {
        let Some(cache) = self.inner.cache.clone() else {
            return Ok(None);
        };
        blocking(move || cache.get(dataset, year, shape)).await
    }

    async fn cache_put(&self, dataset: Dataset, year: u16, table: &Table) -> Result<()> {
        let Some(cache) = self.inner.cache.clone() else {
            return Ok(());
        };
        let table = table.clone();
        blocking(move || cache.put(dataset, year, &table).map(|_| ())).await
    }

    /// Parses and normalizes off the async runtime.
    async fn process(
        &self,
        dataset: Dataset,
        year: u16,
        layout: Layout,
        format: FileFormat,
        bytes: Vec<u8>,
    ) -> Result<Table> {
        let options = self.inner.normalize;
        tokio::task::spawn_blocking(move || {
            let raw: RawTable = parse::parse(&bytes, &format).map_err(|source| Error::Parse {
                dataset,
                year,
                source,
            })?;
            debug!(rows = raw.len(), columns = raw.headers().len(), "parsed");
            normalize(&raw, layout, year, &options)
                .map_err(|err| Error::from_normalize(dataset, year, err))
        })
        .await
        .map_err(|source| Error::Task { source })?
    }

    pub(crate) fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.inner.semaphore)
    }
}

async fn blocking<T, E, F>(task: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<Error> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|source| Error::Task { source })?
        .map_err(Into::into)
}

fn import_format(path: &Path, layout: Layout) -> FileFormat {
    let is_spreadsheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls"));
    if is_spreadsheet {
        FileFormat::Spreadsheet
    } else {
        layout.file_format()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_options_shape() {
        assert_eq!(FetchOptions::default().shape(), Shape::Tidy);
        let wide = FetchOptions {
            tidy: false,
            use_cache: true,
        };
        assert_eq!(wide.shape(), Shape::Wide);
    }

    #[test]
    fn test_import_format_by_extension() {
        assert_eq!(
            import_format(Path::new("acgr19.XLSX"), Layout::GraduationAcgr),
            FileFormat::Spreadsheet
        );
        assert_eq!(
            import_format(Path::new("sb_ca2019.zip"), Layout::AssessmentSbacOriginal),
            FileFormat::ZipArchive { delimiter: b'^' }
        );
        assert_eq!(
            import_format(Path::new("enr.txt"), Layout::EnrollmentCensus),
            FileFormat::Delimited { delimiter: b'\t' }
        );
    }

    #[test]
    fn test_builder_without_cache() {
        let client = SchoolDataClient::builder()
            .without_cache()
            .concurrency(0)
            .build()
            .unwrap();
        assert!(client.cache().is_none());
        assert_eq!(client.concurrency(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_year_fails_before_network() {
        let client = SchoolDataClient::builder()
            .url_builder(UrlBuilder::with_single_base("http://127.0.0.1:9").unwrap())
            .without_cache()
            .build()
            .unwrap();
        let err = client
            .fetch(Dataset::Enrollment, 1900, FetchOptions::default())
            .await
            .unwrap_err();
        match err {
            Error::UnsupportedYear(e) => {
                assert_eq!(e.year, 1900);
                assert_eq!(e.dataset, Dataset::Enrollment);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cache_helpers_are_noops_without_cache() {
        let client = SchoolDataClient::builder().without_cache().build().unwrap();
        assert_eq!(client.clear_cache(Dataset::Graduation, None).await.unwrap(), 0);
        assert!(client.cache_status().await.unwrap().is_none());
    }
}
