//! On-disk cache of processed tables.
//!
//! Entries are keyed by (dataset, year, shape, schema version) and stored as
//! JSON envelopes at `{root}/v{schema}/{dataset}/{year}-{shape}.json`.
//! Bumping [`SCHEMA_VERSION`] moves lookups to a fresh directory, so entries
//! written by an older normalizer are never served.
//!
//! Writes go to a temporary file in the target directory and are renamed
//! into place, so readers see either the old entry or the new one.

mod error;

pub use error::CacheError;

use std::fmt;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::table::{Shape, Table};

/// Version of the processed-table layout. Bump whenever normalized or tidy
/// output changes shape or meaning.
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "CASCHOOL_CACHE_DIR";

const SHAPES: [Shape; 3] = [Shape::Wide, Shape::Tidy, Shape::GradeBands];

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    dataset: Dataset,
    year: u16,
    shape: Shape,
    created_at_unix: u64,
    table: &'a Table,
}

#[derive(Deserialize)]
struct Envelope {
    schema_version: u32,
    dataset: Dataset,
    year: u16,
    shape: Shape,
    table: Table,
}

/// One file found by [`CacheManager::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub dataset: Dataset,
    pub year: u16,
    pub shape: Shape,
    pub schema_version: u32,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl CacheEntry {
    /// Written under a schema version other than `current` and never served.
    #[must_use]
    pub fn is_stale(&self, current: u32) -> bool {
        self.schema_version != current
    }
}

/// Summary of the cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub root: PathBuf,
    pub schema_version: u32,
    pub entries: Vec<CacheEntry>,
}

impl CacheStatus {
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "cache: {} (schema v{}, {} entries, {} bytes)",
            self.root.display(),
            self.schema_version,
            self.entries.len(),
            self.total_bytes()
        )?;
        for entry in &self.entries {
            writeln!(
                f,
                "  {:<11} {} {:<11} v{} {:>10} bytes{}",
                entry.dataset.as_str(),
                entry.year,
                entry.shape.as_str(),
                entry.schema_version,
                entry.size_bytes,
                if entry.is_stale(self.schema_version) {
                    " (stale)"
                } else {
                    ""
                }
            )?;
        }
        Ok(())
    }
}

/// File cache of processed tables.
#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
    schema_version: u32,
}

impl CacheManager {
    /// Cache rooted at `root`, using the current [`SCHEMA_VERSION`].
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Overrides the schema version used for keys.
    #[must_use]
    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    /// Default cache directory.
    ///
    /// Priority:
    /// 1. `$CASCHOOL_CACHE_DIR`
    /// 2. `$XDG_CACHE_HOME/caschool`
    /// 3. `$HOME/.cache/caschool`
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        if let Some(dir) = env_var_non_empty_os(CACHE_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        if let Some(xdg_cache_home) = env_var_non_empty_os("XDG_CACHE_HOME") {
            return Some(PathBuf::from(xdg_cache_home).join("caschool"));
        }
        let home = env_var_non_empty_os("HOME")?;
        Some(PathBuf::from(home).join(".cache").join("caschool"))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn version_dir(&self) -> PathBuf {
        self.root.join(format!("v{}", self.schema_version))
    }

    /// Path of the entry for a key under the current schema version.
    #[must_use]
    pub fn entry_path(&self, dataset: Dataset, year: u16, shape: Shape) -> PathBuf {
        self.version_dir()
            .join(dataset.as_str())
            .join(format!("{year}-{}.json", shape.as_str()))
    }

    /// Looks up a table. Unreadable or mismatched entries are misses.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when an existing entry cannot be opened.
    pub fn get(
        &self,
        dataset: Dataset,
        year: u16,
        shape: Shape,
    ) -> Result<Option<Table>, CacheError> {
        let path = self.entry_path(dataset, year, shape);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "cache miss");
                return Ok(None);
            }
            Err(err) => return Err(CacheError::io(&path, err)),
        };

        let envelope: Envelope = match serde_json::from_reader(BufReader::new(file)) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable cache entry");
                return Ok(None);
            }
        };
        if envelope.schema_version != self.schema_version
            || envelope.dataset != dataset
            || envelope.year != year
            || envelope.shape != shape
            || envelope.table.shape() != shape
        {
            warn!(path = %path.display(), "ignoring cache entry with mismatched key");
            return Ok(None);
        }
        debug!(path = %path.display(), rows = envelope.table.len(), "cache hit");
        Ok(Some(envelope.table))
    }

    /// Stores `table` for (dataset, year), replacing any previous entry
    /// atomically. Returns the entry path.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::DatasetMismatch`] when the rows belong to another
    /// dataset, and other [`CacheError`]s when the directory cannot be
    /// created or the entry cannot be written or renamed into place.
    pub fn put(&self, dataset: Dataset, year: u16, table: &Table) -> Result<PathBuf, CacheError> {
        if table.dataset() != dataset {
            return Err(CacheError::DatasetMismatch {
                dataset,
                year,
                found: table.dataset(),
            });
        }
        let shape = table.shape();
        let path = self.entry_path(dataset, year, shape);
        let dir = path
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        fs::create_dir_all(&dir).map_err(|err| CacheError::io(&dir, err))?;

        let envelope = EnvelopeRef {
            schema_version: self.schema_version,
            dataset,
            year,
            shape,
            created_at_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            table,
        };

        let mut temp = NamedTempFile::new_in(&dir).map_err(|err| CacheError::io(&dir, err))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, &envelope).map_err(|source| CacheError::Serialize {
                dataset,
                year,
                source,
            })?;
            writer.flush().map_err(|err| CacheError::io(&path, err))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|err| CacheError::io(&path, err))?;
        temp.persist(&path).map_err(|err| CacheError::Persist {
            path: path.clone(),
            source: err.error,
        })?;
        info!(path = %path.display(), rows = table.len(), "cached table");
        Ok(path)
    }

    /// Removes entries for `dataset` (one `year` or all years) under every
    /// schema version. Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when a matching entry cannot be removed.
    pub fn clear(&self, dataset: Dataset, year: Option<u16>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for entry in self.scan()? {
            if entry.dataset == dataset && year.is_none_or(|y| y == entry.year) {
                fs::remove_file(&entry.path).map_err(|err| CacheError::io(&entry.path, err))?;
                removed += 1;
            }
        }
        info!(%dataset, year = ?year, removed, "cleared cache entries");
        Ok(removed)
    }

    /// Removes every entry of every dataset.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when an entry cannot be removed.
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for dataset in Dataset::ALL {
            removed += self.clear(dataset, None)?;
        }
        Ok(removed)
    }

    /// Lists cached entries, current and stale.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the cache directory cannot be read.
    pub fn status(&self) -> Result<CacheStatus, CacheError> {
        Ok(CacheStatus {
            root: self.root.clone(),
            schema_version: self.schema_version,
            entries: self.scan()?,
        })
    }

    fn scan(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let mut entries = Vec::new();
        for version_dir in read_dir_if_exists(&self.root)? {
            let Some(schema_version) = file_name(&version_dir)
                .strip_prefix('v')
                .and_then(|v| v.parse::<u32>().ok())
            else {
                continue;
            };
            for dataset in Dataset::ALL {
                let dataset_dir = version_dir.join(dataset.as_str());
                for path in read_dir_if_exists(&dataset_dir)? {
                    let Some((year, shape)) = parse_entry_name(&file_name(&path)) else {
                        continue;
                    };
                    let size_bytes = fs::metadata(&path)
                        .map_err(|err| CacheError::io(&path, err))?
                        .len();
                    entries.push(CacheEntry {
                        dataset,
                        year,
                        shape,
                        schema_version,
                        size_bytes,
                        path,
                    });
                }
            }
        }
        entries.sort_by(|a, b| {
            (a.schema_version, a.dataset, a.year, a.shape).cmp(&(
                b.schema_version,
                b.dataset,
                b.year,
                b.shape,
            ))
        });
        Ok(entries)
    }
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = std::env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn read_dir_if_exists(dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    match fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .map(|entry| entry.map(|e| e.path()).map_err(|err| CacheError::io(dir, err)))
            .collect(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(CacheError::io(dir, err)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parses `{year}-{shape}.json`.
fn parse_entry_name(name: &str) -> Option<(u16, Shape)> {
    let stem = name.strip_suffix(".json")?;
    let (year, shape) = stem.split_once('-')?;
    let year = year.parse().ok()?;
    let shape = SHAPES.into_iter().find(|s| s.as_str() == shape)?;
    Some((year, shape))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use super::*;
    use crate::codes::{GradeLevel, Subgroup};
    use crate::identifier::{AggregationLevel, CdsCode};
    use crate::quality::{DataQualityWarning, WarningKind};
    use crate::table::{EnrollmentRecord, Entity, Rows};

    fn sample_table() -> Table {
        let record = EnrollmentRecord {
            entity: Entity::new(2024, CdsCode::state(), AggregationLevel::State, None),
            subgroup: Subgroup::Total,
            grades: BTreeMap::from([
                (GradeLevel::Kindergarten, Some(10)),
                (GradeLevel::Grade1, None),
            ]),
            total: Some(10),
        };
        Table::new(
            Rows::Enrollment(vec![record]),
            vec![DataQualityWarning {
                end_year: 2024,
                kind: WarningKind::HighSuppression,
                occurrences: 1,
                detail: "1 of 2".to_string(),
            }],
        )
    }

    // ==================== Get/Put Tests ====================

    #[test]
    fn test_put_then_get_round_trips() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path());
        let table = sample_table();
        let path = cache.put(Dataset::Enrollment, 2024, &table).unwrap();
        assert!(path.ends_with("v1/enrollment/2024-wide.json"));
        let cached = cache.get(Dataset::Enrollment, 2024, Shape::Wide).unwrap();
        assert_eq!(cached, Some(table));
    }

    #[test]
    fn test_get_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path());
        assert_eq!(cache.get(Dataset::Assessment, 2019, Shape::Tidy).unwrap(), None);
    }

    #[test]
    fn test_schema_bump_ignores_old_entries() {
        let temp = TempDir::new().unwrap();
        CacheManager::new(temp.path())
            .put(Dataset::Enrollment, 2024, &sample_table())
            .unwrap();
        let bumped = CacheManager::new(temp.path()).with_schema_version(SCHEMA_VERSION + 1);
        assert_eq!(bumped.get(Dataset::Enrollment, 2024, Shape::Wide).unwrap(), None);
        let status = bumped.status().unwrap();
        assert_eq!(status.entries.len(), 1);
        assert_ne!(status.entries[0].schema_version, bumped.schema_version());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path());
        let path = cache.entry_path(Dataset::Graduation, 2020, Shape::Tidy);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(cache.get(Dataset::Graduation, 2020, Shape::Tidy).unwrap(), None);
    }

    #[test]
    fn test_put_replaces_whole_entry() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path());
        cache.put(Dataset::Enrollment, 2024, &sample_table()).unwrap();
        let empty = sample_table().empty_like();
        cache.put(Dataset::Enrollment, 2024, &empty).unwrap();
        let cached = cache.get(Dataset::Enrollment, 2024, Shape::Wide).unwrap().unwrap();
        assert!(cached.is_empty());
        let leftovers = fs::read_dir(path_dir(&cache)).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_put_rejects_table_of_other_dataset() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path());
        let err = cache.put(Dataset::Graduation, 2024, &sample_table()).unwrap_err();
        assert!(matches!(
            err,
            CacheError::DatasetMismatch {
                dataset: Dataset::Graduation,
                year: 2024,
                found: Dataset::Enrollment,
            }
        ));
        assert!(!cache.entry_path(Dataset::Graduation, 2024, Shape::Wide).exists());
    }

    fn path_dir(cache: &CacheManager) -> PathBuf {
        cache.root().join("v1").join("enrollment")
    }

    // ==================== Clear/Status Tests ====================

    #[test]
    fn test_clear_one_year_and_all() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path());
        cache.put(Dataset::Enrollment, 2023, &sample_table()).unwrap();
        cache.put(Dataset::Enrollment, 2024, &sample_table()).unwrap();
        let graduation = Table::new(Rows::Graduation(Vec::new()), Vec::new());
        cache.put(Dataset::Graduation, 2024, &graduation).unwrap();

        assert_eq!(cache.clear(Dataset::Enrollment, Some(2024)).unwrap(), 1);
        let years: Vec<_> = cache
            .status()
            .unwrap()
            .entries
            .iter()
            .map(|e| (e.dataset, e.year))
            .collect();
        assert_eq!(years, vec![(Dataset::Enrollment, 2023), (Dataset::Graduation, 2024)]);

        assert_eq!(cache.clear_all().unwrap(), 2);
        assert!(cache.status().unwrap().entries.is_empty());
    }

    #[test]
    fn test_status_of_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = CacheManager::new(temp.path().join("never-created"));
        let status = cache.status().unwrap();
        assert!(status.entries.is_empty());
        assert_eq!(status.total_bytes(), 0);
    }

    #[test]
    fn test_parse_entry_name() {
        assert_eq!(parse_entry_name("2024-grade_bands.json"), Some((2024, Shape::GradeBands)));
        assert_eq!(parse_entry_name("2024-tidy.json.tmp"), None);
        assert_eq!(parse_entry_name("notes.txt"), None);
    }
}
