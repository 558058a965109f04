//! Error types for the table cache.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dataset::Dataset;

/// Failures reading or writing cache entries.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure at a cache path.
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table could not be serialized.
    #[error("failed to serialize {dataset} {year} for the cache: {source}")]
    Serialize {
        dataset: Dataset,
        year: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The table holds rows of a different dataset than the entry key.
    #[error("refusing to cache {found} rows as {dataset} {year}")]
    DatasetMismatch {
        dataset: Dataset,
        year: u16,
        found: Dataset,
    },

    /// The finished temporary file could not be renamed into place.
    #[error("failed to replace cache entry {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
