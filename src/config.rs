//! Configuration file loading.
//!
//! The file lives at `$XDG_CONFIG_HOME/caschool/config.toml` (falling back to
//! `$HOME/.config/caschool/config.toml`) and holds flat `key = value` lines:
//!
//! ```toml
//! cache_dir = "/var/cache/caschool"
//! read_timeout_secs = 900   # large statewide files
//! max_attempts = 3
//! concurrency = 4
//! ```
//!
//! Precedence for every setting is: command-line flag, then environment
//! (`CASCHOOL_CACHE_DIR` for the cache directory), then this file, then the
//! built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::cache::{CACHE_DIR_ENV, CacheManager};
use crate::fetch::{ClientSettings, MAX_ATTEMPTS_CEILING, RetryPolicy};
use crate::quality::DEFAULT_SUPPRESSION_THRESHOLD;
use crate::source::{
    DEFAULT_CAASPP_BASE, DEFAULT_DATAQUEST_BASE, DEFAULT_DOWNLOADS_BASE, InvalidBaseUrl,
    UrlBuilder,
};

/// Default number of years fetched concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Errors raised while reading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax { line: usize },

    #[error("unknown configuration key: '{key}' on line {line}")]
    UnknownKey { key: String, line: usize },

    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        key: &'static str,
        line: usize,
        reason: String,
    },

    #[error("invalid config value for `{key}`: {value}. Expected range: {expected}")]
    OutOfRange {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Settings read from the configuration file. Absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub cache_dir: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub concurrency: Option<usize>,
    pub suppression_warning_threshold: Option<f64>,
    pub dataquest_base_url: Option<String>,
    pub downloads_base_url: Option<String>,
    pub caaspp_base_url: Option<String>,
    pub user_agent: Option<String>,
}

impl Config {
    /// Loads the file at the default path, or an empty config when there is
    /// none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or is
    /// invalid.
    pub fn load_default() -> Result<Self, ConfigError> {
        match resolve_default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        raw.parse()
    }

    /// Checks values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first invalid key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        if let Some(attempts) = self.max_attempts
            && !(1..=MAX_ATTEMPTS_CEILING).contains(&attempts)
        {
            return Err(ConfigError::OutOfRange {
                key: "max_attempts",
                value: attempts.to_string(),
                expected: "1..=5",
            });
        }
        if let Some(concurrency) = self.concurrency
            && !(1..=32).contains(&concurrency)
        {
            return Err(ConfigError::OutOfRange {
                key: "concurrency",
                value: concurrency.to_string(),
                expected: "1..=32",
            });
        }
        if let Some(threshold) = self.suppression_warning_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(ConfigError::OutOfRange {
                key: "suppression_warning_threshold",
                value: threshold.to_string(),
                expected: "0.0..=1.0",
            });
        }
        Ok(())
    }

    /// Cache directory after applying precedence. `cli` wins over the
    /// environment, which wins over the file.
    #[must_use]
    pub fn cache_dir(&self, cli: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli {
            return Some(path.to_path_buf());
        }
        if let Some(path) = env_var_non_empty_os(CACHE_DIR_ENV) {
            return Some(PathBuf::from(path));
        }
        self.cache_dir.clone().or_else(CacheManager::default_dir)
    }

    /// HTTP settings with file overrides applied.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::default();
        if let Some(secs) = self.connect_timeout_secs {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            settings.read_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.max_attempts {
            settings.retry = RetryPolicy::with_max_attempts(attempts);
        }
        settings.user_agent.clone_from(&self.user_agent);
        settings
    }

    /// URL builder with file overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBaseUrl`] when a configured base is not a URL.
    pub fn url_builder(&self) -> Result<UrlBuilder, InvalidBaseUrl> {
        UrlBuilder::with_bases(
            self.dataquest_base_url
                .as_deref()
                .unwrap_or(DEFAULT_DATAQUEST_BASE),
            self.downloads_base_url
                .as_deref()
                .unwrap_or(DEFAULT_DOWNLOADS_BASE),
            self.caaspp_base_url.as_deref().unwrap_or(DEFAULT_CAASPP_BASE),
        )
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    #[must_use]
    pub fn suppression_threshold(&self) -> f64 {
        self.suppression_warning_threshold
            .unwrap_or(DEFAULT_SUPPRESSION_THRESHOLD)
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut cfg = Config::default();
        for (line_index, raw_line) in raw.lines().enumerate() {
            let line_no = line_index + 1;
            let line = strip_inline_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let Some((raw_key, raw_value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: line_no });
            };
            let value = raw_value.trim();

            macro_rules! field {
                ($key:literal, $parse:expr) => {
                    $parse(value).map_err(|reason| ConfigError::InvalidValue {
                        key: $key,
                        line: line_no,
                        reason,
                    })?
                };
            }

            match raw_key.trim() {
                "cache_dir" => {
                    cfg.cache_dir = Some(PathBuf::from(field!("cache_dir", parse_string_literal)));
                }
                "connect_timeout_secs" => {
                    cfg.connect_timeout_secs =
                        Some(field!("connect_timeout_secs", parse_integer_u64));
                }
                "read_timeout_secs" => {
                    cfg.read_timeout_secs = Some(field!("read_timeout_secs", parse_integer_u64));
                }
                "max_attempts" => {
                    let parsed = field!("max_attempts", parse_integer_u64);
                    cfg.max_attempts = Some(u32::try_from(parsed).unwrap_or(u32::MAX));
                }
                "concurrency" => {
                    let parsed = field!("concurrency", parse_integer_u64);
                    cfg.concurrency = Some(usize::try_from(parsed).unwrap_or(usize::MAX));
                }
                "suppression_warning_threshold" => {
                    cfg.suppression_warning_threshold =
                        Some(field!("suppression_warning_threshold", parse_float));
                }
                "dataquest_base_url" => {
                    cfg.dataquest_base_url =
                        Some(field!("dataquest_base_url", parse_string_literal));
                }
                "downloads_base_url" => {
                    cfg.downloads_base_url =
                        Some(field!("downloads_base_url", parse_string_literal));
                }
                "caaspp_base_url" => {
                    cfg.caaspp_base_url = Some(field!("caaspp_base_url", parse_string_literal));
                }
                "user_agent" => {
                    cfg.user_agent = Some(field!("user_agent", parse_string_literal));
                }
                unknown => {
                    return Err(ConfigError::UnknownKey {
                        key: unknown.to_string(),
                        line: line_no,
                    });
                }
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/caschool/config.toml`
/// 2. `$HOME/.config/caschool/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("caschool")
                .join("config.toml"),
        );
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("caschool")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn validate_timeout_secs(key: &'static str, value: Option<u64>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::OutOfRange {
            key,
            value: value.to_string(),
            expected: "1..=3600",
        });
    }
    Ok(())
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String, String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        return Err("expected double-quoted string".to_string());
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64, String> {
    let token = raw_value.trim();
    if token.is_empty() {
        return Err("expected integer value".to_string());
    }
    let value = token.parse::<i128>().map_err(|e| e.to_string())?;
    if value < 0 {
        return Err("expected non-negative integer".to_string());
    }
    u64::try_from(value).map_err(|_| "integer value out of range for u64".to_string())
}

fn parse_float(raw_value: &str) -> Result<f64, String> {
    let value = raw_value
        .trim()
        .parse::<f64>()
        .map_err(|e| e.to_string())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err("expected a finite number".to_string())
    }
}
