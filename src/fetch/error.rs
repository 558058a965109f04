//! Error types for the raw fetcher.
//!
//! Three failure families are kept apart so callers can react differently:
//! transport failures ([`FetchError::Network`], [`FetchError::Timeout`]) may
//! succeed on retry; upstream rejections ([`FetchError::HttpStatus`],
//! [`FetchError::BlockPage`], [`FetchError::UnexpectedContent`]) will not.

use thiserror::Error;

/// Errors that can occur while fetching a source file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server answered 200 with an HTML page instead of a data file.
    #[error(
        "got a block page, not data, from {url} (HTTP {status}, content-type {content_type}); \
         download the file manually and use `import`"
    )]
    BlockPage {
        /// The requested URL.
        url: String,
        /// The HTTP status code of the response.
        status: u16,
        /// Reported content type, or `unknown`.
        content_type: String,
    },

    /// The body does not carry the signature of the expected file type.
    #[error("unexpected content from {url}: expected {expected}, {detail}")]
    UnexpectedContent {
        /// The requested URL.
        url: String,
        /// Expected file type.
        expected: &'static str,
        /// What was found instead.
        detail: String,
    },

    /// The body exceeded the configured size ceiling.
    #[error("response from {url} exceeds {limit_bytes} bytes")]
    TooLarge {
        /// The requested URL.
        url: String,
        /// Configured ceiling.
        limit_bytes: u64,
    },

    /// The URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a block page error.
    pub fn block_page(url: impl Into<String>, status: u16, content_type: Option<&str>) -> Self {
        Self::BlockPage {
            url: url.into(),
            status,
            content_type: content_type.unwrap_or("unknown").to_string(),
        }
    }

    /// Creates an unexpected-content error.
    pub fn unexpected_content(
        url: impl Into<String>,
        expected: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::UnexpectedContent {
            url: url.into(),
            expected,
            detail: detail.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Whether this is a transport failure (no connectivity, timeout).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// The URL involved, when there is one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::BlockPage { url, .. }
            | Self::UnexpectedContent { url, .. }
            | Self::TooLarge { url, .. }
            | Self::InvalidUrl { url } => Some(url),
            Self::ClientBuild { .. } => None,
        }
    }

    /// HTTP status involved, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::BlockPage { status, .. } => Some(*status),
            _ => None,
        }
    }
}
