//! HTTP client wrapper for fetching source files.
//!
//! [`HttpClient`] downloads a body into memory, enforcing a size ceiling,
//! mapping failures onto [`FetchError`], and checking the body signature
//! against the expected file type before returning it.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, MAX_BODY_BYTES, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::sniff::{ExpectedContent, check_signature};
use crate::user_agent;

/// Tunables for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_body_bytes: u64,
    pub retry: RetryPolicy,
    /// Overrides the default descriptive User-Agent.
    pub user_agent: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            max_body_bytes: MAX_BODY_BYTES,
            retry: RetryPolicy::default(),
            user_agent: None,
        }
    }
}

/// A fetched body that passed signature checks.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status of the final response.
    pub status: u16,
    /// Reported content type.
    pub content_type: Option<String>,
    /// Raw body.
    pub bytes: Vec<u8>,
}

/// HTTP client for fetching source files.
///
/// Create once and reuse; the inner `reqwest::Client` pools connections.
///
/// # Example
///
/// ```no_run
/// use caschool_core::fetch::{ExpectedContent, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let body = client
///     .fetch("https://www3.cde.ca.gov/demo-downloads/acgr/acgr23.txt", ExpectedContent::Text)
///     .await?;
/// println!("{} bytes", body.bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_body_bytes: u64,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(&ClientSettings::default())
    }

    /// Creates a client with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the client cannot be built.
    pub fn with_settings(settings: &ClientSettings) -> Result<Self, FetchError> {
        let agent = settings
            .user_agent
            .clone()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(user_agent::default_user_agent);
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .gzip(true)
            .user_agent(agent)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;
        Ok(Self {
            client,
            max_body_bytes: settings.max_body_bytes,
            retry: settings.retry.clone(),
        })
    }

    /// Fetches `url`, retrying transport failures per the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the last [`FetchError`] once retries are exhausted or on the
    /// first permanent failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &str,
        expected: ExpectedContent,
    ) -> Result<FetchedBody, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, expected).await {
                Ok(body) => return Ok(body),
                Err(error) => match self.retry.should_retry(classify_error(&error), attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next,
                    } => {
                        warn!(
                            %error,
                            attempt,
                            delay_ms = delay.as_millis(),
                            "fetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt = next;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(%error, %reason, "giving up");
                        return Err(error);
                    }
                },
            }
        }
    }

    async fn fetch_once(
        &self,
        url: &str,
        expected: ExpectedContent,
    ) -> Result<FetchedBody, FetchError> {
        debug!("starting fetch");
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FetchError::http_status(url, status));
        }

        let content_type = header_string(&response, CONTENT_TYPE);
        let final_url = response.url().to_string();
        if let Some(length) = header_string(&response, CONTENT_LENGTH)
            .and_then(|v| v.parse::<u64>().ok())
            && length > self.max_body_bytes
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit_bytes: self.max_body_bytes,
            });
        }

        let bytes = self.read_body(url, response).await?;
        check_signature(url, status, content_type.as_deref(), &bytes, expected)?;

        info!(bytes = bytes.len(), %final_url, "fetch complete");
        Ok(FetchedBody {
            url: url.to_string(),
            final_url,
            status,
            content_type,
            bytes,
        })
    }

    async fn read_body(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        let mut stream = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_send_error(url, e))?;
            if (bytes.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit_bytes: self.max_body_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

fn map_send_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url)
    } else {
        FetchError::network(url, error)
    }
}

fn header_string(
    response: &reqwest::Response,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
