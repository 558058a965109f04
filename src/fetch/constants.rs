//! Defaults for the raw fetcher.

/// Default HTTP connect timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout. CAASPP archives run to hundreds of megabytes.
pub const READ_TIMEOUT_SECS: u64 = 600;

/// Largest body accepted before the download is aborted (1 GiB).
pub const MAX_BODY_BYTES: u64 = 1 << 30;
