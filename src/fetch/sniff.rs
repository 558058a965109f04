//! Content signature checks for downloaded bodies.
//!
//! Firewalls in front of the publisher answer blocked requests with
//! `200 OK` and an HTML page. Parsing that page as tab-delimited text would
//! "succeed" with garbage, so every body is checked against the signature of
//! the file type its era declares before it reaches the parser.

use tracing::{debug, warn};

use super::FetchError;
use crate::source::FileFormat;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const OLE_COMPOUND_FILE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Markers that identify an HTML document near the start of a body.
const HTML_MARKERS: &[&str] = &["<!doctype html", "<html", "<head", "<body", "<title"];

/// How many leading bytes are inspected for HTML markers.
const SNIFF_WINDOW: usize = 1024;

/// File family a body is expected to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedContent {
    /// Plain text (delimited or fixed-width).
    Text,
    /// Zip archive.
    Zip,
    /// Excel workbook (`.xlsx` zip container or legacy `.xls` compound file).
    Spreadsheet,
}

impl ExpectedContent {
    /// Maps a declared file format to its expected content family.
    #[must_use]
    pub fn for_format(format: &FileFormat) -> Self {
        match format {
            FileFormat::FixedWidth(_) | FileFormat::Delimited { .. } => Self::Text,
            FileFormat::ZipArchive { .. } => Self::Zip,
            FileFormat::Spreadsheet => Self::Spreadsheet,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Text => "text data",
            Self::Zip => "a zip archive",
            Self::Spreadsheet => "a spreadsheet",
        }
    }
}

/// Returns true when the start of `body` looks like an HTML document.
#[must_use]
pub fn looks_like_html(body: &[u8]) -> bool {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    let window = &body[..body.len().min(SNIFF_WINDOW)];
    let text = String::from_utf8_lossy(window).to_ascii_lowercase();
    let trimmed = text.trim_start();
    if !trimmed.starts_with('<') {
        return false;
    }
    HTML_MARKERS.iter().any(|marker| trimmed.contains(marker))
}

fn is_zip(body: &[u8]) -> bool {
    body.starts_with(ZIP_LOCAL_HEADER) || body.starts_with(ZIP_EMPTY_ARCHIVE)
}

fn is_ole(body: &[u8]) -> bool {
    body.starts_with(OLE_COMPOUND_FILE)
}

fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
}

/// Verifies that `body` matches the expected content family.
///
/// # Errors
///
/// Returns [`FetchError::BlockPage`] when the body is an HTML page, and
/// [`FetchError::UnexpectedContent`] when a binary signature is missing or
/// the body is empty.
pub fn check_signature(
    url: &str,
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
    expected: ExpectedContent,
) -> Result<(), FetchError> {
    if body.is_empty() {
        return Err(FetchError::unexpected_content(url, expected.name(), "got an empty body"));
    }

    if looks_like_html(body) {
        debug!(url, ?content_type, "HTML signature found in body");
        return Err(FetchError::block_page(url, status, content_type));
    }

    match expected {
        ExpectedContent::Text => {
            if is_zip(body) || is_ole(body) {
                return Err(FetchError::unexpected_content(
                    url,
                    expected.name(),
                    "got a binary container",
                ));
            }
            if is_html_content_type(content_type) {
                warn!(url, "server labelled a text body as text/html; body has no HTML markup");
            }
        }
        ExpectedContent::Zip => {
            if !is_zip(body) {
                if is_html_content_type(content_type) {
                    return Err(FetchError::block_page(url, status, content_type));
                }
                return Err(FetchError::unexpected_content(
                    url,
                    expected.name(),
                    "zip signature missing",
                ));
            }
        }
        ExpectedContent::Spreadsheet => {
            if !is_zip(body) && !is_ole(body) {
                if is_html_content_type(content_type) {
                    return Err(FetchError::block_page(url, status, content_type));
                }
                return Err(FetchError::unexpected_content(
                    url,
                    expected.name(),
                    "workbook signature missing",
                ));
            }
        }
    }
    Ok(())
}
