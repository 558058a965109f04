//! Shared User-Agent string for all publisher requests.
//!
//! Some CDE endpoints reject requests that do not identify the client, so every
//! request built by [`crate::fetch::HttpClient`] carries this header.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/caschool/caschool";

/// Default User-Agent for data file requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("caschool/{version} (public-education-data-client; +{PROJECT_UA_URL})")
}
