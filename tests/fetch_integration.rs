//! Error classification of fetch failures as seen through the client.
//!
//! Transport failures must come back retryable; upstream rejections (HTTP
//! errors, block pages, wrong content) must not.

mod support;

use std::time::Duration;

use caschool_core::{
    ClientSettings, Dataset, Error, FetchError, FetchOptions, RetryPolicy, SchoolDataClient,
    UrlBuilder,
};
use support::fixtures::{
    CENSUS_2024_PATH, SBAC_2023_PATH, census_file, client_without_cache, mount_body,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOCK_PAGE: &str = "<!DOCTYPE html><html><head><title>Request Rejected</title></head>\
    <body>The requested URL was rejected. Please consult with your administrator.</body></html>";

#[tokio::test]
async fn test_html_block_page_is_upstream_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CENSUS_2024_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(BLOCK_PAGE, "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    let client = client_without_cache(&server.uri());

    let err = client
        .fetch(Dataset::Enrollment, 2024, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
    let Error::UpstreamRejection { year, source, .. } = &err else {
        panic!("expected upstream rejection, got {err:?}");
    };
    assert_eq!(*year, 2024);
    let FetchError::BlockPage {
        status,
        content_type,
        ..
    } = source
    else {
        panic!("expected block page, got {source:?}");
    };
    assert_eq!(*status, 200);
    assert!(content_type.starts_with("text/html"), "{content_type}");
    assert!(err.to_string().contains("import"));
}

#[tokio::test]
async fn test_http_404_is_upstream_rejection() {
    let server = MockServer::start().await;
    let client = client_without_cache(&server.uri());

    let err = client
        .fetch(Dataset::Graduation, 2023, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
    assert!(matches!(
        err,
        Error::UpstreamRejection {
            dataset: Dataset::Graduation,
            year: 2023,
            source: FetchError::HttpStatus { status: 404, .. },
        }
    ));
}

#[tokio::test]
async fn test_slow_server_is_retryable_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CENSUS_2024_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(census_file("2023-24"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let client = SchoolDataClient::builder()
        .url_builder(UrlBuilder::with_single_base(&server.uri()).unwrap())
        .client_settings(ClientSettings {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_millis(500),
            retry: RetryPolicy::no_retry(),
            ..ClientSettings::default()
        })
        .without_cache()
        .build()
        .unwrap();

    let err = client
        .fetch(Dataset::Enrollment, 2024, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
    assert!(matches!(err, Error::Transport { year: 2024, .. }));
}

#[tokio::test]
async fn test_text_where_zip_expected_is_unexpected_content() {
    let server = MockServer::start().await;
    mount_body(&server, SBAC_2023_PATH, "County Code^District Code\n01^61119\n").await;
    let client = client_without_cache(&server.uri());

    let err = client
        .fetch(Dataset::Assessment, 2023, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UpstreamRejection {
            source: FetchError::UnexpectedContent { expected: "a zip archive", .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    // Nothing listens on the discard port.
    let client = client_without_cache("http://127.0.0.1:9");
    let err = client
        .fetch(Dataset::Enrollment, 2024, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
    assert!(matches!(err, Error::Transport { source: FetchError::Network { .. }, .. }));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CENSUS_2024_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let client = SchoolDataClient::builder()
        .url_builder(UrlBuilder::with_single_base(&server.uri()).unwrap())
        .client_settings(ClientSettings {
            retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 1.0),
            ..ClientSettings::default()
        })
        .without_cache()
        .build()
        .unwrap();

    let err = client
        .fetch(Dataset::Enrollment, 2024, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UpstreamRejection {
            source: FetchError::HttpStatus { status: 503, .. },
            ..
        }
    ));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
