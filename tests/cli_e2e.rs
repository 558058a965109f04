//! End-to-end CLI tests for the caschool binary.

mod support;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use support::fixtures::{CENSUS_2024_PATH, acgr_file, acgr_path, census_file, mount_body};
use tempfile::TempDir;
use wiremock::MockServer;

/// A command isolated from the user's config and cache.
fn caschool(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("caschool").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("CASCHOOL_CACHE_DIR", home.join("cache"))
        .env_remove("RUST_LOG");
    cmd
}

/// Writes a config file pointing every host at `base`.
fn write_config(home: &Path, base: &str) -> std::path::PathBuf {
    let path = home.join("caschool.toml");
    std::fs::write(
        &path,
        format!(
            "dataquest_base_url = \"{base}\"\n\
             downloads_base_url = \"{base}\"\n\
             caaspp_base_url = \"{base}\"\n\
             max_attempts = 1\n\
             read_timeout_secs = 5\n"
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_binary_without_args_shows_usage() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("California"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("caschool"));
}

#[test]
fn test_parse_id_splits_segments() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .args(["parse-id", "01611190130229"])
        .assert()
        .success()
        .stdout(predicate::str::contains("county:      01"))
        .stdout(predicate::str::contains("district:    61119"))
        .stdout(predicate::str::contains("school:      0130229"))
        .stdout(predicate::str::contains("level:       school"));
}

#[test]
fn test_parse_id_rejects_bad_identifier() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .args(["parse-id", "0161119"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_years_lists_assessment_without_2020() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .args(["years", "assessment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2019\n"))
        .stdout(predicate::str::contains("2021\n"))
        .stdout(predicate::str::contains("2020").not());
}

#[test]
fn test_fetch_unsupported_year_fails_naming_year() {
    let home = TempDir::new().unwrap();
    caschool(home.path())
        .args(["fetch", "enrollment", "1900"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("1900"))
        .stderr(predicate::str::contains("enrollment"));
}

#[test]
fn test_cache_status_on_empty_cache() {
    let home = TempDir::new().unwrap();
    let cache_dir = home.path().join("explicit-cache");
    caschool(home.path())
        .arg("cache")
        .arg("status")
        .arg("--cache-dir")
        .arg(&cache_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 entries"));
}

#[test]
fn test_invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "concurrency = 0\n").unwrap();
    caschool(home.path())
        .args(["cache", "status", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

/// Starts a mock publisher serving `files`.
fn mock_server(files: &[(&str, String)]) -> MockServer {
    tokio_test::block_on(async {
        let server = MockServer::start().await;
        for (at, body) in files {
            mount_body(&server, at, body.clone()).await;
        }
        server
    })
}

#[test]
fn test_fetch_writes_csv_and_caches() {
    let server = mock_server(&[(CENSUS_2024_PATH, census_file("2023-24"))]);
    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), &server.uri());
    let output = home.path().join("enrollment.csv");

    caschool(home.path())
        .args(["fetch", "enrollment", "2024", "-q", "--config"])
        .arg(&config)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();
    caschool(home.path())
        .args(["cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enrollment  2024 tidy"));

    let csv = std::fs::read_to_string(&output).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("end_year,cds_code,"));
    assert!(header.ends_with("subgroup,grade_level,n_students,pct"));
    assert!(csv.contains("01611190130229"));
}

#[test]
fn test_fetch_partial_failure_exits_with_two() {
    let server = mock_server(&[(acgr_path(2023).as_str(), acgr_file("2022-23"))]);
    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), &server.uri());

    caschool(home.path())
        .args(["fetch", "graduation", "2022-2023", "--wide", "-f", "json", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"end_year\": 2023"))
        .stderr(predicate::str::contains("failed graduation 2022"));
}
