//! Integration tests for a11yscan-cli.
//!
//! None of these reach a browser: they cover argument handling, the
//! environment guard, runs that find no pages, and report building.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use a11yscan_core::test_utils::create_test_zip;
use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

const IN_CONTAINER_ENV: &str = "A11Y_SCANNER_IN_CONTAINER";

fn a11yscan_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("a11yscan");
    cmd.env_remove(IN_CONTAINER_ENV)
        .env_remove("A11Y_WEBDRIVER_URL")
        .env_remove("A11Y_AXE_SCRIPT")
        .env_remove("A11Y_CHROMEDRIVER")
        .env_remove("RUST_LOG");
    cmd
}

/// Writes a stand-in axe script and returns its path.
fn axe_script(dir: &Path) -> PathBuf {
    let path = dir.join("axe.min.js");
    fs::write(&path, "window.axe = {};").unwrap();
    path
}

fn write_artifact(results: &Path, name: &str, violations: &serde_json::Value) {
    fs::create_dir_all(results).unwrap();
    let artifact = json!({
        "scanned_url": format!("http://127.0.0.1:8000/{name}.html"),
        "source_file": format!("{name}.html"),
        "violations": violations,
        "passes": [],
        "inapplicable": [],
        "incomplete": [],
        "timestamp": "2026-01-01T00:00:00Z"
    });
    fs::write(results.join(format!("{name}.json")), artifact.to_string()).unwrap();
}

#[test]
fn test_version_flag() {
    a11yscan_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("a11yscan"));
}

#[test]
fn test_help_flag() {
    a11yscan_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Accessibility scanner"));
}

#[test]
fn test_scan_help() {
    a11yscan_cmd()
        .arg("scan")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan a zipped static site"))
        .stdout(predicate::str::contains("--skip-env-check"));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    a11yscan_cmd()
        .args(["--quiet", "--verbose", "report"])
        .assert()
        .failure();
}

#[test]
fn test_scan_outside_container_exits_2() {
    let temp = TempDir::new().expect("failed to create temp dir");

    a11yscan_cmd()
        .arg("scan")
        .arg("--base-dir")
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--skip-env-check"))
        .stderr(predicate::str::contains(IN_CONTAINER_ENV));

    assert!(!temp.path().join("data").exists());
}

#[test]
fn test_live_outside_container_exits_2() {
    a11yscan_cmd()
        .args(["live", "--base-url", "https://example.com"])
        .env(IN_CONTAINER_ENV, "0")
        .assert()
        .code(2);
}

#[test]
fn test_live_rejects_non_http_base_url() {
    a11yscan_cmd()
        .args(["live", "--base-url", "ftp://example.com", "--skip-env-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid base URL"));
}

#[test]
fn test_scan_missing_archive() {
    let temp = TempDir::new().expect("failed to create temp dir");

    a11yscan_cmd()
        .env(IN_CONTAINER_ENV, "1")
        .arg("scan")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--axe-script")
        .arg(axe_script(temp.path()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No site archive found"));
}

#[test]
fn test_scan_zip_not_found() {
    let temp = TempDir::new().expect("failed to create temp dir");

    a11yscan_cmd()
        .arg("scan")
        .arg("--skip-env-check")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--zip")
        .arg(temp.path().join("missing.zip"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("ZIP not found"));
}

#[test]
fn test_scan_missing_axe_script() {
    let temp = TempDir::new().expect("failed to create temp dir");

    a11yscan_cmd()
        .arg("scan")
        .arg("--skip-env-check")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--axe-script")
        .arg(temp.path().join("nope.js"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--axe-script"));
}

#[test]
fn test_scan_missing_axe_script_fails_before_extraction() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let upload = temp.path().join("upload.zip");
    fs::write(&upload, create_test_zip(&[("css/site.css", "body {}")])).unwrap();

    a11yscan_cmd()
        .arg("scan")
        .arg("--skip-env-check")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--zip")
        .arg(&upload)
        .arg("--axe-script")
        .arg(temp.path().join("nope.js"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--axe-script"));

    assert!(!temp.path().join("data/scan/css/site.css").exists());
    assert!(!temp.path().join("data/reports/latest.html").exists());
}

/// A site without HTML pages never starts the server or the browser.
#[test]
fn test_scan_site_without_pages() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let upload = temp.path().join("upload.zip");
    fs::write(&upload, create_test_zip(&[("css/site.css", "body {}")])).unwrap();

    a11yscan_cmd()
        .env(IN_CONTAINER_ENV, "1")
        .arg("scan")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--zip")
        .arg(&upload)
        .arg("--axe-script")
        .arg(axe_script(temp.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan complete"))
        .stdout(predicate::str::contains("No accessibility violations found"));

    assert!(temp.path().join("data/unzip/site.zip").is_file());
    assert!(temp.path().join("data/scan/css/site.css").is_file());
    assert!(temp.path().join("data/reports/latest.html").is_file());
    assert!(temp.path().join("data/reports/latest.json").is_file());
}

#[test]
fn test_scan_json_output_format() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let upload = temp.path().join("upload.zip");
    fs::write(
        &upload,
        create_test_zip(&[("readme.txt", "no pages"), ("../escape.html", "x")]),
    )
    .unwrap();

    let output = a11yscan_cmd()
        .arg("--json")
        .arg("scan")
        .arg("--skip-env-check")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--zip")
        .arg(&upload)
        .arg("--axe-script")
        .arg(axe_script(temp.path()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "scan");
    assert_eq!(json["data"]["pages_found"], 0);
    assert_eq!(json["data"]["total_violations"], 0);
    assert_eq!(json["data"]["files_extracted"], 1);
    assert_eq!(json["data"]["entries_skipped"], 1);
    assert!(json["data"]["report_path"].is_string());
    assert!(!temp.path().join("data/escape.html").exists());
}

#[test]
fn test_report_empty_results() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let results = temp.path().join("results");
    fs::create_dir_all(&results).unwrap();
    let output = temp.path().join("out/report.html");

    a11yscan_cmd()
        .arg("report")
        .arg("--results-dir")
        .arg(&results)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Report generated"))
        .stdout(predicate::str::contains("report.html"));

    assert!(output.is_file());
    assert!(temp.path().join("out/report.json").is_file());
}

#[test]
fn test_report_json_counts() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let results = temp.path().join("data/results");
    write_artifact(
        &results,
        "index",
        &json!([
            {"id": "image-alt", "impact": "critical", "nodes": [{"target": ["img"], "html": "<img>"}]},
            {"id": "label", "impact": "serious", "nodes": [{"target": ["input"], "html": "<input>"}]}
        ]),
    );
    write_artifact(&results, "about", &json!([]));

    let output = a11yscan_cmd()
        .arg("--json")
        .arg("report")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--title")
        .arg("Nightly")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["operation"], "report");
    assert_eq!(json["data"]["pages_scanned"], 2);
    assert_eq!(json["data"]["total_violations"], 2);
    assert_eq!(json["data"]["violations_by_impact"]["critical"], 1);
    assert_eq!(json["data"]["violations_by_impact"]["serious"], 1);
    assert_eq!(json["data"]["rules"], json!(["image-alt", "label"]));

    let html = fs::read_to_string(temp.path().join("data/reports/latest.html")).unwrap();
    assert!(html.contains("Nightly"));
    assert!(html.contains("image-alt"));
}

#[test]
fn test_report_no_overwrite() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let output = temp.path().join("latest.html");
    fs::write(&output, "previous").unwrap();

    a11yscan_cmd()
        .arg("report")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--output")
        .arg(&output)
        .arg("--no-overwrite")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Report already exists"));

    assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn test_report_no_json() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let output = temp.path().join("latest.html");

    a11yscan_cmd()
        .arg("report")
        .arg("--base-dir")
        .arg(temp.path())
        .arg("--output")
        .arg(&output)
        .arg("--no-json")
        .assert()
        .success();

    assert!(output.is_file());
    assert!(!temp.path().join("latest.json").exists());
}

#[test]
fn test_report_quiet_mode() {
    let temp = TempDir::new().expect("failed to create temp dir");

    a11yscan_cmd()
        .arg("--quiet")
        .arg("report")
        .arg("--base-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
