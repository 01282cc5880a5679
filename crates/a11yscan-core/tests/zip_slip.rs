//! Hostile archive integration tests.
//!
//! Real-world zip slip and zip bomb shapes run through the full extractor.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use a11yscan_core::QuotaResource;
use a11yscan_core::ScanError;
use a11yscan_core::SecurityConfig;
use a11yscan_core::discovery::discover_pages;
use a11yscan_core::extraction::ExtractionStats;
use a11yscan_core::extraction::ZipExtractor;
use a11yscan_core::test_utils::ZipTestBuilder;
use a11yscan_core::test_utils::create_deflated_zip;
use a11yscan_core::test_utils::create_test_zip;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use walkdir::WalkDir;

type Extraction = (TempDir, PathBuf, a11yscan_core::Result<ExtractionStats>);

fn extract(archive: &[u8], config: SecurityConfig) -> Extraction {
    let temp = TempDir::new().unwrap();
    let archive_path = temp.path().join("site.zip");
    fs::write(&archive_path, archive).unwrap();
    let dest = temp.path().join("work/scan");
    let result = ZipExtractor::new(config).extract(&archive_path, &dest);
    (temp, dest, result)
}

fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_classic_zip_slip_names_are_skipped() {
    let archive = create_test_zip(&[
        ("index.html", "<html></html>"),
        ("../evil.html", "x"),
        ("../../etc/cron.d/evil", "x"),
        ("assets/../../evil.js", "x"),
        ("/etc/passwd", "x"),
        ("..\\..\\windows.html", "x"),
        ("assets/app.js", "console.log(1)"),
    ]);

    let (temp, dest, result) = extract(&archive, SecurityConfig::default());
    let stats = result.unwrap();

    assert_eq!(stats.files_extracted, 2);
    assert_eq!(stats.entries_skipped, 5);
    assert_eq!(files_under(&dest), vec!["assets/app.js", "index.html"]);
    assert!(!temp.path().join("work/evil.html").exists());
    assert!(!temp.path().join("evil.js").exists());
}

#[test]
fn test_only_safe_pages_are_discovered() {
    let archive = create_test_zip(&[("index.html", "<html></html>"), ("../evil.html", "x")]);

    let (_temp, dest, result) = extract(&archive, SecurityConfig::default());
    result.unwrap();

    let pages = discover_pages(&dest);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].label(), "index.html");
}

#[test]
fn test_banned_components_are_skipped() {
    let archive = create_test_zip(&[
        ("index.html", "<html></html>"),
        (".git/config", "[core]"),
        ("deploy/.aws/credentials", "secret"),
    ]);

    let (_temp, dest, result) = extract(&archive, SecurityConfig::default());
    let stats = result.unwrap();
    assert_eq!(stats.entries_skipped, 2);
    assert_eq!(files_under(&dest), vec!["index.html"]);
}

#[test]
#[cfg(unix)]
fn test_symlink_entry_then_write_through_it() {
    // A link entry followed by a file "inside" the link must not escape.
    let archive = ZipTestBuilder::new()
        .add_symlink("assets", "/tmp")
        .add_file("assets/evil.html", b"x")
        .add_file("index.html", b"<html></html>")
        .build();

    let (_temp, dest, result) = extract(&archive, SecurityConfig::default());
    let stats = result.unwrap();

    assert!(dest.join("assets").symlink_metadata().map_or(true, |m| !m.file_type().is_symlink()));
    assert!(stats.skipped.contains(&"assets".to_string()));
    assert!(files_under(&dest).contains(&"index.html".to_string()));
}

#[test]
fn test_zip_bomb_is_fatal() {
    let zeros = vec![0u8; 4 * 1024 * 1024];
    let archive = create_deflated_zip("bomb.html", &zeros);

    let (_temp, _dest, result) = extract(&archive, SecurityConfig::default());
    assert!(matches!(result, Err(ScanError::ZipBomb { .. })));
}

#[test]
fn test_file_count_quota() {
    let archive = create_test_zip(&[("a.html", "a"), ("b.html", "b"), ("c.html", "c")]);
    let config = SecurityConfig {
        max_file_count: 2,
        ..Default::default()
    };

    let (_temp, _dest, result) = extract(&archive, config);
    let err = result.unwrap_err();
    assert!(matches!(
        err.quota_resource(),
        Some(QuotaResource::FileCount { max: 2, .. })
    ));
}

#[test]
fn test_corrupt_archive_is_fatal() {
    let (_temp, _dest, result) = extract(
        b"PK\x03\x04 definitely not a zip",
        SecurityConfig::default(),
    );
    assert!(matches!(result, Err(ScanError::InvalidArchive(_))));
}
