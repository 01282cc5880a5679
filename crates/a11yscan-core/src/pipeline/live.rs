//! Scanning pages of an already-running site.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::error;
use tracing::info;
use tracing::warn;

use super::PageFailure;
use super::ScannerGuard;
use super::capabilities::PageScanner;
use super::progress::ScanProgress;
use crate::Result;
use crate::audit::live_artifact_name;

/// Result of a live scan.
#[derive(Debug, Default)]
pub struct LiveOutcome {
    /// Artifacts written, in scan order.
    pub artifacts: Vec<PathBuf>,

    /// Pages skipped after recoverable errors.
    pub failures: Vec<PageFailure>,

    /// Violations found across all scanned pages.
    pub total_violations: usize,
}

/// Joins a base URL and a page path (`"/"`, `"/about"`, `"contact"`).
///
/// # Examples
///
/// ```
/// use a11yscan_core::pipeline::live::page_url;
///
/// assert_eq!(page_url("https://example.com/", "/about"), "https://example.com/about");
/// assert_eq!(page_url("https://example.com", "/"), "https://example.com/");
/// assert_eq!(page_url("https://example.com", "contact"), "https://example.com/contact");
/// ```
#[must_use]
pub fn page_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Scans `paths` under `base_url` with one shared browser session.
///
/// Artifacts land in `results_dir`, named by [`live_artifact_name`]. A page
/// that fails recoverably is recorded and skipped.
///
/// # Errors
///
/// Returns an error if `results_dir` cannot be created, the browser cannot
/// be launched, or a page fails with a non-recoverable error.
pub fn scan_urls(
    scanner: &mut dyn PageScanner,
    base_url: &str,
    paths: &[String],
    results_dir: &Path,
    progress: &mut dyn ScanProgress,
) -> Result<LiveOutcome> {
    fs::create_dir_all(results_dir)?;
    let mut outcome = LiveOutcome::default();

    if paths.is_empty() {
        warn!(%base_url, "no live pages requested");
        return Ok(outcome);
    }
    info!(%base_url, pages = paths.len(), "starting live scan");

    let mut guard = ScannerGuard { scanner };
    guard.scanner.open()?;

    progress.on_run_start(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let url = page_url(base_url, path);
        let artifact = results_dir.join(live_artifact_name(&url));
        progress.on_page_start(&url, index + 1, paths.len());

        match guard.scanner.scan(&url, &artifact, None) {
            Ok(violations) => {
                outcome.total_violations += violations.len();
                progress.on_page_complete(&url, violations.len());
                outcome.artifacts.push(artifact);
            }
            Err(e) if e.is_page_recoverable() => {
                error!(%url, error = %e, "failed to scan live page, skipping");
                progress.on_page_failed(&url, &e);
                outcome.failures.push(PageFailure {
                    label: url.clone(),
                    url,
                    error: e,
                });
            }
            Err(e) => return Err(e),
        }
    }
    progress.on_run_complete();

    info!(
        scanned = outcome.artifacts.len(),
        failed = outcome.failures.len(),
        violations = outcome.total_violations,
        "live scan finished"
    );
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::audit::AxeEngine;
    use crate::audit::PageAuditor;
    use crate::pipeline::NoopProgress;
    use crate::test_utils::FakeBrowser;
    use crate::test_utils::sample_results;
    use tempfile::TempDir;

    #[test]
    fn test_scan_urls_reuses_one_session() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.set_results(
            "https://example.test/about",
            sample_results(&[("region", "moderate"), ("label", "minor")]),
        );
        let mut auditor = PageAuditor::new(browser.clone(), AxeEngine::from_source(""));

        let paths = vec!["/".to_string(), "/about".to_string()];
        let outcome = scan_urls(
            &mut auditor,
            "https://example.test",
            &paths,
            temp.path(),
            &mut NoopProgress,
        )
        .unwrap();

        assert_eq!(outcome.artifacts.len(), 2);
        assert_eq!(outcome.total_violations, 2);
        assert!(outcome.artifacts.iter().all(|a| a.is_file()));
        assert_eq!(browser.launches(), 1);
        assert_eq!(browser.closes(), 1);
        assert_eq!(
            browser.navigations(),
            vec!["https://example.test/", "https://example.test/about"]
        );
    }

    #[test]
    fn test_scan_urls_skips_failed_page() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.fail_navigation("https://example.test/down");
        let mut auditor = PageAuditor::new(browser.clone(), AxeEngine::from_source(""));

        let paths = vec!["/down".to_string(), "/up".to_string()];
        let outcome = scan_urls(
            &mut auditor,
            "https://example.test",
            &paths,
            temp.path(),
            &mut NoopProgress,
        )
        .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].url, "https://example.test/down");
        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(browser.closes(), 1);
    }

    #[test]
    fn test_scan_urls_empty_list() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        let mut auditor = PageAuditor::new(browser.clone(), AxeEngine::from_source(""));

        let outcome = scan_urls(&mut auditor, "https://example.test", &[], temp.path(), &mut NoopProgress)
            .unwrap();
        assert!(outcome.artifacts.is_empty());
        assert_eq!(browser.launches(), 0);
    }
}
