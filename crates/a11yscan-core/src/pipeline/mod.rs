//! Scan orchestration.
//!
//! [`Pipeline`] runs extract → discover → host → scan each page → stop host
//! → aggregate, with every step supplied as a capability at construction.

pub mod capabilities;
pub mod environment;
pub mod live;
pub mod progress;

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use tracing::error;
use tracing::info;
use tracing::warn;

pub use capabilities::ContentHost;
pub use capabilities::PageDiscoverer;
pub use capabilities::PageScanner;
pub use capabilities::ReportBuilder;
pub use capabilities::SiteExtractor;
pub use environment::EnvironmentGuard;
pub use environment::IN_CONTAINER_ENV;
pub use live::LiveOutcome;
pub use live::scan_urls;
pub use progress::NoopProgress;
pub use progress::ScanProgress;

use crate::Result;
use crate::ScanError;
use crate::Settings;
use crate::audit::artifact_name;
use crate::discovery::DiscoveredPage;
use crate::extraction::ExtractionStats;
use crate::report::ReportModel;

/// A page that could not be scanned.
#[derive(Debug)]
pub struct PageFailure {
    /// Page label (relative path or URL).
    pub label: String,

    /// URL the scanner was pointed at.
    pub url: String,

    /// Why the page was skipped.
    pub error: ScanError,
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Extraction statistics.
    pub stats: ExtractionStats,

    /// Pages found after extraction, in scan order.
    pub pages: Vec<DiscoveredPage>,

    /// Artifacts written, in scan order.
    pub artifacts: Vec<PathBuf>,

    /// Pages skipped after recoverable errors.
    pub failures: Vec<PageFailure>,

    /// Aggregated report.
    pub report: ReportModel,

    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl RunOutcome {
    /// Pages that produced an artifact.
    #[must_use]
    pub fn pages_scanned(&self) -> usize {
        self.artifacts.len()
    }

    /// `true` if at least one page was skipped.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Stops the host when dropped.
struct HostGuard<'a> {
    host: &'a mut dyn ContentHost,
}

impl Drop for HostGuard<'_> {
    fn drop(&mut self) {
        info!("shutting down content server");
        self.host.stop();
    }
}

/// Closes the scanner when dropped.
pub(crate) struct ScannerGuard<'a> {
    pub(crate) scanner: &'a mut dyn PageScanner,
}

impl Drop for ScannerGuard<'_> {
    fn drop(&mut self) {
        self.scanner.close();
    }
}

/// The scan pipeline for one run.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::Settings;
/// use a11yscan_core::audit::AxeEngine;
/// use a11yscan_core::audit::PageAuditor;
/// use a11yscan_core::audit::WebDriverBrowser;
/// use a11yscan_core::discovery::HtmlDiscoverer;
/// use a11yscan_core::extraction::ZipExtractor;
/// use a11yscan_core::pipeline::NoopProgress;
/// use a11yscan_core::pipeline::Pipeline;
/// use a11yscan_core::report::HtmlReport;
/// use a11yscan_core::server::ContentServer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = Settings::from_env();
/// let extractor = ZipExtractor::new(settings.security.clone());
/// let mut server = ContentServer::new(settings.server.clone());
/// let browser = WebDriverBrowser::new(settings.audit.clone())?;
/// let engine = AxeEngine::from_file(&settings.audit.axe_script)?;
/// let mut auditor = PageAuditor::new(browser, engine);
/// let report = HtmlReport::new(settings.reports_dir().join("latest.html"));
///
/// let outcome = Pipeline::new(
///     &settings,
///     &extractor,
///     &HtmlDiscoverer,
///     &mut server,
///     &mut auditor,
///     &report,
/// )
/// .run(&mut NoopProgress)?;
/// println!("{} violations", outcome.report.total_violations);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<'a> {
    settings: &'a Settings,
    extractor: &'a dyn SiteExtractor,
    discoverer: &'a dyn PageDiscoverer,
    host: &'a mut dyn ContentHost,
    scanner: &'a mut dyn PageScanner,
    reporter: &'a dyn ReportBuilder,
}

impl<'a> Pipeline<'a> {
    /// Assembles a pipeline from its capabilities.
    pub fn new(
        settings: &'a Settings,
        extractor: &'a dyn SiteExtractor,
        discoverer: &'a dyn PageDiscoverer,
        host: &'a mut dyn ContentHost,
        scanner: &'a mut dyn PageScanner,
        reporter: &'a dyn ReportBuilder,
    ) -> Self {
        Self {
            settings,
            extractor,
            discoverer,
            host,
            scanner,
            reporter,
        }
    }

    /// Runs the pipeline once.
    ///
    /// Zero pages is a successful run: the server is never started and the
    /// report is empty. A page that fails recoverably is recorded in
    /// [`RunOutcome::failures`] and the run continues. The content server is
    /// stopped on every exit path once started.
    ///
    /// # Errors
    ///
    /// - Extraction errors (missing/corrupt archive, limits exceeded)
    /// - `ScanError::Server` if the content server cannot start
    /// - `ScanError::Browser` if the browser cannot be launched
    /// - `ScanError::Io` if the results directory cannot be created
    /// - Report output errors
    pub fn run(&mut self, progress: &mut dyn ScanProgress) -> Result<RunOutcome> {
        let started = Instant::now();
        let settings = self.settings;
        let scan_dir = settings.scan_dir();
        let results_dir = settings.results_dir();
        info!(base = %settings.base_path().display(), "starting scan pipeline");

        if settings.clean_results {
            reset_dir(scan_dir);
            reset_dir(results_dir);
        }
        fs::create_dir_all(results_dir)?;

        let stats = self.extractor.extract_site(settings.unzip_dir(), scan_dir)?;
        info!(
            files = stats.files_extracted,
            skipped = stats.entries_skipped,
            bytes = stats.bytes_written,
            "site extracted"
        );

        let pages = self.discoverer.discover(scan_dir);
        let mut artifacts = Vec::with_capacity(pages.len());
        let mut failures = Vec::new();

        if pages.is_empty() {
            warn!(dir = %scan_dir.display(), "no HTML pages found, nothing to scan");
        } else {
            let mut host = HostGuard {
                host: &mut *self.host,
            };
            let base_url = host.host.start(scan_dir)?;

            let mut scanner = ScannerGuard {
                scanner: &mut *self.scanner,
            };
            scanner.scanner.open()?;

            progress.on_run_start(pages.len());
            for (index, page) in pages.iter().enumerate() {
                let label = page.label();
                let url = format!("{base_url}/{}", page.url_path());
                let artifact = results_dir.join(artifact_name(&page.relative));
                progress.on_page_start(&label, index + 1, pages.len());

                match scanner.scanner.scan(&url, &artifact, Some(&label)) {
                    Ok(violations) => {
                        progress.on_page_complete(&label, violations.len());
                        artifacts.push(artifact);
                    }
                    Err(e) if e.is_page_recoverable() => {
                        error!(page = %label, %url, error = %e, "failed to scan page, skipping");
                        progress.on_page_failed(&label, &e);
                        failures.push(PageFailure {
                            label,
                            url,
                            error: e,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            progress.on_run_complete();

            drop(scanner);
            drop(host);
        }

        let report = self.reporter.build(results_dir)?;
        let duration = started.elapsed();
        info!(
            pages = pages.len(),
            scanned = artifacts.len(),
            failed = failures.len(),
            violations = report.total_violations,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "scan pipeline finished"
        );

        Ok(RunOutcome {
            stats,
            pages,
            artifacts,
            failures,
            report,
            duration,
        })
    }
}

/// Empties `dir`, creating it if needed. Failures are logged, not returned.
fn reset_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "cannot create working directory");
        return;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list working directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let removed = match entry.file_type() {
            Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
            _ => fs::remove_file(&path),
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "cannot remove stale file");
        }
    }
}
