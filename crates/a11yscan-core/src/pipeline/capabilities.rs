//! Capabilities the pipeline is assembled from, and their production
//! implementations.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::Result;
use crate::audit::BrowserDriver;
use crate::audit::PageAuditor;
use crate::audit::RuleEngine;
use crate::audit::RuleResult;
use crate::discovery::DiscoveredPage;
use crate::discovery::HtmlDiscoverer;
use crate::discovery::discover_pages;
use crate::extraction::ExtractionStats;
use crate::extraction::ZipExtractor;
use crate::extraction::locate_archive;
use crate::report::HtmlReport;
use crate::report::ReportModel;
use crate::server::ContentServer;

/// Unpacks the input archive into the scan directory.
pub trait SiteExtractor {
    /// Finds the archive in `input_dir` and extracts it into `destination`.
    ///
    /// # Errors
    ///
    /// Fatal extraction errors: missing or corrupt archive, unwritable
    /// destination, size or ratio limits exceeded.
    fn extract_site(&self, input_dir: &Path, destination: &Path) -> Result<ExtractionStats>;
}

/// Finds the pages to scan.
pub trait PageDiscoverer {
    /// Pages under `root`, sorted by relative path. Never fails.
    fn discover(&self, root: &Path) -> Vec<DiscoveredPage>;
}

/// Serves a directory over HTTP for the duration of a run.
pub trait ContentHost {
    /// Starts serving `root` and returns the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Server` if the server cannot bind.
    fn start(&mut self, root: &Path) -> Result<String>;

    /// Stops serving. Safe to call when not started.
    fn stop(&mut self);
}

/// Audits one URL at a time, writing one artifact per page.
pub trait PageScanner {
    /// Acquires resources shared by subsequent scans.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the browser cannot be launched.
    fn open(&mut self) -> Result<()>;

    /// Releases shared resources. Idempotent.
    fn close(&mut self);

    /// Scans `url` and writes its artifact to `artifact_path`.
    ///
    /// # Errors
    ///
    /// Per-page failures (see `ScanError::is_page_recoverable`).
    fn scan(
        &mut self,
        url: &str,
        artifact_path: &Path,
        source_file: Option<&str>,
    ) -> Result<Vec<RuleResult>>;
}

/// Aggregates the results directory once scanning is over.
pub trait ReportBuilder {
    /// Builds (and usually writes) the report for `results_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the report output cannot be written.
    fn build(&self, results_dir: &Path) -> Result<ReportModel>;
}

impl SiteExtractor for ZipExtractor {
    fn extract_site(&self, input_dir: &Path, destination: &Path) -> Result<ExtractionStats> {
        let archive = locate_archive(input_dir)?;
        let stats = self.extract(&archive, destination)?;

        let empty = fs::read_dir(destination).map_or(true, |mut entries| entries.next().is_none());
        if empty {
            warn!(
                archive = %archive.display(),
                destination = %destination.display(),
                "extraction produced no files"
            );
        }
        Ok(stats)
    }
}

impl PageDiscoverer for HtmlDiscoverer {
    fn discover(&self, root: &Path) -> Vec<DiscoveredPage> {
        discover_pages(root)
    }
}

impl ContentHost for ContentServer {
    fn start(&mut self, root: &Path) -> Result<String> {
        Self::start(self, root)
    }

    fn stop(&mut self) {
        Self::stop(self);
    }
}

impl<D: BrowserDriver, E: RuleEngine> PageScanner for PageAuditor<D, E> {
    fn open(&mut self) -> Result<()> {
        Self::open(self)
    }

    fn close(&mut self) {
        Self::close(self);
    }

    fn scan(
        &mut self,
        url: &str,
        artifact_path: &Path,
        source_file: Option<&str>,
    ) -> Result<Vec<RuleResult>> {
        Self::scan(self, url, artifact_path, source_file)
    }
}

impl ReportBuilder for HtmlReport {
    fn build(&self, results_dir: &Path) -> Result<ReportModel> {
        let (model, _paths) = self.generate(results_dir)?;
        Ok(model)
    }
}
