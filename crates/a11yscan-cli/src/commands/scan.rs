//! Scan command implementation.

use super::audit_config;
use super::build_auditor;
use super::check_environment;
use super::progress_sink;
use crate::cli::ScanArgs;
use crate::error::add_scan_context;
use crate::output::OutputFormatter;
use crate::output::ScanResult;
use a11yscan_core::ReportModel;
use a11yscan_core::Settings;
use a11yscan_core::discovery::HtmlDiscoverer;
use a11yscan_core::extraction::ZipExtractor;
use a11yscan_core::pipeline::Pipeline;
use a11yscan_core::pipeline::ReportBuilder;
use a11yscan_core::report::HtmlReport;
use a11yscan_core::report::ReportPaths;
use a11yscan_core::report::build_model;
use a11yscan_core::server::ContentServer;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::error;
use tracing::info;

/// Name the supplied archive gets inside the input directory.
const SITE_ARCHIVE: &str = "site.zip";

pub fn execute(
    args: &ScanArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    check_environment(&args.browser)?;

    let mut settings = Settings::new(&args.base_dir).with_audit(audit_config(&args.browser));
    settings.clean_results = !args.keep_results;

    if let Some(zip) = &args.zip {
        stage_archive(zip, settings.unzip_dir())?;
    }

    let extractor = ZipExtractor::new(settings.security.clone());
    let mut server = ContentServer::new(settings.server.clone());
    let mut auditor = build_auditor(&settings.audit)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| settings.reports_dir().join("latest.html"));
    let report = BestEffortReport::new(HtmlReport::new(output).with_title(&args.title), &args.title);
    let mut progress = progress_sink(show_progress);

    let outcome = add_scan_context(
        Pipeline::new(
            &settings,
            &extractor,
            &HtmlDiscoverer,
            &mut server,
            &mut auditor,
            &report,
        )
        .run(progress.as_mut()),
    )?;
    drop(progress);

    let paths = report.into_paths();
    formatter.format_scan_result(&ScanResult {
        outcome: &outcome,
        paths: paths.as_ref(),
    })
}

/// Copies `zip` into `unzip_dir` as `site.zip`.
fn stage_archive(zip: &Path, unzip_dir: &Path) -> Result<PathBuf> {
    if !zip.is_file() {
        bail!(
            "ZIP not found: {}\n\
             HINT: Check the --zip path.",
            zip.display()
        );
    }
    fs::create_dir_all(unzip_dir)
        .with_context(|| format!("failed to create {}", unzip_dir.display()))?;

    let dest = unzip_dir.join(SITE_ARCHIVE);
    fs::copy(zip, &dest)
        .with_context(|| format!("failed to copy {} to {}", zip.display(), dest.display()))?;
    info!(from = %zip.display(), to = %dest.display(), "staged site archive");
    Ok(dest)
}

/// Writes the report but never fails the run over it.
///
/// If rendering or writing fails the error is logged and the model is
/// rebuilt without output, so the scan results still reach the caller.
struct BestEffortReport {
    report: HtmlReport,
    title: String,
    paths: RefCell<Option<ReportPaths>>,
}

impl BestEffortReport {
    fn new(report: HtmlReport, title: &str) -> Self {
        Self {
            report,
            title: title.to_string(),
            paths: RefCell::new(None),
        }
    }

    fn into_paths(self) -> Option<ReportPaths> {
        self.paths.into_inner()
    }
}

impl ReportBuilder for BestEffortReport {
    fn build(&self, results_dir: &Path) -> a11yscan_core::Result<ReportModel> {
        match self.report.generate(results_dir) {
            Ok((model, paths)) => {
                self.paths.replace(Some(paths));
                Ok(model)
            }
            Err(e) => {
                error!(
                    path = %self.report.output_html().display(),
                    error = %e,
                    "failed to write report"
                );
                Ok(build_model(results_dir, &self.title))
            }
        }
    }
}
