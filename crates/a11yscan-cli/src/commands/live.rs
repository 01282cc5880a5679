//! Live command implementation

use super::audit_config;
use super::build_auditor;
use super::check_environment;
use super::progress_sink;
use crate::cli::LiveArgs;
use crate::cli::normalize_pages;
use crate::error::add_scan_context;
use crate::output::LiveResult;
use crate::output::OutputFormatter;
use a11yscan_core::Settings;
use a11yscan_core::pipeline::scan_urls;
use a11yscan_core::report::HtmlReport;
use anyhow::Result;
use anyhow::bail;

/// Directory under `data/` that receives live scan results.
pub const LIVE_RESULTS_DIR: &str = "live_results";

pub fn execute(
    args: &LiveArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    check_environment(&args.browser)?;

    let base_url = args.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        bail!(
            "Invalid base URL: {base_url:?}\n\
             HINT: Use an absolute http:// or https:// URL, e.g. https://example.com"
        );
    }
    let pages = normalize_pages(&args.pages);
    if pages.is_empty() {
        bail!("No pages to scan\nHINT: Pass --pages, e.g. --pages /,/about");
    }

    let settings = Settings::new(&args.base_dir).with_audit(audit_config(&args.browser));
    let live_results = settings.data_dir().join(LIVE_RESULTS_DIR);
    let settings = settings.with_results_dir(live_results);
    let mut auditor = build_auditor(&settings.audit)?;

    let mut progress = progress_sink(show_progress);
    let outcome = add_scan_context(scan_urls(
        &mut auditor,
        base_url,
        &pages,
        settings.results_dir(),
        progress.as_mut(),
    ))?;
    drop(progress);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| settings.reports_dir().join("latest.html"));
    let (model, paths) = add_scan_context(
        HtmlReport::new(output)
            .with_title(&args.title)
            .generate(settings.results_dir()),
    )?;

    formatter.format_live_result(&LiveResult {
        base_url,
        outcome: &outcome,
        results_dir: settings.results_dir(),
        model: &model,
        paths: &paths,
    })
}
