//! JSON output formatter for machine-readable results.

use super::formatter::FailureOutput;
use super::formatter::JsonOutput;
use super::formatter::LiveResult;
use super::formatter::OutputFormatter;
use super::formatter::ReportResult;
use super::formatter::ScanResult;
use a11yscan_core::ReportModel;
use a11yscan_core::report::ImpactCounts;
use a11yscan_core::report::ReportPaths;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ReportOutput {
    pages_scanned: usize,
    total_violations: usize,
    violations_by_impact: ImpactCounts,
    rules: Vec<String>,
    report_path: Option<String>,
    summary_json_path: Option<String>,
}

impl ReportOutput {
    fn new(model: &ReportModel, paths: Option<&ReportPaths>) -> Self {
        Self {
            pages_scanned: model.pages_scanned,
            total_violations: model.total_violations,
            violations_by_impact: model.violations_by_impact,
            rules: model.rule_groups.iter().map(|g| g.id.clone()).collect(),
            report_path: paths.map(|p| display(&p.html)),
            summary_json_path: paths.and_then(|p| p.json.as_deref()).map(display),
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl OutputFormatter for JsonFormatter {
    fn format_scan_result(&self, result: &ScanResult<'_>) -> Result<()> {
        #[derive(Serialize)]
        struct ScanOutput {
            #[serde(flatten)]
            report: ReportOutput,
            pages_found: usize,
            pages_failed: usize,
            failures: Vec<FailureOutput>,
            files_extracted: usize,
            entries_skipped: usize,
            bytes_written: u64,
            duration_ms: u128,
        }

        let outcome = result.outcome;
        let data = ScanOutput {
            report: ReportOutput::new(&outcome.report, result.paths),
            pages_found: outcome.pages.len(),
            pages_failed: outcome.failures.len(),
            failures: outcome.failures.iter().map(FailureOutput::from).collect(),
            files_extracted: outcome.stats.files_extracted,
            entries_skipped: outcome.stats.entries_skipped,
            bytes_written: outcome.stats.bytes_written,
            duration_ms: outcome.duration.as_millis(),
        };

        Self::output(&JsonOutput::success("scan", data))
    }

    fn format_live_result(&self, result: &LiveResult<'_>) -> Result<()> {
        #[derive(Serialize)]
        struct LiveOutput {
            #[serde(flatten)]
            report: ReportOutput,
            base_url: String,
            results_dir: String,
            pages_failed: usize,
            failures: Vec<FailureOutput>,
        }

        let data = LiveOutput {
            report: ReportOutput::new(result.model, Some(result.paths)),
            base_url: result.base_url.to_string(),
            results_dir: display(result.results_dir),
            pages_failed: result.outcome.failures.len(),
            failures: result
                .outcome
                .failures
                .iter()
                .map(FailureOutput::from)
                .collect(),
        };

        Self::output(&JsonOutput::success("live", data))
    }

    fn format_report_result(&self, result: &ReportResult<'_>) -> Result<()> {
        #[derive(Serialize)]
        struct ReportCommandOutput {
            #[serde(flatten)]
            report: ReportOutput,
            results_dir: String,
        }

        let data = ReportCommandOutput {
            report: ReportOutput::new(result.model, Some(result.paths)),
            results_dir: display(result.results_dir),
        };

        Self::output(&JsonOutput::success("report", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::error("unknown", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
