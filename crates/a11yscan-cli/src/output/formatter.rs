//! Output formatter trait for CLI results.

use a11yscan_core::ReportModel;
use a11yscan_core::RunOutcome;
use a11yscan_core::pipeline::LiveOutcome;
use a11yscan_core::pipeline::PageFailure;
use a11yscan_core::report::ReportPaths;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Finished `scan` run.
pub struct ScanResult<'a> {
    pub outcome: &'a RunOutcome,
    pub paths: Option<&'a ReportPaths>,
}

/// Finished `live` run.
pub struct LiveResult<'a> {
    pub base_url: &'a str,
    pub outcome: &'a LiveOutcome,
    pub results_dir: &'a Path,
    pub model: &'a ReportModel,
    pub paths: &'a ReportPaths,
}

/// Finished `report` run.
pub struct ReportResult<'a> {
    pub results_dir: &'a Path,
    pub model: &'a ReportModel,
    pub paths: &'a ReportPaths,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the result of a site scan
    fn format_scan_result(&self, result: &ScanResult<'_>) -> Result<()>;

    /// Format the result of a live scan
    fn format_live_result(&self, result: &LiveResult<'_>) -> Result<()>;

    /// Format the result of a report build
    fn format_report_result(&self, result: &ReportResult<'_>) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// JSON view of a skipped page.
#[derive(Debug, Serialize)]
pub struct FailureOutput {
    pub label: String,
    pub url: String,
    pub error: String,
}

impl From<&PageFailure> for FailureOutput {
    fn from(failure: &PageFailure) -> Self {
        Self {
            label: failure.label.clone(),
            url: failure.url.clone(),
            error: failure.error.to_string(),
        }
    }
}
