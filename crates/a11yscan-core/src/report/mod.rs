//! Result aggregation and report output.
//!
//! [`build_model`] folds the per-page artifacts of a results directory into a
//! [`ReportModel`]; [`write_report`] renders it to HTML and writes a JSON
//! summary next to it.

pub mod aggregate;
pub mod model;
pub mod render;

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

pub use aggregate::build_model;
pub use aggregate::validate_artifact;
pub use model::ImpactCounts;
pub use model::Occurrence;
pub use model::PageSummary;
pub use model::ReportModel;
pub use model::RuleGroup;
pub use render::escape_html;
pub use render::render_html;

use crate::Result;
use crate::ScanError;

/// Default report title.
pub const DEFAULT_TITLE: &str = "Accessibility Report";

/// Options for [`write_report`].
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Replace an existing report. When `false`, an existing report is an
    /// error.
    pub overwrite: bool,

    /// Write the JSON summary.
    pub save_json: bool,

    /// JSON summary path; defaults to the HTML path with a `.json` extension.
    pub output_json: Option<PathBuf>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            save_json: true,
            output_json: None,
        }
    }
}

/// Files produced by [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Rendered HTML report.
    pub html: PathBuf,

    /// JSON summary, if written.
    pub json: Option<PathBuf>,
}

/// Renders `model` to `output_html` and, if enabled, writes the JSON summary.
///
/// The summary is the serialized model plus `results_dir`, `report_path`
/// and `summary_json_path`.
///
/// # Errors
///
/// - `ScanError::ReportExists` if the report exists and `overwrite` is off
/// - `ScanError::Io` if an output file cannot be written
/// - `ScanError::Artifact` if the summary cannot be serialized
pub fn write_report(
    model: &ReportModel,
    results_dir: &Path,
    output_html: &Path,
    options: &ReportOptions,
) -> Result<ReportPaths> {
    if !options.overwrite && output_html.exists() {
        return Err(ScanError::ReportExists {
            path: output_html.to_path_buf(),
        });
    }

    let output_html = std::path::absolute(output_html)?;
    let results_dir = std::path::absolute(results_dir)?;
    let report_dir = output_html.parent().unwrap_or_else(|| Path::new("/"));
    fs::create_dir_all(report_dir)?;

    let results_web_base = relative_web_path(&results_dir, report_dir);
    fs::write(&output_html, render_html(model, &results_web_base))?;
    info!(path = %output_html.display(), "HTML report written");

    let json = if options.save_json {
        let json_path = match &options.output_json {
            Some(path) => std::path::absolute(path)?,
            None => output_html.with_extension("json"),
        };
        write_summary(model, &results_dir, &output_html, &json_path)?;
        info!(path = %json_path.display(), "JSON summary written");
        Some(json_path)
    } else {
        None
    };

    Ok(ReportPaths {
        html: output_html,
        json,
    })
}

fn write_summary(
    model: &ReportModel,
    results_dir: &Path,
    output_html: &Path,
    json_path: &Path,
) -> Result<()> {
    let artifact_error = |source| ScanError::Artifact {
        path: json_path.to_path_buf(),
        source,
    };

    let mut payload = serde_json::to_value(model).map_err(artifact_error)?;
    if let Value::Object(map) = &mut payload {
        map.insert(
            "results_dir".to_string(),
            Value::String(results_dir.display().to_string()),
        );
        map.insert(
            "report_path".to_string(),
            Value::String(output_html.display().to_string()),
        );
        map.insert(
            "summary_json_path".to_string(),
            Value::String(json_path.display().to_string()),
        );
    }

    if let Some(parent) = json_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(&payload).map_err(artifact_error)?;
    fs::write(json_path, bytes)?;
    Ok(())
}

/// `/`-separated relative path from directory `from` to `to`.
///
/// Both paths must be absolute. Falls back to `to` itself when they share no
/// root (different drives).
///
/// # Examples
///
/// ```
/// use a11yscan_core::report::relative_web_path;
/// use std::path::Path;
///
/// assert_eq!(
///     relative_web_path(Path::new("/srv/data/results"), Path::new("/srv/data/reports")),
///     "../results"
/// );
/// assert_eq!(relative_web_path(Path::new("/srv/out"), Path::new("/srv/out")), ".");
/// ```
#[must_use]
pub fn relative_web_path(to: &Path, from: &Path) -> String {
    let to: Vec<Component<'_>> = to.components().filter(|c| *c != Component::CurDir).collect();
    let from: Vec<Component<'_>> = from.components().filter(|c| *c != Component::CurDir).collect();

    if to.first() != from.first() {
        return to
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
    }

    let common = to.iter().zip(&from).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Builds a model from a results directory and writes it as HTML + JSON.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::report::HtmlReport;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = HtmlReport::new("data/reports/latest.html");
/// let (model, paths) = report.generate(Path::new("data/results"))?;
/// println!("{} violations, see {}", model.total_violations, paths.html.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HtmlReport {
    output_html: PathBuf,
    title: String,
    options: ReportOptions,
}

impl HtmlReport {
    /// Report at `output_html` with the default title and options.
    pub fn new(output_html: impl Into<PathBuf>) -> Self {
        Self {
            output_html: output_html.into(),
            title: DEFAULT_TITLE.to_string(),
            options: ReportOptions::default(),
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the write options.
    #[must_use]
    pub fn with_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    /// HTML output path.
    #[must_use]
    pub fn output_html(&self) -> &Path {
        &self.output_html
    }

    /// Aggregates `results_dir` and writes the report.
    ///
    /// # Errors
    ///
    /// Same as [`write_report`].
    pub fn generate(&self, results_dir: &Path) -> Result<(ReportModel, ReportPaths)> {
        let model = build_model(results_dir, &self.title);
        let paths = write_report(&model, results_dir, &self.output_html, &self.options)?;
        Ok((model, paths))
    }
}
