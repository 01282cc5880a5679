//! Human-readable output formatter with colors and styling.

use super::formatter::LiveResult;
use super::formatter::OutputFormatter;
use super::formatter::ReportResult;
use super::formatter::ScanResult;
use a11yscan_core::ReportModel;
use a11yscan_core::pipeline::PageFailure;
use a11yscan_core::report::ReportPaths;
use anyhow::Result;
use console::Term;
use console::style;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn headline(&self, text: &str) {
        if self.use_colors {
            self.line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            self.line(text);
        }
    }

    fn write_violations(&self, model: &ReportModel) {
        if model.is_clean() {
            self.line("  No accessibility violations found");
            return;
        }

        let total = format!("  Violations:       {}", model.total_violations);
        if self.use_colors {
            self.line(&style(total).red().bold().to_string());
        } else {
            self.line(&total);
        }
        for (impact, count) in model.violations_by_impact.non_zero() {
            self.line(&format!("    {:<16}{count}", format!("{impact}:")));
        }

        if self.verbose {
            self.line("");
            self.line("  Rules:");
            for group in &model.rule_groups {
                self.line(&format!(
                    "    {} ({}) x{}: {}",
                    group.id, group.impact, group.count, group.help
                ));
            }
        }
    }

    fn write_failures(&self, failures: &[PageFailure]) {
        if failures.is_empty() {
            return;
        }
        self.line("");
        if self.use_colors {
            self.line(&style("Skipped pages:").yellow().bold().to_string());
        } else {
            self.line("Skipped pages:");
        }
        for failure in failures {
            self.line(&format!("  - {}: {}", failure.label, failure.error));
        }
    }

    fn write_paths(&self, paths: &ReportPaths) {
        self.line("");
        self.line(&format!("  HTML report:      {}", paths.html.display()));
        if let Some(json) = &paths.json {
            self.line(&format!("  JSON summary:     {}", json.display()));
        }
    }

    fn write_results_dir(&self, results_dir: &Path) {
        if self.verbose {
            self.line(&format!("  Page results:     {}", results_dir.display()));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_scan_result(&self, result: &ScanResult<'_>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let outcome = result.outcome;

        self.headline("Scan complete");
        self.line(&format!("  Pages scanned:    {}", outcome.pages_scanned()));
        if outcome.has_failures() {
            self.line(&format!("  Pages skipped:    {}", outcome.failures.len()));
        }
        self.write_violations(&outcome.report);

        if self.verbose {
            self.line("");
            self.line(&format!(
                "  Files extracted:  {} ({})",
                outcome.stats.files_extracted,
                Self::format_size(outcome.stats.bytes_written)
            ));
            self.line(&format!(
                "  Entries skipped:  {}",
                outcome.stats.entries_skipped
            ));
            self.line(&format!("  Duration:         {:?}", outcome.duration));
        }

        self.write_failures(&outcome.failures);
        match result.paths {
            Some(paths) => self.write_paths(paths),
            None => self.format_warning("The HTML report could not be written; see the log"),
        }
        Ok(())
    }

    fn format_live_result(&self, result: &LiveResult<'_>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let outcome = result.outcome;

        self.headline(&format!("Live scan of {} complete", result.base_url));
        self.line(&format!("  Pages scanned:    {}", outcome.artifacts.len()));
        if !outcome.failures.is_empty() {
            self.line(&format!("  Pages skipped:    {}", outcome.failures.len()));
        }
        self.write_violations(result.model);
        self.write_results_dir(result.results_dir);
        self.write_failures(&outcome.failures);
        self.write_paths(result.paths);
        Ok(())
    }

    fn format_report_result(&self, result: &ReportResult<'_>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline("Report generated");
        self.line(&format!("  Pages:            {}", result.model.pages_scanned));
        self.write_violations(result.model);
        self.write_results_dir(result.results_dir);
        self.write_paths(result.paths);
        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {message}", style("WARNING:").yellow().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("WARNING: {message}"));
        }
    }
}
