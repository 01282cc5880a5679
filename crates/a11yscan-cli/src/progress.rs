//! Progress bar implementation for scan runs.

use a11yscan_core::ScanError;
use a11yscan_core::pipeline::ScanProgress;
use console::Term;
use console::style;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;

/// CLI progress bar wrapper implementing `ScanProgress`.
///
/// Displays a bar with the page count, the page being scanned, violations
/// found so far and ETA when running in a TTY. Automatically cleans up on
/// drop.
pub struct CliProgress {
    bar: ProgressBar,
    violations: usize,
    failed: usize,
}

impl CliProgress {
    /// Creates a hidden progress bar; its length is set by `on_run_start`.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        // Template: "Scanning [████████░░░░] 4/10 pages (7 violations, 12s) blog/index.html"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Scanning [{bar:40.cyan/blue}] {pos}/{len} pages ({prefix}, {eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );

        let progress = Self {
            bar,
            violations: 0,
            failed: 0,
        };
        progress.update_prefix();
        progress
    }

    fn update_prefix(&self) {
        let mut prefix = format!("{} violations", self.violations);
        if self.failed > 0 {
            let _ = write!(prefix, ", {} skipped", self.failed);
        }
        self.bar.set_prefix(prefix);
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ScanProgress for CliProgress {
    fn on_run_start(&mut self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_position(0);
    }

    fn on_page_start(&mut self, label: &str, _current: usize, _total: usize) {
        self.bar.set_message(label.to_string());
    }

    fn on_page_complete(&mut self, _label: &str, violations: usize) {
        self.violations += violations;
        self.update_prefix();
        self.bar.inc(1);
    }

    fn on_page_failed(&mut self, label: &str, error: &ScanError) {
        self.failed += 1;
        self.bar
            .println(format!("{} {label}: {error}", style("skipped").yellow()));
        self.update_prefix();
        self.bar.inc(1);
    }

    fn on_run_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
