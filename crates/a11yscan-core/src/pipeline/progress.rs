//! Progress reporting for scan runs.

use crate::ScanError;

/// Callback trait for reporting scan progress.
///
/// Implement this trait to receive progress updates while pages are
/// scanned. All methods are called from the thread running the pipeline.
///
/// # Examples
///
/// ```
/// use a11yscan_core::ScanError;
/// use a11yscan_core::pipeline::ScanProgress;
///
/// struct Tally {
///     done: usize,
/// }
///
/// impl ScanProgress for Tally {
///     fn on_run_start(&mut self, _total_pages: usize) {}
///     fn on_page_start(&mut self, _label: &str, _current: usize, _total: usize) {}
///     fn on_page_complete(&mut self, _label: &str, _violations: usize) {
///         self.done += 1;
///     }
///     fn on_page_failed(&mut self, _label: &str, _error: &ScanError) {}
///     fn on_run_complete(&mut self) {}
/// }
/// ```
pub trait ScanProgress {
    /// Called once before the first page with the number of pages to scan.
    fn on_run_start(&mut self, total_pages: usize);

    /// Called when a page scan starts.
    ///
    /// # Arguments
    ///
    /// * `label` - Relative path (or URL) of the page
    /// * `current` - Page number (1-indexed)
    /// * `total` - Number of pages in the run
    fn on_page_start(&mut self, label: &str, current: usize, total: usize);

    /// Called when a page was scanned and its artifact written.
    fn on_page_complete(&mut self, label: &str, violations: usize);

    /// Called when a page was skipped after a recoverable error.
    fn on_page_failed(&mut self, label: &str, error: &ScanError);

    /// Called after the last page, before aggregation.
    fn on_run_complete(&mut self);
}

/// No-op implementation of `ScanProgress`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ScanProgress for NoopProgress {
    fn on_run_start(&mut self, _total_pages: usize) {}

    fn on_page_start(&mut self, _label: &str, _current: usize, _total: usize) {}

    fn on_page_complete(&mut self, _label: &str, _violations: usize) {}

    fn on_page_failed(&mut self, _label: &str, _error: &ScanError) {}

    fn on_run_complete(&mut self) {}
}
