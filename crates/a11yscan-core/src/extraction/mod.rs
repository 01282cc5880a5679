//! Archive Extractor: locates the uploaded site archive and unpacks it
//! safely into the scan directory.

pub mod archive;
pub mod locate;

use std::time::Duration;

pub use archive::ZipExtractor;
pub use locate::locate_archive;

/// Statistics for one archive extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStats {
    /// Number of regular files written.
    pub files_extracted: usize,

    /// Number of directory entries created.
    pub directories_created: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Number of entries rejected by path validation or skipped as links.
    pub entries_skipped: usize,

    /// Names of the skipped entries, as they appear in the archive.
    pub skipped: Vec<String>,

    /// Wall-clock duration of the extraction.
    pub duration: Duration,
}

impl ExtractionStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entry that was not extracted.
    pub fn record_skip(&mut self, name: impl Into<String>) {
        self.entries_skipped += 1;
        self.skipped.push(name.into());
    }

    /// Returns total number of items written.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created
    }

    /// Returns whether any entry was skipped.
    #[must_use]
    pub fn has_skipped(&self) -> bool {
        self.entries_skipped > 0
    }
}
