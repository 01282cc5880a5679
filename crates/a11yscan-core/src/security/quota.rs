//! Running file and byte budgets for one extraction.

use crate::Result;
use crate::ScanError;
use crate::SecurityConfig;
use crate::error::QuotaResource;

/// Totals for the archive being extracted, checked against the
/// [`SecurityConfig`] limits.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    files: usize,
    bytes: u64,
}

impl QuotaTracker {
    /// Creates a tracker with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits an entry by its declared size, before any byte is written.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::QuotaExceeded` naming the first limit the entry
    /// would break: single file size, file count, then total size.
    pub fn check_entry(&self, size: u64, config: &SecurityConfig) -> Result<()> {
        let exceeded = |resource| -> Result<()> { Err(ScanError::QuotaExceeded { resource }) };

        if size > config.max_file_size {
            return exceeded(QuotaResource::FileSize {
                size,
                max: config.max_file_size,
            });
        }

        let files = self.files + 1;
        if files > config.max_file_count {
            return exceeded(QuotaResource::FileCount {
                current: files,
                max: config.max_file_count,
            });
        }

        match self.bytes.checked_add(size) {
            None => exceeded(QuotaResource::IntegerOverflow),
            Some(total) if total > config.max_total_size => exceeded(QuotaResource::TotalSize {
                current: total,
                max: config.max_total_size,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Records a written file by its actual size.
    ///
    /// # Errors
    ///
    /// Same as [`QuotaTracker::check_entry`]; nothing is recorded on error.
    pub fn record_file(&mut self, size: u64, config: &SecurityConfig) -> Result<()> {
        self.check_entry(size, config)?;
        self.files += 1;
        self.bytes += size;
        Ok(())
    }

    /// Files recorded so far.
    #[must_use]
    pub fn files_extracted(&self) -> usize {
        self.files
    }

    /// Bytes recorded so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Bytes still available under the total size limit.
    #[must_use]
    pub fn remaining_bytes(&self, config: &SecurityConfig) -> u64 {
        config.max_total_size.saturating_sub(self.bytes)
    }
}
