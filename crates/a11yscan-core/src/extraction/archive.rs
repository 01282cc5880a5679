//! Zip extraction with per-entry validation.

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;
use zip::ZipArchive;
use zip::result::ZipError;

use super::ExtractionStats;
use crate::Result;
use crate::ScanError;
use crate::SecurityConfig;
use crate::error::QuotaResource;
use crate::security::QuotaTracker;
use crate::security::validate_compression_ratio;
use crate::security::validate_entry_name;
use crate::types::DestDir;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Extracts site archives under a [`SecurityConfig`].
///
/// Entry names that fail path validation are skipped and logged; the rest of
/// the archive is still extracted. Size and compression-ratio violations abort
/// the extraction because they indicate a hostile archive rather than one bad
/// entry.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::SecurityConfig;
/// use a11yscan_core::extraction::ZipExtractor;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = ZipExtractor::new(SecurityConfig::default());
/// let stats = extractor.extract(Path::new("data/unzip/site.zip"), Path::new("data/scan"))?;
/// println!("{} files, {} skipped", stats.files_extracted, stats.entries_skipped);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZipExtractor {
    config: SecurityConfig,
}

impl ZipExtractor {
    /// Creates an extractor enforcing `config`.
    #[must_use]
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Returns the active security configuration.
    #[must_use]
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Extracts `archive_path` into `destination`, creating it if needed.
    ///
    /// # Errors
    ///
    /// - `ScanError::Io` if the destination cannot be created or a write
    ///   fails
    /// - `ScanError::InvalidArchive` if the archive is corrupt
    /// - `ScanError::QuotaExceeded` if size or count limits are exceeded
    /// - `ScanError::ZipBomb` if an entry's compression ratio is excessive
    pub fn extract(&self, archive_path: &Path, destination: &Path) -> Result<ExtractionStats> {
        let start = Instant::now();
        info!(
            archive = %archive_path.display(),
            destination = %destination.display(),
            "extracting site archive"
        );

        let dest = DestDir::create(destination)?;
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| invalid_archive(archive_path, &e))?;

        let declared = declared_total_size(&mut archive, archive_path)?;
        if declared > self.config.max_total_size {
            return Err(ScanError::QuotaExceeded {
                resource: QuotaResource::TotalSize {
                    current: declared,
                    max: self.config.max_total_size,
                },
            });
        }
        debug!(entries = archive.len(), declared_bytes = declared, "archive opened");

        let mut stats = ExtractionStats::new();
        let mut quota = QuotaTracker::new();

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| invalid_archive(archive_path, &e))?;
            let name = entry.name().to_string();

            if entry
                .unix_mode()
                .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
            {
                warn!(entry = %name, "skipping symlink entry");
                stats.record_skip(name);
                continue;
            }

            let safe_path = match validate_entry_name(&name, &dest, &self.config) {
                Ok(safe_path) => safe_path,
                Err(e) if e.is_security_violation() => {
                    warn!(entry = %name, error = %e, "skipping unsafe archive entry");
                    stats.record_skip(name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let target = dest.join(&safe_path);

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                stats.directories_created += 1;
                continue;
            }

            validate_compression_ratio(entry.compressed_size(), entry.size(), &self.config)?;
            quota.check_entry(entry.size(), &self.config)?;

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }

            // Declared sizes can lie; cap the actual bytes read.
            let remaining = quota.remaining_bytes(&self.config);
            let limit = self.config.max_file_size.min(remaining);
            let written = write_entry(&mut entry, &target, limit)?;
            if written > limit {
                let _ = fs::remove_file(&target);
                let resource = if limit < self.config.max_file_size {
                    QuotaResource::TotalSize {
                        current: quota.bytes_written().saturating_add(written),
                        max: self.config.max_total_size,
                    }
                } else {
                    QuotaResource::FileSize {
                        size: written,
                        max: self.config.max_file_size,
                    }
                };
                return Err(ScanError::QuotaExceeded { resource });
            }

            quota.record_file(written, &self.config)?;
            stats.files_extracted += 1;
            stats.bytes_written += written;
        }

        stats.duration = start.elapsed();
        info!(
            files = stats.files_extracted,
            directories = stats.directories_created,
            bytes = stats.bytes_written,
            skipped = stats.entries_skipped,
            "extraction completed"
        );
        if stats.has_skipped() {
            warn!(
                skipped = stats.entries_skipped,
                "entries were skipped due to unsafe paths"
            );
        }

        Ok(stats)
    }
}

fn declared_total_size<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &Path) -> Result<u64> {
    let mut total: u64 = 0;
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| invalid_archive(path, &e))?;
        total = total
            .checked_add(entry.size())
            .ok_or(ScanError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;
    }
    Ok(total)
}

fn write_entry<R: Read>(reader: &mut R, target: &Path, limit: u64) -> Result<u64> {
    let file = File::create(target)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    let written = std::io::copy(&mut reader.take(limit.saturating_add(1)), &mut writer)?;
    writer.flush()?;
    Ok(written)
}

fn invalid_archive(path: &Path, err: &ZipError) -> ScanError {
    ScanError::InvalidArchive(format!("{}: {err}", path.display()))
}
