//! Zip bomb detection.

use crate::Result;
use crate::ScanError;
use crate::SecurityConfig;

/// Validates the compression ratio of an entry to detect zip bombs.
///
/// Entries with a compressed size of zero (empty files, directories) are
/// always accepted.
///
/// # Errors
///
/// Returns `ScanError::ZipBomb` if the compression ratio exceeds the
/// configured maximum.
#[allow(clippy::cast_precision_loss)]
pub fn validate_compression_ratio(
    compressed_size: u64,
    uncompressed_size: u64,
    config: &SecurityConfig,
) -> Result<()> {
    if compressed_size == 0 {
        return Ok(());
    }

    let ratio = uncompressed_size as f64 / compressed_size as f64;

    if ratio > config.max_compression_ratio {
        return Err(ScanError::ZipBomb {
            compressed: compressed_size,
            uncompressed: uncompressed_size,
            ratio,
        });
    }

    Ok(())
}
