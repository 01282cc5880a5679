//! Error conversion utilities for CLI.
//!
//! Converts a11yscan-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance. The original error
//! stays in the chain so [`exit_code`] can classify it.

use a11yscan_core::ScanError;
use a11yscan_core::pipeline::IN_CONTAINER_ENV;

/// Exit code for a failed environment precondition.
pub const EXIT_PRECONDITION: u8 = 2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Converts `ScanError` to a user-friendly anyhow error with a hint.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn convert_scan_error(err: ScanError) -> anyhow::Error {
    let message = match &err {
        ScanError::Precondition(_) => format!(
            "This command only runs inside the scanner container\n\
             HINT: Run it through the container image (which sets {IN_CONTAINER_ENV}=1), \
             or pass --skip-env-check."
        ),
        ScanError::ArchiveNotFound { dir } => format!(
            "No site archive found in '{}'\n\
             HINT: Pass --zip <site.zip> or place a .zip file in that directory.",
            dir.display()
        ),
        ScanError::InvalidArchive(reason) => format!(
            "Invalid site archive: {reason}\n\
             HINT: The archive may be corrupted or not a zip file."
        ),
        ScanError::ZipBomb {
            compressed,
            uncompressed,
            ratio,
        } => format!(
            "Security violation: the site archive appears to be a zip bomb\n\
             Compression ratio: {}:1 ({}KB → {}MB)\n\
             HINT: Do not scan archives from untrusted sources.",
            *ratio as u64,
            compressed / 1024,
            uncompressed / 1024 / 1024
        ),
        ScanError::QuotaExceeded { resource } => format!(
            "Extraction limit exceeded: {resource}\n\
             HINT: The site is larger than the scanner accepts; trim it before zipping."
        ),
        ScanError::Server(reason) => format!(
            "Could not serve the extracted site: {reason}\n\
             HINT: Check that a loopback port can be bound."
        ),
        ScanError::Browser(reason) => format!(
            "Browser error: {reason}\n\
             HINT: Start chromedriver and pass --webdriver-url, or pass --chromedriver \
             to spawn one."
        ),
        ScanError::RuleEngine(reason) => format!(
            "Rule engine error: {reason}\n\
             HINT: Point --axe-script (or A11Y_AXE_SCRIPT) at axe.min.js."
        ),
        ScanError::ReportExists { path } => format!(
            "Report already exists: {}\n\
             HINT: Drop --no-overwrite or choose another --output.",
            path.display()
        ),
        _ => "Scan failed".to_string(),
    };
    anyhow::Error::new(err).context(message)
}

/// Adds user guidance to a core result.
pub fn add_scan_context<T>(result: Result<T, ScanError>) -> anyhow::Result<T> {
    result.map_err(convert_scan_error)
}

/// Process exit code for `err`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ScanError>() {
        Some(ScanError::Precondition(_)) => EXIT_PRECONDITION,
        _ => EXIT_FAILURE,
    }
}
