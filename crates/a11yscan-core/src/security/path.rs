//! Archive entry name validation.

use crate::Result;
use crate::SecurityConfig;
use crate::types::DestDir;
use crate::types::SafePath;

/// Validates a raw archive entry name against the destination directory.
///
/// Delegates to [`SafePath::validate`], which rejects absolute names, `..`
/// segments, null bytes, banned components and paths that would resolve
/// outside `dest` through already-extracted symlinks.
///
/// # Errors
///
/// - `ScanError::PathTraversal` for `..`, absolute or escaping names
/// - `ScanError::SecurityViolation` for banned components, excessive depth
///   or empty names
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::SecurityConfig;
/// use a11yscan_core::security::validate_entry_name;
/// use a11yscan_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("data/scan")?;
/// let config = SecurityConfig::default();
///
/// assert!(validate_entry_name("index.html", &dest, &config).is_ok());
/// assert!(validate_entry_name("../evil.html", &dest, &config).is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_entry_name(name: &str, dest: &DestDir, config: &SecurityConfig) -> Result<SafePath> {
    SafePath::validate(name, dest, config)
}
