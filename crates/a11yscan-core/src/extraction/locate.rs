//! Input archive lookup.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use tracing::warn;

use crate::Result;
use crate::ScanError;

/// Finds the site archive in `input_dir`.
///
/// Only regular files directly inside `input_dir` with a `.zip` extension
/// (any case) are considered. When several archives are present the
/// lexicographically first one is chosen and the others are named in a
/// warning, so the choice never depends on directory iteration order.
///
/// # Errors
///
/// Returns `ScanError::ArchiveNotFound` if the directory is missing,
/// unreadable, or holds no archive.
pub fn locate_archive(input_dir: &Path) -> Result<PathBuf> {
    info!(dir = %input_dir.display(), "looking for site archive");

    let entries = fs::read_dir(input_dir).map_err(|_| ScanError::ArchiveNotFound {
        dir: input_dir.to_path_buf(),
    })?;

    let mut archives: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_zip_extension(path))
        .collect();
    archives.sort();

    let mut candidates = archives.into_iter();
    let Some(chosen) = candidates.next() else {
        return Err(ScanError::ArchiveNotFound {
            dir: input_dir.to_path_buf(),
        });
    };

    let ignored: Vec<String> = candidates.map(|p| p.display().to_string()).collect();
    if !ignored.is_empty() {
        warn!(
            chosen = %chosen.display(),
            ignored = ?ignored,
            "multiple archives found, using the first in name order"
        );
    }

    info!(archive = %chosen.display(), "site archive detected");
    Ok(chosen)
}

fn has_zip_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
