//! Validated extraction destination directory.

use crate::Result;
use crate::ScanError;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// A validated destination directory for site extraction.
///
/// A `DestDir` is guaranteed to:
/// - Exist on the filesystem and be a directory
/// - Be represented as an absolute canonical path
/// - Not be marked read-only
///
/// Every extracted entry is checked against this canonical path, so symlinks
/// in the caller-supplied path cannot widen the extraction boundary.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("data/scan")?;
/// println!("Extracting to: {}", dest.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Creates a new `DestDir` from an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Io` if the path does not exist, is not a
    /// directory, cannot be canonicalized, or is read-only.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path).map_err(|e| {
            ScanError::Io(std::io::Error::new(
                e.kind(),
                format!("destination directory unavailable: {}: {e}", path.display()),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(ScanError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        if metadata.permissions().readonly() {
            return Err(ScanError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("directory is not writable: {}", path.display()),
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            ScanError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize path {}: {e}", path.display()),
            ))
        })?;

        Ok(Self(canonical))
    }

    /// Creates the directory (and missing parents) if needed, then validates
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Io` if the directory cannot be created or fails
    /// the checks of [`DestDir::new`].
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Self::new(path)
    }

    /// Returns the canonical path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a validated `SafePath` to this destination.
    #[inline]
    #[must_use]
    pub fn join(&self, safe_path: &super::SafePath) -> PathBuf {
        self.0.join(safe_path.as_path())
    }

    /// Returns `true` if `path` resolves inside this destination.
    ///
    /// Existing paths are canonicalized first; paths that do not exist yet
    /// are compared lexically.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.canonicalize()
            .map_or_else(|_| path.starts_with(&self.0), |c| c.starts_with(&self.0))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dest_dir_valid() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("dest should be valid");
        assert!(dest.as_path().is_absolute());
    }

    #[test]
    fn test_dest_dir_nonexistent() {
        let result = DestDir::new("/nonexistent/directory/that/does/not/exist");
        assert!(matches!(result, Err(ScanError::Io(_))));
    }

    #[test]
    fn test_dest_dir_not_a_directory() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file_path = temp.path().join("file.txt");
        fs::write(&file_path, "test").expect("failed to write file");

        let result = DestDir::new(file_path);
        assert!(matches!(result, Err(ScanError::Io(_))));
    }

    #[test]
    fn test_dest_dir_create_nested() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let nested = temp.path().join("data").join("scan");

        let dest = DestDir::create(&nested).expect("should create");
        assert!(nested.is_dir());
        assert_eq!(dest.as_path(), nested.canonicalize().unwrap());
    }

    #[test]
    fn test_dest_dir_canonicalization() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let subdir = temp.path().join("subdir");
        fs::create_dir(&subdir).expect("failed to create subdir");

        let dest = DestDir::new(subdir.join(".").join("..")).expect("should create");
        assert_eq!(dest.as_path(), temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_dest_dir_contains() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("should create");

        assert!(dest.contains(&dest.as_path().join("index.html")));
        assert!(!dest.contains(Path::new("/etc/passwd")));
    }

    #[test]
    #[cfg(unix)]
    fn test_dest_dir_with_symlink() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().expect("failed to create temp dir");
        let real_dir = temp.path().join("real");
        fs::create_dir(&real_dir).expect("failed to create real dir");
        let link = temp.path().join("link");
        symlink(&real_dir, &link).expect("failed to create symlink");

        let dest = DestDir::new(link).expect("should create from symlink");
        assert_eq!(dest.as_path(), real_dir.canonicalize().unwrap());
    }
}
