//! Validated archive entry path.

use crate::Result;
use crate::ScanError;
use crate::SecurityConfig;
use std::borrow::Cow;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use super::DestDir;

/// An archive entry name that is safe to write under a [`DestDir`].
///
/// `SafePath` represents a relative path that has been validated to not
/// contain:
/// - Parent directory segments (`..`)
/// - Null bytes
/// - Root or drive prefixes
/// - Banned path components
/// - Excessive depth
///
/// and whose joined location stays inside the destination even after
/// resolving symlinks in already-extracted parent directories.
///
/// There is no `From<PathBuf>`; validation is the only constructor.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::SecurityConfig;
/// use a11yscan_core::types::DestDir;
/// use a11yscan_core::types::SafePath;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("data/scan")?;
/// let config = SecurityConfig::default();
///
/// let safe = SafePath::validate("css/site.css", &dest, &config)?;
/// assert!(SafePath::validate("../evil.html", &dest, &config).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// Validates a raw archive entry name.
    ///
    /// # Validation Steps
    ///
    /// 1. Reject null bytes
    /// 2. Treat `\` as a separator (archives built on Windows)
    /// 3. Reject absolute names, root and prefix components
    /// 4. Reject any `..` component
    /// 5. Enforce maximum depth and banned components
    /// 6. Drop `.` components
    /// 7. Verify the joined path stays within the destination, canonicalizing
    ///    the deepest existing ancestor
    ///
    /// # Errors
    ///
    /// - `ScanError::PathTraversal` for `..`, absolute or escaping names
    /// - `ScanError::SecurityViolation` for null bytes, banned components,
    ///   excessive depth or empty names
    pub fn validate(name: &str, dest: &DestDir, config: &SecurityConfig) -> Result<Self> {
        if name.contains('\0') {
            return Err(ScanError::SecurityViolation {
                reason: format!("entry name contains null bytes: {}", name.escape_debug()),
            });
        }

        let name: Cow<'_, str> = if name.contains('\\') {
            Cow::Owned(name.replace('\\', "/"))
        } else {
            Cow::Borrowed(name)
        };
        let path = Path::new(name.as_ref());

        if path.is_absolute() || name.starts_with('/') {
            return Err(ScanError::PathTraversal {
                path: path.to_path_buf(),
            });
        }

        let mut depth = 0;
        let mut normalized = PathBuf::new();

        for component in path.components() {
            match component {
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ScanError::PathTraversal {
                        path: path.to_path_buf(),
                    });
                }
                Component::Normal(comp) => {
                    depth += 1;
                    let comp_str = comp.to_string_lossy();
                    if !config.is_path_component_allowed(&comp_str) {
                        return Err(ScanError::SecurityViolation {
                            reason: format!("banned path component: {comp_str}"),
                        });
                    }
                    normalized.push(comp);
                }
                Component::CurDir => {}
            }
        }

        if depth == 0 {
            return Err(ScanError::SecurityViolation {
                reason: format!("entry name has no path components: {name:?}"),
            });
        }

        if depth > config.max_path_depth {
            return Err(ScanError::SecurityViolation {
                reason: format!(
                    "path depth {} exceeds maximum {}",
                    depth, config.max_path_depth
                ),
            });
        }

        let resolved = dest.as_path().join(&normalized);
        if !resolved.starts_with(dest.as_path()) {
            return Err(ScanError::PathTraversal {
                path: path.to_path_buf(),
            });
        }

        // A previously extracted symlink could redirect the write; check the
        // deepest ancestor that exists on disk.
        let mut ancestor = resolved.parent();
        while let Some(dir) = ancestor {
            match dir.canonicalize() {
                Ok(canonical) => {
                    if !canonical.starts_with(dest.as_path()) {
                        return Err(ScanError::PathTraversal {
                            path: path.to_path_buf(),
                        });
                    }
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    ancestor = dir.parent();
                }
                Err(e) => {
                    return Err(ScanError::Io(std::io::Error::new(
                        e.kind(),
                        format!("failed to canonicalize {}: {e}", dir.display()),
                    )));
                }
            }
        }

        if let Ok(meta) = resolved.symlink_metadata()
            && meta.file_type().is_symlink()
        {
            return Err(ScanError::PathTraversal {
                path: path.to_path_buf(),
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized relative path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Converts into the inner `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::field_reassign_with_default)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dest() -> (TempDir, DestDir) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("failed to create dest");
        (temp, dest)
    }

    #[test]
    fn test_safe_path_valid_relative() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        let safe = SafePath::validate("about/team.html", &dest, &config).expect("should be valid");
        assert_eq!(safe.as_path(), Path::new("about/team.html"));
    }

    #[test]
    fn test_safe_path_reject_parent_traversal() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        for name in ["../evil.html", "foo/../../evil.html", "a/b/../c.html", ".."] {
            let result = SafePath::validate(name, &dest, &config);
            assert!(
                matches!(result, Err(ScanError::PathTraversal { .. })),
                "name should be rejected: {name}"
            );
        }
    }

    #[test]
    fn test_safe_path_reject_backslash_traversal() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        let result = SafePath::validate("..\\..\\evil.html", &dest, &config);
        assert!(matches!(result, Err(ScanError::PathTraversal { .. })));

        let safe = SafePath::validate("css\\site.css", &dest, &config).expect("should be valid");
        assert_eq!(safe.as_path(), Path::new("css/site.css"));
    }

    #[test]
    fn test_safe_path_reject_absolute() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        let result = SafePath::validate("/etc/passwd", &dest, &config);
        assert!(matches!(result, Err(ScanError::PathTraversal { .. })));
    }

    #[test]
    fn test_safe_path_normalize_dot_components() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        let safe = SafePath::validate("./foo/./bar.html", &dest, &config).expect("should be valid");
        assert_eq!(safe.as_path(), Path::new("foo/bar.html"));
    }

    #[test]
    fn test_safe_path_reject_empty() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        for name in ["", ".", "./"] {
            let result = SafePath::validate(name, &dest, &config);
            assert!(
                matches!(result, Err(ScanError::SecurityViolation { .. })),
                "name should be rejected: {name:?}"
            );
        }
    }

    #[test]
    fn test_safe_path_null_bytes() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        let result = SafePath::validate("index\0.html", &dest, &config);
        assert!(matches!(result, Err(ScanError::SecurityViolation { .. })));
    }

    #[test]
    fn test_safe_path_reject_excessive_depth() {
        let (_temp, dest) = create_test_dest();
        let mut config = SecurityConfig::default();
        config.max_path_depth = 3;

        assert!(SafePath::validate("a/b/c", &dest, &config).is_ok());
        assert!(matches!(
            SafePath::validate("a/b/c/d", &dest, &config),
            Err(ScanError::SecurityViolation { .. })
        ));
    }

    #[test]
    fn test_safe_path_reject_banned_components() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        for name in ["site/.git/config", ".SSH/id_rsa"] {
            let result = SafePath::validate(name, &dest, &config);
            assert!(
                matches!(result, Err(ScanError::SecurityViolation { .. })),
                "name should be rejected: {name}"
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_in_parent_chain() {
        use std::os::unix::fs::symlink;

        let (temp, dest) = create_test_dest();
        let config = SecurityConfig::default();
        symlink("/tmp", temp.path().join("assets")).expect("failed to create symlink");

        let result = SafePath::validate("assets/evil.html", &dest, &config);
        assert!(
            matches!(result, Err(ScanError::PathTraversal { .. })),
            "symlink in parent chain should be rejected"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_in_missing_subtree() {
        use std::os::unix::fs::symlink;

        let (temp, dest) = create_test_dest();
        let config = SecurityConfig::default();
        symlink("/tmp", temp.path().join("escape")).expect("failed to create symlink");

        // `escape/new` does not exist yet; the deepest existing ancestor does.
        let result = SafePath::validate("escape/new/page.html", &dest, &config);
        assert!(matches!(result, Err(ScanError::PathTraversal { .. })));
    }

    #[test]
    fn test_safe_path_unicode() {
        let (_temp, dest) = create_test_dest();
        let config = SecurityConfig::default();

        assert!(SafePath::validate("über/café.html", &dest, &config).is_ok());
    }
}
