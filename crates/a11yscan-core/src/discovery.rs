//! File Discoverer: finds the HTML pages of an extracted site.

use std::fmt::Write as _;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

/// An HTML page found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredPage {
    /// Absolute location on disk under the canonical scan root. A symlinked
    /// page keeps its link path, since that is where the site serves it.
    pub absolute: PathBuf,

    /// Location relative to the scan root.
    pub relative: PathBuf,
}

impl DiscoveredPage {
    /// Renders the relative path as a URL path (without a leading `/`).
    ///
    /// Separators become `/` on every platform and bytes outside the
    /// unreserved URL set are percent-encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use a11yscan_core::discovery::DiscoveredPage;
    /// use std::path::PathBuf;
    ///
    /// let page = DiscoveredPage {
    ///     absolute: PathBuf::from("/srv/scan/about us/team.html"),
    ///     relative: PathBuf::from("about us/team.html"),
    /// };
    /// assert_eq!(page.url_path(), "about%20us/team.html");
    /// ```
    #[must_use]
    pub fn url_path(&self) -> String {
        let mut out = String::new();
        for component in self.relative.components() {
            if let Component::Normal(segment) = component {
                if !out.is_empty() {
                    out.push('/');
                }
                percent_encode_segment(&segment.to_string_lossy(), &mut out);
            }
        }
        out
    }

    /// Relative path rendered with `/` separators, used as the page label.
    #[must_use]
    pub fn label(&self) -> String {
        self.relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn percent_encode_segment(segment: &str, out: &mut String) {
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Recursively discovers `.html` / `.htm` files (any case) under `root`.
///
/// Never fails: a missing or non-directory root yields an empty list and an
/// error log. Symlinks are not followed while walking; a symlinked page is
/// kept only if it resolves to a file inside `root`. The result is sorted by
/// relative path.
pub fn discover_pages(root: &Path) -> Vec<DiscoveredPage> {
    info!(root = %root.display(), "discovering HTML pages");

    if !root.is_dir() {
        error!(root = %root.display(), "scan directory does not exist or is not a directory");
        return Vec::new();
    }

    let canonical_root = match root.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            error!(root = %root.display(), error = %e, "cannot resolve scan directory");
            return Vec::new();
        }
    };

    let mut pages = Vec::new();
    for entry in WalkDir::new(&canonical_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !is_html(path) {
            continue;
        }

        let absolute = if entry.file_type().is_symlink() {
            match path.canonicalize() {
                Ok(target) if target.starts_with(&canonical_root) && target.is_file() => {
                    path.to_path_buf()
                }
                Ok(target) => {
                    warn!(
                        page = %path.display(),
                        target = %target.display(),
                        "excluding symlinked page that resolves outside the scan root"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(page = %path.display(), error = %e, "excluding dangling symlink");
                    continue;
                }
            }
        } else if entry.file_type().is_file() {
            path.to_path_buf()
        } else {
            continue;
        };

        let Ok(relative) = absolute.strip_prefix(&canonical_root) else {
            warn!(
                page = %absolute.display(),
                root = %canonical_root.display(),
                "could not determine relative path, skipping"
            );
            continue;
        };
        let relative = relative.to_path_buf();

        debug!(relative = %relative.display(), "found page");
        pages.push(DiscoveredPage { absolute, relative });
    }

    pages.sort_by(|a, b| a.relative.cmp(&b.relative));

    info!(count = pages.len(), root = %root.display(), "page discovery finished");
    pages
}

/// Default [`crate::pipeline::PageDiscoverer`] backed by [`discover_pages`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDiscoverer;
