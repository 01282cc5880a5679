//! Error types for the accessibility scan pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ScanError`.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Represents a specific extraction quota that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResource {
    /// Entry count quota exceeded.
    FileCount {
        /// Current entry count.
        current: usize,
        /// Maximum allowed entry count.
        max: usize,
    },
    /// Total uncompressed size quota exceeded.
    TotalSize {
        /// Current total size in bytes.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single file size quota exceeded.
    FileSize {
        /// File size in bytes.
        size: u64,
        /// Maximum allowed file size in bytes.
        max: u64,
    },
    /// Integer overflow detected in quota tracking.
    IntegerOverflow,
}

impl std::fmt::Display for QuotaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileCount { current, max } => {
                write!(f, "quota exceeded: file count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "quota exceeded: total size ({current} > {max})")
            }
            Self::FileSize { size, max } => {
                write!(f, "quota exceeded: single file size ({size} > {max})")
            }
            Self::IntegerOverflow => {
                write!(f, "quota exceeded: integer overflow in quota tracking")
            }
        }
    }
}

/// Errors that can occur while extracting, hosting, auditing or reporting.
#[derive(Error, Debug)]
pub enum ScanError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No input archive was found in the input directory.
    #[error("no zip archive found in {dir}")]
    ArchiveNotFound {
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// Archive is corrupted or not a zip file.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Archive entry attempted to escape the destination directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: PathBuf,
    },

    /// Archive entry rejected by security policy.
    #[error("operation denied by security policy: {reason}")]
    SecurityViolation {
        /// Reason for the rejection.
        reason: String,
    },

    /// Potential zip bomb detected.
    #[error(
        "potential zip bomb: compressed={compressed} bytes, uncompressed={uncompressed} bytes (ratio: {ratio:.2})"
    )]
    ZipBomb {
        /// Compressed size in bytes.
        compressed: u64,
        /// Uncompressed size in bytes.
        uncompressed: u64,
        /// Compression ratio.
        ratio: f64,
    },

    /// Extraction quota exceeded.
    #[error("{resource}")]
    QuotaExceeded {
        /// Description of the exceeded resource.
        resource: QuotaResource,
    },

    /// The local content server failed.
    #[error("content server error: {0}")]
    Server(String),

    /// Navigating the browser to a page failed or timed out.
    #[error("navigation to {url} failed: {reason}")]
    Navigation {
        /// Target URL.
        url: String,
        /// Reason reported by the browser.
        reason: String,
    },

    /// The browser automation layer failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// The accessibility rule engine failed or returned malformed output.
    #[error("rule engine error: {0}")]
    RuleEngine(String),

    /// A scan artifact could not be serialized or parsed.
    #[error("artifact error for {path}: {source}")]
    Artifact {
        /// Artifact path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A process precondition required by the caller does not hold.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A report already exists and overwriting was disabled.
    #[error("report already exists: {path}")]
    ReportExists {
        /// Existing report path.
        path: PathBuf,
    },
}

impl ScanError {
    /// Returns `true` if this error represents a rejected archive entry or a
    /// hostile archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use a11yscan_core::ScanError;
    /// use std::path::PathBuf;
    ///
    /// let err = ScanError::PathTraversal {
    ///     path: PathBuf::from("../evil.html"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = ScanError::Browser("session closed".into());
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. }
                | Self::SecurityViolation { .. }
                | Self::ZipBomb { .. }
                | Self::QuotaExceeded { .. }
        )
    }

    /// Returns `true` if this error only invalidates the page being scanned.
    ///
    /// The pipeline logs these, skips the page and continues with the next
    /// one. Anything else aborts the run.
    ///
    /// # Examples
    ///
    /// ```
    /// use a11yscan_core::ScanError;
    ///
    /// let err = ScanError::Navigation {
    ///     url: "http://127.0.0.1:1/index.html".into(),
    ///     reason: "timeout".into(),
    /// };
    /// assert!(err.is_page_recoverable());
    ///
    /// let err = ScanError::Precondition("not in container".into());
    /// assert!(!err.is_page_recoverable());
    /// ```
    #[must_use]
    pub const fn is_page_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. }
                | Self::Browser(_)
                | Self::RuleEngine(_)
                | Self::Artifact { .. }
                | Self::Io(_)
        )
    }

    /// Returns the quota resource that was exceeded, if applicable.
    #[must_use]
    pub const fn quota_resource(&self) -> Option<&QuotaResource> {
        match self {
            Self::QuotaExceeded { resource } => Some(resource),
            _ => None,
        }
    }
}
