//! Execution environment precondition.

use std::env;

use crate::Result;
use crate::ScanError;

/// Variable the container image sets to mark a supported environment.
pub const IN_CONTAINER_ENV: &str = "A11Y_SCANNER_IN_CONTAINER";

/// Requires an environment variable to hold an exact value before a run.
///
/// The core never checks this on its own; the binary decides whether to
/// enforce it.
///
/// # Examples
///
/// ```
/// use a11yscan_core::pipeline::EnvironmentGuard;
///
/// let guard = EnvironmentGuard::new("A11YSCAN_DOCTEST_UNSET_VARIABLE", "1");
/// assert!(guard.check().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentGuard {
    variable: String,
    expected: String,
}

impl Default for EnvironmentGuard {
    fn default() -> Self {
        Self::new(IN_CONTAINER_ENV, "1")
    }
}

impl EnvironmentGuard {
    /// Guard requiring `variable == expected`.
    pub fn new(variable: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            expected: expected.into(),
        }
    }

    /// Variable name.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Checks the current process environment.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Precondition` if the variable is unset or holds a
    /// different value.
    pub fn check(&self) -> Result<()> {
        self.check_value(env::var(&self.variable).ok().as_deref())
    }

    /// Checks an explicit value instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Precondition` unless `value` equals the expected
    /// value.
    pub fn check_value(&self, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) if v == self.expected => Ok(()),
            Some(v) => Err(ScanError::Precondition(format!(
                "{}={v:?}, expected {:?}",
                self.variable, self.expected
            ))),
            None => Err(ScanError::Precondition(format!(
                "{} is not set (expected {:?})",
                self.variable, self.expected
            ))),
        }
    }
}
