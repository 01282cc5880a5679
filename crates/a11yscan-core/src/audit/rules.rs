//! Accessibility rule engine seam and the axe-core implementation.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::browser::BrowserSession;
use super::model::AuditResults;
use crate::Result;
use crate::ScanError;

/// Runs accessibility rules against the page loaded in a session.
pub trait RuleEngine {
    /// Audits the current page.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::RuleEngine` if the engine cannot be loaded, fails,
    /// or returns malformed output.
    fn run(&self, session: &mut dyn BrowserSession) -> Result<AuditResults>;
}

const AXE_RUN_SCRIPT: &str = "\
const done = arguments[arguments.length - 1];
if (typeof axe === 'undefined') {
  done({ error: 'axe-core is not loaded' });
  return;
}
axe.run(document).then(done, (err) => done({ error: String(err) }));";

/// Injects axe-core into the page and returns its results verbatim.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::audit::AxeEngine;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = AxeEngine::from_file(Path::new("vendor/axe.min.js"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AxeEngine {
    source: Arc<str>,
}

impl AxeEngine {
    /// Uses `source` as the axe-core script.
    #[must_use]
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Arc::from(source.into()),
        }
    }

    /// Loads the axe-core script from disk.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::RuleEngine` if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            ScanError::RuleEngine(format!("cannot read axe-core script {}: {e}", path.display()))
        })?;
        Ok(Self::from_source(source))
    }
}

impl RuleEngine for AxeEngine {
    fn run(&self, session: &mut dyn BrowserSession) -> Result<AuditResults> {
        session
            .execute(&self.source, Vec::new())
            .map_err(|e| ScanError::RuleEngine(format!("failed to inject axe-core: {e}")))?;

        let value = session
            .execute_async(AXE_RUN_SCRIPT, Vec::new())
            .map_err(|e| ScanError::RuleEngine(format!("axe.run failed: {e}")))?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(ScanError::RuleEngine(error.to_string()));
        }
        if !value.is_object() {
            return Err(ScanError::RuleEngine(format!(
                "unexpected axe.run result: {value}"
            )));
        }

        let results: AuditResults = serde_json::from_value(value)
            .map_err(|e| ScanError::RuleEngine(format!("malformed axe results: {e}")))?;
        debug!(
            violations = results.violations.len(),
            passes = results.passes.len(),
            incomplete = results.incomplete.len(),
            inapplicable = results.inapplicable.len(),
            "axe run finished"
        );
        Ok(results)
    }
}
