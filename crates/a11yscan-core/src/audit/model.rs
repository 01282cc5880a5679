//! Serializable audit results and the per-page artifact format.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::Result;
use crate::ScanError;

/// Separator between levels of a nested (shadow DOM / iframe) target.
pub const TARGET_LEVEL_SEPARATOR: &str = " >>> ";

/// Top-level artifact keys owned by [`ScanResult`]; engine metadata with the
/// same name is dropped.
const RESERVED_KEYS: [&str; 7] = [
    "scanned_url",
    "source_file",
    "violations",
    "passes",
    "inapplicable",
    "incomplete",
    "timestamp",
];

/// Severity vocabulary used for counting and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Blocks access for some users.
    Critical,
    /// Seriously degrades access.
    Serious,
    /// Moderately degrades access.
    Moderate,
    /// Minor annoyance.
    Minor,
    /// Missing or unrecognized impact.
    Unknown,
}

impl Impact {
    /// All levels, most severe first.
    pub const ALL: [Self; 5] = [
        Self::Critical,
        Self::Serious,
        Self::Moderate,
        Self::Minor,
        Self::Unknown,
    ];

    /// Maps an engine-reported impact onto the vocabulary.
    ///
    /// # Examples
    ///
    /// ```
    /// use a11yscan_core::audit::Impact;
    ///
    /// assert_eq!(Impact::parse(Some("Serious")), Impact::Serious);
    /// assert_eq!(Impact::parse(Some("catastrophic")), Impact::Unknown);
    /// assert_eq!(Impact::parse(None), Impact::Unknown);
    /// ```
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("critical") => Self::Critical,
            Some("serious") => Self::Serious,
            Some("moderate") => Self::Moderate,
            Some("minor") => Self::Minor,
            _ => Self::Unknown,
        }
    }

    /// Lowercase name as used in artifacts and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Serious => "serious",
            Self::Moderate => "moderate",
            Self::Minor => "minor",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One DOM node matched by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    /// Selector path; nested frames are joined with `" >>> "`.
    #[serde(default, deserialize_with = "deserialize_target")]
    pub target: Vec<String>,

    /// Outer HTML of the node.
    #[serde(default)]
    pub html: String,

    /// Screenshot file path, `null` when none was captured.
    #[serde(default)]
    pub screenshot: Option<String>,

    /// Engine's remediation summary.
    #[serde(
        default,
        rename = "failureSummary",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_summary: Option<String>,

    /// Any other keys the engine reported.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeResult {
    /// First selector of this node, if any.
    #[must_use]
    pub fn first_selector(&self) -> Option<&str> {
        self.target.first().map(String::as_str)
    }
}

/// One rule outcome (a violation, pass, inapplicable or incomplete entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule identifier.
    pub id: String,

    /// Engine-reported impact, possibly `null`.
    #[serde(default)]
    pub impact: Option<String>,

    /// Rule description.
    #[serde(default)]
    pub description: String,

    /// Short remediation hint.
    #[serde(default)]
    pub help: String,

    /// Remediation documentation link.
    #[serde(default, rename = "helpUrl")]
    pub help_url: String,

    /// Matched nodes.
    #[serde(default)]
    pub nodes: Vec<NodeResult>,

    /// Any other keys the engine reported (tags, etc.).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RuleResult {
    /// Impact mapped onto the fixed vocabulary.
    #[must_use]
    pub fn impact_level(&self) -> Impact {
        Impact::parse(self.impact.as_deref())
    }

    /// First selector of the first node.
    #[must_use]
    pub fn first_selector(&self) -> Option<&str> {
        self.nodes.first().and_then(NodeResult::first_selector)
    }
}

/// Structured output of one rule-engine run, captured verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditResults {
    /// Failed rules.
    #[serde(default)]
    pub violations: Vec<RuleResult>,

    /// Passed rules.
    #[serde(default)]
    pub passes: Vec<RuleResult>,

    /// Rules with no matching elements.
    #[serde(default)]
    pub inapplicable: Vec<RuleResult>,

    /// Rules needing manual review.
    #[serde(default)]
    pub incomplete: Vec<RuleResult>,

    /// Engine metadata (`testEngine`, `url`, `timestamp`, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// The persisted per-page artifact.
///
/// `source_file` and every node's `screenshot` are always present in the
/// serialized form, as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// URL the browser was pointed at.
    pub scanned_url: String,

    /// Relative path of the page in the site, `null` for live scans.
    #[serde(default)]
    pub source_file: Option<String>,

    /// Failed rules.
    #[serde(default)]
    pub violations: Vec<RuleResult>,

    /// Passed rules.
    #[serde(default)]
    pub passes: Vec<RuleResult>,

    /// Rules with no matching elements.
    #[serde(default)]
    pub inapplicable: Vec<RuleResult>,

    /// Rules needing manual review.
    #[serde(default)]
    pub incomplete: Vec<RuleResult>,

    /// When the page was scanned (UTC).
    pub timestamp: DateTime<Utc>,

    /// Remaining engine metadata, kept verbatim.
    #[serde(flatten)]
    pub engine_metadata: Map<String, Value>,
}

impl ScanResult {
    /// Builds an artifact from engine output.
    #[must_use]
    pub fn from_audit(
        scanned_url: impl Into<String>,
        source_file: Option<String>,
        results: AuditResults,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut engine_metadata = results.metadata;
        for key in RESERVED_KEYS {
            engine_metadata.remove(key);
        }
        Self {
            scanned_url: scanned_url.into(),
            source_file,
            violations: results.violations,
            passes: results.passes,
            inapplicable: results.inapplicable,
            incomplete: results.incomplete,
            timestamp,
            engine_metadata,
        }
    }

    /// Writes the artifact as pretty-printed JSON, creating the parent
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Artifact` if serialization fails and
    /// `ScanError::Io` if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| ScanError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads an artifact written by [`ScanResult::write_to`].
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Io` if the file cannot be read and
    /// `ScanError::Artifact` if it is not a valid artifact.
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| ScanError::Artifact {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn deserialize_target<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_target(&value))
}

/// Flattens an engine target into one selector string per entry.
///
/// Plain strings pass through; nested arrays (shadow DOM, iframes) are joined
/// level by level with `" >>> "`. Values of any other type are dropped.
///
/// # Examples
///
/// ```
/// use a11yscan_core::audit::model::flatten_target;
/// use serde_json::json;
///
/// assert_eq!(flatten_target(&json!(["#main", ["#host", "button"]])), vec![
///     "#main".to_string(),
///     "#host >>> button".to_string()
/// ]);
/// ```
#[must_use]
pub fn flatten_target(value: &Value) -> Vec<String> {
    match value {
        Value::String(selector) => vec![selector.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(selector) => Some(selector.clone()),
                Value::Array(_) => {
                    let levels = flatten_target(item);
                    (!levels.is_empty()).then(|| levels.join(TARGET_LEVEL_SEPARATOR))
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
