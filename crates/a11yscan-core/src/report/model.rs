//! Report model: the cross-page aggregate rendered into the final report.

use std::ops::AddAssign;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::audit::Impact;

/// Violation counts over the fixed severity vocabulary.
///
/// Serializes with the keys in severity order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImpactCounts {
    /// Critical violations.
    pub critical: usize,
    /// Serious violations.
    pub serious: usize,
    /// Moderate violations.
    pub moderate: usize,
    /// Minor violations.
    pub minor: usize,
    /// Violations with a missing or unrecognized impact.
    pub unknown: usize,
}

impl ImpactCounts {
    /// Count for one level.
    #[must_use]
    pub const fn get(&self, impact: Impact) -> usize {
        match impact {
            Impact::Critical => self.critical,
            Impact::Serious => self.serious,
            Impact::Moderate => self.moderate,
            Impact::Minor => self.minor,
            Impact::Unknown => self.unknown,
        }
    }

    /// Adds one violation at `impact`.
    pub fn record(&mut self, impact: Impact) {
        let slot = match impact {
            Impact::Critical => &mut self.critical,
            Impact::Serious => &mut self.serious,
            Impact::Moderate => &mut self.moderate,
            Impact::Minor => &mut self.minor,
            Impact::Unknown => &mut self.unknown,
        };
        *slot = slot.saturating_add(1);
    }

    /// Sum over all levels.
    #[must_use]
    pub fn total(&self) -> usize {
        Impact::ALL.iter().map(|level| self.get(*level)).sum()
    }

    /// Levels with a non-zero count, most severe first.
    pub fn non_zero(&self) -> impl Iterator<Item = (Impact, usize)> + '_ {
        Impact::ALL
            .iter()
            .map(|level| (*level, self.get(*level)))
            .filter(|(_, count)| *count > 0)
    }
}

impl AddAssign for ImpactCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.critical += rhs.critical;
        self.serious += rhs.serious;
        self.moderate += rhs.moderate;
        self.minor += rhs.minor;
        self.unknown += rhs.unknown;
    }
}

/// One violation of a rule on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Page URL as scanned.
    pub url: String,

    /// Relative source path of the page, if known.
    pub source_file: Option<String>,

    /// First selector of the first matched node.
    pub selector: Option<String>,

    /// Outer HTML of the first matched node.
    pub html_snippet: Option<String>,

    /// Screenshot path recorded in the artifact.
    pub screenshot: Option<String>,

    /// File name part of `screenshot`, used for report links.
    pub screenshot_filename: Option<String>,

    /// Remediation summary of the first matched node.
    pub failure_summary: Option<String>,

    /// Number of nodes the rule matched on this page.
    pub node_count: usize,
}

/// All occurrences of one rule across every scanned page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleGroup {
    /// Rule identifier.
    pub id: String,

    /// Severity, taken from the first occurrence seen.
    pub impact: Impact,

    /// Rule description.
    pub description: String,

    /// Short remediation hint.
    pub help: String,

    /// Remediation documentation link.
    #[serde(rename = "helpUrl")]
    pub help_url: String,

    /// Number of occurrences.
    pub count: usize,

    /// Occurrences ordered by URL, source file, then selector.
    pub occurrences: Vec<Occurrence>,
}

/// Per-page violation breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    /// Source file when known, otherwise the URL.
    pub label: String,

    /// Page URL as scanned.
    pub url: String,

    /// Violations found on the page.
    pub total_violations: usize,

    /// Violations by severity.
    pub impact_counts: ImpactCounts,
}

/// The aggregate handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportModel {
    /// Report title.
    pub title: String,

    /// When the model was built (UTC).
    pub generated_at: DateTime<Utc>,

    /// Artifacts successfully parsed.
    pub pages_scanned: usize,

    /// Violations across all pages.
    pub total_violations: usize,

    /// Violations by severity.
    pub violations_by_impact: ImpactCounts,

    /// Rule groups ordered by severity, then rule id.
    pub rule_groups: Vec<RuleGroup>,

    /// Pages ordered by violation count (descending), then label.
    pub page_summaries: Vec<PageSummary>,

    /// File names of the artifacts that were aggregated.
    pub raw_files: Vec<String>,
}

impl ReportModel {
    /// An empty report: nothing scanned, nothing found.
    #[must_use]
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: Utc::now(),
            pages_scanned: 0,
            total_violations: 0,
            violations_by_impact: ImpactCounts::default(),
            rule_groups: Vec::new(),
            page_summaries: Vec::new(),
            raw_files: Vec::new(),
        }
    }

    /// Checks the aggregate is internally consistent.
    ///
    /// # Examples
    ///
    /// ```
    /// use a11yscan_core::report::ReportModel;
    ///
    /// assert!(ReportModel::empty("Accessibility Report").validate());
    /// ```
    #[must_use]
    pub fn validate(&self) -> bool {
        if !self.rule_groups.is_empty() && self.total_violations == 0 {
            return false;
        }
        if self.violations_by_impact.total() != self.total_violations {
            return false;
        }
        let grouped: usize = self.rule_groups.iter().map(|g| g.count).sum();
        if grouped != self.total_violations {
            return false;
        }
        self.page_summaries.len() <= self.pages_scanned
    }

    /// `true` when no violations were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.total_violations == 0
    }
}
