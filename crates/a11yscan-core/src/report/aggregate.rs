//! Result Aggregator: folds per-page artifacts into a [`ReportModel`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::model::ImpactCounts;
use super::model::Occurrence;
use super::model::PageSummary;
use super::model::ReportModel;
use super::model::RuleGroup;
use crate::audit::RuleResult;

/// The parts of an artifact the aggregator needs.
///
/// Accepts both current artifacts (`scanned_url`) and bare engine dumps
/// (`url`); everything else is ignored. An object with neither URL key is
/// not an artifact.
#[derive(Debug, Deserialize)]
struct ArtifactView {
    #[serde(default)]
    scanned_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "present")]
    source_file: Option<Option<String>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    violations: Vec<RuleResult>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<RuleResult>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<RuleResult>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Distinguishes `"source_file": null` from an absent key.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ArtifactView {
    fn has_url(&self) -> bool {
        self.scanned_url.is_some() || self.url.is_some()
    }

    fn page_url(&self) -> String {
        self.scanned_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| self.url.clone())
            .unwrap_or_default()
    }

    /// Explicit `source_file` wins (even when `null`); otherwise a `file://`
    /// URL yields its file name.
    fn source_file(&self, url: &str) -> Option<String> {
        match &self.source_file {
            Some(explicit) => explicit.clone(),
            None => url.strip_prefix("file://").and_then(|path| {
                Path::new(path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            }),
        }
    }
}

struct PageBucket {
    label: String,
    url: String,
    counts: ImpactCounts,
}

/// Lists `*.json` files directly under `dir`, sorted by file name.
fn artifact_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "results directory is not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();
    files
}

fn read_artifact(path: &Path) -> Option<ArtifactView> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping unreadable artifact");
            return None;
        }
    };
    match serde_json::from_slice::<ArtifactView>(&bytes) {
        Ok(view) if view.has_url() => Some(view),
        Ok(_) => {
            warn!(file = %path.display(), "skipping JSON without scanned_url or url");
            None
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping invalid artifact");
            None
        }
    }
}

/// Builds the report model from every artifact in `results_dir`.
///
/// Never fails: a missing or empty directory produces a zero report and
/// unparsable artifacts are skipped with a warning.
///
/// # Examples
///
/// ```
/// use a11yscan_core::report::build_model;
/// use std::path::Path;
///
/// let model = build_model(Path::new("/nonexistent/results"), "Accessibility Report");
/// assert_eq!(model.pages_scanned, 0);
/// assert_eq!(model.total_violations, 0);
/// ```
pub fn build_model(results_dir: &Path, title: &str) -> ReportModel {
    let mut model = ReportModel::empty(title);

    if !results_dir.is_dir() {
        warn!(dir = %results_dir.display(), "results directory does not exist");
        return model;
    }

    let mut groups: BTreeMap<String, RuleGroup> = BTreeMap::new();
    let mut pages: HashMap<String, PageBucket> = HashMap::new();

    for path in artifact_files(results_dir) {
        let Some(artifact) = read_artifact(&path) else {
            continue;
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        model.pages_scanned += 1;
        model.raw_files.push(file_name.clone());

        let url = artifact.page_url();
        let source_file = artifact.source_file(&url);
        let label = source_file
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| (!url.is_empty()).then(|| url.clone()))
            .unwrap_or(file_name);
        debug!(page = %label, violations = artifact.violations.len(), "aggregating artifact");

        let bucket = pages.entry(label.clone()).or_insert_with(|| PageBucket {
            label,
            url: url.clone(),
            counts: ImpactCounts::default(),
        });

        for violation in artifact.violations {
            let impact = violation.impact_level();
            model.total_violations += 1;
            model.violations_by_impact.record(impact);
            bucket.counts.record(impact);

            let first = violation.nodes.first();
            let screenshot = first.and_then(|n| n.screenshot.clone());
            let occurrence = Occurrence {
                url: url.clone(),
                source_file: source_file.clone(),
                selector: first.and_then(|n| n.first_selector()).map(str::to_string),
                html_snippet: first.map(|n| n.html.clone()).filter(|h| !h.is_empty()),
                screenshot_filename: screenshot.as_deref().and_then(|s| {
                    Path::new(s)
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                }),
                screenshot,
                failure_summary: first.and_then(|n| n.failure_summary.clone()),
                node_count: violation.nodes.len(),
            };

            let group = groups
                .entry(violation.id.clone())
                .or_insert_with(|| RuleGroup {
                    id: violation.id.clone(),
                    impact,
                    description: violation.description.clone(),
                    help: violation.help.clone(),
                    help_url: violation.help_url.clone(),
                    count: 0,
                    occurrences: Vec::new(),
                });
            group.count += 1;
            group.occurrences.push(occurrence);
        }
    }

    let mut rule_groups: Vec<RuleGroup> = groups.into_values().collect();
    for group in &mut rule_groups {
        group.occurrences.sort_by(|a, b| {
            a.url
                .cmp(&b.url)
                .then_with(|| a.source_file.cmp(&b.source_file))
                .then_with(|| a.selector.cmp(&b.selector))
        });
    }
    rule_groups.sort_by(|a, b| a.impact.cmp(&b.impact).then_with(|| a.id.cmp(&b.id)));
    model.rule_groups = rule_groups;

    let mut page_summaries: Vec<PageSummary> = pages
        .into_values()
        .map(|bucket| PageSummary {
            label: bucket.label,
            url: bucket.url,
            total_violations: bucket.counts.total(),
            impact_counts: bucket.counts,
        })
        .collect();
    page_summaries.sort_by(|a, b| {
        b.total_violations
            .cmp(&a.total_violations)
            .then_with(|| a.label.cmp(&b.label))
    });
    model.page_summaries = page_summaries;
    model.generated_at = Utc::now();

    if !model.validate() {
        warn!("report model failed consistency check");
    }

    info!(
        pages = model.pages_scanned,
        violations = model.total_violations,
        rules = model.rule_groups.len(),
        "report model built"
    );
    model
}

/// Checks that `path` holds a JSON object with a URL key and, if present, a
/// list-typed `violations`.
///
/// # Examples
///
/// ```
/// use a11yscan_core::report::validate_artifact;
/// use std::path::Path;
///
/// assert!(!validate_artifact(Path::new("/nonexistent/page.json")));
/// ```
pub fn validate_artifact(path: &Path) -> bool {
    let Ok(bytes) = fs::read(path) else {
        return false;
    };
    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&bytes) else {
        return false;
    };
    if map.get("violations").is_some_and(|v| !v.is_array()) {
        return false;
    }
    map.contains_key("scanned_url") || map.contains_key("url")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::audit::Impact;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_json(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    fn violation(id: &str, impact: Option<&str>, selector: &str) -> Value {
        json!({
            "id": id,
            "impact": impact,
            "description": format!("{id} description"),
            "help": format!("{id} help"),
            "helpUrl": format!("https://dequeuniversity.com/rules/axe/4.10/{id}"),
            "nodes": [{
                "target": [selector],
                "html": format!("<div id=\"{selector}\"></div>"),
                "screenshot": format!("/data/results/violation-{id}-1.png"),
                "failureSummary": "Fix this"
            }]
        })
    }

    #[test]
    fn test_empty_directory_gives_zero_report() {
        let temp = TempDir::new().unwrap();
        let model = build_model(temp.path(), "Report");
        assert_eq!(model.pages_scanned, 0);
        assert_eq!(model.total_violations, 0);
        assert!(model.rule_groups.is_empty());
        assert!(model.validate());
    }

    #[test]
    fn test_groups_and_counts() {
        let temp = TempDir::new().unwrap();
        write_json(
            temp.path(),
            "a.json",
            &json!({
                "scanned_url": "http://127.0.0.1:1/a.html",
                "source_file": "a.html",
                "violations": [
                    violation("image-alt", Some("critical"), "img"),
                    violation("color-contrast", Some("serious"), "p"),
                ]
            }),
        );
        write_json(
            temp.path(),
            "b.json",
            &json!({
                "scanned_url": "http://127.0.0.1:1/b.html",
                "source_file": "b.html",
                "violations": [violation("color-contrast", Some("serious"), "h1")]
            }),
        );

        let model = build_model(temp.path(), "Report");
        assert_eq!(model.pages_scanned, 2);
        assert_eq!(model.total_violations, 3);
        assert_eq!(model.violations_by_impact.critical, 1);
        assert_eq!(model.violations_by_impact.serious, 2);
        assert_eq!(model.raw_files, vec!["a.json", "b.json"]);

        let ids: Vec<&str> = model.rule_groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["image-alt", "color-contrast"]);

        let contrast = &model.rule_groups[1];
        assert_eq!(contrast.count, 2);
        assert_eq!(contrast.occurrences[0].source_file.as_deref(), Some("a.html"));
        assert_eq!(contrast.occurrences[1].selector.as_deref(), Some("h1"));
        assert_eq!(
            contrast.occurrences[0].screenshot_filename.as_deref(),
            Some("violation-color-contrast-1.png")
        );

        assert_eq!(model.page_summaries[0].label, "a.html");
        assert_eq!(model.page_summaries[0].total_violations, 2);
        assert!(model.validate());
    }

    #[test]
    fn test_unknown_impact_bucket() {
        let temp = TempDir::new().unwrap();
        write_json(
            temp.path(),
            "a.json",
            &json!({
                "scanned_url": "http://x/a.html",
                "violations": [
                    violation("odd", Some("catastrophic"), "div"),
                    violation("none", None, "span"),
                ]
            }),
        );

        let model = build_model(temp.path(), "Report");
        assert_eq!(model.violations_by_impact.unknown, 2);
        assert!(model.rule_groups.iter().all(|g| g.impact == Impact::Unknown));
    }

    #[test]
    fn test_invalid_artifact_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        write_json(
            temp.path(),
            "ok.json",
            &json!({"scanned_url": "http://x/ok.html", "violations": []}),
        );

        let model = build_model(temp.path(), "Report");
        assert_eq!(model.pages_scanned, 1);
        assert_eq!(model.raw_files, vec!["ok.json"]);
    }

    #[test]
    fn test_objects_without_url_are_not_pages() {
        let temp = TempDir::new().unwrap();
        write_json(temp.path(), "empty.json", &json!({}));
        write_json(temp.path(), "null_url.json", &json!({"url": null, "violations": []}));
        write_json(
            temp.path(),
            "summary.json",
            &json!({"title": "Report", "pages_scanned": 3, "total_violations": 0}),
        );
        write_json(
            temp.path(),
            "page.json",
            &json!({"scanned_url": "http://x/page.html", "violations": []}),
        );

        let model = build_model(temp.path(), "Report");
        assert_eq!(model.pages_scanned, 1);
        assert_eq!(model.raw_files, vec!["page.json"]);
    }

    #[test]
    fn test_legacy_url_key_and_file_source() {
        let temp = TempDir::new().unwrap();
        write_json(
            temp.path(),
            "legacy.json",
            &json!({
                "url": "file:///srv/site/contact.html",
                "violations": [violation("label", Some("minor"), "input")]
            }),
        );

        let model = build_model(temp.path(), "Report");
        let occurrence = &model.rule_groups[0].occurrences[0];
        assert_eq!(occurrence.url, "file:///srv/site/contact.html");
        assert_eq!(occurrence.source_file.as_deref(), Some("contact.html"));
    }

    #[test]
    fn test_occurrences_sorted_by_url() {
        let temp = TempDir::new().unwrap();
        for (file, url) in [("1.json", "http://x/z.html"), ("2.json", "http://x/a.html")] {
            write_json(
                temp.path(),
                file,
                &json!({"scanned_url": url, "violations": [violation("label", Some("minor"), "input")]}),
            );
        }

        let model = build_model(temp.path(), "Report");
        let urls: Vec<&str> = model.rule_groups[0]
            .occurrences
            .iter()
            .map(|o| o.url.as_str())
            .collect();
        assert_eq!(urls, vec!["http://x/a.html", "http://x/z.html"]);
    }

    #[test]
    fn test_validate_artifact() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.json");
        write_json(temp.path(), "good.json", &json!({"scanned_url": "u", "violations": []}));
        let no_url = temp.path().join("no_url.json");
        write_json(temp.path(), "no_url.json", &json!({"violations": []}));
        let bad_list = temp.path().join("bad_list.json");
        write_json(temp.path(), "bad_list.json", &json!({"url": "u", "violations": {}}));
        let array = temp.path().join("array.json");
        write_json(temp.path(), "array.json", &json!([]));

        assert!(validate_artifact(&good));
        assert!(!validate_artifact(&no_url));
        assert!(!validate_artifact(&bad_list));
        assert!(!validate_artifact(&array));
    }
}
