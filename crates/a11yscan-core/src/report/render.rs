//! HTML rendering of a [`ReportModel`].
//!
//! The document is self-contained (inline CSS, no scripts). Every value that
//! comes from an artifact is escaped; screenshot links are relative to the
//! report so the file works when opened straight from disk.

use std::fmt::Write as _;

use super::model::Occurrence;
use super::model::ReportModel;
use super::model::RuleGroup;
use crate::audit::Impact;

const STYLE: &str = "\
body{font-family:system-ui,-apple-system,Segoe UI,Roboto,sans-serif;margin:0;padding:0 2rem 3rem;color:#1f2328;background:#f6f8fa}
header{padding:1.5rem 0}
h1{margin:0 0 .25rem}
.meta{color:#57606a;font-size:.9rem}
.summary{display:flex;flex-wrap:wrap;gap:1rem;margin:1rem 0 2rem}
.card{background:#fff;border:1px solid #d0d7de;border-radius:6px;padding:.75rem 1rem;min-width:8rem}
.card .value{font-size:1.6rem;font-weight:600}
table{border-collapse:collapse;width:100%;background:#fff}
th,td{border:1px solid #d0d7de;padding:.4rem .6rem;text-align:left;vertical-align:top}
section.rule{background:#fff;border:1px solid #d0d7de;border-radius:6px;margin:1rem 0;padding:1rem}
.badge{display:inline-block;border-radius:1rem;padding:.1rem .6rem;font-size:.8rem;font-weight:600;color:#fff}
.impact-critical{background:#a40e26}
.impact-serious{background:#d1242f}
.impact-moderate{background:#bc4c00}
.impact-minor{background:#4d2d00}
.impact-unknown{background:#6e7781}
pre{white-space:pre-wrap;word-break:break-all;background:#f6f8fa;padding:.5rem;border-radius:4px;margin:.25rem 0}
img.shot{max-width:320px;border:1px solid #d0d7de}
.clean{background:#dafbe1;border:1px solid #4ac26b;border-radius:6px;padding:1rem}";

/// Escapes text for use in HTML content and double-quoted attributes.
///
/// # Examples
///
/// ```
/// use a11yscan_core::report::escape_html;
///
/// assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Only http(s) links are rendered as anchors.
fn safe_href(url: &str) -> Option<String> {
    let lower = url.trim_start().to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")).then(|| escape_html(url))
}

fn impact_badge(impact: Impact) -> String {
    format!("<span class=\"badge impact-{impact}\">{impact}</span>")
}

/// Renders the report as a standalone HTML document.
///
/// `results_web_base` is the `/`-separated path from the report's directory
/// to the results directory (for example `../results`).
#[must_use]
pub fn render_html(model: &ReportModel, results_web_base: &str) -> String {
    let mut html = String::with_capacity(16 * 1024);
    let title = escape_html(&model.title);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>\n"
    );
    let _ = write!(
        html,
        "<header>\n<h1>{title}</h1>\n<p class=\"meta\">Generated {}</p>\n</header>\n<main>\n",
        model.generated_at.format("%Y-%m-%d %H:%M:%SZ")
    );

    render_summary(&mut html, model);

    if model.rule_groups.is_empty() {
        let message = if model.pages_scanned == 0 {
            "No pages were scanned."
        } else {
            "No accessibility violations were found."
        };
        let _ = writeln!(html, "<p class=\"clean\">{message}</p>");
    } else {
        render_pages(&mut html, model);
        html.push_str("<h2>Violations by rule</h2>\n");
        for group in &model.rule_groups {
            render_group(&mut html, group, results_web_base);
        }
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_summary(html: &mut String, model: &ReportModel) {
    html.push_str("<section class=\"summary\" aria-label=\"Summary\">\n");
    let _ = writeln!(
        html,
        "<div class=\"card\"><div class=\"value\">{}</div>Pages scanned</div>",
        model.pages_scanned
    );
    let _ = writeln!(
        html,
        "<div class=\"card\"><div class=\"value\">{}</div>Total violations</div>",
        model.total_violations
    );
    for level in Impact::ALL {
        let _ = writeln!(
            html,
            "<div class=\"card\"><div class=\"value\">{}</div>{}</div>",
            model.violations_by_impact.get(level),
            impact_badge(level)
        );
    }
    html.push_str("</section>\n");
}

fn render_pages(html: &mut String, model: &ReportModel) {
    html.push_str(
        "<h2>Pages</h2>\n<table>\n<thead><tr><th scope=\"col\">Page</th>\
         <th scope=\"col\">Violations</th><th scope=\"col\">By impact</th></tr></thead>\n<tbody>\n",
    );
    for page in &model.page_summaries {
        let label = escape_html(&page.label);
        let page_cell = safe_href(&page.url)
            .map_or_else(|| label.clone(), |href| format!("<a href=\"{href}\">{label}</a>"));
        let breakdown = page
            .impact_counts
            .non_zero()
            .map(|(level, count)| format!("{} {count}", impact_badge(level)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            html,
            "<tr><td>{page_cell}</td><td>{}</td><td>{breakdown}</td></tr>",
            page.total_violations
        );
    }
    html.push_str("</tbody>\n</table>\n");
}

fn render_group(html: &mut String, group: &RuleGroup, results_web_base: &str) {
    let id = escape_html(&group.id);
    let _ = writeln!(
        html,
        "<section class=\"rule\" id=\"rule-{id}\">\n<h3>{} <code>{id}</code> ({} occurrence{})</h3>",
        impact_badge(group.impact),
        group.count,
        if group.count == 1 { "" } else { "s" }
    );
    if !group.help.is_empty() {
        let _ = writeln!(html, "<p><strong>{}</strong></p>", escape_html(&group.help));
    }
    if !group.description.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", escape_html(&group.description));
    }
    if let Some(href) = safe_href(&group.help_url) {
        let _ = writeln!(html, "<p><a href=\"{href}\">How to fix</a></p>");
    }

    html.push_str(
        "<table>\n<thead><tr><th scope=\"col\">Page</th><th scope=\"col\">Element</th>\
         <th scope=\"col\">Screenshot</th></tr></thead>\n<tbody>\n",
    );
    for occurrence in &group.occurrences {
        render_occurrence(html, occurrence, results_web_base);
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
}

fn render_occurrence(html: &mut String, occurrence: &Occurrence, results_web_base: &str) {
    let url = escape_html(&occurrence.url);
    let page = match (&occurrence.source_file, safe_href(&occurrence.url)) {
        (Some(source), Some(href)) => {
            format!("<a href=\"{href}\">{}</a><br><small>{url}</small>", escape_html(source))
        }
        (Some(source), None) => escape_html(source),
        (None, Some(href)) => format!("<a href=\"{href}\">{url}</a>"),
        (None, None) => url,
    };

    let mut element = String::new();
    if let Some(selector) = &occurrence.selector {
        let _ = write!(element, "<code>{}</code>", escape_html(selector));
    }
    if occurrence.node_count > 1 {
        let _ = write!(element, " <small>(+{} more)</small>", occurrence.node_count - 1);
    }
    if let Some(snippet) = &occurrence.html_snippet {
        let _ = write!(element, "<pre>{}</pre>", escape_html(snippet));
    }
    if let Some(summary) = &occurrence.failure_summary {
        let _ = write!(element, "<pre>{}</pre>", escape_html(summary));
    }

    let screenshot = occurrence.screenshot_filename.as_deref().map_or_else(
        || "&mdash;".to_string(),
        |name| {
            let src = escape_html(&join_web_path(results_web_base, name));
            format!(
                "<a href=\"{src}\"><img class=\"shot\" src=\"{src}\" alt=\"Screenshot of the violating element\" loading=\"lazy\"></a>"
            )
        },
    );

    let _ = writeln!(html, "<tr><td>{page}</td><td>{element}</td><td>{screenshot}</td></tr>");
}

fn join_web_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}
