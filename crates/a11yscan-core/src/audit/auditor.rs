//! Page Auditor: navigates, audits, captures screenshots and persists one
//! artifact per page.

use std::fmt::Write as _;
use std::fs;
use std::ops::Deref;
use std::ops::DerefMut;
use std::path::Component;
use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::browser::BrowserDriver;
use super::browser::BrowserSession;
use super::model::RuleResult;
use super::model::ScanResult;
use super::rules::RuleEngine;
use crate::Result;
use crate::ScanError;

/// Hex characters of the path digest appended to artifact names.
const DIGEST_LEN: usize = 12;

/// Longest sanitized stem kept in an artifact name; with the digest and
/// extension the name stays under the common 255-byte file name limit.
const MAX_STEM_LEN: usize = 200;

const HIGHLIGHT_SCRIPT: &str = "\
const el = document.querySelector(arguments[0]);
if (!el) { throw new Error('no element matches ' + arguments[0]); }
el.style.outline = '3px solid red';
el.style.outlineOffset = '2px';";

/// Audits pages with one reusable browser session.
///
/// Use [`PageAuditor::with_session`] (or `open`/`close`) to share a session
/// across many `scan` calls. Without an open session each `scan` launches and
/// releases a private one.
pub struct PageAuditor<D: BrowserDriver, E: RuleEngine> {
    driver: D,
    engine: E,
    session: Option<Box<dyn BrowserSession>>,
}

impl<D: BrowserDriver, E: RuleEngine> PageAuditor<D, E> {
    /// Creates an auditor with no open session.
    pub fn new(driver: D, engine: E) -> Self {
        Self {
            driver,
            engine,
            session: None,
        }
    }

    /// Returns the browser driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns `true` while a shared session is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Launches the shared session. A second call is ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the browser cannot be launched.
    pub fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            warn!("browser session already open, ignoring open request");
            return Ok(());
        }
        info!("starting shared browser session");
        self.session = Some(self.driver.launch()?);
        Ok(())
    }

    /// Releases the shared session. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close() {
                warn!(error = %e, "browser session did not close cleanly");
            }
            info!("browser session stopped");
        }
    }

    /// Opens a session, runs `f`, and closes the session on every exit path
    /// (including errors and panics in `f`).
    ///
    /// # Errors
    ///
    /// Returns the launch error or whatever `f` returns.
    pub fn with_session<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.open()?;
        let mut guard = SessionGuard { auditor: self };
        f(&mut guard)
    }

    /// Audits `url` and writes the artifact to `artifact_path`.
    ///
    /// Screenshots land next to the artifact. Screenshot failures never fail
    /// the page; the node's `screenshot` stays `null`.
    ///
    /// # Errors
    ///
    /// - `ScanError::Navigation` if the page cannot be loaded
    /// - `ScanError::RuleEngine` if the audit fails
    /// - `ScanError::Io` / `ScanError::Artifact` if the artifact cannot be
    ///   written
    ///
    /// All of these are recoverable at page level.
    pub fn scan(
        &mut self,
        url: &str,
        artifact_path: &Path,
        source_file: Option<&str>,
    ) -> Result<Vec<RuleResult>> {
        if self.session.is_some() {
            return self.scan_in_session(url, artifact_path, source_file);
        }

        debug!(%url, "no shared session, using a single-use browser");
        self.open()?;
        let mut guard = SessionGuard { auditor: self };
        guard.scan_in_session(url, artifact_path, source_file)
    }

    fn scan_in_session(
        &mut self,
        url: &str,
        artifact_path: &Path,
        source_file: Option<&str>,
    ) -> Result<Vec<RuleResult>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ScanError::Browser("no browser session".to_string()))?;

        info!(%url, "scanning page");
        let artifact_dir = artifact_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(artifact_dir)?;

        session.navigate(url)?;
        match session.current_url() {
            Ok(landed) if landed != url => info!(%url, %landed, "page redirected"),
            Ok(_) => {}
            Err(e) => debug!(%url, error = %e, "current URL unavailable"),
        }

        let mut results = self.engine.run(session.as_mut()).map_err(|e| match e {
            ScanError::RuleEngine(_) => e,
            other => ScanError::RuleEngine(other.to_string()),
        })?;

        if results.violations.is_empty() {
            info!(%url, "no accessibility violations found");
        } else {
            warn!(%url, count = results.violations.len(), "found accessibility violations");
        }

        for violation in &mut results.violations {
            let screenshot = capture_violation_screenshot(session.as_mut(), violation, artifact_dir);
            if let Some(node) = violation.nodes.first_mut() {
                node.screenshot = screenshot;
            }
        }

        let scan = ScanResult::from_audit(url, source_file.map(str::to_string), results, Utc::now());
        scan.write_to(artifact_path)?;
        info!(artifact = %artifact_path.display(), "scan artifact saved");

        Ok(scan.violations)
    }
}

impl<D: BrowserDriver, E: RuleEngine> Drop for PageAuditor<D, E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Closes the auditor's session when dropped.
struct SessionGuard<'a, D: BrowserDriver, E: RuleEngine> {
    auditor: &'a mut PageAuditor<D, E>,
}

impl<D: BrowserDriver, E: RuleEngine> Deref for SessionGuard<'_, D, E> {
    type Target = PageAuditor<D, E>;

    fn deref(&self) -> &Self::Target {
        self.auditor
    }
}

impl<D: BrowserDriver, E: RuleEngine> DerefMut for SessionGuard<'_, D, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.auditor
    }
}

impl<D: BrowserDriver, E: RuleEngine> Drop for SessionGuard<'_, D, E> {
    fn drop(&mut self) {
        self.auditor.close();
    }
}

/// Highlights and captures the first target of the first node, falling back
/// to a full-page capture. Returns the written path.
fn capture_violation_screenshot(
    session: &mut dyn BrowserSession,
    violation: &RuleResult,
    dir: &Path,
) -> Option<String> {
    let selector = violation.first_selector()?.to_string();
    let path = dir.join(screenshot_file_name(&violation.id));

    let png = match highlight_and_capture(session, &selector) {
        Ok(png) => png,
        Err(e) => {
            debug!(%selector, error = %e, "element screenshot failed, using full page");
            match full_page_capture(session, &selector) {
                Ok(png) => png,
                Err(e) => {
                    error!(%selector, error = %e, "failed to capture screenshot");
                    return None;
                }
            }
        }
    };

    if let Err(e) = fs::write(&path, png) {
        error!(path = %path.display(), error = %e, "failed to write screenshot");
        return None;
    }
    info!(rule = %violation.id, path = %path.display(), "captured violation screenshot");
    Some(path.display().to_string())
}

fn highlight_and_capture(session: &mut dyn BrowserSession, selector: &str) -> Result<Vec<u8>> {
    session.execute(HIGHLIGHT_SCRIPT, vec![Value::String(selector.to_string())])?;
    session.element_screenshot(selector)
}

fn full_page_capture(session: &mut dyn BrowserSession, selector: &str) -> Result<Vec<u8>> {
    session.inject_style(&format!("{selector} {{ border: 5px solid red !important; }}"))?;
    session.page_screenshot()
}

/// `violation-<rule>-<uuid v4>.png`.
#[must_use]
pub fn screenshot_file_name(rule_id: &str) -> String {
    format!("violation-{}-{}.png", sanitize(rule_id), Uuid::new_v4())
}

/// Artifact file name for a page at `relative` inside the site.
///
/// The name is the flattened path plus a short SHA-256 digest of the path,
/// so distinct pages never share an artifact even when flattening collides
/// (`a/b.html` vs `a_b.html`). Long paths are cut to a bounded stem; the
/// digest still tells them apart.
///
/// # Examples
///
/// ```
/// use a11yscan_core::audit::artifact_name;
/// use std::path::Path;
///
/// let name = artifact_name(Path::new("blog/post.html"));
/// assert!(name.starts_with("blog_post.html-"));
/// assert!(name.ends_with(".json"));
/// assert_ne!(name, artifact_name(Path::new("blog_post.html")));
/// ```
#[must_use]
pub fn artifact_name(relative: &Path) -> String {
    let label = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    named_with_digest(&label.replace('/', "_"), &label)
}

/// Artifact file name for a live URL.
#[must_use]
pub fn live_artifact_name(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    named_with_digest(without_scheme.trim_end_matches('/'), url)
}

fn named_with_digest(stem: &str, identity: &str) -> String {
    let mut stem = sanitize(stem);
    // sanitize only emits ASCII, so any byte index is a char boundary
    stem.truncate(MAX_STEM_LEN);
    if stem.is_empty() {
        stem.push_str("page");
    }
    let digest = Sha256::digest(identity.as_bytes());
    let mut hex = String::with_capacity(DIGEST_LEN);
    for byte in digest.iter().take(DIGEST_LEN / 2) {
        let _ = write!(hex, "{byte:02x}");
    }
    format!("{stem}-{hex}.json")
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::AxeEngine;
    use crate::audit::model::AuditResults;
    use crate::test_utils::FakeBrowser;
    use crate::test_utils::sample_results;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn auditor(browser: &FakeBrowser) -> PageAuditor<FakeBrowser, AxeEngine> {
        PageAuditor::new(browser.clone(), AxeEngine::from_source("/* axe */"))
    }

    #[test]
    fn test_scan_writes_artifact_with_screenshots() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.set_results("http://site.test/index.html", sample_results(&[("image-alt", "critical")]));
        let mut auditor = auditor(&browser);

        let artifact = temp.path().join("results/index.html-abc.json");
        let violations = auditor
            .with_session(|a| a.scan("http://site.test/index.html", &artifact, Some("index.html")))
            .expect("scan should succeed");

        assert_eq!(violations.len(), 1);
        let shot = violations[0].nodes[0].screenshot.clone().expect("screenshot path");
        assert!(Path::new(&shot).is_file());
        assert!(shot.contains("violation-image-alt-"));

        let saved = ScanResult::read_from(&artifact).unwrap();
        assert_eq!(saved.scanned_url, "http://site.test/index.html");
        assert_eq!(saved.source_file.as_deref(), Some("index.html"));
        assert_eq!(browser.launches(), 1);
        assert_eq!(browser.closes(), 1);
    }

    #[test]
    fn test_redirect_keeps_requested_url() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.redirect("http://site.test/old.html", "http://site.test/new.html");
        let mut auditor = auditor(&browser);

        let artifact = temp.path().join("old.json");
        auditor
            .with_session(|a| a.scan("http://site.test/old.html", &artifact, Some("old.html")))
            .unwrap();

        assert_eq!(browser.url_queries(), 1);
        let saved = ScanResult::read_from(&artifact).unwrap();
        assert_eq!(saved.scanned_url, "http://site.test/old.html");
    }

    #[test]
    fn test_screenshot_falls_back_to_full_page() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.fail_element_screenshots();
        browser.set_results("http://site.test/a.html", sample_results(&[("label", "serious")]));
        let mut auditor = auditor(&browser);

        let violations = auditor
            .scan("http://site.test/a.html", &temp.path().join("a.json"), None)
            .unwrap();
        assert!(violations[0].nodes[0].screenshot.is_some());
        assert_eq!(browser.injected_styles().len(), 1);
        assert!(browser.injected_styles()[0].contains("border: 5px solid red"));
    }

    #[test]
    fn test_screenshot_total_failure_keeps_page() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.fail_element_screenshots();
        browser.fail_page_screenshots();
        browser.set_results("http://site.test/a.html", sample_results(&[("label", "serious")]));
        let mut auditor = auditor(&browser);

        let artifact = temp.path().join("a.json");
        let violations = auditor.scan("http://site.test/a.html", &artifact, None).unwrap();
        assert!(violations[0].nodes[0].screenshot.is_none());

        let raw: Value = serde_json::from_slice(&fs::read(&artifact).unwrap()).unwrap();
        assert!(raw["violations"][0]["nodes"][0]["screenshot"].is_null());
    }

    #[test]
    fn test_highlight_receives_selector_as_argument() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        let mut results = sample_results(&[("color-contrast", "serious")]);
        results.violations[0].nodes[0].target = vec!["a[href='x'); alert(1); ('".to_string()];
        browser.set_results("http://site.test/a.html", results);
        let mut auditor = auditor(&browser);

        auditor
            .scan("http://site.test/a.html", &temp.path().join("a.json"), None)
            .unwrap();
        let (script, args) = browser
            .executed()
            .into_iter()
            .find(|(script, _)| script.contains("outline"))
            .expect("highlight script executed");
        assert!(!script.contains("alert(1)"));
        assert_eq!(args, vec![Value::String("a[href='x'); alert(1); ('".to_string())]);
    }

    #[test]
    fn test_single_use_mode_releases_browser() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        let mut auditor = auditor(&browser);

        auditor.scan("http://site.test/a.html", &temp.path().join("a.json"), None).unwrap();
        auditor.scan("http://site.test/b.html", &temp.path().join("b.json"), None).unwrap();

        assert_eq!(browser.launches(), 2);
        assert_eq!(browser.closes(), 2);
        assert!(!auditor.is_open());
    }

    #[test]
    fn test_shared_session_is_reused() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        let mut auditor = auditor(&browser);

        auditor
            .with_session(|a| {
                a.scan("http://site.test/a.html", &temp.path().join("a.json"), None)?;
                a.scan("http://site.test/b.html", &temp.path().join("b.json"), None)?;
                Ok(())
            })
            .unwrap();

        assert_eq!(browser.launches(), 1);
        assert_eq!(browser.closes(), 1);
    }

    #[test]
    fn test_with_session_releases_after_error() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.fail_navigation("http://site.test/broken.html");
        let mut auditor = auditor(&browser);

        let result = auditor.with_session(|a| {
            a.scan("http://site.test/broken.html", &temp.path().join("x.json"), None)
        });

        let err = result.unwrap_err();
        assert!(matches!(err, ScanError::Navigation { .. }));
        assert!(err.is_page_recoverable());
        assert!(!auditor.is_open());
        assert_eq!(browser.closes(), 1);
        assert!(!temp.path().join("x.json").exists());
    }

    #[test]
    fn test_rule_engine_failure_is_recoverable() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        browser.fail_rule_engine("http://site.test/a.html");
        let mut auditor = auditor(&browser);

        let err = auditor
            .scan("http://site.test/a.html", &temp.path().join("a.json"), None)
            .unwrap_err();
        assert!(matches!(err, ScanError::RuleEngine(_)));
    }

    #[test]
    fn test_engine_metadata_kept() {
        let temp = TempDir::new().unwrap();
        let browser = FakeBrowser::new();
        let mut results = AuditResults::default();
        results
            .metadata
            .insert("testEngine".to_string(), serde_json::json!({"name": "axe-core"}));
        results
            .metadata
            .insert("timestamp".to_string(), serde_json::json!("engine-time"));
        browser.set_results("http://site.test/a.html", results);
        let mut auditor = auditor(&browser);

        let artifact = temp.path().join("a.json");
        auditor.scan("http://site.test/a.html", &artifact, None).unwrap();
        let raw: Value = serde_json::from_slice(&fs::read(&artifact).unwrap()).unwrap();
        assert_eq!(raw["testEngine"]["name"], "axe-core");
        assert_ne!(raw["timestamp"], "engine-time");
    }

    #[test]
    fn test_artifact_names_are_unique() {
        let names: HashSet<String> = ["a/b.html", "a_b.html", "a/b/index.html", "a_b/index.html"]
            .iter()
            .map(|p| artifact_name(Path::new(p)))
            .collect();
        assert_eq!(names.len(), 4);
        assert_eq!(artifact_name(Path::new("index.html")), artifact_name(Path::new("./index.html")));
    }

    #[test]
    fn test_deep_page_gets_writable_artifact_name() {
        let segment = "a".repeat(60);
        let deep = format!("{segment}/{segment}/{segment}/{segment}/index.html");
        let sibling = format!("{segment}/{segment}/{segment}/{segment}/other.html");

        let name = artifact_name(Path::new(&deep));
        assert!(name.len() < 255, "name is {} bytes", name.len());
        assert!(name.ends_with(".json"));
        assert_ne!(name, artifact_name(Path::new(&sibling)));

        let temp = TempDir::new().unwrap();
        let result = ScanResult::from_audit(
            "http://site.test/deep/index.html",
            Some(deep),
            AuditResults::default(),
            Utc::now(),
        );
        result.write_to(&temp.path().join(&name)).unwrap();
        assert!(temp.path().join(&name).is_file());
    }

    #[test]
    fn test_long_live_url_is_bounded() {
        let url = format!("https://example.com/search?q={}", "x".repeat(400));
        let name = live_artifact_name(&url);
        assert!(name.len() < 255);
        assert_ne!(name, live_artifact_name(&format!("{url}y")));
    }

    #[test]
    fn test_live_artifact_name() {
        let name = live_artifact_name("https://example.com/about/");
        assert!(name.starts_with("example.com_about-"));
        assert_ne!(name, live_artifact_name("https://example.com/about"));
    }

    #[test]
    fn test_screenshot_file_name_shape() {
        let name = screenshot_file_name("aria/role");
        assert!(name.starts_with("violation-aria_role-"));
        assert!(name.ends_with(".png"));
        assert_ne!(name, screenshot_file_name("aria/role"));
    }
}
