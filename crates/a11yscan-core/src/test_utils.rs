//! Test utilities: in-memory site archives and a scriptable fake browser.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Cursor;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

use crate::Result;
use crate::ScanError;
use crate::audit::AuditResults;
use crate::audit::BrowserDriver;
use crate::audit::BrowserSession;

/// Bytes returned by fake screenshots (a bare PNG signature).
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Creates an in-memory ZIP archive from `(path, content)` pairs.
///
/// Files are stored uncompressed with mode 0o644.
///
/// # Examples
///
/// ```
/// use a11yscan_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(&[("index.html", "<html></html>"), ("css/site.css", "body{}")]);
/// assert!(!zip_data.is_empty());
/// ```
#[must_use]
pub fn create_test_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = ZipTestBuilder::new();
    for (path, content) in entries {
        builder = builder.add_file(path, content.as_bytes());
    }
    builder.build()
}

/// Creates an in-memory ZIP archive with one deflated entry.
#[must_use]
pub fn create_deflated_zip(path: &str, data: &[u8]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);
    zip.start_file(path, options).unwrap();
    zip.write_all(data).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Builder for creating ZIP test archives with various entry types.
///
/// # Examples
///
/// ```
/// use a11yscan_core::test_utils::ZipTestBuilder;
///
/// let zip_data = ZipTestBuilder::new()
///     .add_directory("blog/")
///     .add_file("blog/index.html", b"<html></html>")
///     .add_symlink("leak.html", "/etc/passwd")
///     .build();
/// ```
pub struct ZipTestBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Creates a new ZIP test builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a regular file, stored uncompressed.
    #[must_use]
    pub fn add_file(mut self, path: &str, data: &[u8]) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o644);
        self.zip.start_file(path, options).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory entry.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        let options = SimpleFileOptions::default().unix_permissions(0o755);
        self.zip.add_directory(path, options).unwrap();
        self
    }

    /// Adds a symlink entry (a file whose Unix mode marks it as a link).
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o777);
        self.zip.add_symlink(path, target, options).unwrap();
        self
    }

    /// Builds and returns the ZIP archive data.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine results with one violation per `(rule id, impact)` pair.
///
/// Each violation has a single node targeting `#<rule id>`.
#[must_use]
pub fn sample_results(violations: &[(&str, &str)]) -> AuditResults {
    let violations: Vec<Value> = violations
        .iter()
        .map(|(id, impact)| {
            json!({
                "id": id,
                "impact": impact,
                "description": format!("{id} description"),
                "help": format!("{id} help"),
                "helpUrl": format!("https://dequeuniversity.com/rules/axe/4.10/{id}"),
                "tags": ["wcag2a"],
                "nodes": [{
                    "target": [format!("#{id}")],
                    "html": format!("<div id=\"{id}\"></div>"),
                    "failureSummary": "Fix any of the following"
                }]
            })
        })
        .collect();
    serde_json::from_value(json!({
        "violations": violations,
        "passes": [],
        "inapplicable": [],
        "incomplete": [],
        "testEngine": {"name": "axe-core", "version": "4.10.0"}
    }))
    .unwrap()
}

#[derive(Debug, Default)]
struct FakeState {
    fetch: bool,
    launches: usize,
    closes: usize,
    navigations: Vec<String>,
    executed: Vec<(String, Vec<Value>)>,
    injected_styles: Vec<String>,
    failing_urls: HashSet<String>,
    failing_engine_urls: HashSet<String>,
    results: HashMap<String, AuditResults>,
    redirects: HashMap<String, String>,
    url_queries: usize,
    fail_element_screenshots: bool,
    fail_page_screenshots: bool,
}

/// In-process browser double.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the auditor owns another. Pages return empty results unless configured
/// with [`FakeBrowser::set_results`].
#[derive(Debug, Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    /// Browser that accepts every URL without fetching it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Browser that fetches every URL over HTTP and fails navigation on a
    /// non-success status.
    #[must_use]
    pub fn fetching() -> Self {
        let browser = Self::default();
        browser.state().fetch = true;
        browser
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Engine results returned for URLs ending with `url_suffix`.
    pub fn set_results(&self, url_suffix: &str, results: AuditResults) {
        self.state().results.insert(url_suffix.to_string(), results);
    }

    /// Makes navigation fail for every URL ending with `url_suffix`.
    pub fn fail_navigation(&self, url_suffix: &str) {
        self.state().failing_urls.insert(url_suffix.to_string());
    }

    /// Makes the rule engine report an error on `url`.
    pub fn fail_rule_engine(&self, url: &str) {
        self.state().failing_engine_urls.insert(url.to_string());
    }

    /// Makes navigation to `from` land on `to`.
    pub fn redirect(&self, from: &str, to: &str) {
        self.state().redirects.insert(from.to_string(), to.to_string());
    }

    /// Makes every element screenshot fail.
    pub fn fail_element_screenshots(&self) {
        self.state().fail_element_screenshots = true;
    }

    /// Makes every full-page screenshot fail.
    pub fn fail_page_screenshots(&self) {
        self.state().fail_page_screenshots = true;
    }

    /// Sessions launched so far.
    #[must_use]
    pub fn launches(&self) -> usize {
        self.state().launches
    }

    /// Sessions closed so far.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Times a session was asked for its current URL.
    #[must_use]
    pub fn url_queries(&self) -> usize {
        self.state().url_queries
    }

    /// Every URL navigated to, in order.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    /// Every synchronous and asynchronous script run, with its arguments.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state().executed.clone()
    }

    /// CSS injected through `inject_style`.
    #[must_use]
    pub fn injected_styles(&self) -> Vec<String> {
        self.state().injected_styles.clone()
    }
}

impl BrowserDriver for FakeBrowser {
    fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.state().launches += 1;
        Ok(Box::new(FakeSession {
            browser: self.clone(),
            current: None,
            closed: false,
        }))
    }
}

struct FakeSession {
    browser: FakeBrowser,
    current: Option<String>,
    closed: bool,
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let (fetch, failing) = {
            let mut state = self.browser.state();
            state.navigations.push(url.to_string());
            let failing = state
                .failing_urls
                .iter()
                .any(|suffix| url.ends_with(suffix.as_str()));
            (state.fetch, failing)
        };
        if failing {
            return Err(ScanError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        if fetch {
            let status = reqwest::blocking::get(url)
                .map_err(|e| ScanError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
                .status();
            if !status.is_success() {
                return Err(ScanError::Navigation {
                    url: url.to_string(),
                    reason: format!("HTTP {status}"),
                });
            }
        }
        let landed = self.browser.state().redirects.get(url).cloned();
        self.current = Some(landed.unwrap_or_else(|| url.to_string()));
        Ok(())
    }

    fn current_url(&mut self) -> Result<String> {
        self.browser.state().url_queries += 1;
        Ok(self
            .current
            .clone()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        let mut state = self.browser.state();
        if script.contains("createElement('style')")
            && let Some(Value::String(css)) = args.first()
        {
            state.injected_styles.push(css.clone());
        }
        state.executed.push((script.to_string(), args));
        Ok(Value::Null)
    }

    fn execute_async(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        let url = self.current.clone().unwrap_or_default();
        let mut state = self.browser.state();
        state.executed.push((script.to_string(), args));
        if state.failing_engine_urls.contains(&url) {
            return Ok(json!({"error": "axe.run rejected"}));
        }
        let results = state
            .results
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, results)| results.clone())
            .unwrap_or_default();
        Ok(serde_json::to_value(results).unwrap())
    }

    fn element_screenshot(&mut self, selector: &str) -> Result<Vec<u8>> {
        if self.browser.state().fail_element_screenshots {
            return Err(ScanError::Browser(format!("no element matches {selector}")));
        }
        Ok(FAKE_PNG.to_vec())
    }

    fn page_screenshot(&mut self) -> Result<Vec<u8>> {
        if self.browser.state().fail_page_screenshots {
            return Err(ScanError::Browser("screenshot failed".to_string()));
        }
        Ok(FAKE_PNG.to_vec())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.browser.state().closes += 1;
        }
        Ok(())
    }
}
