//! Browser automation seam.
//!
//! The auditor only needs a handful of page operations. Implementations can
//! drive a real browser ([`crate::audit::WebDriverBrowser`]) or a test
//! double.

use serde_json::Value;

use crate::Result;

/// Launches browser sessions.
pub trait BrowserDriver {
    /// Starts a new browser session with a blank page.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the browser cannot be started.
    fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One live browser session with a single page.
pub trait BrowserSession {
    /// Navigates to `url` and waits for the page to load.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Navigation` on timeout or load failure.
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current page.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the session is gone.
    fn current_url(&mut self) -> Result<String>;

    /// Runs a synchronous script; `args` are exposed as `arguments[i]`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the script throws.
    fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Runs an asynchronous script; the last argument is the completion
    /// callback.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the script throws or times out.
    fn execute_async(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// PNG screenshot of the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if no element matches or capture fails.
    fn element_screenshot(&mut self, selector: &str) -> Result<Vec<u8>>;

    /// PNG screenshot of the full viewport.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if capture fails.
    fn page_screenshot(&mut self) -> Result<Vec<u8>>;

    /// Appends a `<style>` element with `css` to the current document.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the script fails.
    fn inject_style(&mut self, css: &str) -> Result<()> {
        self.execute(
            "const style = document.createElement('style');\
             style.textContent = arguments[0];\
             (document.head || document.documentElement).appendChild(style);",
            vec![Value::String(css.to_string())],
        )?;
        Ok(())
    }

    /// Ends the session and releases browser resources.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if teardown fails; the session is
    /// unusable either way.
    fn close(&mut self) -> Result<()>;
}
