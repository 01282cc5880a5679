//! W3C WebDriver client for a headless Chrome driven by chromedriver.

use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use reqwest::blocking::Client;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::browser::BrowserDriver;
use super::browser::BrowserSession;
use crate::AuditConfig;
use crate::Result;
use crate::ScanError;

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// How long a spawned driver gets to report ready.
const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Launches Chrome sessions through a WebDriver endpoint.
///
/// With `AuditConfig::driver_binary` set, every session spawns its own
/// chromedriver on `driver_port` and kills it on close; otherwise sessions are
/// opened against `AuditConfig::webdriver_url`.
#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    config: AuditConfig,
    client: Client,
}

impl WebDriverBrowser {
    /// Creates a driver for `config`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Browser` if the HTTP client cannot be built.
    pub fn new(config: AuditConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.navigation_timeout + config.script_timeout)
            .build()
            .map_err(|e| ScanError::Browser(format!("failed to build WebDriver client: {e}")))?;
        Ok(Self { config, client })
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            format!(
                "--window-size={},{}",
                self.config.viewport_width, self.config.viewport_height
            ),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.config.headless {
            args.insert(0, "--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                    "timeouts": {
                        "pageLoad": duration_ms(self.config.navigation_timeout),
                        "script": duration_ms(self.config.script_timeout),
                    }
                }
            }
        })
    }

    fn spawn_driver(&self) -> Result<Option<(Child, String)>> {
        let Some(binary) = &self.config.driver_binary else {
            return Ok(None);
        };
        let port = self.config.driver_port;
        let child = Command::new(binary)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ScanError::Browser(format!("failed to spawn {}: {e}", binary.display()))
            })?;
        let endpoint = format!("http://127.0.0.1:{port}");
        debug!(driver = %binary.display(), %endpoint, "spawned WebDriver process");
        Ok(Some((child, endpoint)))
    }

    fn wait_until_ready(&self, endpoint: &str) -> Result<()> {
        let deadline = Instant::now() + DRIVER_STARTUP_TIMEOUT;
        loop {
            let ready = self
                .client
                .get(format!("{endpoint}/status"))
                .send()
                .ok()
                .and_then(|resp| resp.json::<Value>().ok())
                .and_then(|body| body["value"]["ready"].as_bool())
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScanError::Browser(format!(
                    "WebDriver at {endpoint} did not become ready within {DRIVER_STARTUP_TIMEOUT:?}"
                )));
            }
            thread::sleep(Duration::from_millis(100));
        }
    }

    fn open_session(&self, endpoint: &str, spawned: bool) -> Result<String> {
        if spawned {
            self.wait_until_ready(endpoint)?;
        }
        let value = send(
            &self.client,
            Method::POST,
            &format!("{endpoint}/session"),
            Some(self.capabilities()),
        )?;
        value["sessionId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScanError::Browser("WebDriver returned no sessionId".to_string()))
    }
}

impl BrowserDriver for WebDriverBrowser {
    fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let mut driver = self.spawn_driver()?;
        let endpoint = driver
            .as_ref()
            .map_or_else(|| self.config.webdriver_url.clone(), |(_, e)| e.clone());
        let endpoint = endpoint.trim_end_matches('/').to_string();

        let session_id = match self.open_session(&endpoint, driver.is_some()) {
            Ok(id) => id,
            Err(e) => {
                if let Some((child, _)) = driver.as_mut() {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                return Err(e);
            }
        };

        info!(%endpoint, session = %session_id, "browser session started");
        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!("{endpoint}/session/{session_id}"),
            driver: driver.map(|(child, _)| child),
            closed: false,
        }))
    }
}

/// A WebDriver session; closed on drop if `close` was not called.
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    base: String,
    driver: Option<Child>,
    closed: bool,
}

impl WebDriverSession {
    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        if self.closed {
            return Err(ScanError::Browser("session is closed".to_string()));
        }
        send(&self.client, method, &format!("{}{path}", self.base), body)
    }

    fn find_element(&self, selector: &str) -> Result<String> {
        let value = self.command(
            Method::POST,
            "/element",
            Some(json!({ "using": "css selector", "value": selector })),
        )?;
        value[ELEMENT_KEY]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScanError::Browser(format!("no element reference for {selector}")))
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .map(|_| ())
            .map_err(|e| ScanError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn current_url(&mut self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScanError::Browser("current URL is not a string".to_string()))
    }

    fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
    }

    fn execute_async(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/async",
            Some(json!({ "script": script, "args": args })),
        )
    }

    fn element_screenshot(&mut self, selector: &str) -> Result<Vec<u8>> {
        let element = self.find_element(selector)?;
        let value = self.command(Method::GET, &format!("/element/{element}/screenshot"), None)?;
        decode_png(&value)
    }

    fn page_screenshot(&mut self) -> Result<Vec<u8>> {
        let value = self.command(Method::GET, "/screenshot", None)?;
        decode_png(&value)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = send(&self.client, Method::DELETE, &self.base, None).map(|_| ());
        self.closed = true;
        if let Some(mut child) = self.driver.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        debug!(session = %self.base, "browser session closed");
        result
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close browser session");
        }
    }
}

/// Sends one WebDriver command and unwraps the `value` member.
fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
    let mut request = client.request(method.clone(), url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .map_err(|e| ScanError::Browser(format!("{method} {url}: {e}")))?;
    let payload: Value = response
        .json()
        .map_err(|e| ScanError::Browser(format!("{method} {url}: invalid response: {e}")))?;

    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(ScanError::Browser(format!("{error}: {message}")));
    }
    Ok(value)
}

fn decode_png(value: &Value) -> Result<Vec<u8>> {
    let encoded = value
        .as_str()
        .ok_or_else(|| ScanError::Browser("screenshot payload is not a string".to_string()))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| ScanError::Browser(format!("screenshot payload is not base64: {e}")))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
