//! Configuration for extraction limits, hosting, auditing and the working
//! directory layout.

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the WebDriver endpoint.
pub const WEBDRIVER_URL_ENV: &str = "A11Y_WEBDRIVER_URL";

/// Environment variable pointing at the axe-core script.
pub const AXE_SCRIPT_ENV: &str = "A11Y_AXE_SCRIPT";

/// Environment variable pointing at a chromedriver binary to spawn per session.
pub const CHROMEDRIVER_ENV: &str = "A11Y_CHROMEDRIVER";

/// Security configuration with default-deny settings for archive extraction.
///
/// Site archives are untrusted input. These limits bound what a single
/// archive may write to disk before the scan even starts.
///
/// # Examples
///
/// ```
/// use a11yscan_core::SecurityConfig;
///
/// let config = SecurityConfig::default();
/// assert_eq!(config.max_total_size, 500 * 1024 * 1024);
///
/// let custom = SecurityConfig {
///     max_file_size: 10 * 1024 * 1024,
///     ..Default::default()
/// };
/// assert_eq!(custom.max_file_size, 10 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum size for a single extracted file in bytes.
    pub max_file_size: u64,

    /// Maximum total size for all extracted files in bytes.
    pub max_total_size: u64,

    /// Maximum compression ratio allowed (uncompressed / compressed).
    pub max_compression_ratio: f64,

    /// Maximum number of entries that can be extracted.
    pub max_file_count: usize,

    /// Maximum path depth allowed.
    pub max_path_depth: usize,

    /// List of banned path components (e.g., ".git", ".ssh").
    pub banned_path_components: Vec<String>,
}

impl Default for SecurityConfig {
    /// Default values:
    /// - `max_file_size`: 50 MB
    /// - `max_total_size`: 500 MB
    /// - `max_compression_ratio`: 100.0
    /// - `max_file_count`: 10,000
    /// - `max_path_depth`: 32
    /// - `banned_path_components`: `[".git", ".ssh", ".gnupg", ".aws", ".env"]`
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_total_size: 500 * 1024 * 1024,
            max_compression_ratio: 100.0,
            max_file_count: 10_000,
            max_path_depth: 32,
            banned_path_components: vec![
                ".git".to_string(),
                ".ssh".to_string(),
                ".gnupg".to_string(),
                ".aws".to_string(),
                ".env".to_string(),
            ],
        }
    }
}

impl SecurityConfig {
    /// Validates whether a path component is allowed.
    ///
    /// Comparison is case-insensitive to prevent bypass on case-insensitive
    /// filesystems.
    #[must_use]
    pub fn is_path_component_allowed(&self, component: &str) -> bool {
        !self
            .banned_path_components
            .iter()
            .any(|banned| banned.eq_ignore_ascii_case(component))
    }
}

/// Configuration for the ephemeral content server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Loopback host to bind.
    pub host: String,

    /// Upper bound on waiting for the server thread during shutdown.
    pub shutdown_timeout: Duration,

    /// How often the accept loop checks for a shutdown request.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            shutdown_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Browser and rule-engine settings for the page auditor.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,

    /// Optional chromedriver binary; when set, one driver process is spawned
    /// per browser session on `driver_port`.
    pub driver_binary: Option<PathBuf>,

    /// Port used when spawning `driver_binary`.
    pub driver_port: u16,

    /// Path to the axe-core script injected into each page.
    pub axe_script: PathBuf,

    /// Run the browser without a window.
    pub headless: bool,

    /// Viewport width in CSS pixels.
    pub viewport_width: u32,

    /// Viewport height in CSS pixels.
    pub viewport_height: u32,

    /// Page load timeout for navigation.
    pub navigation_timeout: Duration,

    /// Timeout for injected scripts, including the axe run.
    pub script_timeout: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:9515".to_string(),
            driver_binary: None,
            driver_port: 9515,
            axe_script: PathBuf::from("vendor/axe.min.js"),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout: Duration::from_secs(30),
            script_timeout: Duration::from_secs(60),
        }
    }
}

impl AuditConfig {
    /// Applies `A11Y_WEBDRIVER_URL`, `A11Y_AXE_SCRIPT` and `A11Y_CHROMEDRIVER`
    /// overrides on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env_non_empty(WEBDRIVER_URL_ENV) {
            config.webdriver_url = url;
        }
        if let Some(script) = env_non_empty(AXE_SCRIPT_ENV) {
            config.axe_script = PathBuf::from(script);
        }
        if let Some(binary) = env_non_empty(CHROMEDRIVER_ENV) {
            config.driver_binary = Some(PathBuf::from(binary));
        }
        config
    }

    /// Sets the WebDriver endpoint.
    #[must_use]
    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = url.into();
        self
    }

    /// Sets the axe-core script path.
    #[must_use]
    pub fn with_axe_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.axe_script = path.into();
        self
    }

    /// Sets the navigation timeout.
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Working directory layout for one scan run.
///
/// All directories derive from a base path:
///
/// ```text
/// <base>/data/unzip     input archive
/// <base>/data/scan      extracted site
/// <base>/data/results   per-page artifacts and screenshots
/// <base>/data/reports   rendered report
/// ```
///
/// # Examples
///
/// ```
/// use a11yscan_core::Settings;
/// use std::path::Path;
///
/// let settings = Settings::new("/srv/site");
/// assert_eq!(settings.scan_dir(), Path::new("/srv/site/data/scan"));
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    base_path: PathBuf,
    data_dir: PathBuf,
    unzip_dir: PathBuf,
    scan_dir: PathBuf,
    results_dir: PathBuf,
    reports_dir: PathBuf,

    /// Remove artifacts left by a previous run before scanning.
    pub clean_results: bool,

    /// Extraction limits.
    pub security: SecurityConfig,

    /// Content server settings.
    pub server: ServerConfig,

    /// Browser and rule-engine settings.
    pub audit: AuditConfig,
}

impl Settings {
    /// Creates settings rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        let data_dir = base_path.join("data");
        Self {
            unzip_dir: data_dir.join("unzip"),
            scan_dir: data_dir.join("scan"),
            results_dir: data_dir.join("results"),
            reports_dir: data_dir.join("reports"),
            data_dir,
            base_path,
            clean_results: true,
            security: SecurityConfig::default(),
            server: ServerConfig::default(),
            audit: AuditConfig::default(),
        }
    }

    /// Creates settings rooted at the current directory with audit settings
    /// taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::new(".");
        settings.audit = AuditConfig::from_env();
        settings
    }

    /// Replaces the results directory (live scans write elsewhere).
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Replaces the audit configuration.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    /// Base path all other directories derive from.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `<base>/data`.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory searched for the input archive.
    #[must_use]
    pub fn unzip_dir(&self) -> &Path {
        &self.unzip_dir
    }

    /// Directory the site is extracted into and served from.
    #[must_use]
    pub fn scan_dir(&self) -> &Path {
        &self.scan_dir
    }

    /// Directory receiving per-page artifacts and screenshots.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Directory receiving the rendered report.
    #[must_use]
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_security_config() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.max_total_size, 500 * 1024 * 1024);
        assert_eq!(config.max_path_depth, 32);
    }

    #[test]
    fn test_path_component_allowed() {
        let config = SecurityConfig::default();
        assert!(config.is_path_component_allowed("assets"));
        assert!(!config.is_path_component_allowed(".git"));
        assert!(!config.is_path_component_allowed(".GIT"));
        assert!(!config.is_path_component_allowed(".Ssh"));
    }

    #[test]
    fn test_settings_layout() {
        let settings = Settings::new("/work");
        assert_eq!(settings.data_dir(), Path::new("/work/data"));
        assert_eq!(settings.unzip_dir(), Path::new("/work/data/unzip"));
        assert_eq!(settings.scan_dir(), Path::new("/work/data/scan"));
        assert_eq!(settings.results_dir(), Path::new("/work/data/results"));
        assert_eq!(settings.reports_dir(), Path::new("/work/data/reports"));
        assert!(settings.clean_results);
    }

    #[test]
    fn test_settings_results_override() {
        let settings = Settings::new("/work").with_results_dir("/work/data/live_results");
        assert_eq!(
            settings.results_dir(),
            Path::new("/work/data/live_results")
        );
        assert_eq!(settings.scan_dir(), Path::new("/work/data/scan"));
    }

    #[test]
    fn test_audit_defaults() {
        let config = AuditConfig::default();
        assert!(config.headless);
        assert_eq!((config.viewport_width, config.viewport_height), (1280, 720));
        assert!(config.driver_binary.is_none());
    }

    #[test]
    fn test_audit_builders() {
        let config = AuditConfig::default()
            .with_webdriver_url("http://localhost:4444")
            .with_axe_script("/opt/axe.js")
            .with_navigation_timeout(Duration::from_secs(5));
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.axe_script, PathBuf::from("/opt/axe.js"));
        assert_eq!(config.navigation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }
}
