//! Subcommand implementations.

pub mod live;
pub mod report;
pub mod scan;

use crate::cli::BrowserArgs;
use crate::error::add_scan_context;
use crate::progress::CliProgress;
use a11yscan_core::AuditConfig;
use a11yscan_core::audit::AxeEngine;
use a11yscan_core::audit::PageAuditor;
use a11yscan_core::audit::WebDriverBrowser;
use a11yscan_core::pipeline::EnvironmentGuard;
use a11yscan_core::pipeline::NoopProgress;
use a11yscan_core::pipeline::ScanProgress;
use anyhow::Result;
use tracing::debug;

/// Browser-backed auditor used by `scan` and `live`.
pub type Auditor = PageAuditor<WebDriverBrowser, AxeEngine>;

/// Enforces the container precondition unless `--skip-env-check` was given.
pub fn check_environment(args: &BrowserArgs) -> Result<()> {
    if args.skip_env_check {
        debug!("environment check skipped");
        return Ok(());
    }
    add_scan_context(EnvironmentGuard::default().check())
}

/// Audit settings from the environment with flag overrides applied.
pub fn audit_config(args: &BrowserArgs) -> AuditConfig {
    let mut config = AuditConfig::from_env();
    if let Some(url) = &args.webdriver_url {
        config = config.with_webdriver_url(url.clone());
    }
    if let Some(script) = &args.axe_script {
        config = config.with_axe_script(script.clone());
    }
    if let Some(binary) = &args.chromedriver {
        config.driver_binary = Some(binary.clone());
    }
    if args.headed {
        config.headless = false;
    }
    config
}

/// Loads the rule engine and prepares the browser driver.
///
/// Runs before extraction so a missing axe script fails the command up
/// front, even for an archive that turns out to have no pages. Nothing is
/// launched until the first page is scanned.
pub fn build_auditor(config: &AuditConfig) -> Result<Auditor> {
    let engine = add_scan_context(AxeEngine::from_file(&config.axe_script))?;
    let browser = add_scan_context(WebDriverBrowser::new(config.clone()))?;
    Ok(PageAuditor::new(browser, engine))
}

/// Progress sink for the run: a bar on a terminal, nothing otherwise.
pub fn progress_sink(show_progress: bool) -> Box<dyn ScanProgress> {
    if show_progress {
        Box::new(CliProgress::new())
    } else {
        Box::new(NoopProgress)
    }
}
