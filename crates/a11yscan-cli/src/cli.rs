//! CLI argument parsing using clap.

use a11yscan_core::report::DEFAULT_TITLE;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Report title used by `live` unless `--title` is given.
pub const LIVE_TITLE: &str = "Accessibility Report (Live Site)";

#[derive(Parser)]
#[command(name = "a11yscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a zipped static site
    Scan(ScanArgs),
    /// Scan pages of a running site
    Live(LiveArgs),
    /// Build the HTML and JSON report from existing scan results
    Report(ReportArgs),
}

/// Browser and rule-engine overrides shared by `scan` and `live`.
///
/// Unset flags fall back to `A11Y_WEBDRIVER_URL`, `A11Y_AXE_SCRIPT` and
/// `A11Y_CHROMEDRIVER`, then to built-in defaults.
#[derive(clap::Args)]
pub struct BrowserArgs {
    /// Path to axe.min.js (checked before the archive is extracted)
    #[arg(long, value_name = "FILE")]
    pub axe_script: Option<PathBuf>,

    /// WebDriver endpoint of an already running driver
    #[arg(long, value_name = "URL")]
    pub webdriver_url: Option<String>,

    /// chromedriver binary to spawn for each browser session
    #[arg(long, value_name = "FILE")]
    pub chromedriver: Option<PathBuf>,

    /// Run Chrome with a visible window
    #[arg(long)]
    pub headed: bool,

    /// Run even outside the scanner container
    #[arg(long)]
    pub skip_env_check: bool,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Project root holding the data/ directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Site archive to copy into data/unzip/site.zip before scanning
    #[arg(long, value_name = "ZIP")]
    pub zip: Option<PathBuf>,

    /// Report path (default: <base-dir>/data/reports/latest.html)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report title
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Keep results and extracted files from earlier runs
    #[arg(long)]
    pub keep_results: bool,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(clap::Args)]
pub struct LiveArgs {
    /// Base URL of the site, e.g. https://example.com
    #[arg(long, value_name = "URL")]
    pub base_url: String,

    /// Comma-separated page paths, e.g. /,/about,/contact
    #[arg(long, value_name = "PATHS", value_delimiter = ',', default_value = "/")]
    pub pages: Vec<String>,

    /// Project root holding the data/ directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Report path (default: <base-dir>/data/reports/latest.html)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report title
    #[arg(long, default_value = LIVE_TITLE)]
    pub title: String,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(clap::Args)]
pub struct ReportArgs {
    /// Project root holding the data/ directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Directory of per-page results (default: <base-dir>/data/results)
    #[arg(long, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Report path (default: <base-dir>/data/reports/latest.html)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report title
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Fail instead of replacing an existing report
    #[arg(long)]
    pub no_overwrite: bool,

    /// Skip the JSON summary
    #[arg(long)]
    pub no_json: bool,
}

/// Trims page paths and drops empty ones (`"/, ,/about"`).
pub fn normalize_pages(pages: &[String]) -> Vec<String> {
    pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_live_pages_split_on_commas() {
        let cli = Cli::try_parse_from([
            "a11yscan",
            "live",
            "--base-url",
            "https://example.com",
            "--pages",
            "/,/about, ,/contact",
        ])
        .unwrap();
        let Commands::Live(args) = cli.command else {
            panic!("expected live command");
        };
        assert_eq!(normalize_pages(&args.pages), vec!["/", "/about", "/contact"]);
        assert_eq!(args.title, LIVE_TITLE);
    }

    #[test]
    fn test_live_pages_default_to_root() {
        let cli =
            Cli::try_parse_from(["a11yscan", "live", "--base-url", "https://example.com"]).unwrap();
        let Commands::Live(args) = cli.command else {
            panic!("expected live command");
        };
        assert_eq!(args.pages, vec!["/"]);
    }

    #[test]
    fn test_scan_defaults() {
        let cli = Cli::try_parse_from(["a11yscan", "scan"]).unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.base_dir, PathBuf::from("."));
        assert_eq!(args.title, DEFAULT_TITLE);
        assert!(args.zip.is_none());
        assert!(!args.keep_results);
        assert!(!args.browser.skip_env_check);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["a11yscan", "-q", "-v", "report"]).is_err());
    }
}
