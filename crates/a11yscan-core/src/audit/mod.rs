//! Browser-driven page auditing.
//!
//! [`PageAuditor`] composes a [`BrowserDriver`] and a [`RuleEngine`]. The
//! production pair is [`WebDriverBrowser`] + [`AxeEngine`]; tests substitute
//! their own doubles.

pub mod auditor;
pub mod browser;
pub mod model;
pub mod rules;
pub mod webdriver;

pub use auditor::PageAuditor;
pub use auditor::artifact_name;
pub use auditor::live_artifact_name;
pub use browser::BrowserDriver;
pub use browser::BrowserSession;
pub use model::AuditResults;
pub use model::Impact;
pub use model::NodeResult;
pub use model::RuleResult;
pub use model::ScanResult;
pub use rules::AxeEngine;
pub use rules::RuleEngine;
pub use webdriver::WebDriverBrowser;
pub use webdriver::WebDriverSession;
