//! Accessibility auditing for static websites.
//!
//! `a11yscan-core` takes a zipped static site, extracts it with protection
//! against path traversal and zip bombs, serves it from an ephemeral loopback
//! HTTP server, audits every page in a headless browser with axe-core, and
//! aggregates the per-page results into a cross-page report.
//!
//! # Examples
//!
//! ```no_run
//! use a11yscan_core::Settings;
//! use a11yscan_core::report::build_model;
//!
//! let settings = Settings::new(".");
//! let model = build_model(settings.results_dir(), "Accessibility Report");
//! println!(
//!     "{} pages, {} violations",
//!     model.pages_scanned, model.total_violations
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod report;
pub mod security;
pub mod server;
#[doc(hidden)]
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use config::AuditConfig;
pub use config::SecurityConfig;
pub use config::ServerConfig;
pub use config::Settings;
pub use error::QuotaResource;
pub use error::Result;
pub use error::ScanError;
pub use pipeline::Pipeline;
pub use pipeline::RunOutcome;
pub use report::ReportModel;

// Re-export types module for easier access
pub use types::DestDir;
pub use types::SafePath;
