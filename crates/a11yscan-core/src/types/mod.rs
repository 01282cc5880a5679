//! Type-safe wrappers for site extraction.
//!
//! These newtypes enforce path validation at the type level. Both are
//! validated on construction and cannot be built from raw paths without going
//! through validation.

pub mod dest_dir;
pub mod safe_path;

pub use dest_dir::DestDir;
pub use safe_path::SafePath;
