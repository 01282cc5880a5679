//! Security checks applied to untrusted site archives.

pub mod path;
pub mod quota;
pub mod zipbomb;

pub use path::validate_entry_name;
pub use quota::QuotaTracker;
pub use zipbomb::validate_compression_ratio;
