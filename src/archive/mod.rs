//! Archive module — the encrypted container.
//!
//! This module provides:
//! - `Entry`, the named payload type (`entry`)
//! - The binary container codec (`format`)
//! - Optional payload compression (`compress`)
//! - `build` / `build_with_options` (`builder`)
//! - `extract` (`extractor`)

pub mod builder;
pub mod compress;
pub mod entry;
pub mod extractor;
pub mod format;

// Re-export the most commonly used items.
pub use builder::{build, build_with_options, BuildOptions};
pub use entry::{is_safe_entry_name, validate_entry_name, Entry, MAX_ENTRY_LEN};
pub use extractor::extract;
pub use format::CURRENT_VERSION;
