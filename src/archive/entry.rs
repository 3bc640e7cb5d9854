//! Credential entries carried inside an archive.
//!
//! An `Entry` pairs a logical name (usually the original file name, such
//! as `id_ed25519`) with the file contents.  The payload is held in a
//! `Zeroizing` buffer so private key material is wiped when the entry is
//! dropped, and `Debug` never prints it.

use std::fmt;

use zeroize::Zeroizing;

use crate::errors::{KeystashError, Result};

/// Longest entry name accepted, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Largest payload accepted per entry (16 MiB).
pub const MAX_ENTRY_LEN: u64 = 16 * 1024 * 1024;

/// A single named payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
    /// Logical name, unique within one archive.
    pub name: String,

    /// Raw file contents, wiped on drop.
    pub data: Zeroizing<Vec<u8>>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: Zeroizing::new(data.into()),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Validate that an entry name is safe to use as a bare file name.
///
/// Must be non-empty, at most 255 bytes, free of path separators and
/// control characters, and not `.` or `..`.
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeystashError::InvalidEntryName(
            "entry name cannot be empty".into(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(KeystashError::InvalidEntryName(format!(
            "entry name cannot exceed {MAX_NAME_LEN} bytes"
        )));
    }
    if name == "." || name == ".." {
        return Err(KeystashError::InvalidEntryName(format!(
            "'{name}' is not a valid entry name"
        )));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(KeystashError::InvalidEntryName(format!(
            "entry name '{}' contains a path separator or control character",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Returns `true` if `name` passes `validate_entry_name`.
pub fn is_safe_entry_name(name: &str) -> bool {
    validate_entry_name(name).is_ok()
}
