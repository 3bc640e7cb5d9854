//! Derived key holder.
//!
//! The archive key lives in a `DerivedKey` for exactly one build or
//! extract call and is wiped from memory when it goes out of scope.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the derived key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte symmetric key that zeroes its memory when dropped.
///
/// Never handed back to callers of the archive API; it is created,
/// used and dropped inside `build` / `extract`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Create a new `DerivedKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// An all-zero key, to be filled by the KDF.
    pub(crate) fn zeroed() -> Self {
        Self {
            bytes: [0u8; KEY_LEN],
        }
    }

    /// Access the raw key bytes (e.g. to build the cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}
