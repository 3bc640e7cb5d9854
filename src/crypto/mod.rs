//! Cryptographic primitives for Keystash.
//!
//! This module provides:
//! - AES-256-GCM sealing with associated data and detached tags (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - The zeroize-on-drop `DerivedKey` holder (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use encryption::{open, seal, Sealed, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, Argon2Params, SALT_LEN};
pub use keys::{DerivedKey, KEY_LEN};
