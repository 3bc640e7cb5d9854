//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  The work factor is configurable via `Argon2Params`
//! (loaded from `.keystash.toml`, the environment, or sensible defaults)
//! and is recorded in every archive so restore derives the same key.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::TryRngCore;

use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{KeystashError, Result};

/// Length of a freshly generated salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Shortest salt accepted by `derive_key`.
pub const MIN_SALT_LEN: usize = 16;

/// Longest salt accepted by `derive_key` (and storable in an archive).
pub const MAX_SALT_LEN: usize = 64;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Maximum memory cost in KiB (1 GB).  Archives asking for more are
/// rejected before any allocation happens.
pub const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Upper bound on Argon2 passes.
pub const MAX_ITERATIONS: u32 = 64;

/// Upper bound on Argon2 lanes.
pub const MAX_PARALLELISM: u32 = 16;

/// Configurable Argon2id parameters.
///
/// These map 1:1 to the fields in `Settings` and to the work-factor
/// fields of the archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Check that every parameter is inside the accepted range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(KeystashError::InvalidParameters(format!(
                "Argon2 memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(KeystashError::InvalidParameters(format!(
                "Argon2 iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(KeystashError::InvalidParameters(format!(
                "Argon2 parallelism must be between 1 and {MAX_PARALLELISM} (got {})",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// The same password + salt + params will always produce the same key.
/// Rejects short salts and out-of-range work factors with
/// `InvalidParameters` before doing any hashing.
pub fn derive_key(password: &[u8], salt: &[u8], argon2_params: &Argon2Params) -> Result<DerivedKey> {
    if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
        return Err(KeystashError::InvalidParameters(format!(
            "salt must be between {MIN_SALT_LEN} and {MAX_SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeystashError::InvalidParameters(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = DerivedKey::zeroed();
    argon2
        .hash_password_into(password, salt, key.as_mut_bytes())
        .map_err(|e| KeystashError::InvalidParameters(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt from the OS.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| KeystashError::EncryptionFailed(format!("OS random source failed: {e}")))?;
    Ok(salt)
}
