//! Archive builder: password + entries -> encrypted container bytes.

use std::collections::HashSet;

use tracing::{debug, info};

use super::compress;
use super::entry::{validate_entry_name, Entry, MAX_ENTRY_LEN};
use super::format::{self, ContainerHeader, EntryRecord};
use crate::crypto::kdf::{derive_key, generate_salt, Argon2Params};
use crate::crypto::seal;
use crate::errors::{KeystashError, Result};

/// Knobs for `build_with_options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Argon2id work factor for this archive.
    pub argon2: Argon2Params,
    /// DEFLATE payloads before encrypting them.
    pub compress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            argon2: Argon2Params::default(),
            compress: true,
        }
    }
}

/// Build an archive with default options.
pub fn build(password: &[u8], entries: &[Entry]) -> Result<Vec<u8>> {
    build_with_options(password, entries, &BuildOptions::default())
}

/// Encrypt `entries` into a new archive.
///
/// 1. Validate names, sizes and KDF params (before any expensive work).
/// 2. Generate a fresh salt and derive the key with Argon2id.
/// 3. Seal each payload under its own random nonce, with the header,
///    index, name and length as associated data.
/// 4. Encode everything with the container codec.
///
/// Two calls with identical inputs never produce the same bytes.
pub fn build_with_options(
    password: &[u8],
    entries: &[Entry],
    options: &BuildOptions,
) -> Result<Vec<u8>> {
    validate_entries(entries)?;
    options.argon2.validate()?;

    let salt = generate_salt()?;
    let header = ContainerHeader {
        compressed: options.compress,
        argon2_params: options.argon2,
        salt: salt.to_vec(),
    };
    let header_bytes = format::encode_header(&header, entries.len())?;

    let key = derive_key(password, &salt, &options.argon2)?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let plain_len = entry.len() as u64;
        // validate_entries bounds the count well below u32::MAX.
        let aad = format::entry_aad(&header_bytes, index as u32, &entry.name, plain_len);

        let sealed = if options.compress {
            let packed = compress::deflate(&entry.data)?;
            seal(&key, &packed, &aad)?
        } else {
            seal(&key, &entry.data, &aad)?
        };

        debug!(
            name = %entry.name,
            plain_len,
            stored_len = sealed.ciphertext.len(),
            "entry sealed"
        );

        records.push(EntryRecord {
            name: entry.name.clone(),
            nonce: sealed.nonce,
            plain_len,
            tag: sealed.tag,
            ciphertext: sealed.ciphertext,
        });
    }
    drop(key);

    let bytes = format::encode(&header, &records)?;
    info!(
        entries = records.len(),
        bytes = bytes.len(),
        compressed = options.compress,
        "archive built"
    );
    Ok(bytes)
}

/// Reject inputs the archive cannot represent.
fn validate_entries(entries: &[Entry]) -> Result<()> {
    if entries.is_empty() {
        return Err(KeystashError::EmptyInput);
    }
    if u32::try_from(entries.len()).is_err() {
        return Err(KeystashError::InvalidParameters(format!(
            "too many entries ({})",
            entries.len()
        )));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        validate_entry_name(&entry.name)?;
        if !seen.insert(entry.name.as_str()) {
            return Err(KeystashError::DuplicateEntry(entry.name.clone()));
        }
        let size = entry.len() as u64;
        if size > MAX_ENTRY_LEN {
            return Err(KeystashError::EntryTooLarge {
                name: entry.name.clone(),
                size,
            });
        }
    }
    Ok(())
}
