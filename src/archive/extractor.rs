//! Archive extractor: password + container bytes -> entries.

use tracing::{debug, info};

use super::compress;
use super::entry::Entry;
use super::format;
use crate::crypto::kdf::derive_key;
use crate::crypto::open;
use crate::errors::Result;

/// Decrypt every entry in an archive.
///
/// All-or-nothing: if any record fails authentication the whole call
/// returns `AuthenticationFailed`, and the entries already decrypted are
/// wiped as they drop.  No plaintext is produced for a record before its
/// tag has been verified.
pub fn extract(password: &[u8], container: &[u8]) -> Result<Vec<Entry>> {
    // 1. Parse.  Codec errors pass through untouched.
    let raw = format::decode(container)?;

    // 2. Derive the key with the archive's own salt and work factor.
    let key = derive_key(password, &raw.header.salt, &raw.header.argon2_params)?;

    // 3. Verify and decrypt each record in stored order.
    let mut entries = Vec::with_capacity(raw.records.len());
    for (index, record) in raw.records.iter().enumerate() {
        let aad = format::entry_aad(&raw.header_bytes, index as u32, &record.name, record.plain_len);
        let plaintext = open(&key, &record.nonce, &record.tag, &record.ciphertext, &aad)?;

        let data = if raw.header.compressed {
            compress::inflate(&plaintext, record.plain_len)?
        } else {
            plaintext
        };

        debug!(name = %record.name, len = data.len(), "entry authenticated");
        entries.push(Entry {
            name: record.name.clone(),
            data,
        });
    }

    info!(entries = entries.len(), "archive extracted");
    Ok(entries)
}
