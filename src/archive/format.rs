//! Binary container format.
//!
//! A `.kst` archive has this layout (all integers little-endian):
//!
//! ```text
//! header:
//!   [KSTH: 4][version: 1][flags: 1]
//!   [memory_kib: u32][iterations: u32][parallelism: u32]
//!   [salt_len: u8][salt: salt_len]
//!   [entry_count: u32]
//! entry_count times:
//!   [name_len: u16][name: name_len][nonce: 12][plain_len: u64]
//!   [tag: 16][cipher_len: u64][ciphertext: cipher_len]
//! ```
//!
//! - **Magic** (`KSTH`): identifies the file as a Keystash archive.
//! - **Version**: format version (currently `1`).
//! - **Flags**: bit 0 set means payloads were DEFLATE-compressed before
//!   encryption.  All other bits must be zero.
//! - **Argon2 params**: the work factor used to derive the key.
//! - **plain_len**: length of the original payload, before compression.
//!
//! This module only moves bytes.  It knows nothing about keys; the
//! builder and extractor layer encryption on top.  Every length read
//! from the stream is checked against the bytes that remain before
//! anything is allocated.

use std::collections::HashSet;

use super::entry::{MAX_ENTRY_LEN, MAX_NAME_LEN};
use crate::crypto::kdf::{Argon2Params, MAX_SALT_LEN, MIN_SALT_LEN};
use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::errors::{KeystashError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every archive.
pub const MAGIC: &[u8; 4] = b"KSTH";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Flag bit: payloads are DEFLATE-compressed.
pub const FLAG_COMPRESSED: u8 = 0b0000_0001;

const KNOWN_FLAGS: u8 = FLAG_COMPRESSED;

/// Smallest possible encoded entry record (one-byte name, empty payload).
const MIN_RECORD_LEN: usize = 2 + 1 + NONCE_LEN + 8 + TAG_LEN + 8;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Archive-wide metadata written before the entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Payloads were compressed before encryption.
    pub compressed: bool,

    /// Argon2 params used at build time (restore must use the same).
    pub argon2_params: Argon2Params,

    /// The salt used for Argon2id key derivation.
    pub salt: Vec<u8>,
}

/// One encrypted entry as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name: String,
    pub nonce: [u8; NONCE_LEN],
    /// Length of the original payload (before compression).
    pub plain_len: u64,
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// A decoded archive.
///
/// Keeps the header bytes exactly as they were read so the extractor
/// can rebuild each entry's associated data from the original bytes.
#[derive(Debug, Clone)]
pub struct RawContainer {
    pub header: ContainerHeader,
    pub header_bytes: Vec<u8>,
    pub records: Vec<EntryRecord>,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode the header for an archive holding `entry_count` entries.
pub fn encode_header(header: &ContainerHeader, entry_count: usize) -> Result<Vec<u8>> {
    let salt_len = u8::try_from(header.salt.len())
        .map_err(|_| KeystashError::InvalidParameters("salt is too long to encode".into()))?;
    let count = u32::try_from(entry_count).map_err(|_| {
        KeystashError::InvalidParameters(format!("too many entries ({entry_count})"))
    })?;

    let mut buf = Vec::with_capacity(4 + 1 + 1 + 12 + 1 + header.salt.len() + 4);
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.push(if header.compressed { FLAG_COMPRESSED } else { 0 }); // 1 byte
    buf.extend_from_slice(&header.argon2_params.memory_kib.to_le_bytes());
    buf.extend_from_slice(&header.argon2_params.iterations.to_le_bytes());
    buf.extend_from_slice(&header.argon2_params.parallelism.to_le_bytes());
    buf.push(salt_len);
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&count.to_le_bytes());
    Ok(buf)
}

/// Serialize a complete archive.
pub fn encode(header: &ContainerHeader, records: &[EntryRecord]) -> Result<Vec<u8>> {
    let mut buf = encode_header(header, records.len())?;

    let body: usize = records
        .iter()
        .map(|r| MIN_RECORD_LEN - 1 + r.name.len() + r.ciphertext.len())
        .sum();
    buf.reserve(body);

    for record in records {
        let name_len = u16::try_from(record.name.len())
            .ok()
            .filter(|len| (1..=MAX_NAME_LEN).contains(&usize::from(*len)))
            .ok_or_else(|| {
                KeystashError::InvalidEntryName(format!(
                    "entry name must be 1..={MAX_NAME_LEN} bytes"
                ))
            })?;

        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(record.name.as_bytes());
        buf.extend_from_slice(&record.nonce);
        buf.extend_from_slice(&record.plain_len.to_le_bytes());
        buf.extend_from_slice(&record.tag);
        buf.extend_from_slice(&(record.ciphertext.len() as u64).to_le_bytes());
        buf.extend_from_slice(&record.ciphertext);
    }

    Ok(buf)
}

/// Associated data bound to entry number `index`.
///
/// Covers the full header (salt, KDF params, flags, entry count) plus the
/// entry's position, name and original length, so a record cannot be
/// renamed, resized, reordered or moved to another archive.
pub fn entry_aad(header_bytes: &[u8], index: u32, name: &str, plain_len: u64) -> Vec<u8> {
    let mut aad = Vec::with_capacity(header_bytes.len() + 4 + 2 + name.len() + 8);
    aad.extend_from_slice(header_bytes);
    aad.extend_from_slice(&index.to_le_bytes());
    aad.extend_from_slice(&(name.len() as u16).to_le_bytes());
    aad.extend_from_slice(name.as_bytes());
    aad.extend_from_slice(&plain_len.to_le_bytes());
    aad
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over the archive bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(KeystashError::CorruptArchive(format!(
                "truncated while reading {what}"
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }
}

/// Parse an archive.
///
/// The caller must still authenticate every record before trusting its
/// contents; this only guarantees the bytes are well-formed.
pub fn decode(data: &[u8]) -> Result<RawContainer> {
    let mut r = Reader::new(data);

    // --- Fixed-size prefix ---

    if r.remaining() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
        return Err(KeystashError::CorruptArchive(
            "missing KSTH magic bytes".into(),
        ));
    }
    r.take(MAGIC.len(), "magic")?;

    let version = r.u8("version")?;
    if version != CURRENT_VERSION {
        return Err(KeystashError::UnsupportedVersion(version));
    }

    let flags = r.u8("flags")?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(KeystashError::CorruptArchive(format!(
            "unknown flag bits {flags:#010b}"
        )));
    }

    let argon2_params = Argon2Params {
        memory_kib: r.u32("argon2 memory")?,
        iterations: r.u32("argon2 iterations")?,
        parallelism: r.u32("argon2 parallelism")?,
    };
    argon2_params
        .validate()
        .map_err(|e| KeystashError::CorruptArchive(format!("bad key derivation header: {e}")))?;

    let salt_len = usize::from(r.u8("salt length")?);
    if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt_len) {
        return Err(KeystashError::CorruptArchive(format!(
            "salt length {salt_len} out of range"
        )));
    }
    let salt = r.take(salt_len, "salt")?.to_vec();

    let entry_count = r.u32("entry count")?;
    let entry_count = usize::try_from(entry_count)
        .map_err(|_| KeystashError::CorruptArchive("entry count too large".into()))?;
    if entry_count == 0 {
        return Err(KeystashError::CorruptArchive(
            "archive contains no entries".into(),
        ));
    }
    if entry_count > r.remaining() / MIN_RECORD_LEN {
        return Err(KeystashError::CorruptArchive(format!(
            "entry count {entry_count} exceeds archive size"
        )));
    }

    let header_bytes = data[..r.pos].to_vec();
    let compressed = flags & FLAG_COMPRESSED != 0;

    // --- Entry records ---

    let mut records = Vec::with_capacity(entry_count);
    let mut seen = HashSet::with_capacity(entry_count);

    for index in 0..entry_count {
        let name_len = usize::from(r.u16("name length")?);
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(KeystashError::CorruptArchive(format!(
                "entry {index} has invalid name length {name_len}"
            )));
        }
        let name = std::str::from_utf8(r.take(name_len, "entry name")?)
            .map_err(|_| {
                KeystashError::CorruptArchive(format!("entry {index} name is not valid UTF-8"))
            })?
            .to_string();
        if !seen.insert(name.clone()) {
            return Err(KeystashError::CorruptArchive(format!(
                "duplicate entry name '{name}'"
            )));
        }

        let nonce = r.array::<NONCE_LEN>("nonce")?;

        let plain_len = r.u64("plaintext length")?;
        if plain_len > MAX_ENTRY_LEN {
            return Err(KeystashError::CorruptArchive(format!(
                "entry '{name}' claims {plain_len} bytes, above the limit"
            )));
        }

        let tag = r.array::<TAG_LEN>("tag")?;

        let cipher_len = r.u64("ciphertext length")?;
        let cipher_len = usize::try_from(cipher_len).map_err(|_| {
            KeystashError::CorruptArchive(format!("entry '{name}' ciphertext length overflows"))
        })?;
        if !compressed && cipher_len as u64 != plain_len {
            return Err(KeystashError::CorruptArchive(format!(
                "entry '{name}' length fields disagree"
            )));
        }
        let ciphertext = r.take(cipher_len, "ciphertext")?.to_vec();

        records.push(EntryRecord {
            name,
            nonce,
            plain_len,
            tag,
            ciphertext,
        });
    }

    if r.remaining() != 0 {
        return Err(KeystashError::CorruptArchive(format!(
            "{} trailing bytes after last entry",
            r.remaining()
        )));
    }

    Ok(RawContainer {
        header: ContainerHeader {
            compressed,
            argon2_params,
            salt,
        },
        header_bytes,
        records,
    })
}
