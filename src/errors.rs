use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Keystash.
#[derive(Debug, Error)]
pub enum KeystashError {
    // --- Key derivation errors ---
    #[error("Invalid key derivation parameters: {0}")]
    InvalidParameters(String),

    // --- Build errors ---
    #[error("Nothing to back up — no entries were supplied")]
    EmptyInput,

    #[error("Invalid entry name: {0}")]
    InvalidEntryName(String),

    #[error("Duplicate entry name '{0}'")]
    DuplicateEntry(String),

    #[error("Entry '{name}' is too large ({size} bytes)")]
    EntryTooLarge { name: String, size: u64 },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Container errors ---
    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(u8),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Authentication failed — wrong password or tampered archive")]
    AuthenticationFailed,

    // --- Backup / restore errors ---
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Archive entry '{0}' has no restore destination")]
    UnrecognizedEntry(String),

    #[error("Failed to restore '{name}' to {path}: {reason}")]
    RestoreWriteFailed {
        name: String,
        path: PathBuf,
        reason: String,
    },

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Refusing to overwrite existing file {0}")]
    OutputExists(PathBuf),
}

impl KeystashError {
    /// Returns `true` when asking the user for the password again makes sense.
    pub fn is_retryable_password(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }
}

/// Convenience type alias for Keystash results.
pub type Result<T> = std::result::Result<T, KeystashError>;
