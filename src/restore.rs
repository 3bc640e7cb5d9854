//! Restore orchestration: write extracted entries to their destinations.
//!
//! Unlike extraction, which is all-or-nothing, restoring is best-effort
//! per entry: an entry with no destination or a failed write is reported
//! and the remaining entries are still written.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::archive::{extract, is_safe_entry_name, Entry};
use crate::errors::{KeystashError, Result};

/// Destination path for each logical entry name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreMap {
    targets: BTreeMap<String, PathBuf>,
}

impl RestoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `name` to `path`, replacing any earlier mapping.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.targets.insert(name.into(), path.into());
        self
    }

    /// Map every safe name to `dir/<name>`.
    ///
    /// Names that are not plain file names are left unmapped, so they
    /// are reported as unrecognized instead of escaping `dir`.
    pub fn into_dir<'a>(dir: &Path, names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::new();
        for name in names {
            if is_safe_entry_name(name) {
                map.insert(name, dir.join(name));
            }
        }
        map
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.targets.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// What to do when a destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Replace the existing file.
    Overwrite,
    /// Leave the existing file alone and report it.
    KeepExisting,
}

/// Something that can persist restored bytes.
pub trait ByteSink {
    fn exists(&self, path: &Path) -> bool;
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// Writes to the local filesystem.
///
/// Each file is first written to a fresh temp file in the same directory,
/// then moved over the target, so a destination is never left
/// half-written.  The temp file is created exclusively with owner-only
/// permissions (`0o600` on Unix) and never follows an existing link.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl FsSink {
    /// Write `bytes` to `path`, failing with `OutputExists` if it exists.
    ///
    /// The temp file is hard-linked into place, so the existence check and
    /// the write are a single filesystem operation.
    pub fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp_path = write_private_temp(path, bytes)?;
        let linked = fs::hard_link(&tmp_path, path);
        let _ = fs::remove_file(&tmp_path);
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(KeystashError::OutputExists(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl ByteSink for FsSink {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp_path = write_private_temp(path, bytes)?;
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Attempts at finding an unused temp name before giving up.
const TEMP_ATTEMPTS: u32 = 8;

/// Write `bytes` to a new private temp file next to `path`.
///
/// The name carries the process id and a nanosecond timestamp.  A name
/// that is already taken, by a file or a symlink, is skipped rather than
/// opened.
fn write_private_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();

    let mut attempt = 0;
    let (tmp_path, mut file) = loop {
        let tmp_path = parent.join(format!(
            ".{file_name}.{}-{}-{attempt}.keystash-tmp",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or(0)
        ));
        match create_private_file(&tmp_path) {
            Ok(file) => break (tmp_path, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt + 1 < TEMP_ATTEMPTS => {
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };

    if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(tmp_path)
}

/// Create `path` for writing, failing if anything already exists there.
///
/// On Unix the file is born with mode `0o600`; there is no window in
/// which it is readable by others.
fn create_private_file(path: &Path) -> io::Result<File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
    }

    #[cfg(not(unix))]
    {
        fs::OpenOptions::new().write(true).create_new(true).open(path)
    }
}

/// Per-entry restore result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    Written(PathBuf),
    Unrecognized,
    KeptExisting(PathBuf),
    WriteFailed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    pub name: String,
    pub status: RestoreStatus,
}

impl EntryOutcome {
    /// The error this outcome represents, if any.
    pub fn error(&self) -> Option<KeystashError> {
        match &self.status {
            RestoreStatus::Written(_) | RestoreStatus::KeptExisting(_) => None,
            RestoreStatus::Unrecognized => Some(KeystashError::UnrecognizedEntry(self.name.clone())),
            RestoreStatus::WriteFailed { path, reason } => Some(KeystashError::RestoreWriteFailed {
                name: self.name.clone(),
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Outcome of a restore, one record per archive entry in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub outcomes: Vec<EntryOutcome>,
}

impl RestoreReport {
    pub fn written(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RestoreStatus::Written(_)))
    }

    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == RestoreStatus::Unrecognized)
            .map(|o| o.name.as_str())
    }

    /// `true` if any recognized entry could not be written.
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.status, RestoreStatus::WriteFailed { .. }))
    }

    /// Every non-fatal problem as a typed error.
    pub fn errors(&self) -> Vec<KeystashError> {
        self.outcomes.iter().filter_map(EntryOutcome::error).collect()
    }
}

/// Write each recognized entry to its mapped destination.
pub fn restore_entries(
    entries: &[Entry],
    map: &RestoreMap,
    policy: OverwritePolicy,
    sink: &mut impl ByteSink,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for entry in entries {
        let status = match map.get(&entry.name) {
            None => {
                info!(name = %entry.name, "archive entry has no restore destination");
                RestoreStatus::Unrecognized
            }
            Some(path) if policy == OverwritePolicy::KeepExisting && sink.exists(path) => {
                debug!(name = %entry.name, path = %path.display(), "keeping existing file");
                RestoreStatus::KeptExisting(path.to_path_buf())
            }
            Some(path) => match sink.write(path, &entry.data) {
                Ok(()) => {
                    debug!(name = %entry.name, path = %path.display(), "entry restored");
                    RestoreStatus::Written(path.to_path_buf())
                }
                Err(e) => {
                    warn!(name = %entry.name, path = %path.display(), error = %e, "restore write failed");
                    RestoreStatus::WriteFailed {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                }
            },
        };
        report.outcomes.push(EntryOutcome {
            name: entry.name.clone(),
            status,
        });
    }

    info!(
        written = report.written().count(),
        total = report.outcomes.len(),
        "restore finished"
    );
    report
}

/// Extract `container` and restore its entries.
///
/// Extraction failures abort before anything is written.
pub fn restore(
    password: &[u8],
    container: &[u8],
    map: &RestoreMap,
    policy: OverwritePolicy,
    sink: &mut impl ByteSink,
) -> Result<RestoreReport> {
    let entries = extract(password, container)?;
    Ok(restore_entries(&entries, map, policy, sink))
}
