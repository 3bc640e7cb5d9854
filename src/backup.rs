//! Backup orchestration: read the requested key files and build one archive.
//!
//! Files are pulled through a `ByteSource` so the archive core never sees
//! a path.  A source that is missing is skipped and reported rather
//! than aborting the whole backup; the outcome lists every skipped
//! source so the caller can tell the user.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::{build_with_options, BuildOptions, Entry};
use crate::errors::{KeystashError, Result};

/// Where a backup entry comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Logical name stored in the archive.
    pub name: String,
    /// File to read.
    pub path: PathBuf,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Use the file name of `path` as the entry name.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                KeystashError::InvalidEntryName(format!(
                    "cannot derive an entry name from {}",
                    path.display()
                ))
            })?
            .to_string();
        Ok(Self { name, path })
    }

    /// Parse `name=path`, or a bare `path`.
    pub fn parse(arg: &str) -> Result<Self> {
        match arg.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => {
                Ok(Self::new(name, path))
            }
            Some(_) => Err(KeystashError::CommandFailed(format!(
                "invalid source '{arg}' — expected NAME=PATH"
            ))),
            None => Self::from_path(arg),
        }
    }
}

/// Something that can hand over file contents.
pub trait ByteSource {
    /// Read the full contents at `path`.
    ///
    /// Implementations return `SourceMissing` when nothing usable exists
    /// at `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl ByteSource for FsSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(KeystashError::SourceMissing(path.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(KeystashError::SourceMissing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        }
        Ok(fs::read(path)?)
    }
}

/// A source that was left out of the archive.
#[derive(Debug)]
pub struct SkippedSource {
    pub name: String,
    pub path: PathBuf,
    pub error: KeystashError,
}

/// Result of `collect_sources`.
#[derive(Debug, Default)]
pub struct Collected {
    pub entries: Vec<Entry>,
    pub skipped: Vec<SkippedSource>,
}

/// Read every source, keeping the ones that could be read.
///
/// Request order is preserved.  Unreadable sources land in `skipped`.
pub fn collect_sources(specs: &[SourceSpec], source: &impl ByteSource) -> Collected {
    let mut collected = Collected::default();

    for spec in specs {
        match source.read(&spec.path) {
            Ok(bytes) => collected.entries.push(Entry::new(spec.name.clone(), bytes)),
            Err(error) => {
                info!(
                    name = %spec.name,
                    path = %spec.path.display(),
                    %error,
                    "skipping backup source"
                );
                collected.skipped.push(SkippedSource {
                    name: spec.name.clone(),
                    path: spec.path.clone(),
                    error,
                });
            }
        }
    }

    collected
}

/// Result of `backup`.
#[derive(Debug)]
pub struct BackupOutcome {
    /// The encrypted archive, ready to persist.
    pub container: Vec<u8>,
    /// Names stored in the archive, in order.
    pub included: Vec<String>,
    /// Requested sources that were not stored.
    pub skipped: Vec<SkippedSource>,
}

/// Collect `specs` from `source` and build an archive from what was found.
///
/// Fails with `EmptyInput` when no source could be read.
pub fn backup(
    password: &[u8],
    specs: &[SourceSpec],
    options: &BuildOptions,
    source: &impl ByteSource,
) -> Result<BackupOutcome> {
    let Collected { entries, skipped } = collect_sources(specs, source);
    if entries.is_empty() {
        return Err(KeystashError::EmptyInput);
    }

    let container = build_with_options(password, &entries, options)?;
    let included: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();

    info!(
        included = included.len(),
        skipped = skipped.len(),
        "backup archive ready"
    );

    Ok(BackupOutcome {
        container,
        included,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_named_source() {
        let spec = SourceSpec::parse("ssh_key=/home/me/.ssh/id_ed25519").unwrap();
        assert_eq!(spec.name, "ssh_key");
        assert_eq!(spec.path, PathBuf::from("/home/me/.ssh/id_ed25519"));
    }

    #[test]
    fn parse_bare_path_uses_file_name() {
        let spec = SourceSpec::parse("/home/me/.gnupg/secring.gpg").unwrap();
        assert_eq!(spec.name, "secring.gpg");
    }

    #[test]
    fn parse_rejects_empty_halves() {
        assert!(SourceSpec::parse("=/a").is_err());
        assert!(SourceSpec::parse("name=").is_err());
    }

    #[test]
    fn from_path_rejects_root() {
        assert!(SourceSpec::from_path("/").is_err());
    }

    #[test]
    fn fs_source_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FsSource.read(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, KeystashError::SourceMissing(_)));
    }

    #[test]
    fn fs_source_treats_directory_as_missing() {
        let dir = TempDir::new().unwrap();
        let err = FsSource.read(dir.path()).unwrap_err();
        assert!(matches!(err, KeystashError::SourceMissing(_)));
    }

    #[test]
    fn collect_keeps_order_and_skips_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"A").unwrap();
        fs::write(dir.path().join("c"), b"C").unwrap();

        let specs = [
            SourceSpec::new("a", dir.path().join("a")),
            SourceSpec::new("b", dir.path().join("b")),
            SourceSpec::new("c", dir.path().join("c")),
        ];
        let collected = collect_sources(&specs, &FsSource);

        let names: Vec<_> = collected.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(collected.skipped.len(), 1);
        assert_eq!(collected.skipped[0].name, "b");
    }

    #[test]
    fn backup_with_nothing_found_is_empty_input() {
        let dir = TempDir::new().unwrap();
        let specs = [SourceSpec::new("gone", dir.path().join("gone"))];
        let err = backup(b"pw", &specs, &BuildOptions::default(), &FsSource).unwrap_err();
        assert!(matches!(err, KeystashError::EmptyInput));
    }
}
