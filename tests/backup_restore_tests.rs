//! End-to-end tests for backing up key files and restoring them to disk.

use std::fs;

use keystash::archive::{extract, BuildOptions};
use keystash::backup::{backup, FsSource, SourceSpec};
use keystash::crypto::Argon2Params;
use keystash::errors::KeystashError;
use keystash::restore::{restore, FsSink, OverwritePolicy, RestoreMap, RestoreStatus};
use tempfile::TempDir;

fn fast_options() -> BuildOptions {
    BuildOptions {
        argon2: Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        },
        compress: true,
    }
}

#[test]
fn missing_source_is_skipped_and_reported() {
    let home = TempDir::new().unwrap();
    let ssh = home.path().join("id_ed25519");
    fs::write(&ssh, b"SSH").unwrap();
    let gpg = home.path().join("secring.gpg");

    let specs = [
        SourceSpec::new("ssh_key", &ssh),
        SourceSpec::new("gpg_key", &gpg),
    ];
    let outcome = backup(b"pw", &specs, &fast_options(), &FsSource).expect("backup");

    assert_eq!(outcome.included, ["ssh_key"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].name, "gpg_key");
    assert!(matches!(&outcome.skipped[0].error, KeystashError::SourceMissing(p) if *p == gpg));

    let entries = extract(b"pw", &outcome.container).expect("extract");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "ssh_key");
    assert_eq!(entries[0].data.as_slice(), b"SSH");
}

#[test]
fn nothing_readable_means_empty_input() {
    let home = TempDir::new().unwrap();
    let specs = [SourceSpec::new("ssh_key", home.path().join("missing"))];
    let result = backup(b"pw", &specs, &fast_options(), &FsSource);
    assert!(matches!(result, Err(KeystashError::EmptyInput)));
}

#[test]
fn directories_are_not_sources() {
    let home = TempDir::new().unwrap();
    let specs = [
        SourceSpec::new("dir", home.path()),
        SourceSpec::new("missing", home.path().join("nope")),
    ];
    let result = backup(b"pw", &specs, &fast_options(), &FsSource);
    assert!(matches!(result, Err(KeystashError::EmptyInput)));
}

#[test]
fn backup_then_restore_to_new_locations() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(src.path().join("id_rsa"), b"RSA PRIVATE").unwrap();
    fs::write(src.path().join("secring.gpg"), b"GPG SECRET").unwrap();

    let specs = [
        SourceSpec::from_path(src.path().join("id_rsa")).unwrap(),
        SourceSpec::from_path(src.path().join("secring.gpg")).unwrap(),
    ];
    let outcome = backup(b"hunter22", &specs, &fast_options(), &FsSource).expect("backup");

    let mut map = RestoreMap::new();
    map.insert("id_rsa", dest.path().join(".ssh").join("id_rsa"))
        .insert("secring.gpg", dest.path().join(".gnupg").join("secring.gpg"));

    let report = restore(
        b"hunter22",
        &outcome.container,
        &map,
        OverwritePolicy::Overwrite,
        &mut FsSink,
    )
    .expect("restore");

    assert_eq!(report.written().count(), 2);
    assert!(!report.has_failures());
    assert_eq!(
        fs::read(dest.path().join(".ssh/id_rsa")).unwrap(),
        b"RSA PRIVATE"
    );
    assert_eq!(
        fs::read(dest.path().join(".gnupg/secring.gpg")).unwrap(),
        b"GPG SECRET"
    );
}

#[test]
fn partial_map_restores_what_it_can() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(src.path().join("a"), b"b1").unwrap();
    fs::write(src.path().join("b"), b"b2").unwrap();

    let specs = [
        SourceSpec::new("ssh_key", src.path().join("a")),
        SourceSpec::new("unknown", src.path().join("b")),
    ];
    let outcome = backup(b"pw", &specs, &fast_options(), &FsSource).expect("backup");

    let mut map = RestoreMap::new();
    map.insert("ssh_key", dest.path().join("ssh_key"));

    let report = restore(b"pw", &outcome.container, &map, OverwritePolicy::Overwrite, &mut FsSink)
        .expect("restore");

    assert_eq!(fs::read(dest.path().join("ssh_key")).unwrap(), b"b1");
    assert_eq!(report.unrecognized().collect::<Vec<_>>(), ["unknown"]);
    assert_eq!(report.outcomes[1].status, RestoreStatus::Unrecognized);
    assert!(!report.has_failures());
}

#[test]
fn keep_existing_does_not_clobber() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(src.path().join("id_ed25519"), b"new").unwrap();
    fs::write(dest.path().join("id_ed25519"), b"old").unwrap();

    let specs = [SourceSpec::from_path(src.path().join("id_ed25519")).unwrap()];
    let outcome = backup(b"pw", &specs, &fast_options(), &FsSource).expect("backup");

    let map = RestoreMap::into_dir(dest.path(), outcome.included.iter().map(String::as_str));
    let report = restore(
        b"pw",
        &outcome.container,
        &map,
        OverwritePolicy::KeepExisting,
        &mut FsSink,
    )
    .expect("restore");

    assert_eq!(fs::read(dest.path().join("id_ed25519")).unwrap(), b"old");
    assert!(matches!(report.outcomes[0].status, RestoreStatus::KeptExisting(_)));
}

#[test]
fn wrong_password_writes_nothing() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(src.path().join("id_rsa"), b"RSA").unwrap();

    let specs = [SourceSpec::from_path(src.path().join("id_rsa")).unwrap()];
    let outcome = backup(b"pw", &specs, &fast_options(), &FsSource).expect("backup");

    let map = RestoreMap::into_dir(dest.path(), ["id_rsa"]);
    let result = restore(b"nope", &outcome.container, &map, OverwritePolicy::Overwrite, &mut FsSink);

    assert!(matches!(result, Err(KeystashError::AuthenticationFailed)));
    assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
}
