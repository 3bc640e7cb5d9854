//! `keystash restore` — decrypt an archive and write key files back.

use std::fs;
use std::path::Path;

use crate::archive::{extract, Entry};
use crate::cli::output;
use crate::cli::{ask_password, parse_mapping, password_from_env, Cli};
use crate::errors::{KeystashError, Result};
use crate::restore::{restore_entries, FsSink, OverwritePolicy, RestoreMap};

/// Interactive password attempts before giving up.
const MAX_ATTEMPTS: usize = 3;

/// Execute the `restore` command.
pub fn execute(
    _cli: &Cli,
    archive: &str,
    maps: &[String],
    dest_dir: Option<&str>,
    keep_existing: bool,
) -> Result<()> {
    if maps.is_empty() && dest_dir.is_none() {
        return Err(KeystashError::CommandFailed(
            "nothing to restore to — pass --map NAME=PATH or --dest-dir DIR".into(),
        ));
    }

    // Parse mappings before asking for a password.
    let explicit = maps
        .iter()
        .map(|m| parse_mapping(m))
        .collect::<Result<Vec<_>>>()?;

    // 1. Read the archive.
    let data = fs::read(archive).map_err(|e| {
        KeystashError::CommandFailed(format!("cannot read archive {archive}: {e}"))
    })?;

    // 2. Decrypt everything (all-or-nothing).
    let entries = decrypt_with_retries(&data)?;

    // 3. Build the destination map: --dest-dir first, --map overrides.
    let mut map = match dest_dir {
        Some(dir) => RestoreMap::into_dir(Path::new(dir), entries.iter().map(|e| e.name.as_str())),
        None => RestoreMap::new(),
    };
    for (name, path) in explicit {
        map.insert(name, path);
    }

    // 4. Write what we can.
    let policy = if keep_existing {
        OverwritePolicy::KeepExisting
    } else {
        OverwritePolicy::Overwrite
    };
    let report = restore_entries(&entries, &map, policy, &mut FsSink);
    drop(entries);

    output::print_restore_table(&report);

    for name in report.unrecognized() {
        output::warning(&format!("No destination for archive entry '{name}' — not restored."));
    }

    let written = report.written().count();
    if report.has_failures() {
        return Err(KeystashError::CommandFailed(format!(
            "restored {written} of {} entries; some files could not be written",
            report.outcomes.len()
        )));
    }

    output::success(&format!("Restored {written} file(s)."));
    Ok(())
}

/// Decrypt `data`, re-prompting on a wrong password when interactive.
fn decrypt_with_retries(data: &[u8]) -> Result<Vec<Entry>> {
    if let Some(pw) = password_from_env() {
        return extract(pw.as_bytes(), data);
    }

    let mut attempt = 1;
    loop {
        let password = ask_password()?;
        match extract(password.as_bytes(), data) {
            Err(e) if e.is_retryable_password() && attempt < MAX_ATTEMPTS => {
                output::error(&e.to_string());
                attempt += 1;
            }
            result => return result,
        }
    }
}
