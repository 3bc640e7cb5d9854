//! `keystash backup` — encrypt key files into one archive.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};

use crate::backup::{backup, FsSource, SourceSpec};
use crate::cli::output;
use crate::cli::{config_dir, prompt_new_password, Cli};
use crate::config::Settings;
use crate::errors::{KeystashError, Result};
use crate::restore::FsSink;

/// File extension for archives.
pub const ARCHIVE_EXTENSION: &str = "kst";

/// Execute the `backup` command.
pub fn execute(cli: &Cli, sources: &[String], output_path: Option<&str>, no_compress: bool) -> Result<()> {
    let base = config_dir(cli)?;
    let settings = Settings::load(&base)?;

    // 1. Pick sources (command line first, then config) and decide where
    //    the archive goes.
    let specs = if sources.is_empty() {
        settings.source_specs(&base)?
    } else {
        sources
            .iter()
            .map(|s| SourceSpec::parse(s))
            .collect::<Result<Vec<_>>>()?
    };
    if specs.is_empty() {
        return Err(KeystashError::CommandFailed(
            "no sources — pass PATH or NAME=PATH, or add [[sources]] to .keystash.toml".into(),
        ));
    }

    let archive_path = match output_path {
        Some(p) => PathBuf::from(p),
        None => settings
            .output_dir(&base)
            .join(default_archive_name(Local::now().naive_local())),
    };

    // Fail before prompting; `write_new` repeats the check atomically.
    if archive_path.exists() {
        return Err(KeystashError::OutputExists(archive_path));
    }

    // 2. Resolve build options.
    let mut options = settings.build_options();
    if no_compress {
        options.compress = false;
    }

    // 3. Prompt for a new password (with confirmation).
    let password = prompt_new_password()?;

    // 4. Read sources and build the archive.
    let outcome = backup(password.as_bytes(), &specs, &options, &FsSource)?;
    drop(password);

    for skipped in &outcome.skipped {
        output::warning(&format!(
            "Skipped '{}' ({}): {}",
            skipped.name,
            skipped.path.display(),
            skipped.error
        ));
    }

    // 5. Persist with owner-only permissions, never replacing a file.
    FsSink.write_new(&archive_path, &outcome.container)?;

    output::success(&format!(
        "Backed up {} file(s) to {}",
        outcome.included.len(),
        archive_path.display()
    ));
    if !outcome.skipped.is_empty() {
        output::tip(&format!(
            "{} requested file(s) were not included — see warnings above.",
            outcome.skipped.len()
        ));
    }
    output::tip(&format!(
        "Run `keystash restore {} --dest-dir <DIR>` to get them back.",
        archive_path.display()
    ));

    Ok(())
}

/// `keys-backup-YYYYmmdd-HHMMSS.kst`
pub fn default_archive_name(now: NaiveDateTime) -> String {
    format!(
        "keys-backup-{}.{ARCHIVE_EXTENSION}",
        now.format("%Y%m%d-%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_archive_name_is_timestamped() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        assert_eq!(default_archive_name(now), "keys-backup-20260309-070501.kst");
    }
}
