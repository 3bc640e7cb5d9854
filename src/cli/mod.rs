//! CLI module — Clap argument parser, password prompts, output helpers,
//! and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::errors::{KeystashError, Result};

/// Minimum password length for new archives.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable consulted before prompting.
pub const PASSWORD_ENV: &str = "KEYSTASH_PASSWORD";

/// Keystash CLI: encrypted backups of SSH and GPG keys.
#[derive(Parser)]
#[command(
    name = "keystash",
    about = "Encrypted backup and restore for SSH and GPG keys",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory containing .keystash.toml (default: current directory)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Encrypt key files into a single archive
    Backup {
        /// Files to back up, as PATH or NAME=PATH (default: [[sources]] in .keystash.toml)
        sources: Vec<String>,

        /// Archive path (default: keys-backup-<timestamp>.kst in output_dir)
        #[arg(short, long)]
        output: Option<String>,

        /// Store payloads without compressing them first
        #[arg(long)]
        no_compress: bool,
    },

    /// Decrypt an archive and write its key files back
    Restore {
        /// Archive to restore from
        archive: String,

        /// Destination for one entry, as NAME=PATH (repeatable)
        #[arg(short, long = "map", value_name = "NAME=PATH")]
        map: Vec<String>,

        /// Restore every entry into this directory under its own name
        #[arg(short, long)]
        dest_dir: Option<String>,

        /// Leave existing destination files untouched
        #[arg(long)]
        keep_existing: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// The password from `KEYSTASH_PASSWORD`, if set and non-empty.
pub fn password_from_env() -> Option<Zeroizing<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

/// Ask for the archive password on the terminal.
pub fn ask_password() -> Result<Zeroizing<String>> {
    let pw = dialoguer::Password::new()
        .with_prompt("Enter archive password")
        .interact()
        .map_err(|e| KeystashError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used by `backup`).
///
/// Also respects `KEYSTASH_PASSWORD`.  Enforces a minimum length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        check_new_password(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose archive password")
                .with_confirmation(
                    "Confirm archive password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| KeystashError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if let Err(e) = check_new_password(&password) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(password);
    }
}

/// Reject passwords that are too short to protect private keys.
pub fn check_new_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(KeystashError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Directory holding `.keystash.toml`: `--config`, or the current directory.
pub fn config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(std::env::current_dir()?),
    }
}

/// Split a `NAME=PATH` argument.
pub fn parse_mapping(arg: &str) -> Result<(String, PathBuf)> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(KeystashError::CommandFailed(format!(
            "invalid mapping '{arg}' — expected NAME=PATH"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mapping_splits_on_first_equals() {
        let (name, path) = parse_mapping("ssh_key=/home/me/.ssh/id=1").unwrap();
        assert_eq!(name, "ssh_key");
        assert_eq!(path, PathBuf::from("/home/me/.ssh/id=1"));
    }

    #[test]
    fn parse_mapping_rejects_malformed() {
        assert!(parse_mapping("no-equals").is_err());
        assert!(parse_mapping("=path").is_err());
        assert!(parse_mapping("name=").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_new_password("short").is_err());
        assert!(check_new_password("long-enough").is_ok());
    }

    #[test]
    fn cli_parses_backup() {
        let cli = Cli::try_parse_from([
            "keystash",
            "backup",
            "ssh_key=/a",
            "/b/secring.gpg",
            "-o",
            "out.kst",
            "--no-compress",
        ])
        .unwrap();
        match cli.command {
            Commands::Backup {
                sources,
                output,
                no_compress,
            } => {
                assert_eq!(sources, ["ssh_key=/a", "/b/secring.gpg"]);
                assert_eq!(output.as_deref(), Some("out.kst"));
                assert!(no_compress);
            }
            Commands::Restore { .. } => panic!("expected backup"),
        }
    }

    #[test]
    fn cli_parses_restore_with_repeated_maps() {
        let cli = Cli::try_parse_from([
            "keystash",
            "-v",
            "restore",
            "keys.kst",
            "--map",
            "a=/x",
            "--map",
            "b=/y",
            "--keep-existing",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Restore {
                archive,
                map,
                dest_dir,
                keep_existing,
            } => {
                assert_eq!(archive, "keys.kst");
                assert_eq!(map, ["a=/x", "b=/y"]);
                assert!(dest_dir.is_none());
                assert!(keep_existing);
            }
            Commands::Backup { .. } => panic!("expected restore"),
        }
    }

    #[test]
    fn backup_sources_may_come_from_config() {
        let cli = Cli::try_parse_from(["keystash", "backup"]).unwrap();
        match cli.command {
            Commands::Backup { sources, .. } => assert!(sources.is_empty()),
            Commands::Restore { .. } => panic!("expected backup"),
        }
    }
}
