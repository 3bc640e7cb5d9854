use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::BuildOptions;
use crate::backup::SourceSpec;
use crate::crypto::kdf::Argon2Params;
use crate::errors::{KeystashError, Result};

/// Environment variables that override the Argon2 work factor.
pub const ENV_MEMORY_KIB: &str = "KEYSTASH_ARGON2_MEMORY_KIB";
pub const ENV_ITERATIONS: &str = "KEYSTASH_ARGON2_ITERATIONS";
pub const ENV_PARALLELISM: &str = "KEYSTASH_ARGON2_PARALLELISM";

/// Backup configuration, loaded from `.keystash.toml`.
///
/// Every field has a sensible default so Keystash works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Compress key files before encrypting them.
    #[serde(default = "default_compress")]
    pub compress: bool,

    /// Directory (relative to the config dir) where new archives go.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Files backed up when none are given on the command line.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// One `[[sources]]` table.
///
/// ```toml
/// [[sources]]
/// name = "ssh_key"
/// path = "/home/me/.ssh/id_ed25519"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Entry name in the archive (default: the file name).
    #[serde(default)]
    pub name: Option<String>,

    /// File to back up.  Relative paths are taken from the config dir.
    pub path: PathBuf,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_compress() -> bool {
    true
}

fn default_output_dir() -> String {
    ".".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            compress: default_compress(),
            output_dir: default_output_dir(),
            sources: Vec::new(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for.
    const FILE_NAME: &'static str = ".keystash.toml";

    /// Load settings from `<dir>/.keystash.toml`, then apply
    /// `KEYSTASH_ARGON2_*` environment overrides.
    ///
    /// A missing file means defaults; an unparseable one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut settings = Self::load_file(dir)?;
        settings.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Load `<dir>/.keystash.toml` only.
    pub fn load_file(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            KeystashError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Override the work factor from variables returned by `lookup`.
    ///
    /// Empty values are ignored.  Values that are not integers are a
    /// `ConfigError`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let targets: [(&str, &mut u32); 3] = [
            (ENV_MEMORY_KIB, &mut self.argon2_memory_kib),
            (ENV_ITERATIONS, &mut self.argon2_iterations),
            (ENV_PARALLELISM, &mut self.argon2_parallelism),
        ];

        for (name, slot) in targets {
            let Some(raw) = lookup(name) else { continue };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            *slot = raw.parse().map_err(|e| {
                KeystashError::ConfigError(format!("{name}='{raw}' is not a valid number: {e}"))
            })?;
        }
        Ok(())
    }

    /// Directory where new archives are written.
    pub fn output_dir(&self, base: &Path) -> PathBuf {
        base.join(&self.output_dir)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// The configured `[[sources]]`, resolved against `base`.
    pub fn source_specs(&self, base: &Path) -> Result<Vec<SourceSpec>> {
        self.sources
            .iter()
            .map(|source| {
                let path = base.join(&source.path);
                match &source.name {
                    Some(name) => Ok(SourceSpec::new(name.clone(), path)),
                    None => SourceSpec::from_path(path),
                }
            })
            .collect()
    }

    /// Build options for the archive builder.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            argon2: self.argon2_params(),
            compress: self.compress,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
