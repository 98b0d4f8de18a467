use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Deployment-level configuration, loaded from `credvault.toml`.
///
/// Every field has a sensible default so the vault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the service's base dir) holding the record
    /// and audit databases.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// File name of the record database inside `vault_dir`.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Whether to keep an operation history in `<vault_dir>/audit.db`.
    #[serde(default = "default_audit_log")]
    pub audit_log: bool,

    /// Length of generated passwords when a store request supplies no
    /// secret value (default: 16).
    #[serde(default = "default_generated_password_length")]
    pub generated_password_length: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".credvault".to_string()
}

fn default_database_file() -> String {
    "records.db".to_string()
}

fn default_audit_log() -> bool {
    true
}

fn default_generated_password_length() -> usize {
    16
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            database_file: default_database_file(),
            audit_log: default_audit_log(),
            generated_password_length: default_generated_password_length(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the base directory.
    const FILE_NAME: &'static str = "credvault.toml";

    /// Load settings from `<base_dir>/credvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let config_path = base_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Build the full path to the record database.
    ///
    /// Example: `base_dir/.credvault/records.db`
    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.vault_dir).join(&self.database_file)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
