//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILKEEP_CONFIG` (environment variable)
//! 2. `~/.config/mailkeep/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailkeep\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::sanitize::sanitize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mailboxes backed up by the `run` command.
    pub accounts: Vec<AccountConfig>,
}

/// General behavior settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory that holds all backups. Account destinations are created
    /// beneath it unless an account overrides its output.
    pub backup_root: PathBuf,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for the log file.
    pub cache_dir: Option<PathBuf>,
}

/// One mailbox entry in the `[[accounts]]` list.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Label for this mailbox; also its subdirectory name under the
    /// backup root.
    pub name: String,
    /// Path to the mailbox: an MBOX file or a directory of `.eml` files.
    pub mailbox: PathBuf,
    /// Destination override; when absent, `{backup_root}/{name}` is used.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl AccountConfig {
    /// Where this account's messages land.
    ///
    /// The account name is sanitized before joining, so a label like
    /// `"work/gmail"` cannot escape the backup root.
    pub fn destination(&self, backup_root: &Path) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => backup_root.join(sanitize(&self.name)),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            backup_root: PathBuf::from("backup"),
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILKEEP_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailkeep").join("config.toml"))
}

/// Return the cache directory used for the log file.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailkeep")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailkeep.log")
}
