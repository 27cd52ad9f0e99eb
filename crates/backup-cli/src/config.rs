//! Configuration file handling for atlassian-backup

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCATION: &str = "/tmp/";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default instance (short name, host or URL)
    pub instance: Option<String>,
    /// Default account to log in with
    pub username: Option<String>,
    /// Default directory for downloaded archives
    pub location: Option<PathBuf>,
    /// Default export timeout in minutes
    pub timeout: Option<u64>,
    /// Enable the audit log
    pub log: Option<bool>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("atlassian-backup");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: ArgOverrides<'_>) -> Result<MergedConfig> {
        let Some(instance) = args
            .instance
            .map(String::from)
            .or_else(|| self.instance.clone())
        else {
            bail!("No instance given: use --instance or set `instance` in the config file");
        };
        let Some(username) = args
            .username
            .map(String::from)
            .or_else(|| self.username.clone())
        else {
            bail!("No username given: use --username or set `username` in the config file");
        };

        Ok(MergedConfig {
            instance,
            username,
            location: args
                .location
                .map(Path::to_path_buf)
                .or_else(|| self.location.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCATION)),
            timeout: args.timeout.or(self.timeout),
            log: args.log || self.log.unwrap_or(false),
        })
    }
}

/// Values given on the command line, each taking precedence over the file
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgOverrides<'a> {
    pub instance: Option<&'a str>,
    pub username: Option<&'a str>,
    pub location: Option<&'a Path>,
    pub timeout: Option<u64>,
    pub log: bool,
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
    pub instance: String,
    pub username: String,
    pub location: PathBuf,
    /// Unset leaves the client configuration's budget in place
    pub timeout: Option<u64>,
    pub log: bool,
}
