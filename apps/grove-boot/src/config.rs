//! User settings for grove-boot.
//!
//! Settings come from an optional TOML file, then environment variables.
//! Everything has a default, so a missing file is not an error.
//!
//! ## File Format
//!
//! `$GROVE_BOOT_CONFIG`, or `<config_dir>/grove/bootstrap.toml`:
//!
//! ```toml
//! repository = "grove-sh/grove"
//! api_server = "https://api.github.com"
//! download_server = "https://github.com"
//! version_timeout_secs = 5
//! verify_install = true
//!
//! [popup]
//! width = "80%"
//! height = "80%"
//! default_key = "g"
//! ```
//!
//! ## Environment Overrides
//!
//! Empty or whitespace-only values are treated as unset.
//!
//! - `GROVE_BOOT_REPOSITORY` - `owner/project`
//! - `GROVE_BOOT_API_SERVER` - release API base URL
//! - `GROVE_BOOT_DOWNLOAD_SERVER` - release download base URL

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::toolchain::ReleaseConfig;

/// Environment variable pointing at an explicit settings file.
pub const CONFIG_PATH_ENV: &str = "GROVE_BOOT_CONFIG";
pub const REPOSITORY_ENV: &str = "GROVE_BOOT_REPOSITORY";
pub const API_SERVER_ENV: &str = "GROVE_BOOT_API_SERVER";
pub const DOWNLOAD_SERVER_ENV: &str = "GROVE_BOOT_DOWNLOAD_SERVER";

const DEFAULT_REPOSITORY: &str = "grove-sh/grove";
const DEFAULT_API_SERVER: &str = "https://api.github.com";
const DEFAULT_DOWNLOAD_SERVER: &str = "https://github.com";
const DEFAULT_VERSION_TIMEOUT_SECS: u64 = 5;

/// Key bound when the multiplexer has no `@grove-key` override.
pub const DEFAULT_KEY: &str = "g";
const DEFAULT_POPUP_SIZE: &str = "80%";

/// Top-level settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// GitHub repository publishing the releases, as `owner/project`.
    pub repository: String,
    pub api_server: String,
    pub download_server: String,
    /// Bound on the latest-version query; past it the cached binary is used.
    pub version_timeout_secs: u64,
    /// Run `<binary> --version` on a fresh download before installing it.
    pub verify_install: bool,
    pub popup: PopupSettings,
}

/// Popup geometry and key binding.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PopupSettings {
    /// Width as a percentage of the terminal, e.g. `80%`.
    pub width: String,
    /// Height as a percentage of the terminal, e.g. `80%`.
    pub height: String,
    /// Key used when the multiplexer defines no override.
    pub default_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
            api_server: DEFAULT_API_SERVER.to_string(),
            download_server: DEFAULT_DOWNLOAD_SERVER.to_string(),
            version_timeout_secs: DEFAULT_VERSION_TIMEOUT_SECS,
            verify_install: true,
            popup: PopupSettings::default(),
        }
    }
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_POPUP_SIZE.to_string(),
            height: DEFAULT_POPUP_SIZE.to_string(),
            default_key: DEFAULT_KEY.to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the default location and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or
    /// parsed, or if a value is invalid.
    pub fn load() -> Result<Self> {
        let mut settings = match settings_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Parses a settings file.
    ///
    /// # Errors
    ///
    /// Returns an error naming the file if it cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML or unknown keys.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid settings TOML")
    }

    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(repository) = get(REPOSITORY_ENV) {
            self.repository = repository;
        }
        if let Some(server) = get(API_SERVER_ENV) {
            self.api_server = server;
        }
        if let Some(server) = get(DOWNLOAD_SERVER_ENV) {
            self.download_server = server;
        }
    }

    /// Checks values that the deserializer cannot.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        split_repository(&self.repository)?;
        if self.version_timeout_secs == 0 {
            bail!("version_timeout_secs must be at least 1");
        }
        parse_percent(&self.popup.width).context("Invalid popup.width")?;
        parse_percent(&self.popup.height).context("Invalid popup.height")?;
        if self.popup.default_key.trim().is_empty() {
            bail!("popup.default_key must not be empty");
        }
        Ok(())
    }

    /// Builds the release location for the resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if `repository` is not `owner/project`.
    pub fn release_config(&self) -> Result<ReleaseConfig> {
        let (owner, project) = split_repository(&self.repository)?;
        Ok(ReleaseConfig {
            owner: owner.to_string(),
            project: project.to_string(),
            api_server: self.api_server.clone(),
            download_server: self.download_server.clone(),
            version_timeout: Duration::from_secs(self.version_timeout_secs),
        })
    }

    /// Name of the binary inside the release archives.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        split_repository(&self.repository).map_or("grove", |(_, project)| project)
    }
}

/// Returns the settings file path, if one can be determined.
#[must_use]
pub fn settings_path() -> Option<PathBuf> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
        _ => dirs::config_dir().map(|dir| dir.join("grove").join("bootstrap.toml")),
    }
}

fn split_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.split_once('/') {
        Some((owner, project))
            if !owner.is_empty() && !project.is_empty() && !project.contains('/') =>
        {
            Ok((owner, project))
        }
        _ => bail!("repository must be `owner/project`, got {repository:?}"),
    }
}

/// Parses a percentage such as `80%` into `80`.
///
/// # Errors
///
/// Returns an error unless the value is `1%` to `100%`.
pub fn parse_percent(value: &str) -> Result<u8> {
    let number = value
        .trim()
        .strip_suffix('%')
        .with_context(|| format!("{value:?} is not a percentage"))?;
    match number.parse::<u8>() {
        Ok(n) if (1..=100).contains(&n) => Ok(n),
        _ => bail!("{value:?} must be between 1% and 100%"),
    }
}
