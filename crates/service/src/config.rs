//! Daemon configuration
//!
//! Loaded once at startup from `--config` or the default location, and
//! created with defaults when missing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::profile_switcher::SwitcherConfig;

/// Current configuration schema.
pub const CONFIG_SCHEMA_VERSION: &str = "keypilot.config/1";

const MAX_DEBOUNCE_MS: u64 = 10_000;
const MAX_UPLOAD_TIMEOUT_MS: u64 = 120_000;
const MIN_POLL_INTERVAL_MS: u64 = 10;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Complete daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPilotConfig {
    /// Configuration schema version
    pub schema_version: String,
    /// Follow application focus
    pub auto_switch_enabled: bool,
    /// Focus debounce window in milliseconds
    pub debounce_ms: u64,
    /// Upper bound on one upload in milliseconds
    pub upload_timeout_ms: u64,
    /// Configuration tool binary; searched for when unset
    pub tool_path: Option<PathBuf>,
    /// Profile document; `profiles.json` next to the config when unset
    pub profiles_path: Option<PathBuf>,
    /// Focus detection
    pub focus: FocusConfig,
}

/// How the daemon learns about focus changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Command printing the focused application's identifier, as argv
    pub command: Option<Vec<String>>,
    /// Polling period for `command` in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for KeyPilotConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            auto_switch_enabled: true,
            debounce_ms: 300,
            upload_timeout_ms: 5_000,
            tool_path: None,
            profiles_path: None,
            focus: FocusConfig::default(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            command: None,
            poll_interval_ms: 250,
        }
    }
}

impl KeyPilotConfig {
    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path).await
    }

    /// Load configuration from `path`, writing the defaults there if the file
    /// does not exist
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            info!(path = %path.display(), "Config file not found, creating default");
            let config = Self::default();
            config.save_to_path(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save configuration to `path` through a temp file and rename
    pub async fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", temp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                debug!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp config");
            }
            return Err(e)
                .with_context(|| format!("Failed to replace config file: {}", path.display()));
        }

        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// `$HOME/.config/keypilot/config.json` (`%LOCALAPPDATA%` on Windows)
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.json"))
    }

    /// Profile document location, defaulting to the config directory
    pub fn profiles_path(&self) -> Result<PathBuf> {
        match &self.profiles_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("profiles.json")),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.schema_version.starts_with("keypilot.config/") {
            anyhow::bail!("Invalid schema version: {}", self.schema_version);
        }

        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            anyhow::bail!("Invalid debounce: {} ms", self.debounce_ms);
        }

        if self.upload_timeout_ms == 0 || self.upload_timeout_ms > MAX_UPLOAD_TIMEOUT_MS {
            anyhow::bail!("Invalid upload timeout: {} ms", self.upload_timeout_ms);
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.focus.poll_interval_ms) {
            anyhow::bail!(
                "Invalid focus poll interval: {} ms",
                self.focus.poll_interval_ms
            );
        }

        if let Some(command) = &self.focus.command
            && command.first().is_none_or(|program| program.trim().is_empty())
        {
            anyhow::bail!("Focus command must name a program");
        }

        Ok(())
    }

    /// Engine settings derived from this configuration
    pub fn switcher_config(&self) -> SwitcherConfig {
        SwitcherConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            upload_timeout: Duration::from_millis(self.upload_timeout_ms),
            auto_switch_enabled: self.auto_switch_enabled,
            ..SwitcherConfig::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.focus.poll_interval_ms)
    }
}

fn config_dir() -> Result<PathBuf> {
    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA").context("LOCALAPPDATA environment variable not set")?
    } else {
        format!(
            "{}/.config",
            std::env::var("HOME").context("HOME environment variable not set")?
        )
    };
    Ok(PathBuf::from(base).join("keypilot"))
}
