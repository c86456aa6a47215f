//! Configuration system for p2plink.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $P2PLINK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/p2plink/config.toml
//!   3. ~/.config/p2plink/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct P2pLinkConfig {
    pub link: LinkConfig,
    pub api: ApiConfig,
    pub loopback: LoopbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Start with Wi-Fi Direct administratively enabled.
    pub enabled: bool,
    /// Daemon bundled with an app rather than preinstalled. A preinstalled
    /// daemon is always treated as foreground.
    pub standalone: bool,
    /// Default group owner intent for links requested without one (0–15).
    pub group_owner_intent: u8,
    /// Give up on a pending connection after this many seconds.
    pub connection_timeout_secs: u64,
    /// Period of the discovery and peer-find loops.
    pub periodic_interval_secs: u64,
    /// Keep a cancelled advertisement on the air this long so scanning
    /// peers see its zero timer.
    pub advertise_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Local HTTP control port.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Interface name reported for established links.
    pub interface: String,
    /// P2P device address this node reports for itself.
    pub device_address: String,
    /// Form a group as soon as a connect is requested.
    pub auto_accept: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            standalone: true,
            group_owner_intent: 7,
            connection_timeout_secs: 150,
            periodic_interval_secs: 40,
            advertise_grace_secs: 256,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 9101 }
    }
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            interface: "p2p-wlan0-0".to_string(),
            device_address: "02:00:00:00:00:00".to_string(),
            auto_accept: true,
        }
    }
}

impl LinkConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs(self.periodic_interval_secs)
    }

    pub fn advertise_grace(&self) -> Duration {
        Duration::from_secs(self.advertise_grace_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("p2plink")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl P2pLinkConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::parse(&path, &text)?
        } else {
            P2pLinkConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn parse(path: &std::path::Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("P2PLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&P2pLinkConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply P2PLINK_* overrides. `lookup` resolves a variable name.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("P2PLINK_LINK__ENABLED") {
            self.link.enabled = v == "true" || v == "1";
        }
        if let Some(v) = lookup("P2PLINK_LINK__STANDALONE") {
            self.link.standalone = v == "true" || v == "1";
        }
        if let Some(v) = lookup("P2PLINK_LINK__GROUP_OWNER_INTENT") {
            if let Ok(intent) = v.parse::<u8>() {
                self.link.group_owner_intent = intent.min(15);
            }
        }
        if let Some(v) = lookup("P2PLINK_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Some(v) = lookup("P2PLINK_LOOPBACK__INTERFACE") {
            self.loopback.interface = v;
        }
    }
}
