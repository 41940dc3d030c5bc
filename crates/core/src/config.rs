//! Application Configuration
//!
//! Manages settings for a debug run:
//! - Android SDK / adb location
//! - Packager endpoint
//! - Debugger relay reconnect behaviour
//! - Default device preference

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{DebugError, Result};

/// Android SDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    /// Path to Android SDK
    pub sdk_path: Option<PathBuf>,
    /// Explicit adb executable, overrides SDK lookup
    pub adb_path: Option<PathBuf>,
}

/// Packager (bundle server) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    /// Host the packager listens on
    pub host: String,
    /// Port the packager listens on
    pub port: u16,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8081,
        }
    }
}

impl PackagerConfig {
    /// WebSocket endpoint of the debugger proxy
    pub fn relay_url(&self) -> String {
        format!("ws://{}:{}/debugger-proxy", self.host, self.port)
    }
}

/// Debugger relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Fixed delay between a close and the next connect attempt
    pub reconnect_delay_ms: u64,
    /// Give up after this many consecutive failed connects, counting the
    /// first attempt (unset = never)
    pub max_connect_failures: Option<u32>,
    /// Acknowledge `executeApplicationScript` even when the script fails
    pub ack_failed_scripts: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 1000,
            max_connect_failures: None,
            ack_failed_scripts: false,
        }
    }
}

impl RelayConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Session defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Preferred device id when several devices are attached
    pub target: Option<String>,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Android SDK settings
    pub android: AndroidConfig,
    /// Packager settings
    pub packager: PackagerConfig,
    /// Relay settings
    pub relay: RelayConfig,
    /// Session settings
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            android: AndroidConfig::default(),
            packager: PackagerConfig::default(),
            relay: RelayConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "rndroid", "RN-Droid")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location, creating it if missing
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| DebugError::Config("Cannot determine config path".into()))?;
        Self::load_from(&config_file).await
    }

    /// Load configuration from an explicit file, creating it if missing
    pub async fn load_from(config_file: &Path) -> Result<Self> {
        if config_file.exists() {
            debug!("Loading config from {:?}", config_file);
            let contents = tokio::fs::read_to_string(config_file).await?;
            let config: AppConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            info!("Config file not found, using defaults");
            let config = AppConfig::default();
            config.save_to(config_file).await?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<()> {
        let config_file = Self::config_file()
            .ok_or_else(|| DebugError::Config("Cannot determine config path".into()))?;
        self.save_to(&config_file).await
    }

    /// Save configuration to an explicit file
    pub async fn save_to(&self, config_file: &Path) -> Result<()> {
        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(config_file, contents).await?;

        debug!("Config saved to {:?}", config_file);
        Ok(())
    }

    /// Get Android SDK path, with auto-detection
    pub fn get_sdk_path(&self) -> Option<PathBuf> {
        self.android.sdk_path.clone().or_else(|| {
            let from_env = ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
                .iter()
                .filter_map(|var| std::env::var_os(var))
                .map(PathBuf::from);

            let defaults = if cfg!(windows) {
                vec![
                    dirs::config_local_dir().map(|d| d.join("Android").join("Sdk")),
                    Some(PathBuf::from("C:\\Android\\sdk")),
                ]
            } else {
                vec![
                    dirs::home_dir().map(|h: PathBuf| h.join("Android").join("Sdk")),
                    dirs::home_dir().map(|h: PathBuf| h.join("Library").join("Android").join("sdk")),
                    Some(PathBuf::from("/usr/local/android-sdk")),
                ]
            };

            from_env
                .chain(defaults.into_iter().flatten())
                .find(|p: &PathBuf| p.exists())
        })
    }
}
