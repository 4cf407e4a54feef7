//! Configuration file support for FastTrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fasttrack/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub fasting: FastingConfig,

    #[serde(default)]
    pub calories: CaloriesConfig,

    #[serde(default)]
    pub fitbit: FitbitConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Fasting timer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FastingConfig {
    /// Goal shown as the progress target
    #[serde(default = "default_goal_hours")]
    pub goal_hours: u32,

    /// Cadence of the watch loop
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for FastingConfig {
    fn default() -> Self {
        Self {
            goal_hours: default_goal_hours(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Calorie tracking configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaloriesConfig {
    /// Target used until one is set explicitly
    #[serde(default = "default_calorie_target")]
    pub default_target: u32,
}

impl Default for CaloriesConfig {
    fn default() -> Self {
        Self {
            default_target: default_calorie_target(),
        }
    }
}

/// Fitbit weight sync configuration
///
/// The client secret never lives here. Token exchange goes through
/// `token_broker_url`, a backend that holds the secret.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FitbitConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default)]
    pub token_broker_url: Option<String>,

    #[serde(default = "default_period")]
    pub period: String,
}

impl Default for FitbitConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            token_broker_url: None,
            period: default_period(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("fasttrack")
}

fn default_goal_hours() -> u32 {
    16
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_calorie_target() -> u32 {
    2000
}

fn default_redirect_uri() -> String {
    "http://localhost:8080/fitbit-callback".into()
}

fn default_period() -> String {
    "30d".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("fasttrack").join("config.toml")
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.fasting.goal_hours == 0 {
            return Err(Error::Config("fasting.goal_hours must be positive".into()));
        }
        if self.fasting.tick_interval_ms == 0 {
            return Err(Error::Config(
                "fasting.tick_interval_ms must be positive".into(),
            ));
        }
        if !(1..=crate::calories::MAX_CALORIE_TARGET).contains(&self.calories.default_target) {
            return Err(Error::Config(format!(
                "calories.default_target must be between 1 and {}",
                crate::calories::MAX_CALORIE_TARGET
            )));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
