//! Configuration file support for FitXcel.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitxcel/config.toml`.

use crate::progression::{LevelCurve, BASE_XP, SCALING};
use crate::{Error, Result, TaskCatalog, TaskDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub tasks: TasksConfig,
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

/// Level curve parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_base_xp")]
    pub base_xp: u32,

    #[serde(default = "default_scaling")]
    pub scaling: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            scaling: default_scaling(),
        }
    }
}

impl ProgressionConfig {
    pub fn curve(&self) -> Result<LevelCurve> {
        LevelCurve::new(self.base_xp, self.scaling)
    }
}

/// Persistence retry and locking parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Attempts per read-then-conditional-write before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Extra tasks offered on top of the built-in ones
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TasksConfig {
    #[serde(default)]
    pub custom: Vec<TaskDefinition>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join("fitxcel")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_base_xp() -> u32 {
    BASE_XP
}

fn default_scaling() -> u32 {
    SCALING
}

/// Longest accepted retry backoff or lock wait
const MAX_WAIT_MS: u64 = 10 * 60 * 1_000;

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    10
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
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
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join("fitxcel").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
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

    /// Reject settings that would break the level curve or retry loop
    pub fn validate(&self) -> Result<()> {
        self.progression.curve()?;
        if self.store.max_attempts == 0 {
            return Err(Error::Config("store.max_attempts must be at least 1".into()));
        }
        if self.store.retry_backoff_ms > MAX_WAIT_MS {
            return Err(Error::Config(format!(
                "store.retry_backoff_ms must be at most {}",
                MAX_WAIT_MS
            )));
        }
        if self.store.lock_timeout_ms > MAX_WAIT_MS {
            return Err(Error::Config(format!(
                "store.lock_timeout_ms must be at most {}",
                MAX_WAIT_MS
            )));
        }
        Ok(())
    }

    /// Built-in tasks plus any configured custom tasks, validated
    pub fn catalog(&self) -> Result<TaskCatalog> {
        let catalog = TaskCatalog::with_custom(self.tasks.custom.iter().cloned());
        let errors = catalog.validate();
        if !errors.is_empty() {
            for error in &errors {
                tracing::warn!("Task catalog: {}", error);
            }
            return Err(Error::CatalogValidation(errors.join("; ")));
        }
        Ok(catalog)
    }
}
