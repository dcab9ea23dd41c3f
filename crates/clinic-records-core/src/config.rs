//! Configuration management for clinic records.
//!
//! Loaded with figment from defaults, an optional TOML file and
//! `CLINIC_RECORDS_`-prefixed environment variables.

use std::collections::HashSet;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{default_log_level, normalize_level};
use crate::models::DEFAULT_MEDICINES;
use crate::records::clinic_collections;
use crate::store::StoreOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "clinic-records";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "patients.db";

/// Environment variable prefix. Nested keys use `__`,
/// e.g. `CLINIC_RECORDS_STORAGE__SCHEMA_VERSION=5`.
const ENV_PREFIX: &str = "CLINIC_RECORDS_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application configuration.
///
/// Precedence, highest first:
/// 1. Environment variables (prefixed with `CLINIC_RECORDS_`)
/// 2. TOML config file at `~/.config/clinic-records/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub catalog: CatalogConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. Defaults to `~/.local/share/clinic-records/patients.db`
    pub database_path: Option<PathBuf>,
    /// Keep everything in memory (nothing survives the process)
    pub in_memory: bool,
    /// Store name recorded in the database
    pub store_name: String,
    /// Store version; raising it creates collections added since
    pub schema_version: u32,
}

/// Logging-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace | debug | info | warn | error
    pub level: String,
    /// Absolute log directory. File logging is off when unset.
    pub directory: Option<PathBuf>,
}

/// Medicine catalog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Seeded when the medicine collection is first created
    pub default_medicines: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            in_memory: false,
            store_name: "patientDB".to_string(),
            schema_version: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            directory: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_medicines: DEFAULT_MEDICINES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl ClinicConfig {
    /// Load configuration from all sources.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    pub fn load_from(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(ClinicConfig::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: ClinicConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.schema_version == 0 {
            return Err(ConfigError::Validation {
                message: "schema_version must be greater than 0".to_string(),
            });
        }
        if self.storage.store_name.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "store_name cannot be empty".to_string(),
            });
        }

        normalize_level(&self.logging.level)
            .map_err(|err| ConfigError::Validation { message: err.to_string() })?;

        let mut seen = HashSet::new();
        for name in &self.catalog.default_medicines {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Validation {
                    message: "default medicine names cannot be blank".to_string(),
                });
            }
            if !seen.insert(trimmed.to_lowercase()) {
                return Err(ConfigError::Validation {
                    message: format!("duplicate default medicine: {trimmed}"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Options for opening the clinic store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            path: (!self.storage.in_memory).then(|| self.database_path()),
            name: self.storage.store_name.clone(),
            version: self.storage.schema_version,
            collections: clinic_collections(&self.catalog.default_medicines),
        }
    }
}
