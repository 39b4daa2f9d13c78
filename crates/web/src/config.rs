//! Application configuration with multi-source merging.
//!
//! Precedence, lowest first:
//! 1. built-in defaults
//! 2. `nightstocker.toml` in the working directory, or the file named by
//!    `NIGHTSTOCKER_CONFIG`, or an explicit path
//! 3. environment variables, e.g. `NIGHTSTOCKER__SERVER__BIND=0.0.0.0:9000`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nightstocker_core::UserId;
use nightstocker_inventory::{Technician, TechnicianRoster};
use nightstocker_observability::LogFormat;
#[cfg(feature = "firestore")]
use nightstocker_store::FirestoreConfig;

pub const DEFAULT_CONFIG_FILE: &str = "nightstocker.toml";
pub const CONFIG_PATH_VAR: &str = "NIGHTSTOCKER_CONFIG";
pub const ENV_PREFIX: &str = "NIGHTSTOCKER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identity used when a request carries no `X-User-Id` header.
    pub default_user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Firestore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[cfg(feature = "firestore")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firestore: Option<FirestoreConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub log: LogConfig,
    pub store: StoreConfig,
    /// Technicians allowed to pull on the Tech screen.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technicians: Vec<Technician>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8080".to_string(),
            },
            session: SessionConfig {
                default_user: "night-room".to_string(),
            },
            log: LogConfig {
                filter: "info".to_string(),
                format: LogFormat::Json,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                #[cfg(feature = "firestore")]
                firestore: None,
            },
            technicians: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn roster(&self) -> Result<TechnicianRoster, ConfigError> {
        TechnicianRoster::new(self.technicians.clone())
            .map_err(|e| ConfigError::Invalid(format!("technicians: {e}")))
    }

    pub fn default_user(&self) -> Result<UserId, ConfigError> {
        UserId::new(self.session.default_user.as_str())
            .map_err(|e| ConfigError::Invalid(format!("session.default_user: {e}")))
    }

    /// Check cross-field rules that deserialization cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.roster()?;
        self.default_user()?;
        if self.store.backend == StoreBackend::Firestore {
            #[cfg(feature = "firestore")]
            if self.store.firestore.is_none() {
                return Err(ConfigError::Invalid(
                    "store.backend = \"firestore\" requires a [store.firestore] section".to_string(),
                ));
            }
            #[cfg(not(feature = "firestore"))]
            return Err(ConfigError::Invalid(
                "built without the `firestore` feature".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader with builder pattern.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env: None,
        }
    }

    /// Read this file instead of the default location.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use these variables instead of the process environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    fn config_file(&self) -> (PathBuf, bool) {
        if let Some(path) = &self.file {
            return (path.clone(), true);
        }
        let from_env = match &self.env {
            Some(vars) => vars.get(CONFIG_PATH_VAR).cloned(),
            None => std::env::var(CONFIG_PATH_VAR).ok(),
        };
        match from_env {
            Some(path) => (PathBuf::from(path), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }

    /// Load configuration from all sources with proper precedence.
    pub fn load(self) -> Result<AppConfig, ConfigError> {
        let mut builder = config::Config::builder();

        // 1. Built-in defaults
        builder = builder.add_source(config::Config::try_from(&AppConfig::default())?);

        // 2. Config file (required only when named explicitly)
        let (file, required) = self.config_file();
        builder = builder.add_source(
            config::File::from(file)
                .required(required)
                .format(config::FileFormat::Toml),
        );

        // 3. Environment variables (NIGHTSTOCKER__SECTION__KEY)
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(self.env),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
