//! Observation layer configuration.
//!
//! Loaded from YAML files or environment variables.

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "cql-observation.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CQL_OBSERVATION_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CQL_OBSERVATION";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CQL_OBSERVATION_LOG";

/// Default remote service name reported on observations.
pub const DEFAULT_REMOTE_SERVICE_NAME: &str = "cassandra";
/// Keyspace reported when the session has none.
pub const DEFAULT_KEYSPACE: &str = "system";

use serde::Deserialize;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Who stops observations of execute-kind operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecuteCompletion {
    /// The session's request tracker stops them.
    #[default]
    Tracker,
    /// The interceptor stops them when the delegated call completes.
    Interceptor,
}

/// Statement recording settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    /// Include query text in observation contexts.
    pub record: bool,
    /// Maximum recorded query length in bytes.
    pub max_length: usize,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            record: true,
            max_length: 1024,
        }
    }
}

/// Observation layer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    /// Name of the remote service the session talks to.
    pub remote_service_name: String,
    /// When disabled, observations are attached but no handler runs.
    pub enabled: bool,
    /// Keyspace reported when the session has none.
    pub default_keyspace: String,
    pub execute_completion: ExecuteCompletion,
    pub statement: StatementConfig,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            remote_service_name: DEFAULT_REMOTE_SERVICE_NAME.to_string(),
            enabled: true,
            default_keyspace: DEFAULT_KEYSPACE.to_string(),
            execute_completion: ExecuteCompletion::default(),
            statement: StatementConfig::default(),
        }
    }
}

impl ObservationConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `DEFAULT_CONFIG_FILE` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self::default()
    }
}
