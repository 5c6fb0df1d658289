//! Configuration loading for the broker gateway.
//!
//! Configuration is a YAML file (`config.yaml` by default) with serde
//! defaults for every section, so an empty or absent file yields a working
//! sandbox configuration. Secrets (OAuth client secrets) belong in the file
//! or the process environment of the deployment, never in code.

mod brokers;
mod observability;
mod reconciliation;
mod recovery;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use brokers::{BrokersConfig, OAuthSettings, VendorEndpoints};
pub use observability::LoggingConfig;
pub use reconciliation::ReconciliationConfig;
pub use recovery::RecoveryConfig;
pub use server::ServerConfig;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-vendor endpoints and OAuth clients.
    #[serde(default)]
    pub brokers: BrokersConfig,
    /// Reconciliation loop settings.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Startup recovery settings.
    #[serde(default)]
    pub recovery: RecoveryConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// With no explicit path, a missing `config.yaml` falls back to defaults; an
/// explicitly named file must exist.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p, true),
        None => (DEFAULT_CONFIG_PATH, false),
    };

    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(Config::default()),
        Ok(contents) => {
            let interpolated = interpolate_env_vars(&contents);
            Ok(serde_yaml_bw::from_str(&interpolated)?)
        }
        Err(source) if required => Err(ConfigError::ReadError {
            path: path.to_string(),
            source,
        }),
        Err(_) => Ok(Config::default()),
    }
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax, so OAuth client
/// secrets can live in the deployment environment instead of the file.
#[allow(clippy::expect_used)]
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    let mut result = input.to_string();
    for cap in re.captures_iter(input) {
        let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_match.as_str()) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };
        result = result.replace(full_match.as_str(), &value);
    }
    result
}
