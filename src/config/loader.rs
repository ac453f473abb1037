//! Configuration loading from disk.

use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;

/// Failure to produce a usable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{path}' is not valid TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from a TOML file, apply environment overrides
/// and run the semantic checks. Any failure is fatal at startup.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let shown = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: shown.clone(),
        source,
    })?;

    let mut config: GatewayConfig =
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path: shown, source })?;

    apply_env_overrides(&mut config);

    validate_config(&config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(|error| error.0.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        ConfigError::Invalid(joined)
    })?;

    Ok(config)
}

/// Secrets come from the environment, not from the config file.
fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(password) = std::env::var("GATEWAY_SESSION_STORE_PASSWORD") {
        if !password.is_empty() {
            config.session_store.password = Some(password);
        }
    }
}
