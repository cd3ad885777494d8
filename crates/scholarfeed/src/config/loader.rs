use std::path::{Path, PathBuf};

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub const ENV_EMAIL_ADDRESS: &str = "SCHOLARFEED_EMAIL_ADDRESS";
pub const ENV_MAX_MESSAGES: &str = "SCHOLARFEED_MAX_MESSAGES";
pub const ENV_OUTPUT: &str = "SCHOLARFEED_OUTPUT";

/// Loads a config file, applies environment overrides and validates the result.
///
/// A missing `path` yields the built-in defaults (still subject to overrides).
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            parse_and_check(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Parses and validates a config document without consulting the environment.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config = parse_and_check(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_and_check(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;
    validate_schema(&json_value)?;
    Ok(serde_json::from_value(json_value)?)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let errors: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: errors.join("; "),
        });
    }

    Ok(())
}

/// Overrides selected fields from `SCHOLARFEED_*` environment variables.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(address) = env_value(ENV_EMAIL_ADDRESS) {
        config.mail.username = address;
    }

    if let Some(raw) = env_value(ENV_MAX_MESSAGES) {
        config.ingest.max_messages = raw.parse().map_err(|_| ConfigError::InvalidEnv {
            name: ENV_MAX_MESSAGES.to_string(),
            reason: format!("expected a positive integer, got '{}'", raw),
        })?;
    }

    if let Some(path) = env_value(ENV_OUTPUT) {
        config.output.path = PathBuf::from(path);
    }

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Semantic checks that the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.ingest.max_messages == 0 {
        return Err(ConfigError::Validation {
            message: "ingest.max_messages must be at least 1".to_string(),
        });
    }

    if config.ingest.batch_size == 0 {
        return Err(ConfigError::Validation {
            message: "ingest.batch_size must be at least 1".to_string(),
        });
    }

    if config.mail.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "mail.host must not be empty".to_string(),
        });
    }

    if config.enrichment.enabled {
        match config.enrichment.resolved_endpoint() {
            None => {
                return Err(ConfigError::Validation {
                    message: "enrichment.endpoint is required for the custom provider"
                        .to_string(),
                })
            }
            Some(endpoint) => {
                let parsed = url::Url::parse(&endpoint).map_err(|e| ConfigError::Validation {
                    message: format!("Invalid enrichment.endpoint '{}': {}", endpoint, e),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::Validation {
                        message: format!(
                            "enrichment.endpoint must use http or https, got '{}'",
                            parsed.scheme()
                        ),
                    });
                }
            }
        }
    }

    Ok(())
}
