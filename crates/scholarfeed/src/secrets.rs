//! Secret resolution for the mailbox password and the annotation API key.
//!
//! A [`SecretSource`] names up to three places a secret may live. They are
//! consulted in order: inline value, file, environment variable. The first
//! non-empty one wins.

use secrecy::SecretString;
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source configured (need an inline value, a file path, or an env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretSource {
    pub direct: Option<String>,
    pub file: Option<String>,
    pub env_var: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl SecretSource {
    pub fn new(direct: Option<String>, file: Option<String>, env_var: Option<String>) -> Self {
        Self {
            direct,
            file,
            env_var,
        }
    }

    pub fn from_env_var(name: impl Into<String>) -> Self {
        Self {
            env_var: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        non_empty(&self.direct).is_some()
            || non_empty(&self.file).is_some()
            || non_empty(&self.env_var).is_some()
    }

    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        if let Some(value) = non_empty(&self.direct) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = non_empty(&self.file) {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(source) => Err(SecretError::FileRead {
                    path: expanded,
                    source,
                }),
            };
        }

        if let Some(name) = non_empty(&self.env_var) {
            return match std::env::var(name) {
                // Values exported from shell scripts often carry a trailing newline.
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided)
    }

    /// Like [`resolve`](Self::resolve), but an unset env var or a missing
    /// source yields `None`. File errors are still reported.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>, SecretError> {
        match self.resolve() {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided) | Err(SecretError::EnvVarNotSet { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Expands a leading `~` or `~/` to the current user's home directory.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
