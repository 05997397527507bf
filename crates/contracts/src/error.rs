//! Contract errors
//!
//! Configuration problems surface here; wire-level decode errors belong to
//! the bridge crate.

use thiserror::Error;

/// Error raised while loading or checking a bridge blueprint
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `field` is the dotted blueprint path, e.g. `network.sync_port`
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Reports the first failing field; the message lists all of them
impl From<validator::ValidationErrors> for ContractError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "blueprint".to_string());
        Self::ConfigValidation {
            field,
            message: errors.to_string(),
        }
    }
}
