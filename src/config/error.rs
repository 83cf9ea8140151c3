//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a site's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse `{}`", .0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
