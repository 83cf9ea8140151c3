//! Asset pipeline error types.
//!
//! | Type              | Fatal | Raised by                               |
//! |-------------------|-------|-----------------------------------------|
//! | `Configuration`   | yes   | path resolver, entry validation, plan   |
//! | `MissingSource`   | yes   | entry set builder (fixed entries)       |
//! | `Driver`          | yes   | bundler engine, surfaced verbatim       |
//! | `CleanupWarning`  | no    | orphan cleaner                          |

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal build errors. Any of these aborts the build immediately.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("missing source for entry `{entry}`: {} does not exist", path.display())]
    MissingSource { entry: String, path: PathBuf },

    // NOTE: No #[from] here - driver errors are wrapped explicitly at the seam
    #[error("{0:#}")]
    Driver(anyhow::Error),
}

impl BuildError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Short tag used in logs and tests.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::MissingSource { .. } => "MissingSourceError",
            Self::Driver(_) => "DriverError",
        }
    }
}

/// Non-fatal: an orphan artifact exists but could not be deleted.
#[derive(Debug, Error)]
#[error("could not remove orphan artifact `{}`", path.display())]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
