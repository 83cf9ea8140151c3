//! Build mode selection for development/production builds.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Build mode requested by the environment or the command line.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Readable output, no minification.
    #[default]
    Development,
    /// Minified output.
    Production,
}

impl BuildMode {
    /// Whether emitted artifacts are minified.
    #[inline]
    pub const fn minify(self) -> bool {
        matches!(self, Self::Production)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    /// Accepts the usual environment spellings (`dev`, `prod`, any case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown build mode `{other}`")),
        }
    }
}
