//! The `vapid` key of `package.json`.
//!
//! ```json
//! {
//!   "vapid": {
//!     "port": 3000,
//!     "build": {
//!       "output": "data/.assets",
//!       "stylesheets": "stylesheets/site.s[ac]ss",
//!       "respectMode": false
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::{DEFAULT_OUTPUT_DIR, DEFAULT_STYLE_PATTERN, HONOR_REQUESTED_MODE};

pub const DEFAULT_PORT: u16 = 3000;

/// Fields of `package.json` the CLI reads besides `vapid`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub scripts: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str).filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VapidOptions {
    /// Development server port.
    pub port: u16,
    pub build: BuildOptions,
}

impl Default for VapidOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            build: BuildOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
    /// Output directory, relative to the site root.
    pub output: PathBuf,
    /// Stylesheet glob, relative to `www`.
    pub stylesheets: String,
    /// Honor the requested build mode instead of always building for
    /// production.
    pub respect_mode: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            stylesheets: DEFAULT_STYLE_PATTERN.to_string(),
            respect_mode: HONOR_REQUESTED_MODE,
        }
    }
}
