//! Site configuration: `package.json`, `.env` and environment overrides.
//!
//! # Sources (later wins)
//!
//! | Setting        | Defaults          | package.json              | Environment            |
//! |----------------|-------------------|---------------------------|------------------------|
//! | build mode     | `development`     |                           | `VAPID_ENV`/`NODE_ENV` |
//! | port           | `3000`            | `vapid.port`              | `PORT`                 |
//! | output dir     | `data/.assets`    | `vapid.build.output`      |                        |
//! | stylesheets    | `stylesheets/site.s[ac]ss` | `vapid.build.stylesheets` |               |
//! | mode gate      | `false`           | `vapid.build.respectMode` |                        |
//! | framework root | `<site>/.vapid`   |                           | `VAPID_ROOT`           |
//!
//! `.env` in the site root is loaded into the process environment first; it
//! never overrides variables that are already set.

mod error;
mod options;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use error::ConfigError;
pub use options::{BuildOptions, DEFAULT_PORT, PackageManifest, VapidOptions};

use crate::core::BuildMode;
use crate::pipeline::BuildRequest;
use crate::utils::path::normalize_path;

/// Manifest file name in the site root.
pub const MANIFEST: &str = "package.json";

/// Environment file name in the site root.
pub const ENV_FILE: &str = ".env";

/// Framework directory created inside a site when no framework root is
/// configured.
pub const EMBEDDED_FRAMEWORK_DIR: &str = ".vapid";

/// Where the framework root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkSource {
    /// `--framework`
    Flag,
    /// `VAPID_ROOT`
    Env,
    /// `<site>/.vapid`, populated from the binary.
    Embedded,
}

/// Environment variables the configuration reads.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub mode: Option<String>,
    pub port: Option<String>,
    pub vapid_root: Option<String>,
}

impl EnvOverrides {
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            mode: var("VAPID_ENV").or_else(|| var("NODE_ENV")),
            port: var("PORT"),
            vapid_root: var("VAPID_ROOT"),
        }
    }
}

/// Resolved configuration of one site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub root: PathBuf,
    pub framework_root: PathBuf,
    pub framework_source: FrameworkSource,
    pub requested_mode: BuildMode,
    pub port: u16,
    pub package: PackageManifest,
    pub vapid: VapidOptions,
}

impl SiteConfig {
    /// Load the configuration of the site at `target`.
    ///
    /// With `require_manifest`, a missing `package.json` is an error;
    /// otherwise defaults are used.
    pub fn load(
        target: &Path,
        require_manifest: bool,
        framework_override: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let root = normalize_path(target);
        if let Err(e) = dotenvy::from_path(root.join(ENV_FILE))
            && !e.not_found()
        {
            crate::log!("warning"; "ignoring {}: {}", ENV_FILE, e);
        }
        Self::load_with(
            &root,
            require_manifest,
            framework_override,
            &EnvOverrides::from_process(),
        )
    }

    /// [`SiteConfig::load`] with explicit environment values.
    pub fn load_with(
        target: &Path,
        require_manifest: bool,
        framework_override: Option<&Path>,
        env: &EnvOverrides,
    ) -> Result<Self, ConfigError> {
        let root = normalize_path(target);
        if !root.is_dir() {
            return Err(ConfigError::validation(format!(
                "site directory `{}` does not exist",
                root.display()
            )));
        }

        let manifest_path = root.join(MANIFEST);
        let (package, vapid) = if manifest_path.is_file() {
            read_manifest(&manifest_path)?
        } else if require_manifest {
            return Err(ConfigError::validation(format!(
                "no {MANIFEST} found in `{}`",
                root.display()
            )));
        } else {
            (PackageManifest::default(), VapidOptions::default())
        };

        let requested_mode = match &env.mode {
            Some(mode) => mode.parse().map_err(ConfigError::Validation)?,
            None => BuildMode::default(),
        };

        let port = match &env.port {
            Some(port) => parse_port(port, "PORT")?,
            None => vapid.port,
        };
        if port == 0 {
            return Err(ConfigError::validation("port must be between 1 and 65535"));
        }

        if vapid.build.stylesheets.trim().is_empty() {
            return Err(ConfigError::validation(
                "vapid.build.stylesheets must not be empty",
            ));
        }

        let (framework_root, framework_source) = match (framework_override, &env.vapid_root) {
            (Some(dir), _) => (normalize_path(dir), FrameworkSource::Flag),
            (None, Some(dir)) => (
                normalize_path(Path::new(shellexpand::tilde(dir).as_ref())),
                FrameworkSource::Env,
            ),
            (None, None) => (root.join(EMBEDDED_FRAMEWORK_DIR), FrameworkSource::Embedded),
        };

        Ok(Self {
            root,
            framework_root,
            framework_source,
            requested_mode,
            port,
            package,
            vapid,
        })
    }

    /// Output directory as an absolute path.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.vapid.build.output)
    }

    /// Pipeline inputs for this site.
    pub fn build_request(&self, requested_mode: BuildMode) -> BuildRequest {
        BuildRequest {
            framework_root: self.framework_root.clone(),
            site_root: self.root.clone(),
            output: self.vapid.build.output.clone(),
            requested_mode,
            honor_mode: self.vapid.build.respect_mode,
            style_pattern: self.vapid.build.stylesheets.clone(),
        }
    }
}

fn parse_port(value: &str, what: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::validation(format!("{what} `{value}` is not a valid port")))
}

/// Parse `package.json`, reporting unknown `vapid` options as warnings.
fn read_manifest(path: &Path) -> Result<(PackageManifest, VapidOptions), ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let mut value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;

    let vapid_value = value
        .as_object_mut()
        .and_then(|obj| obj.remove("vapid"))
        .unwrap_or(serde_json::Value::Null);

    let package = PackageManifest::deserialize(&value)
        .map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;

    let (vapid, ignored) = parse_with_ignored(vapid_value)
        .map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;
    if !ignored.is_empty() {
        print_unknown_fields_warning(&ignored);
    }

    Ok((package, vapid))
}

/// Deserialize `vapid` options, collecting any unknown fields.
fn parse_with_ignored(
    value: serde_json::Value,
) -> Result<(VapidOptions, Vec<String>), serde_json::Error> {
    if value.is_null() {
        return Ok((VapidOptions::default(), Vec::new()));
    }
    let mut ignored = Vec::new();
    let options = serde_ignored::deserialize(value, |path| {
        ignored.push(format!("vapid.{path}"));
    })?;
    Ok((options, ignored))
}

fn print_unknown_fields_warning(fields: &[String]) {
    crate::log!("warning"; "unknown fields in {}, ignoring:", MANIFEST);
    let lines: Vec<String> = fields.iter().map(|f| format!("- {f}")).collect();
    crate::logger::extra(&lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(manifest: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        if let Some(content) = manifest {
            fs::write(dir.path().join(MANIFEST), content).unwrap();
        }
        dir
    }

    fn load(dir: &TempDir, env: &EnvOverrides) -> Result<SiteConfig, ConfigError> {
        SiteConfig::load_with(dir.path(), false, None, env)
    }

    #[test]
    fn test_defaults_without_manifest() {
        let dir = site(None);
        let config = load(&dir, &EnvOverrides::default()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.requested_mode, BuildMode::Development);
        assert_eq!(config.vapid.build.output, PathBuf::from("data/.assets"));
        assert!(!config.vapid.build.respect_mode);
        assert_eq!(config.framework_source, FrameworkSource::Embedded);
        assert!(config.framework_root.ends_with(".vapid"));
    }

    #[test]
    fn test_manifest_required() {
        let dir = site(None);
        let err = SiteConfig::load_with(dir.path(), true, None, &EnvOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_vapid_options() {
        let dir = site(Some(
            r#"{
                "name": "blog",
                "scripts": { "deploy": "echo ok" },
                "vapid": {
                    "port": 4000,
                    "build": { "output": "public/assets", "stylesheets": "css/*.scss", "respectMode": true }
                }
            }"#,
        ));
        let config = load(&dir, &EnvOverrides::default()).unwrap();

        assert_eq!(config.package.name.as_deref(), Some("blog"));
        assert_eq!(config.package.script("deploy"), Some("echo ok"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.vapid.build.stylesheets, "css/*.scss");
        assert!(config.output_dir().ends_with("public/assets"));

        let request = config.build_request(BuildMode::Development);
        assert!(request.honor_mode);
        assert_eq!(request.style_pattern, "css/*.scss");
    }

    #[test]
    fn test_unknown_vapid_fields_are_ignored() {
        let (options, ignored) = parse_with_ignored(serde_json::json!({
            "port": 5000,
            "theme": "dark",
            "build": { "minifyy": true }
        }))
        .unwrap();
        assert_eq!(options.port, 5000);
        assert_eq!(ignored, ["vapid.theme", "vapid.build.minifyy"]);
    }

    #[test]
    fn test_env_overrides() {
        let dir = site(Some(r#"{ "vapid": { "port": 4000 } }"#));
        let env = EnvOverrides {
            mode: Some("production".into()),
            port: Some("8080".into()),
            vapid_root: Some("/opt/vapid".into()),
        };
        let config = load(&dir, &env).unwrap();

        assert_eq!(config.requested_mode, BuildMode::Production);
        assert_eq!(config.port, 8080);
        assert_eq!(config.framework_source, FrameworkSource::Env);
        assert_eq!(config.framework_root, PathBuf::from("/opt/vapid"));
    }

    #[test]
    fn test_framework_flag_wins() {
        let dir = site(None);
        let env = EnvOverrides {
            vapid_root: Some("/opt/vapid".into()),
            ..EnvOverrides::default()
        };
        let config =
            SiteConfig::load_with(dir.path(), false, Some(Path::new("/srv/framework")), &env)
                .unwrap();
        assert_eq!(config.framework_source, FrameworkSource::Flag);
        assert_eq!(config.framework_root, PathBuf::from("/srv/framework"));
    }

    #[test]
    fn test_invalid_values() {
        let dir = site(None);
        let bad_mode = EnvOverrides {
            mode: Some("staging".into()),
            ..EnvOverrides::default()
        };
        assert!(load(&dir, &bad_mode).is_err());

        let bad_port = EnvOverrides {
            port: Some("http".into()),
            ..EnvOverrides::default()
        };
        assert!(load(&dir, &bad_port).is_err());

        let dir = site(Some("{ not json"));
        assert!(matches!(
            load(&dir, &EnvOverrides::default()).unwrap_err(),
            ConfigError::Json(..)
        ));
    }
}
