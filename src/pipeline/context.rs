//! Build context: every absolute path one build needs, resolved up front.
//!
//! ```text
//! <framework>/                 <site>/
//! ├── assets/                  ├── www/            ← asset sources
//! │   ├── javascripts/         ├── node_modules/   ← searched first
//! │   └── stylesheets/         ├── package.json
//! └── node_modules/            └── data/.assets/   ← output (default)
//! ```

use std::path::{Path, PathBuf};

use crate::core::BuildMode;
use crate::utils::path::normalize_path;

use super::BuildError;
use super::resolve::ModuleSearchOrder;

/// Site asset-source directory name.
pub const ASSET_SOURCE_DIR: &str = "www";

/// Package dependency directory name (both roots).
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Framework-bundled dashboard assets.
pub const FRAMEWORK_ASSETS_DIR: &str = "assets";

/// Default output directory, relative to the site root.
pub const DEFAULT_OUTPUT_DIR: &str = "data/.assets";

/// Resolved paths and mode for one build invocation.
///
/// Immutable once created; each pipeline run owns its own value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    framework_root: PathBuf,
    site_root: PathBuf,
    site_www: PathBuf,
    site_output: PathBuf,
    framework_modules: PathBuf,
    site_modules: PathBuf,
    mode: BuildMode,
}

impl BuildContext {
    /// Resolve a build context from the two roots.
    ///
    /// `output` may be relative (joined onto the site root) or absolute.
    /// Only existence checks are performed; nothing is created.
    pub fn resolve(
        framework_root: &Path,
        site_root: &Path,
        output: &Path,
        mode: BuildMode,
    ) -> Result<Self, BuildError> {
        let framework_root = require_dir(framework_root, "framework root")?;
        let site_root = require_dir(site_root, "site root")?;

        let site_www = require_dir(&site_root.join(ASSET_SOURCE_DIR), "site asset directory")?;
        let site_modules = require_dir(&site_root.join(DEPENDENCY_DIR), "site dependency directory")?;
        let framework_modules = require_dir(
            &framework_root.join(DEPENDENCY_DIR),
            "framework dependency directory",
        )?;

        Ok(Self {
            site_output: site_root.join(output),
            framework_root,
            site_root,
            site_www,
            framework_modules,
            site_modules,
            mode,
        })
    }

    pub fn framework_root(&self) -> &Path {
        &self.framework_root
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// Site asset-source directory (`<site>/www`).
    pub fn site_www(&self) -> &Path {
        &self.site_www
    }

    /// Build output directory.
    pub fn site_output(&self) -> &Path {
        &self.site_output
    }

    pub fn framework_modules(&self) -> &Path {
        &self.framework_modules
    }

    pub fn site_modules(&self) -> &Path {
        &self.site_modules
    }

    pub const fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Same paths, different mode. Used once the transform chain has
    /// settled the effective mode.
    pub fn with_mode(&self, mode: BuildMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Framework dashboard asset path (`<framework>/assets/<rel>`).
    pub fn framework_asset(&self, rel: &str) -> PathBuf {
        self.framework_root.join(FRAMEWORK_ASSETS_DIR).join(rel)
    }

    /// Dependency directories in lookup order: site first, then framework.
    pub fn module_search_order(&self) -> ModuleSearchOrder {
        ModuleSearchOrder::new(&self.site_modules, &self.framework_modules)
    }
}

/// Normalize `path` and require it to be an existing directory.
fn require_dir(path: &Path, what: &str) -> Result<PathBuf, BuildError> {
    let path = normalize_path(path);
    if path.is_dir() {
        Ok(path)
    } else if path.exists() {
        Err(BuildError::configuration(format!(
            "{what} `{}` is not a directory",
            path.display()
        )))
    } else {
        Err(BuildError::configuration(format!(
            "{what} `{}` does not exist",
            path.display()
        )))
    }
}

// ============================================================================
// Test Helpers (available to all pipeline modules)
// ============================================================================

/// Minimal framework + site layout inside a temp dir.
#[cfg(test)]
pub(crate) mod fixture {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    pub struct Fixture {
        pub dir: TempDir,
    }

    impl Fixture {
        /// Framework with dashboard assets, site with `www/` and both
        /// dependency directories. No site sources yet.
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let fixture = Self { dir };
            fs::create_dir_all(fixture.framework().join("node_modules")).unwrap();
            fs::create_dir_all(fixture.site().join("www")).unwrap();
            fs::create_dir_all(fixture.site().join("node_modules")).unwrap();
            fixture.write_framework(
                "assets/javascripts/dashboard.js",
                "document.documentElement.classList.add('dashboard');\n",
            );
            fixture.write_framework(
                "assets/stylesheets/dashboard.scss",
                "$accent: #336699;\n.dashboard { a { color: $accent; } }\n",
            );
            fixture
        }

        /// `new()` plus one site script and one stylesheet.
        pub fn with_site_sources() -> Self {
            let fixture = Self::new();
            fixture.write_site("www/javascripts/site.js", "console.log(1)");
            fixture.write_site("www/stylesheets/site.scss", "body{color:red}");
            fixture
        }

        pub fn framework(&self) -> PathBuf {
            self.dir.path().join("framework")
        }

        pub fn site(&self) -> PathBuf {
            self.dir.path().join("site")
        }

        pub fn output(&self) -> PathBuf {
            self.site().join("data/.assets")
        }

        pub fn write_site(&self, rel: &str, content: &str) -> PathBuf {
            write(&self.site(), rel, content)
        }

        pub fn write_framework(&self, rel: &str, content: &str) -> PathBuf {
            write(&self.framework(), rel, content)
        }

        pub fn context(&self, mode: super::BuildMode) -> super::BuildContext {
            super::BuildContext::resolve(
                &self.framework(),
                &self.site(),
                Path::new(super::DEFAULT_OUTPUT_DIR),
                mode,
            )
            .unwrap()
        }
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::Fixture;
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_paths() {
        let fx = Fixture::new();
        let ctx = fx.context(BuildMode::Development);

        assert!(ctx.site_www().ends_with("site/www"));
        assert!(ctx.site_modules().ends_with("site/node_modules"));
        assert!(ctx.framework_modules().ends_with("framework/node_modules"));
        assert!(ctx.site_output().ends_with("site/data/.assets"));
        assert!(ctx.site_output().is_absolute());
        assert_eq!(ctx.mode(), BuildMode::Development);
    }

    #[test]
    fn test_output_does_not_need_to_exist() {
        let fx = Fixture::new();
        let ctx = fx.context(BuildMode::Production);
        assert!(!ctx.site_output().exists());
    }

    #[test]
    fn test_missing_site_root() {
        let fx = Fixture::new();
        let err = BuildContext::resolve(
            &fx.framework(),
            &fx.dir.path().join("nope"),
            Path::new(DEFAULT_OUTPUT_DIR),
            BuildMode::Production,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains("site root"));
    }

    #[test]
    fn test_missing_www_marker() {
        let fx = Fixture::new();
        fs::remove_dir_all(fx.site().join("www")).unwrap();
        let err = BuildContext::resolve(
            &fx.framework(),
            &fx.site(),
            Path::new(DEFAULT_OUTPUT_DIR),
            BuildMode::Production,
        )
        .unwrap_err();
        assert!(err.to_string().contains("site asset directory"));
    }

    #[test]
    fn test_missing_framework_modules() {
        let fx = Fixture::new();
        fs::remove_dir_all(fx.framework().join("node_modules")).unwrap();
        let err = BuildContext::resolve(
            &fx.framework(),
            &fx.site(),
            Path::new(DEFAULT_OUTPUT_DIR),
            BuildMode::Production,
        )
        .unwrap_err();
        assert!(err.to_string().contains("framework dependency directory"));
    }

    #[test]
    fn test_marker_that_is_a_file() {
        let fx = Fixture::new();
        fs::remove_dir_all(fx.site().join("node_modules")).unwrap();
        fx.write_site("node_modules", "");
        let err = BuildContext::resolve(
            &fx.framework(),
            &fx.site(),
            Path::new(DEFAULT_OUTPUT_DIR),
            BuildMode::Production,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn test_module_search_order_prefers_site() {
        let fx = Fixture::new();
        let ctx = fx.context(BuildMode::Production);
        let order = ctx.module_search_order();
        assert_eq!(order.dirs()[0], ctx.site_modules());
        assert_eq!(order.dirs()[1], ctx.framework_modules());
    }
}
