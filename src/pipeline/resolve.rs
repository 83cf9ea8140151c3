//! Module resolution for bare and relative import specifiers.
//!
//! Bare names (`lodash`, `normalize.css/normalize.css`) are looked up in the
//! dependency directories in order. The site's `node_modules` comes first so
//! a site can override a package the framework also ships.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

/// Extensions tried for script imports, in order.
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

/// Ordered dependency directories consulted for bare imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSearchOrder {
    dirs: Vec<PathBuf>,
}

impl ModuleSearchOrder {
    /// Site directory first, framework directory second.
    pub fn new(site_modules: &Path, framework_modules: &Path) -> Self {
        Self {
            dirs: vec![site_modules.to_path_buf(), framework_modules.to_path_buf()],
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

/// Kind of import specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier<'a> {
    /// `./x`, `../x`
    Relative(&'a str),
    /// `/abs/path/x`
    Absolute(&'a str),
    /// `pkg`, `pkg/sub/path`, `@scope/pkg/sub`
    Bare(&'a str),
}

impl<'a> Specifier<'a> {
    pub fn parse(spec: &'a str) -> Self {
        if spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == ".." {
            Self::Relative(spec)
        } else if Path::new(spec).is_absolute() {
            Self::Absolute(spec)
        } else {
            Self::Bare(spec)
        }
    }
}

/// The subset of `package.json` used to locate a package entry point.
#[derive(Debug, Default, Deserialize)]
struct PackageEntry {
    main: Option<String>,
}

/// Resolves specifiers to files on disk.
#[derive(Debug, Clone, Copy)]
pub struct ModuleResolver<'a> {
    order: &'a ModuleSearchOrder,
    extensions: &'static [&'static str],
}

impl<'a> ModuleResolver<'a> {
    pub fn new(order: &'a ModuleSearchOrder, extensions: &'static [&'static str]) -> Self {
        Self { order, extensions }
    }

    /// Script resolver (`.js`, `.mjs`, `.cjs`, `.json`).
    pub fn scripts(order: &'a ModuleSearchOrder) -> Self {
        Self::new(order, SCRIPT_EXTENSIONS)
    }

    /// Resolve `spec` as imported from `importer`.
    ///
    /// Returns `None` when nothing matches in any search location.
    pub fn resolve(&self, spec: &str, importer: &Path) -> Option<PathBuf> {
        match Specifier::parse(spec) {
            Specifier::Relative(rel) => {
                let base = importer.parent().unwrap_or_else(|| Path::new(""));
                self.resolve_path(&lexical_join(base, rel))
            }
            Specifier::Absolute(abs) => self.resolve_path(Path::new(abs)),
            Specifier::Bare(name) => self
                .order
                .dirs()
                .iter()
                .find_map(|dir| self.resolve_path(&dir.join(name))),
        }
    }

    /// File, then file + extension, then directory entry point.
    fn resolve_path(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        if let Some(found) = self.with_extensions(path) {
            return Some(found);
        }

        if path.is_dir() {
            return self.resolve_dir(path);
        }

        None
    }

    fn with_extensions(&self, path: &Path) -> Option<PathBuf> {
        let file_name = path.file_name()?.to_str()?;
        self.extensions
            .iter()
            .map(|ext| path.with_file_name(format!("{file_name}.{ext}")))
            .find(|candidate| candidate.is_file())
    }

    /// `package.json#main`, then `index.<ext>`.
    fn resolve_dir(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(main) = read_main_field(&dir.join("package.json")) {
            let target = lexical_join(dir, &main);
            if target.is_file() {
                return Some(target);
            }
            if let Some(found) = self.with_extensions(&target) {
                return Some(found);
            }
            if target.is_dir()
                && let Some(found) = self.with_extensions(&target.join("index"))
            {
                return Some(found);
            }
        }
        self.with_extensions(&dir.join("index"))
    }
}

fn read_main_field(manifest: &Path) -> Option<String> {
    let content = fs::read_to_string(manifest).ok()?;
    let entry: PackageEntry = serde_json::from_str(&content).ok()?;
    entry.main.filter(|m| !m.is_empty())
}

/// Join and fold `.`/`..` components without touching the filesystem.
fn lexical_join(base: &Path, rel: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(rel).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Dirs {
        _tmp: TempDir,
        site: PathBuf,
        framework: PathBuf,
        importer: PathBuf,
    }

    fn setup() -> Dirs {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site/node_modules");
        let framework = tmp.path().join("framework/node_modules");
        let www = tmp.path().join("site/www/javascripts");
        fs::create_dir_all(&site).unwrap();
        fs::create_dir_all(&framework).unwrap();
        fs::create_dir_all(&www).unwrap();
        let importer = www.join("site.js");
        fs::write(&importer, "").unwrap();
        Dirs {
            _tmp: tmp,
            site,
            framework,
            importer,
        }
    }

    fn write(path: PathBuf, content: &str) -> PathBuf {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_specifier_kinds() {
        assert_eq!(Specifier::parse("./a"), Specifier::Relative("./a"));
        assert_eq!(Specifier::parse("../a"), Specifier::Relative("../a"));
        assert_eq!(Specifier::parse("/a/b"), Specifier::Absolute("/a/b"));
        assert_eq!(Specifier::parse("jquery"), Specifier::Bare("jquery"));
        assert_eq!(Specifier::parse("@scope/pkg"), Specifier::Bare("@scope/pkg"));
    }

    #[test]
    fn test_site_copy_wins() {
        let d = setup();
        let site_copy = write(d.site.join("shared/index.js"), "module.exports = 'site'");
        write(d.framework.join("shared/index.js"), "module.exports = 'framework'");

        let order = ModuleSearchOrder::new(&d.site, &d.framework);
        let resolver = ModuleResolver::scripts(&order);

        assert_eq!(resolver.resolve("shared", &d.importer), Some(site_copy));
    }

    #[test]
    fn test_framework_fallback() {
        let d = setup();
        let fw = write(d.framework.join("only-framework.js"), "");

        let order = ModuleSearchOrder::new(&d.site, &d.framework);
        let resolver = ModuleResolver::scripts(&order);

        assert_eq!(resolver.resolve("only-framework", &d.importer), Some(fw));
        assert_eq!(resolver.resolve("missing", &d.importer), None);
    }

    #[test]
    fn test_package_main_field() {
        let d = setup();
        write(d.site.join("lib/package.json"), r#"{"main": "dist/lib"}"#);
        let main = write(d.site.join("lib/dist/lib.js"), "");

        let order = ModuleSearchOrder::new(&d.site, &d.framework);
        let resolver = ModuleResolver::scripts(&order);
        assert_eq!(resolver.resolve("lib", &d.importer), Some(main));
    }

    #[test]
    fn test_relative_with_extension_lookup() {
        let d = setup();
        let helper = write(d.importer.with_file_name("helper.js"), "");
        let data = write(d.importer.parent().unwrap().join("../data.json"), "{}");

        let order = ModuleSearchOrder::new(&d.site, &d.framework);
        let resolver = ModuleResolver::scripts(&order);
        assert_eq!(resolver.resolve("./helper", &d.importer), Some(helper));
        assert_eq!(
            resolver.resolve("../data", &d.importer),
            Some(lexical_join(&data, ""))
        );
    }

    #[test]
    fn test_lexical_join() {
        assert_eq!(
            lexical_join(Path::new("/a/b"), "../c/./d.js"),
            PathBuf::from("/a/c/d.js")
        );
    }
}
