//! Entry set: the named logical outputs of one build.
//!
//! | Entry                              | Sources                                   |
//! |------------------------------------|-------------------------------------------|
//! | `javascripts/site`                 | `www/javascripts/site.js`                 |
//! | `stylesheets/site`                 | glob under `www` (`stylesheets/site.s[ac]ss`) |
//! | `dashboard/javascripts/dashboard`  | `<framework>/assets/javascripts/dashboard.js` |
//! | `dashboard/stylesheets/dashboard`  | `<framework>/assets/stylesheets/dashboard.scss` |
//!
//! Glob order is whatever the directory walk yields. It is not stable
//! across platforms; every matched file is a peer source of one bundle and
//! nothing may depend on their relative order.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use wax::Glob;

use super::{BuildContext, BuildError};

pub const SITE_SCRIPT: &str = "javascripts/site";
pub const SITE_STYLE: &str = "stylesheets/site";
pub const DASHBOARD_SCRIPT: &str = "dashboard/javascripts/dashboard";
pub const DASHBOARD_STYLE: &str = "dashboard/stylesheets/dashboard";

/// Default stylesheet glob, relative to the site asset directory.
/// Matches both sub-dialects (`.scss`, `.sass`).
pub const DEFAULT_STYLE_PATTERN: &str = "stylesheets/site.s[ac]ss";

/// What an entry was declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Script,
    /// Style-only: the script artifact the driver emits for it is an orphan.
    Style,
}

/// A named logical output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    name: String,
    kind: EntryKind,
    sources: Vec<PathBuf>,
}

impl EntryDescriptor {
    pub fn new(name: impl Into<String>, kind: EntryKind, sources: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            sources,
        }
    }

    /// Slash-delimited logical path, e.g. `stylesheets/site`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn is_style_only(&self) -> bool {
        self.kind == EntryKind::Style
    }
}

/// Ordered entry list for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySet {
    entries: Vec<EntryDescriptor>,
}

impl EntrySet {
    pub fn new(entries: Vec<EntryDescriptor>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryDescriptor> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[EntryDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&EntryDescriptor> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entries whose script artifact carries no content.
    pub fn style_only(&self) -> impl Iterator<Item = &EntryDescriptor> {
        self.entries.iter().filter(|e| e.is_style_only())
    }

    /// Enforce entry invariants: unique names, non-empty sources.
    pub fn validate(&self) -> Result<(), BuildError> {
        let mut seen = FxHashSet::default();
        for entry in &self.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(BuildError::configuration(format!(
                    "duplicate entry name `{}`",
                    entry.name
                )));
            }
            if entry.sources.is_empty() {
                return Err(BuildError::configuration(format!(
                    "entry `{}` has no sources (pattern matched nothing)",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a EntrySet {
    type Item = &'a EntryDescriptor;
    type IntoIter = std::slice::Iter<'a, EntryDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds the entry set from a context. Read-only.
#[derive(Debug, Clone)]
pub struct EntrySetBuilder {
    style_pattern: String,
}

impl Default for EntrySetBuilder {
    fn default() -> Self {
        Self {
            style_pattern: DEFAULT_STYLE_PATTERN.to_string(),
        }
    }
}

impl EntrySetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the stylesheet glob (relative to `www`).
    pub fn style_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.style_pattern = pattern.into();
        self
    }

    /// Enumerate the four entries.
    ///
    /// Fixed entries fail with `MissingSource` when their file is absent.
    /// The glob entry is returned even when it matched nothing.
    pub fn build(&self, ctx: &BuildContext) -> Result<EntrySet, BuildError> {
        let site_script = require_source(SITE_SCRIPT, ctx.site_www().join("javascripts/site.js"))?;
        let site_styles = discover(&self.style_pattern, ctx.site_www())?;
        let dashboard_script = require_source(
            DASHBOARD_SCRIPT,
            ctx.framework_asset("javascripts/dashboard.js"),
        )?;
        let dashboard_style = require_source(
            DASHBOARD_STYLE,
            ctx.framework_asset("stylesheets/dashboard.scss"),
        )?;

        crate::debug!("entries"; "{} stylesheet source(s) for {}", site_styles.len(), SITE_STYLE);

        Ok(EntrySet::new(vec![
            EntryDescriptor::new(SITE_SCRIPT, EntryKind::Script, vec![site_script]),
            EntryDescriptor::new(SITE_STYLE, EntryKind::Style, site_styles),
            EntryDescriptor::new(DASHBOARD_SCRIPT, EntryKind::Script, vec![dashboard_script]),
            EntryDescriptor::new(DASHBOARD_STYLE, EntryKind::Style, vec![dashboard_style]),
        ]))
    }
}

fn require_source(entry: &str, path: PathBuf) -> Result<PathBuf, BuildError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(BuildError::MissingSource {
            entry: entry.to_string(),
            path,
        })
    }
}

/// Walk `root` for files matching `pattern`.
///
/// A missing directory under the pattern's literal prefix matches nothing.
fn discover(pattern: &str, root: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let (prefix, glob) = Glob::new(pattern)
        .map_err(|e| {
            BuildError::configuration(format!("invalid stylesheet pattern `{pattern}`: {e}"))
        })?
        .partition();

    let base = root.join(&prefix);
    if base.is_file() {
        return Ok(vec![base]);
    }
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in glob.walk(&base) {
        let entry = entry.map_err(|e| {
            BuildError::configuration(format!("failed to scan `{}`: {e}", base.display()))
        })?;
        let path = entry.path();
        if path.is_file() {
            found.push(path.to_path_buf());
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::super::context::fixture::Fixture;
    use super::*;
    use crate::core::BuildMode;
    use std::fs;

    #[test]
    fn test_four_entries_with_stylesheet() {
        let fx = Fixture::with_site_sources();
        let entries = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap();

        assert_eq!(entries.len(), 4);
        let names: Vec<_> = entries.iter().map(EntryDescriptor::name).collect();
        assert_eq!(
            names,
            [SITE_SCRIPT, SITE_STYLE, DASHBOARD_SCRIPT, DASHBOARD_STYLE]
        );
        assert_eq!(entries.get(SITE_STYLE).unwrap().sources().len(), 1);
        assert!(entries.validate().is_ok());
    }

    #[test]
    fn test_missing_main_script() {
        let fx = Fixture::new();
        fx.write_site("www/stylesheets/site.scss", "body{color:red}");

        let err = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap_err();
        assert_eq!(err.kind(), "MissingSourceError");
        assert!(err.to_string().contains(SITE_SCRIPT));
    }

    #[test]
    fn test_missing_main_script_without_stylesheets() {
        let fx = Fixture::new();
        let err = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap_err();
        assert_eq!(err.kind(), "MissingSourceError");
    }

    #[test]
    fn test_missing_dashboard_asset() {
        let fx = Fixture::with_site_sources();
        fs::remove_file(fx.framework().join("assets/stylesheets/dashboard.scss")).unwrap();
        let err = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap_err();
        assert!(err.to_string().contains(DASHBOARD_STYLE));
    }

    #[test]
    fn test_zero_stylesheets_keeps_empty_entry() {
        let fx = Fixture::new();
        fx.write_site("www/javascripts/site.js", "console.log(1)");

        let entries = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries.get(SITE_STYLE).unwrap().sources().is_empty());

        let err = entries.validate().unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains(SITE_STYLE));
    }

    #[test]
    fn test_missing_style_directories_match_nothing() {
        let fx = Fixture::new();
        fx.write_site("www/javascripts/site.js", "console.log(1)");
        assert!(!fx.site().join("www/stylesheets").exists());

        for pattern in [DEFAULT_STYLE_PATTERN, "styles/**/*.scss", "styles/site.scss"] {
            let entries = EntrySetBuilder::new()
                .style_pattern(pattern)
                .build(&fx.context(BuildMode::Production))
                .unwrap();
            assert!(entries.get(SITE_STYLE).unwrap().sources().is_empty(), "{pattern}");
        }
    }

    #[test]
    fn test_literal_pattern_matches_one_file() {
        let fx = Fixture::with_site_sources();
        let entries = EntrySetBuilder::new()
            .style_pattern("stylesheets/site.scss")
            .build(&fx.context(BuildMode::Production))
            .unwrap();
        assert_eq!(
            entries.get(SITE_STYLE).unwrap().sources(),
            [fx.site().join("www/stylesheets/site.scss")]
        );
    }

    #[test]
    fn test_both_dialects_are_peers() {
        let fx = Fixture::with_site_sources();
        fx.write_site("www/stylesheets/site.sass", "a\n  color: blue\n");
        fx.write_site("www/stylesheets/other.scss", "p{margin:0}");

        let entries = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap();
        let mut names: Vec<_> = entries
            .get(SITE_STYLE)
            .unwrap()
            .sources()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["site.sass", "site.scss"]);
    }

    #[test]
    fn test_custom_pattern() {
        let fx = Fixture::with_site_sources();
        fx.write_site("www/stylesheets/extra.scss", "p{margin:0}");

        let entries = EntrySetBuilder::new()
            .style_pattern("stylesheets/*.scss")
            .build(&fx.context(BuildMode::Production))
            .unwrap();
        assert_eq!(entries.get(SITE_STYLE).unwrap().sources().len(), 2);
    }

    #[test]
    fn test_invalid_pattern() {
        let fx = Fixture::with_site_sources();
        let err = EntrySetBuilder::new()
            .style_pattern("stylesheets/[")
            .build(&fx.context(BuildMode::Production))
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_style_only_entries() {
        let fx = Fixture::with_site_sources();
        let entries = EntrySetBuilder::new()
            .build(&fx.context(BuildMode::Production))
            .unwrap();
        let style_only: Vec<_> = entries.style_only().map(EntryDescriptor::name).collect();
        assert_eq!(style_only, [SITE_STYLE, DASHBOARD_STYLE]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let set = EntrySet::new(vec![
            EntryDescriptor::new("a", EntryKind::Script, vec![PathBuf::from("/a.js")]),
            EntryDescriptor::new("a", EntryKind::Style, vec![PathBuf::from("/a.scss")]),
        ]);
        assert!(set.validate().unwrap_err().to_string().contains("duplicate"));
    }
}
