//! Transform (loader) chains per file type.
//!
//! Loaders are declared outermost-first and execute innermost-first, so
//! the stylesheet rule
//!
//! ```text
//! declared:  extract → css { url: false } → resolve-url → sass { source_map }
//! executes:  sass → resolve-url → css → extract
//! ```
//!
//! The loader closest to the source file is declared last and runs first.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::BuildMode;

/// Stylesheet sources handled by the style rule (both sub-dialects).
static STYLE_TEST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.s[ac]ss$").unwrap());

/// One transform stage with its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    /// Pull compiled CSS out of the script bundle into its own artifact.
    ExtractStyle,
    /// CSS handling. `resolve_urls` makes unresolvable `url()` targets an error.
    Css { resolve_urls: bool },
    /// Rewrite relative `url()` references against the source file location.
    ResolveUrl,
    /// Sass/SCSS to CSS.
    Sass { source_map: bool },
}

impl Loader {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExtractStyle => "extract",
            Self::Css { .. } => "css",
            Self::ResolveUrl => "resolve-url",
            Self::Sass { .. } => "sass",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loaders applied to files whose path matches `test`.
#[derive(Debug, Clone)]
pub struct TransformRule {
    test: &'static Regex,
    declared: Vec<Loader>,
}

impl TransformRule {
    /// The stylesheet rule.
    pub fn stylesheets() -> Self {
        Self {
            test: &STYLE_TEST,
            declared: vec![
                Loader::ExtractStyle,
                Loader::Css {
                    resolve_urls: false,
                },
                Loader::ResolveUrl,
                Loader::Sass { source_map: true },
            ],
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.to_str().is_some_and(|p| self.test.is_match(p))
    }

    pub fn test(&self) -> &str {
        self.test.as_str()
    }

    /// Loaders in declaration order.
    pub fn declared(&self) -> &[Loader] {
        &self.declared
    }

    /// Loaders in execution order: exact reverse of declaration.
    pub fn execution_order(&self) -> impl Iterator<Item = &Loader> {
        self.declared.iter().rev()
    }
}

/// Mode-switch gate. While `false`, every build runs in production mode
/// whatever mode was requested.
pub const HONOR_REQUESTED_MODE: bool = false;

/// Settle the effective build mode.
pub const fn select_mode(requested: BuildMode, honor_requested: bool) -> BuildMode {
    if honor_requested {
        requested
    } else {
        BuildMode::Production
    }
}

/// All transform rules plus the mode they run under.
#[derive(Debug, Clone)]
pub struct TransformChain {
    rules: Vec<TransformRule>,
    mode: BuildMode,
}

impl TransformChain {
    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    pub const fn mode(&self) -> BuildMode {
        self.mode
    }

    /// First rule matching `path`. Files no rule matches are plain script
    /// modules.
    pub fn rule_for(&self, path: &Path) -> Option<&TransformRule> {
        self.rules.iter().find(|r| r.matches(path))
    }
}

/// Assemble the transform chain. Pure; never fails.
///
/// `honor_requested` is the mode-switch gate; pass [`HONOR_REQUESTED_MODE`]
/// for the stock behaviour.
pub fn assemble_chain(requested: BuildMode, honor_requested: bool) -> TransformChain {
    TransformChain {
        rules: vec![TransformRule::stylesheets()],
        mode: select_mode(requested, honor_requested),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_reverses_declaration() {
        let rule = TransformRule::stylesheets();
        let declared: Vec<_> = rule.declared().iter().map(Loader::name).collect();
        let executed: Vec<_> = rule.execution_order().map(Loader::name).collect();

        assert_eq!(declared, ["extract", "css", "resolve-url", "sass"]);
        assert_eq!(executed, ["sass", "resolve-url", "css", "extract"]);
    }

    #[test]
    fn test_stage_options() {
        let rule = TransformRule::stylesheets();
        assert!(rule.declared().contains(&Loader::Css {
            resolve_urls: false
        }));
        assert!(rule.declared().contains(&Loader::Sass { source_map: true }));
    }

    #[test]
    fn test_rule_matches_both_dialects() {
        let rule = TransformRule::stylesheets();
        assert!(rule.matches(Path::new("/w/stylesheets/site.scss")));
        assert!(rule.matches(Path::new("/w/stylesheets/site.sass")));
        assert!(!rule.matches(Path::new("/w/stylesheets/site.css")));
        assert!(!rule.matches(Path::new("/w/javascripts/site.js")));
        assert!(!rule.matches(Path::new("/w/site.scss.bak")));
    }

    #[test]
    fn test_production_always_selected_by_default() {
        let chain = assemble_chain(BuildMode::Development, HONOR_REQUESTED_MODE);
        assert_eq!(chain.mode(), BuildMode::Production);

        let chain = assemble_chain(BuildMode::Production, HONOR_REQUESTED_MODE);
        assert_eq!(chain.mode(), BuildMode::Production);
    }

    #[test]
    fn test_gate_open_honors_request() {
        assert_eq!(
            assemble_chain(BuildMode::Development, true).mode(),
            BuildMode::Development
        );
        assert_eq!(
            assemble_chain(BuildMode::Production, true).mode(),
            BuildMode::Production
        );
    }

    #[test]
    fn test_rule_for() {
        let chain = assemble_chain(BuildMode::Production, false);
        assert!(chain.rule_for(Path::new("a.scss")).is_some());
        assert!(chain.rule_for(Path::new("a.js")).is_none());
    }
}
