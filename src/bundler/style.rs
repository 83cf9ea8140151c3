//! Stylesheet compilation through the loader chain.
//!
//! Each source runs the rule's loaders in execution order. The first three
//! stages transform one [`StyleUnit`]; `extract` then merges every unit of
//! the entry into a single stylesheet with a source map.
//!
//! Sass reads go through [`SassFs`], so relative `url()` targets are
//! rebased against the file that wrote them, partials included.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Result, anyhow, bail};
use lightningcss::rules::CssRuleList;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use parcel_sourcemap::SourceMap;
use regex::{Captures, Regex};

use super::script::label_for;
use crate::pipeline::{BuildPlan, Loader, TransformRule};

/// `@import "~pkg/…"`: the webpack module prefix.
static TILDE_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(@(?:import|use|forward)[ \t\r\n]+['"])~"#).unwrap());

/// `url(…)` with an optional quote.
static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\([ \t\r\n]*(['"]?)([^'") \t\r\n]+)['"]?[ \t\r\n]*\)"#).unwrap()
});

/// One stylesheet source on its way through the chain.
#[derive(Debug, Clone)]
pub struct StyleUnit {
    pub source: PathBuf,
    pub css: String,
    /// `url()` targets already rebased while reading the Sass sources.
    pub rebased: bool,
}

/// Extracted stylesheet of one entry.
#[derive(Debug)]
pub struct ExtractedStyle {
    pub code: String,
    pub map: String,
}

/// Run `rule` over `sources` and extract the result.
///
/// `artifact` names the stylesheet inside the output directory; it is the
/// map's only source when the Sass stage has source maps off.
pub fn compile(
    sources: &[PathBuf],
    rule: &TransformRule,
    plan: &BuildPlan,
    artifact: &Path,
) -> Result<ExtractedStyle> {
    let rebase = rule
        .execution_order()
        .any(|loader| matches!(loader, Loader::ResolveUrl));
    let mut units = Vec::with_capacity(sources.len());
    let mut extract = false;
    let mut per_source_map = false;

    for source in sources {
        let mut unit = StyleUnit {
            source: source.clone(),
            css: String::new(),
            rebased: false,
        };
        for loader in rule.execution_order() {
            match *loader {
                Loader::Sass { source_map } => {
                    unit.css = compile_sass(&unit.source, plan, rebase)?;
                    unit.rebased = rebase;
                    per_source_map = source_map;
                }
                Loader::ResolveUrl if !unit.rebased => {
                    let base = unit.source.parent().unwrap_or(plan.context().site_www());
                    unit.css = rebase_urls(&unit.css, base, plan.context().site_www());
                    unit.rebased = true;
                }
                Loader::ResolveUrl => {}
                Loader::Css { resolve_urls: verify } => check_css(&unit, verify, plan)?,
                Loader::ExtractStyle => extract = true,
            }
        }
        units.push(unit);
    }

    if !extract {
        bail!("rule `{}` has no extract stage", rule.test());
    }

    let minify = plan.context().mode().minify();
    if per_source_map {
        let labelled: Vec<(String, &str)> = units
            .iter()
            .map(|unit| (label_for(&unit.source, plan), unit.css.as_str()))
            .collect();
        extract_units(&labelled, minify)
    } else {
        let merged = units.iter().map(|u| u.css.as_str()).collect::<Vec<_>>().join("\n");
        let label = artifact.to_string_lossy().replace('\\', "/");
        extract_units(&[(label, merged.as_str())], minify)
    }
}

// ============================================================================
// sass
// ============================================================================

/// Filesystem view handed to `grass`: strips the `~` module prefix from
/// imports and, with `rebase_urls`, rewrites relative `url()` targets
/// against the directory of the file being read.
#[derive(Debug)]
struct SassFs<'a> {
    www: &'a Path,
    rebase_urls: bool,
}

impl grass::Fs for SassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = std::fs::read(path)?;
        if !path
            .extension()
            .is_some_and(|ext| ext == "scss" || ext == "sass" || ext == "css")
        {
            return Ok(bytes);
        }

        let text = String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut text = TILDE_IMPORT.replace_all(&text, "$1").into_owned();
        if self.rebase_urls {
            let base = path.parent().unwrap_or(self.www);
            text = rebase_urls(&text, base, self.www);
        }
        Ok(text.into_bytes())
    }
}

/// Compile one Sass/SCSS file.
///
/// Load paths: the file's directory, then the module search order.
fn compile_sass(path: &Path, plan: &BuildPlan, rebase_urls: bool) -> Result<String> {
    if !path.is_file() {
        return Err(anyhow!("failed to read {}", path.display()));
    }
    let fs = SassFs {
        www: plan.context().site_www(),
        rebase_urls,
    };

    let mut options = grass::Options::default()
        .fs(&fs)
        .style(grass::OutputStyle::Expanded);
    if let Some(dir) = path.parent() {
        options = options.load_path(dir);
    }
    for dir in plan.context().module_search_order().dirs() {
        options = options.load_path(dir);
    }

    grass::from_path(path, &options).map_err(|e| anyhow!("{}: {e}", path.display()))
}

// ============================================================================
// resolve-url
// ============================================================================

/// Rewrite relative `url()` targets in `css`, read from a file in `base`,
/// that land inside `www` to root-absolute URLs. Anything else is left
/// untouched.
fn rebase_urls(css: &str, base: &Path, www: &Path) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures<'_>| {
            let target = &caps[2];
            if !is_relative_url(target) {
                return caps[0].to_string();
            }
            let (path, suffix) = split_url_suffix(target);
            let resolved = fold(&base.join(path));
            match resolved.strip_prefix(www) {
                Ok(rel) => format!(
                    "url({0}/{1}{2}{0})",
                    &caps[1],
                    rel.to_string_lossy().replace('\\', "/"),
                    suffix
                ),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Local, relative and free of Sass expressions.
fn is_relative_url(target: &str) -> bool {
    !(target.starts_with('/')
        || target.starts_with('#')
        || target.starts_with('$')
        || target.starts_with("data:")
        || target.contains("://")
        || target.contains("#{"))
}

/// `img.png?v=1#x` → (`img.png`, `?v=1#x`)
fn split_url_suffix(target: &str) -> (&str, &str) {
    match target.find(['?', '#']) {
        Some(i) => target.split_at(i),
        None => (target, ""),
    }
}

fn fold(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// css
// ============================================================================

/// Parse the unit. With `resolve_urls`, every local `url()` target must
/// exist (root-absolute ones under `www`).
fn check_css(unit: &StyleUnit, resolve_urls: bool, plan: &BuildPlan) -> Result<()> {
    StyleSheet::parse(&unit.css, ParserOptions::default())
        .map_err(|e| anyhow!("{}: {e}", unit.source.display()))?;

    if !resolve_urls {
        return Ok(());
    }

    let www = plan.context().site_www();
    let base = unit.source.parent().unwrap_or(www);
    for caps in CSS_URL.captures_iter(&unit.css) {
        let target = &caps[2];
        if target.starts_with('#') || target.starts_with("data:") || target.contains("://") {
            continue;
        }
        let (path, _) = split_url_suffix(target);
        let file = match path.strip_prefix('/') {
            Some(abs) => www.join(abs),
            None => base.join(path),
        };
        if !file.exists() {
            bail!(
                "{}: can't resolve '{}' in url()",
                unit.source.display(),
                target
            );
        }
    }
    Ok(())
}

// ============================================================================
// extract
// ============================================================================

/// Merge `(label, css)` units into one stylesheet and print it with a
/// source map that lists every unit as its own source.
fn extract_units(units: &[(String, &str)], minify: bool) -> Result<ExtractedStyle> {
    let mut source_map = SourceMap::new("/");
    let mut sheets = Vec::with_capacity(units.len());

    for (label, css) in units {
        let source_index = source_map.add_source(label);
        source_map
            .set_source_content(source_index as usize, css)
            .map_err(|e| anyhow!("{label}: {e:?}"))?;

        let sheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: label.clone(),
                source_index,
                ..ParserOptions::default()
            },
        )
        .map_err(|e| anyhow!("{label}: {e}"))?;
        sheets.push(sheet);
    }

    let labels: Vec<String> = units.iter().map(|(label, _)| label.clone()).collect();
    let rules = sheets
        .iter_mut()
        .flat_map(|sheet| std::mem::take(&mut sheet.rules.0))
        .collect();
    let mut merged = StyleSheet::new(labels, CssRuleList(rules), ParserOptions::default());

    if minify {
        merged
            .minify(MinifyOptions::default())
            .map_err(|e| anyhow!("stylesheet: {e}"))?;
    }

    let code = merged
        .to_css(PrinterOptions {
            minify,
            source_map: Some(&mut source_map),
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("stylesheet: {e}"))?
        .code;

    let map = source_map
        .to_json(None)
        .map_err(|e| anyhow!("stylesheet: {e:?}"))?;

    Ok(ExtractedStyle { code, map })
}
