//! Output artifact planning.
//!
//! Maps each entry name onto the files the driver will write under the
//! output directory:
//!
//! ```text
//! javascripts/site                → javascripts/site.js (+ .map)
//! stylesheets/site                → stylesheets/site.css (+ .map)
//!                                   stylesheets/site.js   (orphan, removed)
//! ```
//!
//! The output directory is served at the URL root `/`, so artifact paths
//! double as their public URLs.

use std::path::{Path, PathBuf};

use super::cleaner::OrphanCleaner;
use super::entry::{EntryDescriptor, EntrySet};
use super::loader::TransformChain;
use super::{BuildContext, BuildError};

/// Script artifact filename pattern.
pub const SCRIPT_FILENAME: &str = "[name].js";

/// Extracted stylesheet filename pattern.
pub const STYLE_FILENAME: &str = "[name].css";

/// Substitute `[name]` in a filename pattern.
pub fn render_filename(pattern: &str, name: &str) -> String {
    pattern.replace("[name]", name)
}

/// Sibling source map of an artifact (`a/b.js` → `a/b.js.map`).
pub fn source_map_path(artifact: &Path) -> PathBuf {
    let mut os = artifact.as_os_str().to_os_string();
    os.push(".map");
    PathBuf::from(os)
}

/// Style extraction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleExtraction {
    filename_pattern: &'static str,
}

impl Default for StyleExtraction {
    fn default() -> Self {
        Self {
            filename_pattern: STYLE_FILENAME,
        }
    }
}

impl StyleExtraction {
    pub fn filename_for(&self, entry: &str) -> PathBuf {
        PathBuf::from(render_filename(self.filename_pattern, entry))
    }
}

/// Artifacts one entry produces, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRule {
    entry: String,
    script: PathBuf,
    /// Where an extracted stylesheet lands, whether or not one is produced.
    style_target: PathBuf,
    style: Option<PathBuf>,
}

impl OutputRule {
    fn for_entry(entry: &EntryDescriptor, extraction: &StyleExtraction) -> Self {
        let style_target = extraction.filename_for(entry.name());
        Self {
            entry: entry.name().to_string(),
            script: PathBuf::from(render_filename(SCRIPT_FILENAME, entry.name())),
            style: entry.is_style_only().then(|| style_target.clone()),
            style_target,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Script artifact. For style-only entries this is the orphan.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Extracted stylesheet, if the entry carries styles.
    ///
    /// Planned for style-only entries. After a build, script entries carry
    /// one too when they pulled stylesheets in through `require`.
    pub fn style(&self) -> Option<&Path> {
        self.style.as_deref()
    }

    /// Path the driver writes this entry's stylesheet to.
    pub fn style_target(&self) -> &Path {
        &self.style_target
    }

    /// This rule as actually built, given the files the driver wrote.
    ///
    /// Fails when a planned stylesheet is missing from `written`.
    pub fn realized(&self, out_dir: &Path, written: &[PathBuf]) -> Result<Self, BuildError> {
        let extracted = written.contains(&out_dir.join(&self.style_target));
        if self.style.is_some() && !extracted {
            return Err(BuildError::Driver(anyhow::anyhow!(
                "entry `{}` did not produce {}",
                self.entry,
                self.style_target.display()
            )));
        }
        Ok(Self {
            style: extracted.then(|| self.style_target.clone()),
            ..self.clone()
        })
    }
}

/// Everything the driver needs for one build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    context: BuildContext,
    entries: EntrySet,
    chain: TransformChain,
    outputs: Vec<OutputRule>,
    cleaner: OrphanCleaner,
}

impl BuildPlan {
    /// Context carrying the effective (chain-selected) mode.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    pub fn outputs(&self) -> &[OutputRule] {
        &self.outputs
    }

    pub fn output_for(&self, entry: &str) -> Option<&OutputRule> {
        self.outputs.iter().find(|o| o.entry == entry)
    }

    pub fn cleaner(&self) -> &OrphanCleaner {
        &self.cleaner
    }

    pub fn output_dir(&self) -> &Path {
        self.context.site_output()
    }
}

/// Combine context, entries and chain into a plan.
///
/// Validates entry invariants; an entry with no sources is a
/// `Configuration` error here, before the driver runs.
pub fn plan(
    ctx: &BuildContext,
    entries: EntrySet,
    chain: TransformChain,
) -> Result<BuildPlan, BuildError> {
    entries.validate()?;

    let extraction = StyleExtraction::default();
    let outputs = entries
        .iter()
        .map(|entry| OutputRule::for_entry(entry, &extraction))
        .collect();
    let cleaner = OrphanCleaner::for_entries(&entries);

    Ok(BuildPlan {
        context: ctx.with_mode(chain.mode()),
        entries,
        chain,
        outputs,
        cleaner,
    })
}
