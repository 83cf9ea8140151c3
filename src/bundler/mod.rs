//! Built-in bundling driver.
//!
//! Every entry, style-only ones included, is compiled as a script entry:
//! its sources are walked as CommonJS modules and emitted as `<name>.js`.
//! Sources matched by a transform rule are stubbed out of the script and
//! run through that rule's loaders instead, landing in `<name>.css`.
//!
//! Entries are independent and compile in parallel on the rayon pool.

mod script;
mod style;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::logger::ProgressLine;
use crate::pipeline::{BuildPlan, Driver, EntryDescriptor, source_map_path};

use script::ScriptGraph;

/// Driver backed by `oxc` (scripts), `grass` (Sass) and `lightningcss`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssetBundler {
    quiet: bool,
}

impl AssetBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// No progress line (used when the caller prints its own summary).
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

impl Driver for AssetBundler {
    fn compile(&self, plan: &BuildPlan) -> Result<Vec<PathBuf>> {
        let entries = plan.entries().as_slice();
        let styles = entries.iter().filter(|e| e.is_style_only()).count();
        let progress = (!self.quiet).then(|| {
            ProgressLine::new(&[("scripts", entries.len()), ("styles", styles)])
        });

        let written: Vec<Vec<PathBuf>> = entries
            .par_iter()
            .map(|entry| -> Result<Vec<PathBuf>> {
                let files = compile_entry(entry, plan)?;
                if let Some(progress) = &progress {
                    progress.inc("scripts");
                    if entry.is_style_only() {
                        progress.inc("styles");
                    }
                }
                Ok(files)
            })
            .collect::<Result<_>>()?;

        if let Some(progress) = progress {
            progress.finish();
        }

        let mut files: Vec<PathBuf> = written.into_iter().flatten().collect();
        files.sort();
        Ok(files)
    }
}

/// Compile one entry: script artifact always, stylesheet when any source
/// went through a transform rule.
fn compile_entry(entry: &EntryDescriptor, plan: &BuildPlan) -> Result<Vec<PathBuf>> {
    let output = plan
        .output_for(entry.name())
        .with_context(|| format!("no output rule for entry `{}`", entry.name()))?;
    let minify = plan.context().mode().minify();
    let out_dir = plan.output_dir();

    let graph = ScriptGraph::collect(entry.sources(), plan)
        .with_context(|| format!("entry `{}`", entry.name()))?;
    crate::debug!("bundle"; "{}: {} module(s)", entry.name(), graph.len());

    let emitted = script::emit(&graph.render()?, output.script(), minify)?;
    let mut written = write_artifact(out_dir, output.script(), emitted.code, emitted.map)?;

    if graph.styles().is_empty() {
        return Ok(written);
    }

    let Some(rule) = plan.chain().rule_for(&graph.styles()[0]) else {
        return Ok(written);
    };
    let css_path = output.style_target();
    let extracted = style::compile(graph.styles(), rule, plan, css_path)?;
    written.extend(write_artifact(out_dir, css_path, extracted.code, Some(extracted.map))?);

    Ok(written)
}

/// Write `code` (with a source-map trailer) and its map.
fn write_artifact(
    out_dir: &Path,
    rel: &Path,
    mut code: String,
    map: Option<String>,
) -> Result<Vec<PathBuf>> {
    let path = out_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut written = Vec::with_capacity(2);
    if let Some(map) = map {
        let map_path = source_map_path(&path);
        let map_name = map_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !code.ends_with('\n') {
            code.push('\n');
        }
        if rel.extension().is_some_and(|ext| ext == "css") {
            code.push_str(&format!("/*# sourceMappingURL={map_name} */\n"));
        } else {
            code.push_str(&format!("//# sourceMappingURL={map_name}\n"));
        }

        fs::write(&map_path, map)
            .with_context(|| format!("failed to write {}", map_path.display()))?;
        written.push(map_path);
    }

    fs::write(&path, code).with_context(|| format!("failed to write {}", path.display()))?;
    written.push(path);
    Ok(written)
}
