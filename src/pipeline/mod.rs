//! Asset build pipeline.
//!
//! Turns a site and a framework root into a build plan, hands the plan to a
//! bundling driver, then removes the script artifacts of style-only entries.
//!
//! # Phases
//!
//! ```text
//! Configuring ──► Compiling ──► CleaningArtifacts ──► Done
//!      │              │
//!      └──► Failed ◄──┘
//! ```
//!
//! Configuration is synchronous and side-effect free; nothing is written to
//! the output directory before `Compiling`. Cleanup warnings never fail a
//! build.

mod cleaner;
mod context;
mod entry;
mod error;
mod loader;
mod output;
mod resolve;

use std::fmt;
use std::path::{Path, PathBuf};

pub use cleaner::{CleanupReport, OrphanCleaner};
pub use context::{BuildContext, DEFAULT_OUTPUT_DIR};
pub use entry::{DEFAULT_STYLE_PATTERN, EntryDescriptor, EntryKind, EntrySet, EntrySetBuilder};
pub use error::{BuildError, CleanupWarning};
pub use loader::{HONOR_REQUESTED_MODE, Loader, TransformChain, TransformRule, assemble_chain};
pub use output::{BuildPlan, OutputRule, plan, source_map_path};
pub use resolve::{ModuleResolver, ModuleSearchOrder};

#[cfg(test)]
pub(crate) use context::fixture;

use crate::core::BuildMode;

// ============================================================================
// Driver seam
// ============================================================================

/// Bundling engine. Compiles every entry of a plan into the output
/// directory and returns the paths it wrote.
///
/// Errors are opaque to the pipeline and surfaced verbatim.
pub trait Driver {
    fn compile(&self, plan: &BuildPlan) -> anyhow::Result<Vec<PathBuf>>;
}

// ============================================================================
// Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Configuring,
    Compiling,
    CleaningArtifacts,
    Done,
    Failed,
}

impl BuildPhase {
    /// Whether `self → next` is a legal transition.
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Configuring, Self::Compiling)
                | (Self::Configuring, Self::Failed)
                | (Self::Compiling, Self::CleaningArtifacts)
                | (Self::Compiling, Self::Failed)
                | (Self::CleaningArtifacts, Self::Done)
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuring => "configuring",
            Self::Compiling => "compiling",
            Self::CleaningArtifacts => "cleaning",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Tracks the phase of one build and rejects illegal transitions.
#[derive(Debug)]
struct PhaseTracker {
    phase: BuildPhase,
}

impl PhaseTracker {
    const fn new() -> Self {
        Self {
            phase: BuildPhase::Configuring,
        }
    }

    fn advance(&mut self, next: BuildPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal build phase transition {} -> {}",
            self.phase,
            next
        );
        crate::debug!("build"; "{} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Advance to `Failed` when `result` is an error.
    fn check<T>(&mut self, result: Result<T, BuildError>) -> Result<T, BuildError> {
        if result.is_err() {
            self.advance(BuildPhase::Failed);
        }
        result
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Inputs of one build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub framework_root: PathBuf,
    pub site_root: PathBuf,
    /// Output directory, relative to the site root or absolute.
    pub output: PathBuf,
    pub requested_mode: BuildMode,
    /// Mode-switch gate; see [`HONOR_REQUESTED_MODE`].
    pub honor_mode: bool,
    pub style_pattern: String,
}

impl BuildRequest {
    /// Request with stock settings.
    pub fn new(framework_root: &Path, site_root: &Path, requested_mode: BuildMode) -> Self {
        Self {
            framework_root: framework_root.to_path_buf(),
            site_root: site_root.to_path_buf(),
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            requested_mode,
            honor_mode: HONOR_REQUESTED_MODE,
            style_pattern: DEFAULT_STYLE_PATTERN.to_string(),
        }
    }
}

/// Outcome of a successful build.
#[derive(Debug)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub output_dir: PathBuf,
    /// Files the driver wrote, orphans included.
    pub artifacts: Vec<PathBuf>,
    /// Output rules as built: script entries that extracted a stylesheet
    /// carry it here.
    pub outputs: Vec<OutputRule>,
    pub cleanup: CleanupReport,
}

/// Resolve, enumerate, assemble and plan. Writes nothing.
pub fn configure(request: &BuildRequest) -> Result<BuildPlan, BuildError> {
    let ctx = BuildContext::resolve(
        &request.framework_root,
        &request.site_root,
        &request.output,
        request.requested_mode,
    )?;
    let entries = EntrySetBuilder::new()
        .style_pattern(request.style_pattern.as_str())
        .build(&ctx)?;
    let chain = assemble_chain(ctx.mode(), request.honor_mode);
    plan(&ctx, entries, chain)
}

/// Run one full build through `driver`.
pub fn run(request: &BuildRequest, driver: &dyn Driver) -> Result<BuildReport, BuildError> {
    let mut phase = PhaseTracker::new();

    let plan = phase.check(configure(request))?;
    crate::debug!(
        "build";
        "{} entries, {} mode, output {}",
        plan.entries().len(),
        plan.context().mode(),
        plan.output_dir().display()
    );

    phase.advance(BuildPhase::Compiling);
    let artifacts = phase.check(driver.compile(&plan).map_err(BuildError::Driver))?;
    let outputs = phase.check(
        plan.outputs()
            .iter()
            .map(|rule| rule.realized(plan.output_dir(), &artifacts))
            .collect::<Result<Vec<_>, _>>(),
    )?;

    phase.advance(BuildPhase::CleaningArtifacts);
    let cleanup = plan.cleaner().run(plan.output_dir());

    phase.advance(BuildPhase::Done);
    Ok(BuildReport {
        mode: plan.context().mode(),
        output_dir: plan.output_dir().to_path_buf(),
        artifacts,
        outputs,
        cleanup,
    })
}
