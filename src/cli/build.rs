//! `vapid build`: run the asset pipeline for a site.

use anyhow::{Context, Result};

use crate::bundler::AssetBundler;
use crate::config::{FrameworkSource, SiteConfig};
use crate::core::BuildMode;
use crate::pipeline::{self, BuildReport};
use crate::{debug, embed, log};

/// Build a site's assets once.
///
/// A framework root inside the site (`.vapid/`) is populated from the
/// binary first; explicit framework roots are used as they are.
pub fn build_assets(config: &SiteConfig, mode: BuildMode, quiet: bool) -> Result<BuildReport> {
    if config.framework_source == FrameworkSource::Embedded {
        let written = embed::ensure_framework(&config.framework_root).with_context(|| {
            format!(
                "failed to prepare framework root {}",
                config.framework_root.display()
            )
        })?;
        debug!("build"; "framework root {} ({} file(s) written)", config.framework_root.display(), written);
    }

    let request = config.build_request(mode);
    let driver = if quiet {
        AssetBundler::new().quiet()
    } else {
        AssetBundler::new()
    };
    let report = pipeline::run(&request, &driver).map_err(anyhow::Error::from)?;

    if !quiet {
        log_report(config, &report);
    }
    Ok(report)
}

fn log_report(config: &SiteConfig, report: &BuildReport) {
    let output = report
        .output_dir
        .strip_prefix(&config.root)
        .unwrap_or(&report.output_dir);
    let kept = report.artifacts.len() - report.cleanup.removed.len().min(report.artifacts.len());

    log!(
        "build";
        "{} file(s) in {} ({})",
        kept,
        output.display(),
        report.mode
    );
    if !report.cleanup.is_clean() {
        log!("warning"; "{} artifact(s) could not be removed", report.cleanup.warnings.len());
    }
}
