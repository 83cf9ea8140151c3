//! `vapid new`: scaffold a site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::{embed, log};

/// Create a new site at `target`, which must not exist yet.
pub fn new_site(target: &Path) -> Result<()> {
    if target.exists() {
        bail!("target directory `{}` already exists", target.display());
    }

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .with_context(|| format!("cannot derive a site name from `{}`", target.display()))?;

    fs::create_dir_all(target)
        .with_context(|| format!("Failed to create directory '{}'", target.display()))?;
    embed::write_site(target, &name)?;

    log!("new"; "Site created.");
    crate::logger::extra(&[
        "To start the development server now, run:".to_string(),
        format!("  vapid server {}", target.display()),
    ]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_site() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("my-site");
        new_site(&target).unwrap();

        let manifest = fs::read_to_string(target.join("package.json")).unwrap();
        assert!(manifest.contains("\"my-site\""));
        assert!(target.join("www/index.html").is_file());
    }

    #[test]
    fn test_existing_target_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = new_site(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
