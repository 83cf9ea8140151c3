//! `vapid deploy`: run the site's `deploy` script.

use anyhow::Result;

use crate::config::SiteConfig;
use crate::log;
use crate::utils::exec::{Cmd, NPM_FILTER};

/// Script name looked up in `package.json`.
pub const DEPLOY_SCRIPT: &str = "deploy";

/// Run the deploy script, or explain how to get hosting when there is none.
///
/// Script output is logged as it is; a failing script is reported and
/// returned as an error.
pub fn deploy_site(config: &SiteConfig) -> Result<()> {
    log!("deploy"; "Deploying...");

    let Some(script) = config.package.script(DEPLOY_SCRIPT) else {
        crate::logger::extra(&[
            "Vapid hosting is currently in private beta.",
            "To request access, visit https://www.vapid.com",
        ]);
        return Ok(());
    };

    Cmd::shell(script)
        .cwd(&config.root)
        .label(DEPLOY_SCRIPT)
        .filter(&NPM_FILTER)
        .run()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvOverrides;
    use std::fs;
    use tempfile::TempDir;

    fn site(manifest: &str) -> (TempDir, SiteConfig) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), manifest).unwrap();
        let config =
            SiteConfig::load_with(tmp.path(), true, None, &EnvOverrides::default()).unwrap();
        (tmp, config)
    }

    #[test]
    fn test_without_script() {
        let (_tmp, config) = site(r#"{ "name": "blog" }"#);
        deploy_site(&config).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_script_in_site_root() {
        let (tmp, config) = site(r#"{ "scripts": { "deploy": "touch deployed" } }"#);
        deploy_site(&config).unwrap();
        assert!(tmp.path().join("deployed").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_script() {
        let (_tmp, config) = site(r#"{ "scripts": { "deploy": "echo denied >&2; exit 1" } }"#);
        let err = deploy_site(&config).unwrap_err();
        assert!(err.to_string().contains("denied"));
    }
}
