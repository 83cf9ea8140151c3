//! Files compiled into the binary.
//!
//! - [`framework`]: dashboard sources for a framework root created on demand
//! - [`site`]: the starter site written by `vapid new`
//!
//! ```text
//! <framework>/                      <site>/
//! ├── assets/                       ├── package.json
//! │   ├── javascripts/              ├── .env, .gitignore
//! │   │   ├── dashboard.js          ├── node_modules/
//! │   │   └── sidebar.js            └── www/
//! │   └── stylesheets/                  ├── index.html
//! │       ├── dashboard.scss            ├── javascripts/site.js
//! │       └── _variables.scss           └── stylesheets/site.scss
//! └── node_modules/
//! ```

mod template;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub use template::{Template, TemplateVars};

/// One embedded file and its path relative to the directory it belongs in.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFile {
    pub path: &'static str,
    pub content: &'static str,
}

impl EmbeddedFile {
    const fn new(path: &'static str, content: &'static str) -> Self {
        Self { path, content }
    }
}

pub mod framework {
    use super::EmbeddedFile;

    pub const FILES: &[EmbeddedFile] = &[
        EmbeddedFile::new(
            "assets/javascripts/dashboard.js",
            include_str!("framework/dashboard.js"),
        ),
        EmbeddedFile::new(
            "assets/javascripts/sidebar.js",
            include_str!("framework/sidebar.js"),
        ),
        EmbeddedFile::new(
            "assets/stylesheets/dashboard.scss",
            include_str!("framework/dashboard.scss"),
        ),
        EmbeddedFile::new(
            "assets/stylesheets/_variables.scss",
            include_str!("framework/_variables.scss"),
        ),
    ];

    /// Empty directories every framework root needs.
    pub const DIRS: &[&str] = &["node_modules"];
}

pub mod site {
    use super::{EmbeddedFile, Template, TemplateVars};

    /// Starter site variables as JSON string literals. The placeholder is
    /// written quoted (`"__SITE_NAME__"`), so the same vars serve
    /// `package.json` and `site.js`.
    pub struct QuotedVars {
        pub name: String,
    }

    impl TemplateVars for QuotedVars {
        fn apply(&self, content: &str) -> String {
            let quoted = serde_json::Value::from(self.name.as_str()).to_string();
            content.replace("\"__SITE_NAME__\"", &quoted)
        }
    }

    /// Starter site variables, HTML escaped.
    pub struct PageVars {
        pub name: String,
    }

    impl TemplateVars for PageVars {
        fn apply(&self, content: &str) -> String {
            let escaped = self
                .name
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            content.replace("__SITE_NAME__", &escaped)
        }
    }

    pub const PACKAGE_JSON: Template<QuotedVars> =
        Template::new(include_str!("site/package.json"));

    pub const INDEX_HTML: Template<PageVars> =
        Template::new(include_str!("site/index.html"));

    pub const SITE_JS: Template<QuotedVars> = Template::new(include_str!("site/site.js"));

    /// Files copied verbatim.
    pub const STATIC_FILES: &[EmbeddedFile] = &[
        EmbeddedFile::new("www/stylesheets/site.scss", include_str!("site/site.scss")),
        EmbeddedFile::new(".env", include_str!("site/env")),
        EmbeddedFile::new(".gitignore", include_str!("site/gitignore")),
    ];

    /// Empty directories of a new site.
    pub const DIRS: &[&str] = &["node_modules", "www/images", "data"];
}

/// Populate a framework root from the embedded files.
///
/// Existing files are left alone so local edits survive. Returns the
/// number of files written.
pub fn ensure_framework(root: &Path) -> Result<usize> {
    for dir in framework::DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory '{}'", path.display()))?;
    }

    let mut written = 0;
    for file in framework::FILES {
        let path = root.join(file.path);
        if path.exists() {
            continue;
        }
        write_file(&path, file.content)?;
        written += 1;
    }
    Ok(written)
}

/// Write the starter site into `root` (which must already exist).
pub fn write_site(root: &Path, name: &str) -> Result<()> {
    for dir in site::DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory '{}'", path.display()))?;
    }

    write_file(
        &root.join("package.json"),
        &site::PACKAGE_JSON.render(&site::QuotedVars { name: name.to_string() }),
    )?;
    write_file(
        &root.join("www/index.html"),
        &site::INDEX_HTML.render(&site::PageVars { name: name.to_string() }),
    )?;
    write_file(
        &root.join("www/javascripts/site.js"),
        &site::SITE_JS.render(&site::QuotedVars { name: name.to_string() }),
    )?;
    for file in site::STATIC_FILES {
        write_file(&root.join(file.path), file.content)?;
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write '{}'", path.display()))
}
