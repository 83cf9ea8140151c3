//! Post-build removal of orphan script artifacts.
//!
//! The driver compiles every entry as a script entry, so a style-only entry
//! still leaves `<name>.js` (and its map) behind. The set of such entries is
//! known before compilation, so the cleaner works from an explicit
//! allow-list rather than inspecting the output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CleanupWarning;
use super::entry::EntrySet;
use super::output::{render_filename, SCRIPT_FILENAME, source_map_path};

/// What happened to one allow-listed file.
#[derive(Debug)]
pub enum CleanupOutcome {
    Removed,
    /// Nothing to do.
    AlreadyAbsent,
    Failed(CleanupWarning),
}

/// Results of one cleanup pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub already_absent: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Deletes a fixed list of output-relative files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanCleaner {
    files: Vec<PathBuf>,
}

impl OrphanCleaner {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Allow-list for the style-only entries of `entries`:
    /// `<name>.js` and `<name>.js.map`.
    pub fn for_entries(entries: &EntrySet) -> Self {
        let files = entries
            .style_only()
            .flat_map(|entry| {
                let script = PathBuf::from(render_filename(SCRIPT_FILENAME, entry.name()));
                let map = source_map_path(&script);
                [script, map]
            })
            .collect();
        Self { files }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete every allow-listed file under `output_dir`. Never fails; a
    /// deletion refused by the filesystem becomes a warning.
    pub fn run(&self, output_dir: &Path) -> CleanupReport {
        let mut report = CleanupReport::default();

        for rel in &self.files {
            match remove(output_dir, rel) {
                CleanupOutcome::Removed => {
                    crate::debug!("clean"; "removed {}", rel.display());
                    report.removed.push(rel.clone());
                }
                CleanupOutcome::AlreadyAbsent => report.already_absent.push(rel.clone()),
                CleanupOutcome::Failed(warning) => {
                    crate::log!("warning"; "{}: {}", warning, warning.source);
                    report.warnings.push(warning);
                }
            }
        }

        report
    }
}

fn remove(output_dir: &Path, rel: &Path) -> CleanupOutcome {
    match fs::remove_file(output_dir.join(rel)) {
        Ok(()) => CleanupOutcome::Removed,
        Err(e) if e.kind() == io::ErrorKind::NotFound => CleanupOutcome::AlreadyAbsent,
        Err(source) => CleanupOutcome::Failed(CleanupWarning {
            path: rel.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::super::entry::{EntryDescriptor, EntryKind};
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> EntrySet {
        EntrySet::new(vec![
            EntryDescriptor::new("javascripts/site", EntryKind::Script, vec![PathBuf::from("/s.js")]),
            EntryDescriptor::new("stylesheets/site", EntryKind::Style, vec![PathBuf::from("/s.scss")]),
            EntryDescriptor::new(
                "dashboard/stylesheets/dashboard",
                EntryKind::Style,
                vec![PathBuf::from("/d.scss")],
            ),
        ])
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_allow_list_from_style_only_entries() {
        let cleaner = OrphanCleaner::for_entries(&sample_entries());
        assert_eq!(
            cleaner.files(),
            [
                PathBuf::from("stylesheets/site.js"),
                PathBuf::from("stylesheets/site.js.map"),
                PathBuf::from("dashboard/stylesheets/dashboard.js"),
                PathBuf::from("dashboard/stylesheets/dashboard.js.map"),
            ]
        );
    }

    #[test]
    fn test_removes_only_listed_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "stylesheets/site.js");
        touch(tmp.path(), "stylesheets/site.css");
        touch(tmp.path(), "javascripts/site.js");

        let report = OrphanCleaner::for_entries(&sample_entries()).run(tmp.path());

        assert!(!tmp.path().join("stylesheets/site.js").exists());
        assert!(tmp.path().join("stylesheets/site.css").exists());
        assert!(tmp.path().join("javascripts/site.js").exists());
        assert_eq!(report.removed, [PathBuf::from("stylesheets/site.js")]);
        assert_eq!(report.already_absent.len(), 3);
        assert!(report.is_clean());
    }

    #[test]
    fn test_absent_files_are_not_errors() {
        let tmp = TempDir::new().unwrap();
        let report = OrphanCleaner::for_entries(&sample_entries()).run(tmp.path());
        assert!(report.removed.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_failed_deletion_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        // A directory where the file should be: remove_file refuses it.
        fs::create_dir_all(tmp.path().join("stylesheets/site.js")).unwrap();

        let cleaner = OrphanCleaner::new(vec![PathBuf::from("stylesheets/site.js")]);
        let report = cleaner.run(tmp.path());

        assert!(!report.is_clean());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, PathBuf::from("stylesheets/site.js"));
        assert!(report.already_absent.is_empty());
    }
}
