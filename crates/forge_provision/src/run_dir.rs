//! Run directory provisioning.
//!
//! Every generation request gets a fresh working copy of the project
//! template at `runs_dir/{slug}-{YYYYMMDD-HHMMSS}`, plus a mutable
//! `runs_dir/{slug}` alias that always points at the newest run. The alias
//! is a directory symlink where the platform allows one and a full copy
//! everywhere else, so callers can rely on it resolving either way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use fs_extra::dir::CopyOptions;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ProvisionError, ProvisionResult};

/// Directories never included in overviews or tree listings.
const SKIPPED_DIRS: [&str; 3] = ["node_modules", ".git", "dist"];

/// Extensions considered source/config when summarizing a template.
const OVERVIEW_EXTENSIONS: [&str; 5] = ["ts", "tsx", "js", "jsx", "json"];

/// A freshly provisioned run directory.
#[derive(Debug, Clone)]
pub struct ProvisionedRun {
    /// The timestamped directory holding the working copy.
    pub path: PathBuf,
    /// The `{slug}` alias refreshed to point at `path`.
    pub alias: PathBuf,
}

/// Copies a project template into timestamped run directories.
pub struct Provisioner {
    template_dir: PathBuf,
    runs_dir: PathBuf,
}

impl Provisioner {
    pub fn new(template_dir: impl Into<PathBuf>, runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            runs_dir: runs_dir.into(),
        }
    }

    /// Provision a new run directory for `name` and refresh its alias.
    ///
    /// Copy failures are fatal; nothing downstream can work without the
    /// template in place.
    pub fn provision(&self, name: &str) -> ProvisionResult<ProvisionedRun> {
        if !self.template_dir.exists() {
            return Err(ProvisionError::TemplateNotFound(self.template_dir.clone()));
        }

        let slug = slugify(name);
        let run_path = self.runs_dir.join(format!("{}-{}", slug, run_suffix()));
        let alias = self.runs_dir.join(&slug);

        fs::create_dir_all(&run_path)?;
        copy_contents(&self.template_dir, &run_path)?;
        info!("Provisioned run directory {:?}", run_path);

        self.refresh_alias(&run_path, &alias)?;

        Ok(ProvisionedRun {
            path: run_path,
            alias,
        })
    }

    /// Point `alias` at `run_path`, replacing a stale symlink or file.
    ///
    /// When a symlink cannot be created (unsupported platform, missing
    /// privileges, or a real directory occupying the alias), the alias is
    /// rebuilt as a full copy instead.
    fn refresh_alias(&self, run_path: &Path, alias: &Path) -> ProvisionResult<()> {
        if let Ok(meta) = fs::symlink_metadata(alias) {
            let file_type = meta.file_type();
            if file_type.is_symlink() || file_type.is_file() {
                remove_link(alias)?;
            }
        }

        match symlink_dir(run_path, alias) {
            Ok(()) => {
                debug!("Linked {:?} -> {:?}", alias, run_path);
            }
            Err(e) => {
                warn!("Could not link {:?} ({}), copying instead", alias, e);
                if fs::symlink_metadata(alias).is_ok() {
                    remove_any(alias)?;
                }
                fs::create_dir_all(alias)?;
                copy_contents(run_path, alias)?;
            }
        }

        Ok(())
    }

    /// Summarize the template's source and config files for a generator.
    pub fn overview(&self) -> ProvisionResult<String> {
        if !self.template_dir.exists() {
            return Err(ProvisionError::TemplateNotFound(self.template_dir.clone()));
        }

        let mut lines = vec!["Template structure:".to_string()];
        for file in list_files(&self.template_dir, true) {
            lines.push(format!("- {}", file));
        }

        Ok(lines.join("\n"))
    }
}

/// Render a run directory as an indented markdown file listing.
pub fn render_tree(root: &Path) -> ProvisionResult<String> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.display().to_string());

    let mut files = list_files(root, false);
    files.sort();

    let mut content = format!("# Code Tree for {}\n\n", name);
    content.push_str(&format!("Generated: {}\n\n", chrono::Utc::now().to_rfc3339()));
    content.push_str("## File Structure\n\n");

    for file in &files {
        let depth = file.matches('/').count();
        let indent = "  ".repeat(depth);
        let filename = file.rsplit('/').next().unwrap_or(file);
        content.push_str(&format!("{}- {}\n", indent, filename));
    }

    Ok(content)
}

/// Collect relative file paths beneath `root`, skipping vendor directories.
fn list_files(root: &Path, source_only: bool) -> Vec<String> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            !e.file_type().is_dir()
                || !SKIPPED_DIRS
                    .iter()
                    .any(|skip| e.file_name().to_string_lossy() == *skip)
        })
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if source_only {
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            if !OVERVIEW_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
        }

        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    files
}

/// Lowercase a display name and join whitespace runs with dashes.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Sortable local-time suffix for run and artifact directory names.
pub fn run_suffix() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Copy the contents of one directory into another, overwriting collisions.
pub(crate) fn copy_contents(from: &Path, to: &Path) -> ProvisionResult<()> {
    let options = CopyOptions::new().overwrite(true).content_only(true);
    fs_extra::dir::copy(from, to, &options)?;
    Ok(())
}

/// Remove a symlink or plain file without following it.
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

/// Remove whatever occupies `path`, directory trees included.
pub(crate) fn remove_any(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_dir() => fs::remove_dir_all(path),
        Ok(_) => remove_link(path),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
pub(crate) fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
pub(crate) fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
}
