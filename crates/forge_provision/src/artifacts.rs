//! Artifact directory management.
//!
//! Reports, saved plans, and other diagnostics land in a per-run artifact
//! directory. The store is an explicit handle passed to whoever writes
//! artifacts; there is no ambient "current" directory. A best-effort
//! `latest` symlink mirrors the newest store for convenience and is simply
//! skipped where symlinks are unavailable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ProvisionResult;
use crate::run_dir::{remove_any, run_suffix, slugify, symlink_dir};

/// A handle to one run's artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a timestamped store under `artifacts_dir` and refresh the
    /// `latest` link.
    pub fn create(artifacts_dir: impl Into<PathBuf>, name: &str) -> ProvisionResult<Self> {
        let artifacts_dir = artifacts_dir.into();
        let root = artifacts_dir.join(format!("{}-{}", slugify(name), run_suffix()));
        fs::create_dir_all(&root)?;
        info!("Artifact directory: {:?}", root);

        refresh_latest_link(&artifacts_dir, &root);

        Ok(Self { root })
    }

    /// Open a store at a fixed directory without any link juggling.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a text artifact, creating the directory if needed.
    pub fn save(&self, filename: &str, contents: &str) -> ProvisionResult<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(filename);
        fs::write(&path, contents)?;
        debug!("Saved artifact {:?}", path);
        Ok(path)
    }

    /// Write a pretty-printed JSON artifact.
    pub fn save_json<T: Serialize>(&self, filename: &str, value: &T) -> ProvisionResult<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.save(filename, &json)
    }
}

/// Point `artifacts_dir/latest` at `root`, or skip with a note.
fn refresh_latest_link(artifacts_dir: &Path, root: &Path) {
    let latest = artifacts_dir.join("latest");

    if fs::symlink_metadata(&latest).is_ok() {
        if let Err(e) = remove_any(&latest) {
            debug!("Could not remove stale latest link: {}", e);
            return;
        }
    }

    if let Err(e) = symlink_dir(root, &latest) {
        // Artifacts are for humans; a missing convenience link is not
        // worth failing the run over.
        info!("Note: could not create latest artifacts link ({})", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_create_makes_timestamped_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(dir.path(), "My App").unwrap();

        assert!(store.root().exists());
        let dirname = store.root().file_name().unwrap().to_string_lossy().to_string();
        assert!(dirname.starts_with("my-app-"));
    }

    #[test]
    fn test_save_creates_directory_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::at(dir.path().join("artifacts/run-1"));

        let path = store.save("test_report.md", "# Test Report\n").unwrap();

        assert!(path.exists());
        assert_eq!(fs::read_to_string(path).unwrap(), "# Test Report\n");
    }

    #[test]
    fn test_save_json_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::at(dir.path());

        let path = store
            .save_json(
                "plan.json",
                &Sample {
                    name: "demo".to_string(),
                    count: 2,
                },
            )
            .unwrap();

        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains("\"name\": \"demo\""));
        assert!(raw.contains('\n'));
    }

    #[cfg(unix)]
    #[test]
    fn test_latest_link_follows_newest_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(dir.path(), "demo").unwrap();

        let latest = dir.path().join("latest");
        assert!(fs::symlink_metadata(&latest).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&latest).unwrap(), store.root());

        let second = ArtifactStore::create(dir.path(), "demo").unwrap();
        assert_eq!(fs::read_link(&latest).unwrap(), second.root());
    }
}
