//! Error types for the patch module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// Errors that can occur while parsing or applying change plans.
///
/// Unmatched edits and malformed change entries are deliberately NOT
/// errors: the engine records them as warnings and keeps going. Only
/// filesystem and JSON failures surface here.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
