//! Error types for provisioning.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that can occur while provisioning run or artifact directories.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Template directory not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Failed to copy directory tree: {0}")]
    Copy(#[from] fs_extra::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
