//! Error types for process execution.

use thiserror::Error;

/// Result type alias for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors that can occur while launching external processes.
///
/// A command that ran and failed is NOT an error here: non-zero exits and
/// timeouts are reported inside `CommandOutput` so callers can decide what
/// a failure means. Only not being able to run at all surfaces as `Err`.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Invalid toolchain manifest: {0}")]
    InvalidToolchain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
