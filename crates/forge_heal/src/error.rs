//! Error types for the healing loop.

use thiserror::Error;

/// Result type alias for healing operations.
pub type HealResult<T> = Result<T, HealError>;

/// Errors that can occur while generating or applying hotfixes.
///
/// Most failures inside the validation loop itself are recorded on the
/// [`TestResult`](crate::TestResult) instead of surfacing here; these
/// variants cover the hotfix generator and its plan format.
#[derive(Error, Debug)]
pub enum HealError {
    #[error("No hotfix generator configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY")]
    GeneratorNotConfigured,

    #[error("Hotfix generator error: {0}")]
    Generator(String),

    #[error("Invalid hotfix plan: {0}")]
    InvalidPlan(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
