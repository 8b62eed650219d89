//! Log-based failure detection.
//!
//! The validation loop has no structured error channel: compiler output
//! and dev-server chatter arrive as plain text. Failure is detected by
//! scanning that text for a fixed set of signatures, with a short benign
//! list so resilience vocabulary (error boundaries, error handlers) does
//! not trip the loop.

/// Substrings whose presence marks a log batch as failed.
const ERROR_SIGNATURES: [&str; 7] = [
    "error",
    "exception",
    "failed",
    "cannot find module",
    "unexpected token",
    "syntaxerror",
    "typeerror",
];

/// Phrases that suppress a signature match. Both spellings of the React
/// boundary component show up in practice.
const BENIGN_PHRASES: [&str; 5] = [
    "error boundary",
    "errorboundary",
    "error handler",
    "onerror",
    "catch error",
];

/// Whether a batch of captured log lines indicates failure.
///
/// Scans the concatenated logs case-insensitively. Any signature hit
/// counts unless one of the benign phrases also appears.
pub fn has_errors(logs: &[String]) -> bool {
    let text = logs.join("\n").to_lowercase();

    if !ERROR_SIGNATURES.iter().any(|sig| text.contains(sig)) {
        return false;
    }

    !BENIGN_PHRASES.iter().any(|phrase| text.contains(phrase))
}

/// Whether a single output line should be recorded as an error.
///
/// Tighter than [`has_errors`]: used for stderr lines streamed off the
/// dev server, where one line is all the context there is.
pub fn line_is_error(line: &str) -> bool {
    let lower = line.to_lowercase();

    (lower.contains("error") || lower.contains("failed") || lower.contains("exception"))
        && !lower.contains("error boundary")
        && !lower.contains("errorboundary")
}
