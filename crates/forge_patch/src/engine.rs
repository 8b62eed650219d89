//! The patch engine: applies change plans to a project directory.
//!
//! Application is deliberately forgiving. A generator that hallucinated an
//! anchor, repeated an already-applied edit, or described a file that does
//! not exist should degrade the plan, not abort it: every mismatch becomes
//! a recorded warning and the engine moves on to the next edit.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PatchError, PatchResult};
use crate::placeholder;
use crate::plan::{ChangeKind, FileChange, TextEdit};

/// How many characters of an unmatched anchor to echo in a warning.
const WARNING_SNIPPET_CHARS: usize = 50;

/// What happened when a plan was applied.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    /// Paths that were actually created, modified, or deleted.
    pub applied: Vec<String>,
    /// Everything that was skipped or only partially applied.
    pub warnings: Vec<String>,
}

impl ApplyOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Result of running an edit script against one file's content.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub content: String,
    /// Edits that changed the content (insertions included).
    pub applied: usize,
    pub warnings: Vec<String>,
}

/// Applies [`FileChange`] lists beneath a fixed project root.
pub struct PatchEngine {
    root: PathBuf,
}

impl PatchEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Apply every change in order. Only filesystem failures abort; all
    /// plan-level problems end up in the outcome's warnings.
    pub fn apply(&self, changes: &[FileChange]) -> PatchResult<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();

        for change in changes {
            debug!("Processing change: {}", change.path);

            let Some(target) = resolve_target(&self.root, &change.path) else {
                outcome.warn(format!("{}: path escapes the project root", change.path));
                continue;
            };

            match change.kind {
                ChangeKind::Create => self.apply_create(change, &target, &mut outcome)?,
                ChangeKind::Modify => self.apply_modify(change, &target, &mut outcome)?,
                ChangeKind::Delete => self.apply_delete(change, &target, &mut outcome)?,
            }
        }

        Ok(outcome)
    }

    fn apply_create(
        &self,
        change: &FileChange,
        target: &Path,
        outcome: &mut ApplyOutcome,
    ) -> PatchResult<()> {
        match &change.content {
            Some(content) => {
                write_file(target, content)?;
                info!("Created: {}", change.path);
                outcome.applied.push(change.path.clone());
            }
            None => {
                outcome.warn(format!("No content provided for new file: {}", change.path));
            }
        }
        Ok(())
    }

    fn apply_modify(
        &self,
        change: &FileChange,
        target: &Path,
        outcome: &mut ApplyOutcome,
    ) -> PatchResult<()> {
        if !target.exists() {
            outcome.warn(format!("File not found for modification: {}", change.path));
            return Ok(());
        }

        if !change.patches.is_empty() {
            let current = read_file(target)?;
            let edited = apply_edits(&current, &change.patches);
            for warning in edited.warnings {
                outcome.warn(format!("{}: {}", change.path, warning));
            }

            if edited.applied > 0 {
                write_file(target, &edited.content)?;
                info!(
                    "Modified: {} ({}/{} edits)",
                    change.path,
                    edited.applied,
                    change.patches.len()
                );
                outcome.applied.push(change.path.clone());
            } else if let Some(content) = &change.content {
                // Rewrite fallback: the edit script was useless but the
                // generator also sent the whole file.
                write_file(target, content)?;
                outcome.warn(format!(
                    "{}: no edits changed the file, rewrote from supplied content",
                    change.path
                ));
                outcome.applied.push(change.path.clone());
            }
        } else if let Some(content) = &change.content {
            write_file(target, content)?;
            info!("Rewritten: {}", change.path);
            outcome.applied.push(change.path.clone());
        } else {
            outcome.warn(format!("No patches or content supplied for {}", change.path));
        }

        Ok(())
    }

    fn apply_delete(
        &self,
        change: &FileChange,
        target: &Path,
        outcome: &mut ApplyOutcome,
    ) -> PatchResult<()> {
        if target.exists() {
            fs::remove_file(target).map_err(|e| PatchError::io(target, e))?;
            info!("Deleted: {}", change.path);
            outcome.applied.push(change.path.clone());
        } else {
            outcome.warn(format!("File not found for deletion: {}", change.path));
        }
        Ok(())
    }
}

/// Run an edit script against in-memory content.
///
/// Each edit sees the result of the previous ones. Placeholder anchors
/// become insertions, literal matches replace the first occurrence, and a
/// whitespace-insensitive fallback handles anchors whose indentation
/// drifted from the real file. Anything else is a warning.
pub fn apply_edits(content: &str, edits: &[TextEdit]) -> EditOutcome {
    let mut result = content.to_string();
    let mut applied = 0;
    let mut warnings = Vec::new();

    for edit in edits {
        if placeholder::is_placeholder(&edit.old_text) {
            if !edit.new_text.trim().is_empty() {
                result = placeholder::insert_snippet(&result, &edit.new_text);
                applied += 1;
            }
            continue;
        }

        if let Some(start) = result.find(&edit.old_text) {
            result.replace_range(start..start + edit.old_text.len(), &edit.new_text);
            applied += 1;
            continue;
        }

        match fuzzy_span(&result, &edit.old_text) {
            Some(span) => {
                result.replace_range(span, &edit.new_text);
                applied += 1;
            }
            None => {
                warnings.push(format!(
                    "Cannot find text to replace: {}...",
                    snippet(&edit.old_text)
                ));
            }
        }
    }

    EditOutcome {
        content: result,
        applied,
        warnings,
    }
}

/// Locate `needle` in `haystack` ignoring whitespace differences, and map
/// the match back to the byte span it occupies in the original text.
fn fuzzy_span(haystack: &str, needle: &str) -> Option<std::ops::Range<usize>> {
    let (norm_haystack, offsets) = normalize_with_offsets(haystack);
    let (norm_needle, _) = normalize_with_offsets(needle);

    if norm_needle.is_empty() {
        return None;
    }

    let start = norm_haystack.find(&norm_needle)?;
    let end = start + norm_needle.len();

    let span_start = offsets[start];
    let span_end = if end < offsets.len() {
        offsets[end]
    } else {
        haystack.len()
    };

    Some(span_start..span_end)
}

/// Collapse whitespace runs to single spaces, recording for every byte of
/// the normalized string the original byte offset it came from.
fn normalize_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut normalized = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    let mut in_whitespace = false;

    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if !in_whitespace {
                normalized.push(' ');
                offsets.push(offset);
                in_whitespace = true;
            }
        } else {
            in_whitespace = false;
            let start = normalized.len();
            normalized.push(ch);
            for _ in start..normalized.len() {
                offsets.push(offset);
            }
        }
    }

    (normalized, offsets)
}

fn snippet(text: &str) -> String {
    text.chars().take(WARNING_SNIPPET_CHARS).collect()
}

fn resolve_target(root: &Path, relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);
    if rel.is_absolute() {
        return None;
    }

    let mut depth: i32 = 0;
    for component in rel.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => return None,
        }
    }

    Some(root.join(rel))
}

fn read_file(path: &Path) -> PatchResult<String> {
    fs::read_to_string(path).map_err(|e| PatchError::io(path, e))
}

fn write_file(path: &Path, content: &str) -> PatchResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PatchError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| PatchError::io(path, e))
}
