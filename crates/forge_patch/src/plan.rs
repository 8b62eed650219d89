//! Data model for machine-proposed change plans.
//!
//! A plan is the JSON document a code generator hands back: a list of file
//! changes, each either a full file (`create`), an edit script against an
//! existing file (`modify`), or a removal (`delete`). The wire format keeps
//! the generator contract's field names (`type`, `oldText`, `newText`).

use serde::{Deserialize, Serialize};

use crate::error::PatchResult;

/// What a [`FileChange`] does to its target file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Modify,
    Delete,
}

/// A single text replacement inside one file.
///
/// `old_text` is located literally first, then by whitespace-insensitive
/// matching. An edit whose `old_text` looks like an elided-content
/// placeholder is treated as an insertion instead (see the engine).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub old_text: String,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }
}

/// One planned change to one file, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<TextEdit>,
}

impl FileChange {
    /// Create a new file with the given content.
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Create,
            description: None,
            content: Some(content.into()),
            patches: Vec::new(),
        }
    }

    /// Modify an existing file; add edits with [`FileChange::with_edit`].
    pub fn modify(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modify,
            description: None,
            content: None,
            patches: Vec::new(),
        }
    }

    /// Delete an existing file.
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Delete,
            description: None,
            content: None,
            patches: Vec::new(),
        }
    }

    /// Set the human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set full-file content (the rewrite fallback for `modify`).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a text edit.
    pub fn with_edit(mut self, old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        self.patches.push(TextEdit::new(old_text, new_text));
        self
    }
}

/// A complete change plan: the top-level document produced by a generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub files: Vec<FileChange>,
}

impl Plan {
    pub fn new(files: Vec<FileChange>) -> Self {
        Self { files }
    }

    /// Parse a plan from its JSON wire format.
    pub fn from_json(raw: &str) -> PatchResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize the plan for the artifacts directory.
    pub fn to_json_pretty(&self) -> PatchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check plan invariants, returning one message per violation.
    ///
    /// Violations never make a plan unusable; the engine applies what it
    /// can and skips the rest, so these are warnings for the operator.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (index, change) in self.files.iter().enumerate() {
            if change.path.trim().is_empty() {
                warnings.push(format!("Change {} has an empty path", index + 1));
                continue;
            }

            match change.kind {
                ChangeKind::Create => {
                    if change.content.is_none() {
                        warnings.push(format!("{}: create change has no content", change.path));
                    }
                }
                ChangeKind::Modify => {
                    if change.patches.is_empty() && change.content.is_none() {
                        warnings.push(format!(
                            "{}: modify change has neither patches nor content",
                            change.path
                        ));
                    }
                }
                ChangeKind::Delete => {
                    if change.content.is_some() || !change.patches.is_empty() {
                        warnings.push(format!(
                            "{}: delete change carries content or patches",
                            change.path
                        ));
                    }
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generator_wire_format() {
        let raw = r#"{
            "files": [
                {
                    "path": "src/App.tsx",
                    "type": "modify",
                    "description": "Wire up the dashboard",
                    "patches": [
                        { "oldText": "old", "newText": "new" }
                    ]
                },
                {
                    "path": "src/components/Gauge.tsx",
                    "type": "create",
                    "content": "export const Gauge = () => null;\n"
                }
            ]
        }"#;

        let plan = Plan::from_json(raw).unwrap();
        assert_eq!(plan.files.len(), 2);
        assert_eq!(plan.files[0].kind, ChangeKind::Modify);
        assert_eq!(plan.files[0].patches[0].old_text, "old");
        assert_eq!(plan.files[1].kind, ChangeKind::Create);
        assert!(plan.files[1].patches.is_empty());
    }

    #[test]
    fn test_wire_format_round_trip_keeps_camel_case() {
        let plan = Plan::new(vec![
            FileChange::modify("src/main.ts").with_edit("a", "b")
        ]);

        let json = plan.to_json_pretty().unwrap();
        assert!(json.contains("\"oldText\""));
        assert!(json.contains("\"newText\""));
        assert!(json.contains("\"type\": \"modify\""));
    }

    #[test]
    fn test_validate_flags_empty_create() {
        let plan = Plan::new(vec![FileChange {
            path: "src/empty.ts".to_string(),
            kind: ChangeKind::Create,
            description: None,
            content: None,
            patches: Vec::new(),
        }]);

        let warnings = plan.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no content"));
    }

    #[test]
    fn test_validate_flags_bare_modify_and_loaded_delete() {
        let plan = Plan::new(vec![
            FileChange::modify("src/a.ts"),
            FileChange::delete("src/b.ts").with_content("left over"),
        ]);

        let warnings = plan.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("neither patches nor content"));
        assert!(warnings[1].contains("delete change carries"));
    }

    #[test]
    fn test_validate_accepts_well_formed_plan() {
        let plan = Plan::new(vec![
            FileChange::create("src/new.ts", "export {};\n"),
            FileChange::modify("src/old.ts").with_edit("a", "b"),
            FileChange::delete("src/gone.ts"),
        ]);

        assert!(plan.validate().is_empty());
    }
}
