//! Corrective plans and the generator boundary.
//!
//! When a validation attempt fails, the controller asks a
//! [`HotfixGenerator`] for a minimal corrective plan: a diagnosis plus
//! `oldText`/`newText` patches against the files implicated by the error
//! log. The generator is a seam; the production implementation calls an
//! LLM (see [`crate::llm`]), tests script one, and a null implementation
//! degrades the loop to plain retries.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use forge_patch::{FileChange, TextEdit};

use crate::error::{HealError, HealResult};

/// What the controller hands a generator: the recent error/log tail and
/// bounded samples of the files the errors implicate.
#[derive(Debug, Clone)]
pub struct HotfixRequest {
    pub error_context: String,
    pub affected_code: String,
}

/// Patches for one file in a corrective plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotfixFix {
    pub path: String,
    pub patches: Vec<TextEdit>,
}

/// A corrective plan: diagnosis plus per-file patch lists.
///
/// This is the JSON document a generator produces. Field names follow the
/// generator contract (`oldText`/`newText` inside patches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotfixPlan {
    pub diagnosis: String,
    #[serde(default)]
    pub fixes: Vec<HotfixFix>,
}

impl HotfixPlan {
    /// Parse a plan from a raw generator response.
    ///
    /// Responses arrive wrapped in markdown fences or with trailing commas
    /// often enough that both are scrubbed before parsing. The parsed plan
    /// is validated before it is returned.
    pub fn from_json(raw: &str) -> HealResult<Self> {
        let cleaned = clean_json_response(raw);
        let plan: Self = serde_json::from_str(&cleaned)
            .map_err(|e| HealError::InvalidPlan(format!("not valid JSON: {}", e)))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reject plans whose file paths cannot be trusted.
    ///
    /// The patch engine re-checks paths at apply time; this catches a bad
    /// plan before anything touches the filesystem.
    pub fn validate(&self) -> HealResult<()> {
        for fix in &self.fixes {
            if fix.path.trim().is_empty() {
                return Err(HealError::InvalidPlan("fix with an empty path".to_string()));
            }
            if fix.path.starts_with('/') || fix.path.contains("..") {
                return Err(HealError::InvalidPlan(format!(
                    "fix path escapes the project: {}",
                    fix.path
                )));
            }
        }
        Ok(())
    }

    /// Convert the plan into modify changes for the patch engine.
    pub fn to_changes(&self) -> Vec<FileChange> {
        self.fixes
            .iter()
            .map(|fix| {
                let mut change = FileChange::modify(&fix.path);
                for patch in &fix.patches {
                    change = change.with_edit(&patch.old_text, &patch.new_text);
                }
                change
            })
            .collect()
    }

    /// Total number of individual patches across all fixes.
    pub fn patch_count(&self) -> usize {
        self.fixes.iter().map(|f| f.patches.len()).sum()
    }
}

/// Strip markdown fences and trailing commas from a model response.
fn clean_json_response(raw: &str) -> String {
    let mut cleaned = raw.trim();
    for fence in ["```json", "```"] {
        if let Some(rest) = cleaned.strip_prefix(fence) {
            cleaned = rest;
            break;
        }
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim();

    // Trailing commas before a closing bracket are the other recurring
    // way responses miss being valid JSON.
    match Regex::new(r",(\s*[\]}])") {
        Ok(re) => re.replace_all(cleaned, "$1").into_owned(),
        Err(_) => cleaned.to_string(),
    }
}

/// Produces corrective plans for failed validation attempts.
#[async_trait]
pub trait HotfixGenerator: Send + Sync {
    async fn generate(&self, request: &HotfixRequest) -> HealResult<HotfixPlan>;
}

/// Generator used when no backend is configured. Every request fails with
/// a "not configured" error, so the loop retries without fixes.
pub struct NullHotfixGenerator;

#[async_trait]
impl HotfixGenerator for NullHotfixGenerator {
    async fn generate(&self, _request: &HotfixRequest) -> HealResult<HotfixPlan> {
        Err(HealError::GeneratorNotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let plan = HotfixPlan::from_json(
            r#"{
                "diagnosis": "Missing import",
                "fixes": [
                    {
                        "path": "src/App.tsx",
                        "patches": [
                            {"oldText": "useState(", "newText": "React.useState("}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.diagnosis, "Missing import");
        assert_eq!(plan.fixes.len(), 1);
        assert_eq!(plan.fixes[0].patches[0].old_text, "useState(");
        assert_eq!(plan.patch_count(), 1);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"diagnosis\": \"x\", \"fixes\": []}\n```";
        let plan = HotfixPlan::from_json(raw).unwrap();
        assert_eq!(plan.diagnosis, "x");
        assert!(plan.fixes.is_empty());
    }

    #[test]
    fn test_parse_strips_trailing_commas() {
        let raw = r#"{"diagnosis": "y", "fixes": [{"path": "a.ts", "patches": [],}],}"#;
        let plan = HotfixPlan::from_json(raw).unwrap();
        assert_eq!(plan.fixes[0].path, "a.ts");
    }

    #[test]
    fn test_missing_fixes_defaults_empty() {
        let plan = HotfixPlan::from_json(r#"{"diagnosis": "nothing to do"}"#).unwrap();
        assert!(plan.fixes.is_empty());
    }

    #[test]
    fn test_rejects_non_json() {
        let err = HotfixPlan::from_json("Sorry, I could not determine a fix.").unwrap_err();
        assert!(err.to_string().contains("Invalid hotfix plan"));
    }

    #[test]
    fn test_rejects_escaping_paths() {
        assert!(HotfixPlan::from_json(
            r#"{"diagnosis": "d", "fixes": [{"path": "../../etc/passwd", "patches": []}]}"#
        )
        .is_err());
        assert!(HotfixPlan::from_json(
            r#"{"diagnosis": "d", "fixes": [{"path": "/abs/path.ts", "patches": []}]}"#
        )
        .is_err());
        assert!(HotfixPlan::from_json(
            r#"{"diagnosis": "d", "fixes": [{"path": "  ", "patches": []}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_to_changes_preserves_patch_order() {
        let plan = HotfixPlan {
            diagnosis: "two edits".to_string(),
            fixes: vec![HotfixFix {
                path: "src/main.tsx".to_string(),
                patches: vec![
                    TextEdit::new("first", "1st"),
                    TextEdit::new("second", "2nd"),
                ],
            }],
        };

        let changes = plan.to_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "src/main.tsx");
        assert_eq!(changes[0].patches.len(), 2);
        assert_eq!(changes[0].patches[0].new_text, "1st");
        assert_eq!(changes[0].patches[1].new_text, "2nd");
    }

    #[tokio::test]
    async fn test_null_generator_always_fails() {
        let request = HotfixRequest {
            error_context: "Error: boom".to_string(),
            affected_code: String::new(),
        };
        let err = NullHotfixGenerator.generate(&request).await.unwrap_err();
        assert!(matches!(err, HealError::GeneratorNotConfigured));
    }
}
