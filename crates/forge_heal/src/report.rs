//! Markdown reports for validation runs.
//!
//! Every run leaves a `test_report.md` in its artifact store; runs that
//! applied at least one fix also leave a `fixes.md`. Reports are for
//! humans reading the artifacts after the fact and must never fail the
//! pipeline, so the controller logs and swallows write errors.

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use forge_provision::{ArtifactStore, ProvisionResult};

use crate::controller::TestResult;

/// How many trailing log lines the test report carries.
const REPORT_LOG_LINES: usize = 50;

/// Writes run reports into an artifact store.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    store: ArtifactStore,
}

impl ReportWriter {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Write `test_report.md`: status summary, numbered errors and fixes,
    /// and the trailing log lines.
    pub fn write_test_report(&self, result: &TestResult) -> ProvisionResult<PathBuf> {
        let mut content = String::from("# Test Report\n\n");
        content.push_str(&format!("Generated: {}\n\n", Utc::now().to_rfc3339()));

        content.push_str("## Summary\n\n");
        content.push_str(&format!(
            "- Status: {}\n",
            if result.success { "✅ SUCCESS" } else { "❌ FAILED" }
        ));
        content.push_str(&format!("- Errors: {}\n", result.errors.len()));
        content.push_str(&format!("- Fixes Applied: {}\n\n", result.fixes.len()));

        if !result.errors.is_empty() {
            content.push_str("## Errors\n\n");
            for (i, error) in result.errors.iter().enumerate() {
                content.push_str(&format!("{}. {}\n", i + 1, error));
            }
            content.push('\n');
        }

        if !result.fixes.is_empty() {
            content.push_str("## Fixes Applied\n\n");
            for (i, fix) in result.fixes.iter().enumerate() {
                content.push_str(&format!("{}. {}\n", i + 1, fix));
            }
            content.push('\n');
        }

        content.push_str(&format!("## Logs (last {} lines)\n\n", REPORT_LOG_LINES));
        content.push_str("```\n");
        let skip = result.logs.len().saturating_sub(REPORT_LOG_LINES);
        for line in &result.logs[skip..] {
            content.push_str(line);
            content.push('\n');
        }
        content.push_str("```\n");

        let path = self.store.save("test_report.md", &content)?;
        info!("Test report saved to {:?}", path);
        Ok(path)
    }

    /// Write `fixes.md` when at least one fix was applied.
    pub fn write_fixes_report(&self, result: &TestResult) -> ProvisionResult<Option<PathBuf>> {
        if result.fixes.is_empty() {
            return Ok(None);
        }

        let mut content = String::from("# Applied Fixes\n\n");
        content.push_str(&format!("Generated: {}\n\n", Utc::now().to_rfc3339()));

        for (i, fix) in result.fixes.iter().enumerate() {
            content.push_str(&format!("## Fix {}\n\n{}\n\n", i + 1, fix));
        }

        let path = self.store.save("fixes.md", &content)?;
        info!("Fixes report saved to {:?}", path);
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn result(success: bool) -> TestResult {
        TestResult {
            success,
            logs: vec!["line one".to_string(), "line two".to_string()],
            errors: Vec::new(),
            fixes: Vec::new(),
        }
    }

    #[test]
    fn test_report_summarizes_success() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(ArtifactStore::at(dir.path()));

        let path = writer.write_test_report(&result(true)).unwrap();
        let report = fs::read_to_string(path).unwrap();

        assert!(report.starts_with("# Test Report\n"));
        assert!(report.contains("- Status: ✅ SUCCESS"));
        assert!(report.contains("- Errors: 0"));
        assert!(report.contains("line one\nline two"));
        assert!(!report.contains("## Errors"));
    }

    #[test]
    fn test_report_numbers_errors_and_fixes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(ArtifactStore::at(dir.path()));

        let mut failed = result(false);
        failed.errors = vec!["Build failed: exited with code 1".to_string()];
        failed.fixes = vec!["Attempt 1: Missing import".to_string()];

        let report = fs::read_to_string(writer.write_test_report(&failed).unwrap()).unwrap();

        assert!(report.contains("- Status: ❌ FAILED"));
        assert!(report.contains("## Errors\n\n1. Build failed: exited with code 1\n"));
        assert!(report.contains("## Fixes Applied\n\n1. Attempt 1: Missing import\n"));
    }

    #[test]
    fn test_report_truncates_to_log_tail() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(ArtifactStore::at(dir.path()));

        let mut long = result(true);
        long.logs = (0..120).map(|i| format!("log {}", i)).collect();

        let report = fs::read_to_string(writer.write_test_report(&long).unwrap()).unwrap();

        assert!(!report.contains("log 69\n"));
        assert!(report.contains("log 70\n"));
        assert!(report.contains("log 119\n"));
    }

    #[test]
    fn test_fixes_report_skipped_without_fixes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(ArtifactStore::at(dir.path()));

        assert!(writer.write_fixes_report(&result(true)).unwrap().is_none());
        assert!(!dir.path().join("fixes.md").exists());
    }

    #[test]
    fn test_fixes_report_one_section_per_fix() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(ArtifactStore::at(dir.path()));

        let mut fixed = result(true);
        fixed.fixes = vec![
            "Attempt 1: Missing import".to_string(),
            "Attempt 2: Undefined variable".to_string(),
        ];

        let path = writer.write_fixes_report(&fixed).unwrap().unwrap();
        let report = fs::read_to_string(path).unwrap();

        assert!(report.starts_with("# Applied Fixes\n"));
        assert!(report.contains("## Fix 1\n\nAttempt 1: Missing import\n"));
        assert!(report.contains("## Fix 2\n\nAttempt 2: Undefined variable\n"));
    }
}
