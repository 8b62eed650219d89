//! The recovery controller: install, build, probe, fix, retry.
//!
//! One controller owns one run directory for the lifetime of a
//! validation run. Each attempt installs dependencies (or reuses them),
//! builds the project as a smoke test, then boots the dev server and
//! reads its output for a settle window. Failures feed a hotfix
//! generator whose patches are applied before the next attempt. The
//! loop is bounded: after [`RecoveryOptions::max_attempts`] cycles the
//! run is declared failed with its full diagnostic history.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use forge_exec::{CommandOutput, LineSource, ProcessRunner, Toolchain};
use forge_patch::PatchEngine;

use crate::classifier;
use crate::hotfix::{HotfixGenerator, HotfixRequest};
use crate::report::ReportWriter;

/// Everything a validation run produced.
///
/// `logs` carries the output of every command and the dev server's
/// chatter; `errors` the failure records; `fixes` one entry per applied
/// corrective plan. Returned complete on every path, including fatal
/// ones.
#[derive(Debug, Clone, Default)]
pub struct TestResult {
    pub success: bool,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub fixes: Vec<String>,
}

impl TestResult {
    fn record_error(&mut self, message: String) {
        error!("{}", message);
        self.errors.push(message);
    }
}

/// Where the validation loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealState {
    Provisioning,
    Installing,
    Building,
    Probing,
    Fixing,
    Success,
    Failed,
}

/// Attempt budget and sampling windows for the loop.
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// Full install/build/probe cycles before giving up.
    pub max_attempts: u32,
    /// How long the dev server gets before its output is inspected.
    pub settle: Duration,
    /// Log lines included in a hotfix request.
    pub log_tail: usize,
    /// Error records included in a hotfix request.
    pub error_tail: usize,
    /// File paths extracted from error text for a hotfix request.
    pub max_affected_files: usize,
    /// Characters sampled per affected file.
    pub affected_file_chars: usize,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            settle: Duration::from_secs(4),
            log_tail: 50,
            error_tail: 10,
            max_affected_files: 3,
            affected_file_chars: 1000,
        }
    }
}

/// Runs the validation loop against one run directory.
pub struct RecoveryController {
    runner: Arc<dyn ProcessRunner>,
    generator: Arc<dyn HotfixGenerator>,
    toolchain: Toolchain,
    reports: ReportWriter,
    options: RecoveryOptions,
}

impl RecoveryController {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        generator: Arc<dyn HotfixGenerator>,
        toolchain: Toolchain,
        reports: ReportWriter,
    ) -> Self {
        Self {
            runner,
            generator,
            toolchain,
            reports,
            options: RecoveryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RecoveryOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the loop to completion.
    ///
    /// Always returns a complete [`TestResult`] and persists reports,
    /// whatever happened; failures along the way become entries in the
    /// result rather than early returns.
    pub async fn run(&self, run_dir: &Path) -> TestResult {
        let run_id = Uuid::new_v4();
        info!("Starting validation run {} for {:?}", run_id, run_dir);

        let mut result = TestResult::default();
        let mut state = HealState::Provisioning;
        let mut attempt: u32 = 0;

        loop {
            debug!("State: {:?} (attempt {})", state, attempt);

            match state {
                HealState::Provisioning => {
                    state = if self.check_provisioned(run_dir, &mut result) {
                        HealState::Installing
                    } else {
                        HealState::Failed
                    };
                }
                HealState::Installing => {
                    attempt += 1;
                    info!("Test attempt {}/{}", attempt, self.options.max_attempts);
                    state = if self.install(run_dir, &mut result).await {
                        HealState::Building
                    } else {
                        // A broken dependency set is not patchable.
                        HealState::Failed
                    };
                }
                HealState::Building => {
                    state = if self.build(run_dir, &mut result).await {
                        HealState::Probing
                    } else {
                        HealState::Fixing
                    };
                }
                HealState::Probing => {
                    state = if self.probe(run_dir, &mut result).await {
                        HealState::Success
                    } else {
                        HealState::Fixing
                    };
                }
                HealState::Fixing => {
                    if attempt >= self.options.max_attempts {
                        state = HealState::Failed;
                        continue;
                    }
                    self.fix(run_dir, &mut result, attempt).await;
                    state = HealState::Installing;
                }
                HealState::Success => {
                    result.success = true;
                    info!("Application validated successfully");
                    break;
                }
                HealState::Failed => {
                    error!(
                        "Validation failed after {} attempt(s) with {} error(s)",
                        attempt,
                        result.errors.len()
                    );
                    break;
                }
            }
        }

        self.write_reports(&result);
        result
    }

    /// The run directory and its toolchain manifest must be in place.
    fn check_provisioned(&self, run_dir: &Path, result: &mut TestResult) -> bool {
        if !run_dir.exists() {
            result.record_error(format!("Run directory not found: {}", run_dir.display()));
            return false;
        }
        if !self.toolchain.has_manifest(run_dir) {
            result.record_error(format!(
                "{} not found in {}",
                self.toolchain.manifest_file,
                run_dir.display()
            ));
            return false;
        }
        true
    }

    /// Install dependencies, or reuse a previous install. Returns false
    /// on failure, which is fatal for the run.
    async fn install(&self, run_dir: &Path, result: &mut TestResult) -> bool {
        if self.toolchain.dependencies_present(run_dir) {
            info!(
                "Reusing existing {} (skipping install)",
                self.toolchain.dependency_dir
            );
            return true;
        }

        info!("Installing dependencies...");
        let spec = self.toolchain.install_spec(run_dir);
        match self.runner.run(&spec).await {
            Ok(output) => {
                result.logs.push(format!("=== {} output ===", spec.display_line()));
                push_output(&mut result.logs, &output);
                if output.success() {
                    true
                } else {
                    result.record_error(format!(
                        "Dependency install failed: {}",
                        output.failure_reason()
                    ));
                    false
                }
            }
            Err(e) => {
                result.record_error(format!("Dependency install failed: {}", e));
                false
            }
        }
    }

    /// Full production build as a smoke test.
    async fn build(&self, run_dir: &Path, result: &mut TestResult) -> bool {
        info!("Running build...");
        let spec = self.toolchain.build_spec(run_dir);
        match self.runner.run(&spec).await {
            Ok(output) => {
                result.logs.push(format!("=== {} output ===", spec.display_line()));
                push_output(&mut result.logs, &output);
                if output.success() {
                    true
                } else {
                    result.record_error(format!("Build failed: {}", output.failure_reason()));
                    false
                }
            }
            Err(e) => {
                result.record_error(format!("Build failed: {}", e));
                false
            }
        }
    }

    /// Boot the dev server, let it settle, read what it printed.
    ///
    /// The handle is killed on every path before this returns; dropping
    /// the handle is only the backstop.
    async fn probe(&self, run_dir: &Path, result: &mut TestResult) -> bool {
        info!("Starting dev server...");
        let spec = self.toolchain.dev_spec(run_dir);
        let mut service = match self.runner.spawn_service(&spec).await {
            Ok(service) => service,
            Err(e) => {
                result.record_error(format!("Dev server failed: {}", e));
                return false;
            }
        };

        tokio::time::sleep(self.options.settle).await;

        let lines = service.read_available();
        service.kill();

        let mut drained = Vec::with_capacity(lines.len());
        for line in lines {
            if line.source == LineSource::Stdout
                && (line.text.contains("Local:") || line.text.contains("ready"))
            {
                info!("Dev server started");
            }
            if line.source == LineSource::Stderr && classifier::line_is_error(&line.text) {
                result.errors.push(line.text.clone());
            }
            drained.push(line.text);
        }

        let clean = !classifier::has_errors(&drained);
        result.logs.extend(drained);
        clean
    }

    /// Ask the generator for a corrective plan and apply it.
    ///
    /// Nothing here aborts the run: a generator error or an unusable
    /// plan just means this attempt retries unfixed.
    async fn fix(&self, run_dir: &Path, result: &mut TestResult, attempt: u32) {
        warn!("Errors detected, requesting hotfix...");

        let request = self.build_request(run_dir, result);
        let plan = match self.generator.generate(&request).await {
            Ok(plan) => plan,
            Err(e) => {
                result.record_error(format!("Hotfix generation failed: {}", e));
                return;
            }
        };

        info!(
            "Applying {} fix(es) ({} patches): {}",
            plan.fixes.len(),
            plan.patch_count(),
            plan.diagnosis
        );

        let engine = PatchEngine::new(run_dir);
        match engine.apply(&plan.to_changes()) {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    result.logs.push(format!("Fix warning: {}", warning));
                }
                if outcome.applied.is_empty() {
                    info!("Hotfix plan changed nothing");
                    return;
                }
                result.fixes.push(format!("Attempt {}: {}", attempt, plan.diagnosis));
                self.typecheck(run_dir, result).await;
            }
            Err(e) => {
                result.record_error(format!("Failed to apply hotfix: {}", e));
            }
        }
    }

    /// Post-fix typecheck. A confidence signal only; failure is
    /// recorded but never fails the attempt.
    async fn typecheck(&self, run_dir: &Path, result: &mut TestResult) {
        if !self.toolchain.typecheck_ready(run_dir) {
            return;
        }
        let Some(spec) = self.toolchain.typecheck_spec(run_dir) else {
            return;
        };

        info!("Running typecheck to validate fixes...");
        match self.runner.run(&spec).await {
            Ok(output) => {
                push_output(&mut result.logs, &output);
                if !output.success() {
                    warn!("Typecheck failed after hotfix");
                    result
                        .errors
                        .push(format!("Typecheck failed: {}", output.failure_reason()));
                }
            }
            Err(e) => {
                result.errors.push(format!("Typecheck failed: {}", e));
            }
        }
    }

    /// Assemble the context a generator sees: recent errors and logs,
    /// plus bounded samples of the files the error text names.
    fn build_request(&self, run_dir: &Path, result: &TestResult) -> HotfixRequest {
        let error_context = format!(
            "{}\n{}",
            tail_join(&result.errors, self.options.error_tail),
            tail_join(&result.logs, self.options.log_tail)
        );

        let mut affected_code = String::new();
        for file in affected_files(&error_context, self.options.max_affected_files) {
            let path = run_dir.join(&file);
            if let Ok(content) = fs::read_to_string(&path) {
                let sample: String = content.chars().take(self.options.affected_file_chars).collect();
                affected_code.push_str(&format!("\n=== {} ===\n{}", file, sample));
            }
        }

        HotfixRequest {
            error_context,
            affected_code,
        }
    }

    fn write_reports(&self, result: &TestResult) {
        if let Err(e) = self.reports.write_test_report(result) {
            warn!("Could not write test report: {}", e);
        }
        if let Err(e) = self.reports.write_fixes_report(result) {
            warn!("Could not write fixes report: {}", e);
        }
    }
}

fn push_output(logs: &mut Vec<String>, output: &CommandOutput) {
    if !output.stdout.is_empty() {
        logs.push(output.stdout.clone());
    }
    if !output.stderr.is_empty() {
        logs.push(output.stderr.clone());
    }
}

fn tail_join(lines: &[String], count: usize) -> String {
    let skip = lines.len().saturating_sub(count);
    lines[skip..].join("\n")
}

/// Source file paths mentioned in error text, deduplicated in order of
/// first mention.
///
/// Leading slashes are stripped so an absolute path from a stack trace
/// stays relative when joined onto the run directory; a candidate with a
/// parent component is dropped rather than resolved.
fn affected_files(text: &str, limit: usize) -> Vec<String> {
    let Ok(re) = Regex::new(r"[A-Za-z0-9_\-/.]+\.(?:tsx?|jsx?)") else {
        return Vec::new();
    };

    let mut files: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let candidate = m.as_str().trim_start_matches('/');
        if candidate.contains("..") {
            continue;
        }
        if !files.iter().any(|f| f == candidate) {
            files.push(candidate.to_string());
            if files.len() == limit {
                break;
            }
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RecoveryOptions::default();
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.settle, Duration::from_secs(4));
        assert_eq!(options.log_tail, 50);
        assert_eq!(options.error_tail, 10);
        assert_eq!(options.max_affected_files, 3);
        assert_eq!(options.affected_file_chars, 1000);
    }

    #[test]
    fn test_affected_files_extraction() {
        let text = "Error in src/App.tsx: cannot resolve ./components/Button.jsx\n\
                    at src/App.tsx line 3\n\
                    also see lib/util.ts and a.js";

        let files = affected_files(text, 3);
        assert_eq!(
            files,
            vec!["src/App.tsx", "./components/Button.jsx", "lib/util.ts"]
        );

        assert_eq!(affected_files(text, 10).len(), 4);
        assert!(affected_files("no paths here", 3).is_empty());
    }

    #[test]
    fn test_affected_files_skips_other_extensions() {
        let files = affected_files("see README.md, style.css and src/main.tsx", 3);
        assert_eq!(files, vec!["src/main.tsx"]);
    }

    #[test]
    fn test_affected_files_handles_absolute_and_escaping_paths() {
        let files = affected_files(
            "failed to load /srv/app/vite.config.ts, fallback ../shared/Legacy.jsx",
            5,
        );
        assert_eq!(files, vec!["srv/app/vite.config.ts"]);
    }

    #[test]
    fn test_tail_join() {
        let lines: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
        assert_eq!(tail_join(&lines, 2), "4\n5");
        assert_eq!(tail_join(&lines, 10), "1\n2\n3\n4\n5");
        assert_eq!(tail_join(&[], 3), "");
    }
}
