//! Integration tests driving the recovery controller through scripted
//! runners and generators.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use forge_exec::{MockResponse, MockRunner, ServiceLine, Toolchain};
use forge_heal::{
    HotfixFix, HotfixPlan, MockHotfixGenerator, RecoveryController, RecoveryOptions, ReportWriter,
};
use forge_patch::TextEdit;
use forge_provision::ArtifactStore;

fn make_run_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"name": "demo", "scripts": {"dev": "vite", "build": "vite build"}}"#,
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    dir
}

fn with_deps(dir: &TempDir) {
    fs::create_dir_all(dir.path().join("node_modules")).unwrap();
    fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
}

fn controller(
    runner: &MockRunner,
    generator: &MockHotfixGenerator,
    artifacts: &Path,
) -> RecoveryController {
    RecoveryController::new(
        Arc::new(runner.clone()),
        Arc::new(generator.clone()),
        Toolchain::node(),
        ReportWriter::new(ArtifactStore::at(artifacts)),
    )
    .with_options(RecoveryOptions {
        settle: Duration::from_millis(10),
        ..RecoveryOptions::default()
    })
}

fn clean_service() -> Vec<ServiceLine> {
    vec![
        ServiceLine::stdout("VITE v5.0.0 ready in 300 ms"),
        ServiceLine::stdout("Local: http://localhost:5173/"),
    ]
}

fn broken_service() -> Vec<ServiceLine> {
    vec![
        ServiceLine::stdout("VITE v5.0.0 ready in 300 ms"),
        ServiceLine::stderr("TypeError: value is not defined at src/App.tsx"),
    ]
}

#[tokio::test]
async fn test_clean_run_succeeds_on_first_attempt() {
    let run = make_run_dir();
    with_deps(&run);
    let artifacts = tempfile::tempdir().unwrap();

    let runner = MockRunner::new()
        .add_response(MockResponse::success("vite build ok"))
        .add_service_script(clean_service());
    let generator = MockHotfixGenerator::new();

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(result.success);
    assert!(result.errors.is_empty());
    assert!(result.fixes.is_empty());

    // Install skipped, so the only finite command is the build.
    let runs = runner.get_method_calls("run");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].args, vec!["run", "build"]);
    assert_eq!(runner.service_kill_counts(), vec![1]);
    assert_eq!(generator.request_count(), 0);

    let report = fs::read_to_string(artifacts.path().join("test_report.md")).unwrap();
    assert!(report.contains("- Status: ✅ SUCCESS"));
    assert!(!artifacts.path().join("fixes.md").exists());
}

#[tokio::test]
async fn test_install_runs_when_dependencies_missing() {
    let run = make_run_dir();
    let artifacts = tempfile::tempdir().unwrap();

    let runner = MockRunner::new()
        .add_response(MockResponse::success("added 120 packages"))
        .add_response(MockResponse::success("vite build ok"))
        .add_service_script(clean_service());
    let generator = MockHotfixGenerator::new();

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(result.success);

    let runs = runner.get_method_calls("run");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].args, vec!["install"]);
    assert_eq!(runs[1].args, vec!["run", "build"]);
    assert!(result.logs.iter().any(|l| l.contains("added 120 packages")));
}

#[tokio::test]
async fn test_install_failure_aborts_immediately() {
    let run = make_run_dir();
    let artifacts = tempfile::tempdir().unwrap();

    let runner =
        MockRunner::new().add_response(MockResponse::failure(1, "npm ERR! code E404"));
    let generator = MockHotfixGenerator::new();

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(!result.success);
    assert!(result.errors[0].contains("Dependency install failed"));

    // No retry, no build, no dev server, no fix request.
    assert_eq!(runner.get_method_calls("run").len(), 1);
    assert_eq!(runner.spawned_services(), 0);
    assert_eq!(generator.request_count(), 0);

    let report = fs::read_to_string(artifacts.path().join("test_report.md")).unwrap();
    assert!(report.contains("- Status: ❌ FAILED"));
    assert!(report.contains("npm ERR! code E404"));
}

#[tokio::test]
async fn test_build_failure_retries_without_probing() {
    let run = make_run_dir();
    with_deps(&run);
    let artifacts = tempfile::tempdir().unwrap();

    let runner = MockRunner::new()
        .with_responses(vec![MockResponse::failure(1, "src/App.tsx(3,5): TS2304")]);
    let generator = MockHotfixGenerator::new().failing("model unavailable");

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(!result.success);
    assert!(result.fixes.is_empty());

    // Three build attempts, never a dev server.
    assert_eq!(runner.get_method_calls("run").len(), 3);
    assert_eq!(runner.spawned_services(), 0);

    // Fixing runs after the first two attempts only.
    assert_eq!(generator.request_count(), 2);
    assert_eq!(
        result.errors.iter().filter(|e| e.contains("Build failed")).count(),
        3
    );
    assert_eq!(
        result
            .errors
            .iter()
            .filter(|e| e.contains("Hotfix generation failed"))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_probe_error_is_fixed_then_succeeds() {
    let run = make_run_dir();
    with_deps(&run);
    fs::write(run.path().join("tsconfig.json"), "{}").unwrap();
    fs::write(run.path().join("src/App.tsx"), "const broken = value;\n").unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    let runner = MockRunner::new()
        .add_response(MockResponse::success("vite build ok"))
        .add_response(MockResponse::success("")) // typecheck after the fix
        .add_response(MockResponse::success("vite build ok"))
        .add_service_script(broken_service())
        .add_service_script(clean_service());
    let generator = MockHotfixGenerator::new().add_plan(HotfixPlan {
        diagnosis: "Undefined variable".to_string(),
        fixes: vec![HotfixFix {
            path: "src/App.tsx".to_string(),
            patches: vec![TextEdit::new("const broken = value;", "const broken = 0;")],
        }],
    });

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(result.success);
    assert_eq!(result.fixes, vec!["Attempt 1: Undefined variable"]);
    assert_eq!(
        fs::read_to_string(run.path().join("src/App.tsx")).unwrap(),
        "const broken = 0;\n"
    );

    // The stderr line was recorded and fed back to the generator along
    // with a sample of the file it names.
    assert!(result.errors.iter().any(|e| e.contains("TypeError")));
    let request = &generator.requests()[0];
    assert!(request.error_context.contains("TypeError: value is not defined"));
    assert!(request.affected_code.contains("=== src/App.tsx ==="));
    assert!(request.affected_code.contains("const broken = value;"));

    // Both dev servers were killed exactly once.
    assert_eq!(runner.service_kill_counts(), vec![1, 1]);

    // build, typecheck, build.
    let runs = runner.get_method_calls("run");
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[1].args, vec!["tsc", "--noEmit"]);

    let fixes_md = fs::read_to_string(artifacts.path().join("fixes.md")).unwrap();
    assert!(fixes_md.contains("## Fix 1"));
    assert!(fixes_md.contains("Undefined variable"));
}

#[tokio::test]
async fn test_attempt_budget_exhausted() {
    let run = make_run_dir();
    with_deps(&run);
    fs::write(run.path().join("src/App.tsx"), "let x = 1;\n").unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    // Builds always pass; the dev server always reports the same error.
    let runner = MockRunner::new()
        .with_responses(vec![MockResponse::success("vite build ok")])
        .add_service_script(broken_service());
    let generator = MockHotfixGenerator::new()
        .add_plan(HotfixPlan {
            diagnosis: "First try".to_string(),
            fixes: vec![HotfixFix {
                path: "src/App.tsx".to_string(),
                patches: vec![TextEdit::new("let x = 1;", "let x = 2;")],
            }],
        })
        .add_plan(HotfixPlan {
            diagnosis: "Second try".to_string(),
            fixes: vec![HotfixFix {
                path: "src/App.tsx".to_string(),
                patches: vec![TextEdit::new("let x = 2;", "let x = 3;")],
            }],
        });

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(!result.success);

    // Three probes, each killed exactly once; two fixes in between.
    assert_eq!(runner.spawned_services(), 3);
    assert_eq!(runner.service_kill_counts(), vec![1, 1, 1]);
    assert_eq!(generator.request_count(), 2);
    assert_eq!(
        result.fixes,
        vec!["Attempt 1: First try", "Attempt 2: Second try"]
    );
    assert_eq!(
        fs::read_to_string(run.path().join("src/App.tsx")).unwrap(),
        "let x = 3;\n"
    );

    // No tsconfig.json, so the fixes were not followed by typechecks.
    assert_eq!(runner.get_method_calls("run").len(), 3);

    let report = fs::read_to_string(artifacts.path().join("test_report.md")).unwrap();
    assert!(report.contains("- Status: ❌ FAILED"));
    assert!(report.contains("- Fixes Applied: 2"));
    let fixes_md = fs::read_to_string(artifacts.path().join("fixes.md")).unwrap();
    assert!(fixes_md.contains("## Fix 2"));
}

#[tokio::test]
async fn test_missing_manifest_fails_without_running_anything() {
    let run = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();

    let runner = MockRunner::new();
    let generator = MockHotfixGenerator::new();

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(!result.success);
    assert!(result.errors[0].contains("package.json not found"));
    assert!(runner.get_calls().is_empty());
    assert!(artifacts.path().join("test_report.md").exists());
}

#[tokio::test]
async fn test_unusable_plan_still_consumes_the_attempt() {
    let run = make_run_dir();
    with_deps(&run);
    let artifacts = tempfile::tempdir().unwrap();

    // The plan names a file that does not exist, so nothing is applied.
    let runner = MockRunner::new()
        .with_responses(vec![MockResponse::success("vite build ok")])
        .add_service_script(broken_service());
    let generator = MockHotfixGenerator::new().add_plan(HotfixPlan {
        diagnosis: "Phantom file".to_string(),
        fixes: vec![HotfixFix {
            path: "src/Ghost.tsx".to_string(),
            patches: vec![TextEdit::new("a", "b")],
        }],
    });

    let result = controller(&runner, &generator, artifacts.path())
        .run(run.path())
        .await;

    assert!(!result.success);
    assert!(result.fixes.is_empty());
    assert_eq!(runner.spawned_services(), 3);
    assert!(result.logs.iter().any(|l| l.contains("Fix warning:")));
}
