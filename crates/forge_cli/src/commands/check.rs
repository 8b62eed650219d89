//! Check command - Run the self-healing validation loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use forge_exec::{ShellRunner, Toolchain};
use forge_heal::{
    HotfixGenerator, LlmHotfixGenerator, NullHotfixGenerator, RecoveryController, ReportWriter,
    TestResult,
};
use forge_provision::ArtifactStore;

use super::apply::store_for_run;

#[derive(Args)]
pub struct CheckArgs {
    /// Run directory to validate
    #[arg(short, long)]
    run: PathBuf,

    /// Directory that holds artifact stores
    #[arg(long, env = "FORGE_ARTIFACTS_DIR", default_value = "./artifacts")]
    artifacts_dir: PathBuf,
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    if !args.run.exists() {
        anyhow::bail!("Run directory not found: {:?}", args.run);
    }

    let store = store_for_run(&args.artifacts_dir, &args.run)?;
    let result = check_run(&args.run, &store).await?;

    println!();
    if result.success {
        println!("✅ Application validated ({} fix(es) applied)", result.fixes.len());
    } else {
        println!("❌ Validation failed:");
        for error in &result.errors {
            println!("  - {}", error);
        }
    }
    println!();
    println!("Reports: {:?}", store.root());

    if !result.success {
        anyhow::bail!("Validation failed with {} error(s)", result.errors.len());
    }
    Ok(())
}

/// Run the recovery loop on an existing run directory.
///
/// The hotfix generator comes from the environment; without an API key
/// the loop still runs, it just retries without fixes.
pub(crate) async fn check_run(run_dir: &Path, store: &ArtifactStore) -> Result<TestResult> {
    let toolchain =
        Toolchain::load(run_dir).context("Failed to load toolchain for run directory")?;

    let generator: Arc<dyn HotfixGenerator> = match LlmHotfixGenerator::from_env() {
        Ok(llm) => {
            info!("Hotfix model: {}", llm.model());
            Arc::new(llm)
        }
        Err(_) => {
            warn!("No OPENAI_API_KEY or ANTHROPIC_API_KEY set; failures will retry without fixes");
            Arc::new(NullHotfixGenerator)
        }
    };

    let controller = RecoveryController::new(
        Arc::new(ShellRunner::new()),
        generator,
        toolchain,
        ReportWriter::new(store.clone()),
    );

    Ok(controller.run(run_dir).await)
}
