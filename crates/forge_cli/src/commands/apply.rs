//! Apply command - Apply a change plan to a run directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_patch::{ApplyOutcome, PatchEngine, Plan};
use forge_provision::{render_tree, ArtifactStore};

#[derive(Args)]
pub struct ApplyArgs {
    /// Run directory to patch
    #[arg(short, long)]
    run: PathBuf,

    /// Change plan JSON file
    #[arg(short, long)]
    plan: PathBuf,

    /// Directory that holds artifact stores
    #[arg(long, env = "FORGE_ARTIFACTS_DIR", default_value = "./artifacts")]
    artifacts_dir: PathBuf,
}

pub async fn execute(args: ApplyArgs) -> Result<()> {
    if !args.run.exists() {
        anyhow::bail!("Run directory not found: {:?}", args.run);
    }

    let store = store_for_run(&args.artifacts_dir, &args.run)?;
    let outcome = apply_plan(&args.run, &args.plan, &store)?;

    if outcome.is_clean() {
        println!("✅ Applied {} change(s)", outcome.applied.len());
    } else {
        println!(
            "⚠️  Applied {} change(s) with {} warning(s)",
            outcome.applied.len(),
            outcome.warnings.len()
        );
    }
    println!();
    println!("Artifacts: {:?}", store.root());

    Ok(())
}

/// Parse, validate, and apply a plan file, saving the plan and the
/// resulting source tree as artifacts.
pub(crate) fn apply_plan(
    run_dir: &Path,
    plan_file: &Path,
    store: &ArtifactStore,
) -> Result<ApplyOutcome> {
    let raw = fs::read_to_string(plan_file)
        .with_context(|| format!("Failed to read change plan {:?}", plan_file))?;
    let plan = Plan::from_json(&raw).context("Failed to parse change plan")?;

    for warning in plan.validate() {
        println!("⚠️  Plan warning: {}", warning);
    }

    info!("Applying {} file change(s)...", plan.files.len());
    let engine = PatchEngine::new(run_dir);
    let outcome = engine
        .apply(&plan.files)
        .context("Failed to apply change plan")?;

    store.save_json("change_plan.json", &plan)?;
    let tree = render_tree(run_dir)?;
    store.save("code_tree.md", &tree)?;

    Ok(outcome)
}

/// Artifact store for an already-provisioned run, keyed by its
/// directory name so repeated commands land in the same place.
pub(crate) fn store_for_run(artifacts_dir: &Path, run_dir: &Path) -> Result<ArtifactStore> {
    let name = run_dir
        .file_name()
        .context("Run path has no directory name")?
        .to_string_lossy();
    Ok(ArtifactStore::at(artifacts_dir.join(name.as_ref())))
}
