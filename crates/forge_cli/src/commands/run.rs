//! Run command - the whole pipeline: provision, apply, check.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use uuid::Uuid;

use forge_provision::{ArtifactStore, Provisioner};

use super::{apply, check};

#[derive(Args)]
pub struct RunArgs {
    /// Name for the run; generated when omitted
    #[arg(short, long)]
    slug: Option<String>,

    /// Change plan JSON file
    #[arg(short, long)]
    plan: PathBuf,

    /// Project template directory
    #[arg(long, env = "FORGE_TEMPLATE_DIR", default_value = "./template")]
    template_dir: PathBuf,

    /// Directory that holds run directories
    #[arg(long, env = "FORGE_RUNS_DIR", default_value = "./apps")]
    runs_dir: PathBuf,

    /// Directory that holds artifact stores
    #[arg(long, env = "FORGE_ARTIFACTS_DIR", default_value = "./artifacts")]
    artifacts_dir: PathBuf,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let slug = args.slug.unwrap_or_else(generated_slug);
    info!("Running pipeline for '{}'", slug);

    let provisioner = Provisioner::new(&args.template_dir, &args.runs_dir);
    let run = provisioner
        .provision(&slug)
        .context("Failed to provision run directory")?;
    let store = ArtifactStore::create(&args.artifacts_dir, &slug)
        .context("Failed to create artifact directory")?;

    let outcome = apply::apply_plan(&run.path, &args.plan, &store)?;
    info!(
        "Applied {} change(s), {} warning(s)",
        outcome.applied.len(),
        outcome.warnings.len()
    );

    let result = check::check_run(&run.path, &store).await?;

    println!();
    if result.success {
        println!("✅ App generated and validated!");
    } else {
        println!("❌ App generated but validation failed");
    }
    println!();
    println!("Run:       {:?}", run.path);
    println!("Artifacts: {:?}", store.root());

    if !result.success {
        anyhow::bail!("Validation failed with {} error(s)", result.errors.len());
    }
    Ok(())
}

/// Short unique slug for unnamed runs.
fn generated_slug() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("app-{}", &id[..8])
}
