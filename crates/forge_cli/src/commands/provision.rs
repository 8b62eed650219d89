//! Provision command - Create a run directory from the template.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_provision::Provisioner;

#[derive(Args)]
pub struct ProvisionArgs {
    /// Name for the run; becomes the directory slug
    #[arg(short, long)]
    slug: String,

    /// Project template directory
    #[arg(long, env = "FORGE_TEMPLATE_DIR", default_value = "./template")]
    template_dir: PathBuf,

    /// Directory that holds run directories
    #[arg(long, env = "FORGE_RUNS_DIR", default_value = "./apps")]
    runs_dir: PathBuf,
}

pub async fn execute(args: ProvisionArgs) -> Result<()> {
    info!("Provisioning run directory for '{}'", args.slug);

    let provisioner = Provisioner::new(&args.template_dir, &args.runs_dir);
    let run = provisioner
        .provision(&args.slug)
        .context("Failed to provision run directory")?;

    println!("✅ Run directory ready!");
    println!();
    println!("Run:   {:?}", run.path);
    println!("Alias: {:?}", run.alias);
    println!();
    println!("Next steps:");
    println!("  forge apply --run {:?} --plan <plan.json>", run.path);
    println!("  forge check --run {:?}", run.path);

    Ok(())
}
