//! CLI command definitions.
//!
//! Each subcommand maps to one stage of the pipeline; `run` chains them
//! all for the common case.

use clap::{Parser, Subcommand};

pub mod apply;
pub mod check;
pub mod provision;
pub mod run;

/// appforge - self-healing application assembly pipeline
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "appforge - self-healing application assembly pipeline")]
#[command(long_about = r#"
appforge provisions disposable run directories from a project template,
applies machine-proposed change plans to them, and validates the result
with a self-healing install/build/probe loop.

WORKFLOWS:
  provision  → Create a run directory from the project template
  apply      → Apply a change plan JSON to a run directory
  check      → Run the install/build/probe validation loop with auto-fix
  run        → provision + apply + check in one pipeline

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Template/provisioning error

For more information, visit: https://github.com/appforge-dev/appforge
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a run directory from the project template
    Provision(provision::ProvisionArgs),

    /// Apply a change plan to a run directory
    Apply(apply::ApplyArgs),

    /// Validate a run directory with the self-healing loop
    Check(check::CheckArgs),

    /// Provision, apply a plan, and validate in one go
    Run(run::RunArgs),
}
