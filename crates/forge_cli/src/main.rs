//! appforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Template/provisioning error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; --verbose/--quiet set the default level,
    // RUST_LOG still wins.
    let directive = if cli.quiet {
        "forge=warn"
    } else if cli.verbose {
        "forge=debug"
    } else {
        "forge=info"
    };

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Provision(args) => commands::provision::execute(args).await,
        Commands::Apply(args) => commands::apply::execute(args).await,
        Commands::Check(args) => commands::check::execute(args).await,
        Commands::Run(args) => commands::run::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            // Determine appropriate exit code based on error
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = e.to_string().to_lowercase();

    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("template") || msg.contains("provision") {
        ExitCodes::TEMPLATE_ERROR
    } else if msg.contains("argument") || msg.contains("option") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let check = |msg: &str| categorize_error(&anyhow::anyhow!(msg.to_string()));

        assert_eq!(check("Validation failed with 3 error(s)"), ExitCodes::VALIDATION_FAILURE);
        assert_eq!(check("Template directory not found: ./template"), ExitCodes::TEMPLATE_ERROR);
        assert_eq!(check("Failed to provision run directory"), ExitCodes::TEMPLATE_ERROR);
        assert_eq!(check("Run directory not found: ./apps/x"), ExitCodes::INVALID_ARGS);
        assert_eq!(check("something exploded"), ExitCodes::GENERAL_ERROR);
    }
}
