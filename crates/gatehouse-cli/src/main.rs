//! Gatehouse operator CLI.
//!
//! Manages the user directory snapshot from the command line:
//! - `gatehouse add|update|remove` - Maintain users
//! - `gatehouse list|show` - Inspect users (safe projections only)
//! - `gatehouse login` - Check a credential pair
//! - `gatehouse verify` - Resolve a card UID as a reader would
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `gatehouse=info`).

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "gatehouse=info";

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    match cli::run(args).await {
        Ok(report) => {
            match serde_json::to_string_pretty(&report.output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    error!("Failed to render output: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            let status = cli::exit_status(&e);
            if status == 1 {
                error!("{:#}", e);
            }
            eprintln!("Error: {}", cli::error_message(&e));
            ExitCode::from(status)
        }
    }
}
