use clap::Parser;
use spice::cli::{execute, Cli};
use spice_core::config::LogLevel;
use spice_core::error::OrchestratorError;
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    // SPICE_PASS may live in .env
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    let file = cli.file_config();
    let level = cli.log_level(file.as_ref().ok());
    tracing_subscriber::fmt()
        .with_max_level(level.tracing_filter())
        .init();
    info!(log_level = %level, "CLI application startup: tracing initialised, environment loaded");

    match file.and_then(|file| execute(&cli, &file)) {
        Ok(_) => {
            info!("CLI completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_failure(&e, level);
            ExitCode::FAILURE
        }
    }
}

fn report_failure(e: &anyhow::Error, level: LogLevel) {
    error!(error = %e, "CLI exited with error");
    if level.shows_debug_detail() {
        debug!(error = ?e, "Error detail");
    }
    if e
        .downcast_ref::<OrchestratorError>()
        .is_some_and(OrchestratorError::is_validation)
    {
        error!("Run 'spice --help' for usage.");
    }
}
