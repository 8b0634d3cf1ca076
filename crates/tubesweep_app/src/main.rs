mod cli;
mod commands;
mod config;
mod logging;
mod report;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info};

use crate::cli::Cli;
use crate::config::Config;
use crate::logging::LogDestination;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(
        logging::level_for(cli.debug, cli.trace),
        LogDestination::from_flag(cli.log_file.as_deref()),
    );

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Returns whether the run finished without queued failures.
fn run(cli: &Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.host.as_deref(), cli.port);
    engine_info!(
        "Using DevTools at {}:{}",
        config.devtools_host,
        config.devtools_port
    );

    // Single-threaded so the log pass prefix stays on one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    let failures = runtime.block_on(commands::run(cli, &config))?;

    report::print_failures(&failures);
    Ok(failures.is_empty())
}
