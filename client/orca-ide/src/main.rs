//! orca-ide - Orca server supervisor CLI
//!
//! Runs a local Orca lab-automation server on behalf of an editor session
//! and exposes the server's REST queries from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Launch the server and keep it alive until Ctrl+C
//! orca-ide run --load ./workcell.yml
//!
//! # Query a running server
//! orca-ide workflows --pretty
//! orca-ide inputs "plate prep"
//! ```

mod api_commands;
mod cli;
mod commands;
mod console;
mod logging;
mod supervise;


use crate::{cli::Cli, commands::Commands};

use orca_api::OrcaClient;
use orca_config::Config;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(url) = cli.server {
        config.server.base_url = url;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    match logging::setup_logging(&config) {
        Ok(logs_dir) => info!(
            "Logging to {}",
            logging::current_log_path(&logs_dir).display()
        ),
        Err(e) => eprintln!("Logging disabled: {e}"),
    }

    config.log_summary();

    if let Commands::Run { load } = cli.command {
        return supervise::run(&config, load).await;
    }

    let client = OrcaClient::new(config.server.base_url());

    match api_commands::execute(&client, cli.command).await {
        Ok(value) => {
            let output = if cli.pretty {
                serde_json::to_string_pretty(&value)
            } else {
                serde_json::to_string(&value)
            };

            match output {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error serializing response: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
