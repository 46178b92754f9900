//! The `run` command: own the server for the lifetime of this process.

use crate::console::ConsoleNotifier;

use orca_api::OrcaClient;
use orca_config::Config;
use orca_supervisor::{
    LaunchOutcome, LogSink, LoggingChannels, Notifier, ServerSupervisor, ShutdownOutcome,
};

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

pub(crate) async fn run(config: &Config, load: Option<String>) -> ExitCode {
    let sink: Arc<dyn LogSink> = Arc::new(LoggingChannels::new());
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let supervisor = match ServerSupervisor::from_config(config, sink, notifier) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            error!("Failed to build supervisor: {e}");
            eprintln!("Error: {e}");
            eprintln!("{}", e.recovery_hint());
            return ExitCode::FAILURE;
        }
    };

    let outcome = match supervisor.start().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to start Orca server: {e}");
            eprintln!("Error: {e}");
            eprintln!("{}", e.recovery_hint());
            return ExitCode::FAILURE;
        }
    };

    if let LaunchOutcome::Spawned { pid } = outcome {
        info!("Spawned Orca server (pid {pid:?})");
    }

    let mut connectivity = supervisor.subscribe();

    if !supervisor.wait_until_ready().await {
        eprintln!("Orca server did not become reachable at {}", config.server.base_url());
        if supervisor.owns_process().await {
            supervisor.terminate().await;
        }
        return ExitCode::FAILURE;
    }

    println!("Orca server ready at {}", config.server.base_url());

    if let Some(config_file) = load {
        let client = OrcaClient::new(config.server.base_url());
        if let Err(e) = client.load_config(&config_file).await {
            eprintln!("Error loading {config_file}: {e}");
        }
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl+C: {e}");
                }
                break;
            }
            change = connectivity.recv() => match change {
                Ok(true) => println!("Orca server reachable"),
                Ok(false) => println!("Orca server unreachable"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {skipped} connectivity change(s)");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    stop(&supervisor).await
}

/// Cooperative shutdown, falling back to signalling the owned process.
async fn stop(supervisor: &ServerSupervisor) -> ExitCode {
    match supervisor.stop().await {
        ShutdownOutcome::NotRunning | ShutdownOutcome::Confirmed => ExitCode::SUCCESS,
        ShutdownOutcome::Unconfirmed => {
            warn!("Shutdown was not confirmed by the server");
            ExitCode::SUCCESS
        }
        ShutdownOutcome::RequestFailed => {
            if supervisor.terminate().await {
                info!("Terminated Orca server after failed shutdown request");
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
