//! Cooperative shutdown: ask the server to stop and wait briefly for it to say so.

use crate::race::{Race, first_of};
use crate::{LogSink, Notice, Notifier, ProcessLauncher, Result};

use std::sync::Arc;
use std::time::Duration;

use orca_config::ShutdownConfig;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const SHUTDOWN_PATH: &str = "/shutdown";

/// Result of [`ShutdownCoordinator::request_shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// No owned process, nothing was sent
    NotRunning,
    /// The server logged the confirmation marker in time
    Confirmed,
    /// Request accepted but no confirmation arrived before the deadline
    Unconfirmed,
    /// The request itself could not be delivered
    RequestFailed,
}

pub struct ShutdownCoordinator {
    client: reqwest::Client,
    url: String,
    launcher: Arc<ProcessLauncher>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
    request_timeout: Duration,
    confirmation_timeout: Duration,
    confirmation_marker: String,
}

impl ShutdownCoordinator {
    pub fn new(
        base_url: &str,
        config: &ShutdownConfig,
        launcher: Arc<ProcessLauncher>,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), SHUTDOWN_PATH),
            launcher,
            sink,
            notifier,
            request_timeout: config.request_timeout(),
            confirmation_timeout: config.confirmation_timeout(),
            confirmation_marker: config.confirmation_marker.clone(),
        })
    }

    /// Ask the owned server to shut down.
    ///
    /// Bounded by the request timeout plus the confirmation timeout. A request
    /// that times out counts as failed. The process handle is released, not
    /// signalled.
    pub async fn request_shutdown(&self) -> ShutdownOutcome {
        if !self.launcher.is_owned().await {
            self.notifier
                .notify(Notice::warning("Orca server is not running."));
            return ShutdownOutcome::NotRunning;
        }

        // Subscribe first so a fast confirmation is not missed
        let orca_logs = self.sink.subscribe_orca();

        if let Err(e) = self.send_request().await {
            self.sink
                .extension_log(&format!("Failed to stop Orca server: {e}"));
            self.notifier
                .notify(Notice::error("Failed to stop Orca server"));
            return ShutdownOutcome::RequestFailed;
        }

        let confirmation = wait_for_marker(orca_logs, self.confirmation_marker.clone());
        let outcome = match first_of(self.confirmation_timeout, confirmation).await {
            Race::Event(true) => ShutdownOutcome::Confirmed,
            Race::Event(false) | Race::TimedOut => {
                self.sink.extension_log(&format!(
                    "No shutdown confirmation from Orca within {}ms",
                    self.confirmation_timeout.as_millis()
                ));
                ShutdownOutcome::Unconfirmed
            }
        };

        self.launcher.release().await;
        self.notifier.notify(Notice::info("Orca server stopped."));

        outcome
    }

    async fn send_request(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        self.sink
            .extension_log(&format!("Orca server shutdown: {}", status.as_u16()));
        if !status.is_success() {
            self.sink
                .extension_log(&format!("HTTP error, status: {}", status.as_u16()));
        }

        // The body is informational only
        if let Ok(body) = response.json::<Value>().await
            && let Some(message) = body.get("message").and_then(Value::as_str)
        {
            self.sink.extension_log(message);
        }

        Ok(())
    }
}

/// Resolves `true` on the first line containing `marker`, `false` if the channel closes.
async fn wait_for_marker(mut lines: broadcast::Receiver<String>, marker: String) -> bool {
    loop {
        match lines.recv().await {
            Ok(line) if line.contains(&marker) => return true,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return false,
        }
    }
}
