//! Categorized log channels.

use tokio::sync::broadcast;
use tracing::info;

const ORCA_LOG_CAPACITY: usize = 256;

/// Destination for the three log categories the supervisor produces.
pub trait LogSink: Send + Sync {
    /// Raw stdout/stderr lines of a spawned server
    fn server_log(&self, line: &str);

    /// Supervisor status lines
    fn extension_log(&self, line: &str);

    /// Lines received over the server's log stream
    fn orca_log(&self, line: &str);

    /// Listen to future `orca_log` lines.
    fn subscribe_orca(&self) -> broadcast::Receiver<String>;
}

/// Writes each category under its own tracing target and fans orca lines out to listeners.
pub struct LoggingChannels {
    orca_tx: broadcast::Sender<String>,
}

impl LoggingChannels {
    pub fn new() -> Self {
        let (orca_tx, _) = broadcast::channel(ORCA_LOG_CAPACITY);
        Self { orca_tx }
    }
}

impl Default for LoggingChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for LoggingChannels {
    fn server_log(&self, line: &str) {
        info!(target: "orca::server", "{line}");
    }

    fn extension_log(&self, line: &str) {
        info!(target: "orca::extension", "{line}");
    }

    fn orca_log(&self, line: &str) {
        info!(target: "orca::logs", "{line}");
        // No listeners is fine
        let _ = self.orca_tx.send(line.to_string());
    }

    fn subscribe_orca(&self) -> broadcast::Receiver<String> {
        self.orca_tx.subscribe()
    }
}
