use std::sync::Arc;
use std::time::Duration;

use orca_config::LogStreamConfig;
use serde_json::Value;
use tokio::sync::mpsc;

/// Lifecycle and payload events delivered by a stream connection.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Message(Value),
    /// Terminal: the connection will not reconnect on its own after this.
    Disconnected(String),
    ConnectError(String),
}

/// Reconnection behaviour handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(2000),
            timeout: Duration::from_millis(10_000),
        }
    }
}

impl From<&LogStreamConfig> for ReconnectPolicy {
    fn from(config: &LogStreamConfig) -> Self {
        Self {
            attempts: config.reconnection_attempts,
            delay: config.reconnection_delay(),
            timeout: config.connect_timeout(),
        }
    }
}

/// One auto-reconnecting connection to the log stream.
///
/// A connection that has emitted `Disconnected` is finished and cannot be
/// started again.
pub trait StreamConnection: Send + Sync {
    /// Begin connecting. Returns immediately; progress arrives as events.
    ///
    /// Returns `false` when the connection is already finished.
    fn connect(&self) -> bool;

    /// Close the connection. A `Disconnected` event follows.
    fn disconnect(&self);

    fn set_reconnect(&self, enabled: bool);

    fn is_connected(&self) -> bool;
}

/// Creates connections together with the receiving end of their event channel.
pub trait StreamConnector: Send + Sync {
    fn create(
        &self,
        endpoint: &str,
        policy: ReconnectPolicy,
    ) -> (Arc<dyn StreamConnection>, mpsc::UnboundedReceiver<StreamEvent>);
}
