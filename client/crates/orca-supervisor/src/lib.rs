//! Client-side supervision of an Orca orchestration server.
//!
//! [`ServerSupervisor`] ties together process launching, readiness polling,
//! the server's log stream and cooperative shutdown. Every collaborator is
//! injected, so tests can swap the HTTP probe and stream transport for
//! in-memory doubles.

mod connectivity;
mod error;
mod health;
mod launcher;
mod log_sink;
mod log_stream;
mod notice;
mod race;
mod shutdown;
mod stream_reader;
mod supervisor;

pub use connectivity::Connectivity;
pub use error::{Result, SupervisorError};
pub use health::{HealthPoller, HttpProbe, ReachabilityProbe, RetryBudget};
pub use launcher::{DEFAULT_TERMINATION_GRACE, LaunchOutcome, ProcessLauncher, ServerHandle};
pub use log_sink::{LogSink, LoggingChannels};
pub use log_stream::{
    BENIGN_CONNECT_ERROR, EngineIoConnector, LogStreamClient, ReconnectPolicy, StreamConnection,
    StreamConnector, StreamEndpoint, StreamEvent, message_text,
};
pub use notice::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use race::{Race, first_of};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome};
pub use supervisor::{ServerSupervisor, SupervisorParts};

#[cfg(test)]
mod tests;
