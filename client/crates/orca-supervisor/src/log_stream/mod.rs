mod client;
mod engine_io;
pub(crate) mod packet;
mod transport;

pub use client::{BENIGN_CONNECT_ERROR, LogStreamClient, message_text};
pub use engine_io::{EngineIoConnector, StreamEndpoint};
pub use transport::{ReconnectPolicy, StreamConnection, StreamConnector, StreamEvent};
