use crate::log_stream::{ReconnectPolicy, StreamConnection, StreamConnector, StreamEvent};
use crate::{LogSink, Notice, Notifier};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Connect errors containing this text are expected while the server boots.
pub const BENIGN_CONNECT_ERROR: &str = "xhr poll error";

const CONNECTED_MESSAGE: &str = "Connected to Orca logs";
const CONNECTING_MESSAGE: &str = "Connecting to Orca logs...";
const DISCONNECTED_MESSAGE: &str = "Disconnected from Orca logs";

struct ActiveConnection {
    id: u64,
    connection: Arc<dyn StreamConnection>,
    closing: Arc<AtomicBool>,
}

/// Keeps the server's log stream open and routes its events.
///
/// Each underlying connection gets its own event pump, so handlers from a
/// torn-down connection can never act on its replacement.
pub struct LogStreamClient {
    endpoint: String,
    policy: ReconnectPolicy,
    connector: Arc<dyn StreamConnector>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
    current: Arc<Mutex<Option<ActiveConnection>>>,
    next_id: AtomicU64,
}

impl LogStreamClient {
    pub fn new(
        endpoint: impl Into<String>,
        policy: ReconnectPolicy,
        connector: Arc<dyn StreamConnector>,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            policy,
            connector,
            sink,
            notifier,
            current: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Open the stream, reusing a connection that is still being established.
    ///
    /// A connection that has already finished is replaced. Its pump still
    /// reports the disconnect but leaves the replacement alone.
    pub async fn connect(&self) {
        let mut current = self.current.lock().await;

        if let Some(active) = current.as_ref() {
            if active.connection.is_connected() || active.connection.connect() {
                return;
            }
            debug!("Log stream connection {} already finished, replacing it", active.id);
        }

        let (connection, events) = self.connector.create(&self.endpoint, self.policy);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let closing = Arc::new(AtomicBool::new(false));

        tokio::spawn(pump_events(
            EventPump {
                id,
                connection: connection.clone(),
                closing: closing.clone(),
                current: self.current.clone(),
                sink: self.sink.clone(),
                notifier: self.notifier.clone(),
            },
            events,
        ));

        self.sink
            .extension_log(&format!("Connecting to Orca logs at {}", self.endpoint));
        connection.connect();

        *current = Some(ActiveConnection {
            id,
            connection,
            closing,
        });
    }

    /// Close the stream on purpose. No warning notice is raised for it.
    pub async fn disconnect(&self) {
        let active = self.current.lock().await.take();

        if let Some(active) = active {
            active.closing.store(true, Ordering::SeqCst);
            active.connection.set_reconnect(false);
            active.connection.disconnect();
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| active.connection.is_connected())
    }
}

struct EventPump {
    id: u64,
    connection: Arc<dyn StreamConnection>,
    closing: Arc<AtomicBool>,
    current: Arc<Mutex<Option<ActiveConnection>>>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
}

async fn pump_events(pump: EventPump, mut events: mpsc::UnboundedReceiver<StreamEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Connected => {
                pump.sink.extension_log(CONNECTED_MESSAGE);
                pump.notifier.notify(Notice::info(CONNECTED_MESSAGE));
            }
            StreamEvent::Message(payload) => {
                pump.sink.orca_log(&message_text(&payload));
            }
            StreamEvent::Disconnected(reason) => {
                pump.sink
                    .extension_log(&format!("{DISCONNECTED_MESSAGE}: {reason}"));
                if !pump.closing.load(Ordering::SeqCst) {
                    pump.notifier.notify(Notice::warning(DISCONNECTED_MESSAGE));
                }

                pump.connection.set_reconnect(false);

                let mut current = pump.current.lock().await;
                if current.as_ref().is_some_and(|active| active.id == pump.id) {
                    *current = None;
                }
                break;
            }
            StreamEvent::ConnectError(message) => {
                if pump.closing.load(Ordering::SeqCst) {
                    continue;
                }
                if !message.contains(BENIGN_CONNECT_ERROR) {
                    pump.sink
                        .extension_log(&format!("Orca logs connect error: {message}"));
                }
                pump.notifier.notify(Notice::warning(CONNECTING_MESSAGE));
            }
        }
    }

    debug!("Log stream event pump {} finished", pump.id);
}

/// Text of a `logMessage` payload.
///
/// Objects contribute their string `data` field, bare strings pass through,
/// anything else is rendered as JSON.
pub fn message_text(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(fields) => match fields.get("data") {
            Some(Value::String(text)) => text.clone(),
            _ => payload.to_string(),
        },
        other => other.to_string(),
    }
}
