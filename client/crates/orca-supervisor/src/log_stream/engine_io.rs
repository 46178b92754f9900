//! Log stream transport: Socket.IO v5 namespaces over Engine.IO v4 HTTP long-polling.
//!
//! Only what the log stream needs is implemented: handshake, namespace
//! connect, long-poll reads, ping/pong and text events. Every failed
//! request is reported the way browser clients report it, as
//! `"xhr poll error"`.

use crate::log_stream::packet::{
    EnginePacket, Handshake, PONG, SocketPacket, decode_payload, encode_connect,
    encode_disconnect,
};
use crate::log_stream::{
    BENIGN_CONNECT_ERROR, ReconnectPolicy, StreamConnection, StreamConnector, StreamEvent,
};
use crate::{Result, SupervisorError};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use error_location::ErrorLocation;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, trace};

const ENGINE_IO_PATH: &str = "/socket.io/";
const LOG_EVENT: &str = "logMessage";
const TEXT_PLAIN: &str = "text/plain;charset=UTF-8";

const CLIENT_DISCONNECT: &str = "io client disconnect";
const SERVER_DISCONNECT: &str = "io server disconnect";
const RECONNECT_FAILED: &str = "reconnect failed";
const TRANSPORT_ERROR: &str = "transport error";
const CONNECT_TIMEOUT: &str = "timeout";
const PARSER_ERROR: &str = "parser error";

/// Slack added to the server's ping deadline before a long poll is abandoned.
const POLL_SLACK: Duration = Duration::from_secs(5);

/// A log stream URL split into its Engine.IO endpoint and Socket.IO namespace.
///
/// `http://host:5000/logging` polls `http://host:5000/socket.io/` and joins
/// the `/logging` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    engine_url: Url,
    namespace: String,
}

impl StreamEndpoint {
    pub fn parse(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| SupervisorError::StreamEndpoint {
            message: format!("'{endpoint}': {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SupervisorError::StreamEndpoint {
                message: format!("'{endpoint}': scheme must be http or https"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let namespace = match url.path().trim_end_matches('/') {
            "" => String::from("/"),
            path => path.to_string(),
        };

        let mut engine_url = url;
        engine_url.set_path(ENGINE_IO_PATH);
        engine_url.set_query(None);
        engine_url.set_fragment(None);

        Ok(Self {
            engine_url,
            namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Polling URL, with the session id once one is assigned.
    pub fn polling_url(&self, sid: Option<&str>) -> Url {
        let mut url = self.engine_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("EIO", "4").append_pair("transport", "polling");
            if let Some(sid) = sid {
                query.append_pair("sid", sid);
            }
        }
        url
    }
}

/// Creates [`EngineIoConnection`]s sharing one HTTP client.
pub struct EngineIoConnector {
    client: reqwest::Client,
}

impl EngineIoConnector {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

impl StreamConnector for EngineIoConnector {
    fn create(
        &self,
        endpoint: &str,
        policy: ReconnectPolicy,
    ) -> (Arc<dyn StreamConnection>, mpsc::UnboundedReceiver<StreamEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (cancel, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            client: self.client.clone(),
            endpoint: StreamEndpoint::parse(endpoint).map_err(|e| e.to_string()),
            policy,
            events,
            cancel,
            sid: Mutex::new(None),
            connected: AtomicBool::new(false),
            reconnect: AtomicBool::new(true),
            running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        (Arc::new(EngineIoConnection { shared }), events_rx)
    }
}

/// One reconnecting Socket.IO namespace session.
pub struct EngineIoConnection {
    shared: Arc<Shared>,
}

impl StreamConnection for EngineIoConnection {
    fn connect(&self) -> bool {
        // `running` is never cleared, so a session runs at most once
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return !self.shared.closed.load(Ordering::SeqCst);
        }

        self.shared.cancel.send_replace(false);
        let cancel = self.shared.cancel.subscribe();
        let shared = self.shared.clone();
        tokio::spawn(shared.run(cancel));
        true
    }

    fn disconnect(&self) {
        self.shared.reconnect.store(false, Ordering::SeqCst);
        self.shared.cancel.send_replace(true);
    }

    fn set_reconnect(&self, enabled: bool) {
        self.shared.reconnect.store(enabled, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

enum SessionEnd {
    Closed,
    Failed { message: String, established: bool },
}

struct Shared {
    client: reqwest::Client,
    endpoint: std::result::Result<StreamEndpoint, String>,
    policy: ReconnectPolicy,
    events: mpsc::UnboundedSender<StreamEvent>,
    cancel: watch::Sender<bool>,
    sid: Mutex<Option<String>>,
    connected: AtomicBool,
    reconnect: AtomicBool,
    running: AtomicBool,
    closed: AtomicBool,
}

impl Shared {
    async fn run(self: Arc<Self>, mut cancel: watch::Receiver<bool>) {
        let reason = match &self.endpoint {
            Ok(endpoint) => self.run_until_closed(endpoint, &mut cancel).await,
            Err(message) => {
                self.emit(StreamEvent::ConnectError(message.clone()));
                RECONNECT_FAILED
            }
        };

        self.closed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        debug!("Log stream closed: {reason}");
        self.emit(StreamEvent::Disconnected(String::from(reason)));
    }

    async fn run_until_closed(
        &self,
        endpoint: &StreamEndpoint,
        cancel: &mut watch::Receiver<bool>,
    ) -> &'static str {
        let mut retries_left = self.policy.attempts;

        loop {
            let end = tokio::select! {
                end = self.session(endpoint) => end,
                _ = cancelled(cancel) => {
                    self.leave(endpoint).await;
                    return CLIENT_DISCONNECT;
                }
            };

            self.connected.store(false, Ordering::SeqCst);
            *self.sid.lock().await = None;

            let SessionEnd::Failed {
                message,
                established,
            } = end
            else {
                return SERVER_DISCONNECT;
            };

            if established {
                retries_left = self.policy.attempts;
            }
            self.emit(StreamEvent::ConnectError(message));

            if !self.reconnect.load(Ordering::SeqCst) {
                return TRANSPORT_ERROR;
            }
            if retries_left == 0 {
                return RECONNECT_FAILED;
            }
            retries_left -= 1;

            tokio::select! {
                _ = tokio::time::sleep(self.policy.delay) => {}
                _ = cancelled(cancel) => return CLIENT_DISCONNECT,
            }
        }
    }

    async fn session(&self, endpoint: &StreamEndpoint) -> SessionEnd {
        let handshake = match self.handshake(endpoint).await {
            Ok(handshake) => handshake,
            Err(message) => {
                return SessionEnd::Failed {
                    message,
                    established: false,
                };
            }
        };
        let sid = handshake.sid.clone();
        *self.sid.lock().await = Some(sid.clone());

        if let Err(e) = self
            .post(endpoint, &sid, &encode_connect(endpoint.namespace()))
            .await
        {
            return failure(&e, false);
        }

        let live_timeout =
            Duration::from_millis(handshake.ping_interval + handshake.ping_timeout) + POLL_SLACK;
        let mut established = false;

        loop {
            let timeout = if established {
                live_timeout
            } else {
                self.policy.timeout
            };

            let body = match self.poll(endpoint, &sid, timeout).await {
                Ok(body) => body,
                Err(e) => return failure(&e, established),
            };

            for packet in decode_payload(&body) {
                match packet {
                    EnginePacket::Ping => {
                        if let Err(e) = self.post(endpoint, &sid, PONG).await {
                            return failure(&e, established);
                        }
                    }
                    EnginePacket::Close => return SessionEnd::Closed,
                    EnginePacket::Message(SocketPacket::Connect { namespace })
                        if namespace == endpoint.namespace() =>
                    {
                        established = true;
                        self.connected.store(true, Ordering::SeqCst);
                        self.emit(StreamEvent::Connected);
                    }
                    EnginePacket::Message(SocketPacket::ConnectError { namespace, message })
                        if namespace == endpoint.namespace() =>
                    {
                        return SessionEnd::Failed {
                            message,
                            established,
                        };
                    }
                    EnginePacket::Message(SocketPacket::Disconnect { namespace })
                        if namespace == endpoint.namespace() =>
                    {
                        return SessionEnd::Closed;
                    }
                    EnginePacket::Message(SocketPacket::Event {
                        namespace,
                        name,
                        payload,
                    }) if namespace == endpoint.namespace() && name == LOG_EVENT => {
                        self.emit(StreamEvent::Message(payload));
                    }
                    other => trace!("Ignoring log stream packet {other:?}"),
                }
            }
        }
    }

    async fn handshake(&self, endpoint: &StreamEndpoint) -> std::result::Result<Handshake, String> {
        let body = self
            .client
            .get(endpoint.polling_url(None))
            .timeout(self.policy.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| describe(&e, false))?
            .text()
            .await
            .map_err(|e| describe(&e, false))?;

        decode_payload(&body)
            .into_iter()
            .find_map(|packet| match packet {
                EnginePacket::Open(handshake) => Some(handshake),
                _ => None,
            })
            .ok_or_else(|| String::from(PARSER_ERROR))
    }

    async fn poll(
        &self,
        endpoint: &StreamEndpoint,
        sid: &str,
        timeout: Duration,
    ) -> reqwest::Result<String> {
        self.client
            .get(endpoint.polling_url(Some(sid)))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn post(&self, endpoint: &StreamEndpoint, sid: &str, payload: &str) -> reqwest::Result<()> {
        self.client
            .post(endpoint.polling_url(Some(sid)))
            .header(CONTENT_TYPE, TEXT_PLAIN)
            .body(payload.to_string())
            .timeout(self.policy.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Best-effort namespace disconnect and session close.
    async fn leave(&self, endpoint: &StreamEndpoint) {
        let Some(sid) = self.sid.lock().await.take() else {
            return;
        };

        let farewell = format!("{}\u{1e}1", encode_disconnect(endpoint.namespace()));
        if let Err(e) = self.post(endpoint, &sid, &farewell).await {
            debug!("Log stream close request failed: {e}");
        }
    }

    fn emit(&self, event: StreamEvent) {
        // Receiver is gone once the client stops listening
        let _ = self.events.send(event);
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    // A dropped sender also ends the session
    let _ = cancel.wait_for(|cancelled| *cancelled).await;
}

fn failure(error: &reqwest::Error, established: bool) -> SessionEnd {
    SessionEnd::Failed {
        message: describe(error, established),
        established,
    }
}

fn describe(error: &reqwest::Error, established: bool) -> String {
    debug!("Log stream request failed: {error}");
    if error.is_timeout() && !established {
        String::from(CONNECT_TIMEOUT)
    } else {
        String::from(BENIGN_CONNECT_ERROR)
    }
}
