mod launcher;

use crate::{
    LogSink, Notice, NoticeLevel, Notifier, ReachabilityProbe, ReconnectPolicy, StreamConnection,
    StreamConnector, StreamEvent,
};

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

// =========================================================================
// Log sink / notifier doubles
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Category {
    Server,
    Extension,
    Orca,
}

pub(crate) struct RecordingSink {
    lines: Mutex<Vec<(Category, String)>>,
    orca_tx: broadcast::Sender<String>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        let (orca_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            lines: Mutex::new(Vec::new()),
            orca_tx,
        })
    }

    pub(crate) fn lines(&self, category: Category) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub(crate) fn contains(&self, category: Category, needle: &str) -> bool {
        self.lines(category).iter().any(|line| line.contains(needle))
    }

    fn push(&self, category: Category, line: &str) {
        self.lines.lock().unwrap().push((category, line.to_string()));
    }
}

impl LogSink for RecordingSink {
    fn server_log(&self, line: &str) {
        self.push(Category::Server, line);
    }

    fn extension_log(&self, line: &str) {
        self.push(Category::Extension, line);
    }

    fn orca_log(&self, line: &str) {
        self.push(Category::Orca, line);
        let _ = self.orca_tx.send(line.to_string());
    }

    fn subscribe_orca(&self) -> broadcast::Receiver<String> {
        self.orca_tx.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, level: NoticeLevel, message: &str) -> usize {
        self.notices()
            .iter()
            .filter(|n| n.level == level && n.message == message)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// =========================================================================
// Probe double
// =========================================================================

/// Answers `true` from the `reachable_from`-th call on (1-based). `None` never answers.
pub(crate) struct ScriptedProbe {
    calls: AtomicU32,
    reachable_from: Option<u32>,
}

impl ScriptedProbe {
    pub(crate) fn always(reachable: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            reachable_from: reachable.then_some(1),
        })
    }

    pub(crate) fn reachable_from_call(call: u32) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            reachable_from: Some(call),
        })
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn is_reachable(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.reachable_from.is_some_and(|from| call >= from)
    }
}

// =========================================================================
// Stream transport double
// =========================================================================

/// Connects instantly and lets tests inject server-side events.
pub(crate) struct FakeConnection {
    events: mpsc::UnboundedSender<StreamEvent>,
    connected: AtomicBool,
    reconnect: AtomicBool,
    closed: AtomicBool,
    connect_calls: AtomicU32,
    refuse: bool,
}

impl FakeConnection {
    pub(crate) fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn reconnect_enabled(&self) -> bool {
        self.reconnect.load(Ordering::SeqCst)
    }

    pub(crate) fn push(&self, event: StreamEvent) {
        let _ = self.events.send(event);
    }

    /// Server closes the session.
    pub(crate) fn drop_from_server(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        self.push(StreamEvent::Disconnected(String::from("io server disconnect")));
    }
}

impl StreamConnection for FakeConnection {
    fn connect(&self) -> bool {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        if self.refuse {
            self.push(StreamEvent::ConnectError(String::from("xhr poll error")));
            return true;
        }
        self.connected.store(true, Ordering::SeqCst);
        self.push(StreamEvent::Connected);
        true
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        self.push(StreamEvent::Disconnected(String::from("io client disconnect")));
    }

    fn set_reconnect(&self, enabled: bool) {
        self.reconnect.store(enabled, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct FakeConnector {
    created: Mutex<Vec<Arc<FakeConnection>>>,
    refuse: bool,
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connections never succeed and only report connect errors.
    pub(crate) fn refusing() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            refuse: true,
        })
    }

    pub(crate) fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub(crate) fn connection(&self, index: usize) -> Arc<FakeConnection> {
        self.created.lock().unwrap()[index].clone()
    }
}

impl StreamConnector for FakeConnector {
    fn create(
        &self,
        _endpoint: &str,
        _policy: ReconnectPolicy,
    ) -> (Arc<dyn StreamConnection>, mpsc::UnboundedReceiver<StreamEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(FakeConnection {
            events,
            connected: AtomicBool::new(false),
            reconnect: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            connect_calls: AtomicU32::new(0),
            refuse: self.refuse,
        });
        self.created.lock().unwrap().push(connection.clone());
        (connection, events_rx)
    }
}

// =========================================================================
// Helpers
// =========================================================================

/// Poll `condition` until it holds or `limit` passes.
pub(crate) async fn eventually<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
