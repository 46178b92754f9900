#![allow(dead_code)]

use orca_supervisor::{Notice, NoticeLevel, Notifier, StreamEvent};

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn count(&self, level: NoticeLevel, message: &str) -> usize {
        self.notices
            .lock()
            .unwrap()
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

/// Next event, or panic after `limit`.
pub async fn next_event(
    events: &mut mpsc::UnboundedReceiver<StreamEvent>,
    limit: Duration,
) -> StreamEvent {
    tokio::time::timeout(limit, events.recv())
        .await
        .expect("timed out waiting for stream event")
        .expect("event channel closed")
}
