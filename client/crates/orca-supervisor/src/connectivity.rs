use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

const CONNECTIVITY_CAPACITY: usize = 16;

/// Last known reachability of the server, published only when it changes.
pub struct Connectivity {
    current: AtomicBool,
    changes: broadcast::Sender<bool>,
}

impl Connectivity {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CONNECTIVITY_CAPACITY);
        Self {
            current: AtomicBool::new(false),
            changes,
        }
    }

    /// Record `reachable`. Returns whether subscribers were notified.
    pub fn publish(&self, reachable: bool) -> bool {
        let previous = self.current.swap(reachable, Ordering::SeqCst);
        if previous == reachable {
            return false;
        }
        // No subscribers is fine
        let _ = self.changes.send(reachable);
        true
    }

    pub fn current(&self) -> bool {
        self.current.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.changes.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
