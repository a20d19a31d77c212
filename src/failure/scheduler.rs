//! Delayed-delivery scheduler: a priority queue keyed by absolute release
//! time, drained by a single cooperative timer task (spec §4.2 "Delivery
//! scheduling", §5 cancellation).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Entry {
    release_at: Instant,
    action: Box<dyn FnOnce() + Send>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.release_at == other.release_at
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so `BinaryHeap` (a max-heap) pops the earliest release first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.release_at.cmp(&self.release_at)
    }
}

/// Schedules delayed message delivery and tracks one `CancellationToken`
/// per session, so a disconnected session's pending entries are silently
/// discarded instead of firing into nothing.
pub struct Scheduler {
    tokens: Mutex<HashMap<String, CancellationToken>>,
    tx: mpsc::UnboundedSender<Entry>,
}

impl Scheduler {
    pub fn spawn() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Entry>();
        let scheduler = Arc::new(Self {
            tokens: Mutex::new(HashMap::new()),
            tx,
        });

        tokio::spawn(async move {
            let mut heap: BinaryHeap<Entry> = BinaryHeap::new();
            loop {
                match heap.peek() {
                    Some(top) => {
                        let deadline = top.release_at;
                        tokio::select! {
                            _ = tokio::time::sleep_until(deadline) => {
                                let entry = heap.pop().expect("peeked entry must be present");
                                (entry.action)();
                            }
                            received = rx.recv() => {
                                match received {
                                    Some(entry) => heap.push(entry),
                                    None => return,
                                }
                            }
                        }
                    }
                    None => match rx.recv().await {
                        Some(entry) => heap.push(entry),
                        None => return,
                    },
                }
            }
        });

        scheduler
    }

    pub fn session_token(&self, session_id: &str) -> CancellationToken {
        self.tokens
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_insert_with(CancellationToken::new)
            .clone()
    }

    /// Discards all pending entries for `session_id` (spec §5 cancellation).
    pub fn cancel_session(&self, session_id: &str) {
        if let Some(token) = self.tokens.lock().unwrap().remove(session_id) {
            token.cancel();
        }
    }

    /// Schedules `action` to run after `delay`, unless `session_id`'s token
    /// is cancelled before then.
    pub fn schedule(&self, session_id: &str, delay: Duration, action: impl FnOnce() + Send + 'static) {
        let token = self.session_token(session_id);
        let entry = Entry {
            release_at: Instant::now() + delay,
            action: Box::new(move || {
                if !token.is_cancelled() {
                    action();
                }
            }),
        };
        let _ = self.tx.send(entry);
    }
}
