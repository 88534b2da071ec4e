use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Default remembering window for sent message ids.
///
/// An echo filter, not a correctness mechanism: long enough to catch the
/// redelivery of our own outgoing whispers, short enough that a legitimate
/// fast reply reusing an id (which should not happen anyway) is unlikely to
/// be swallowed.
pub const DEFAULT_ECHO_WINDOW: Duration = Duration::from_secs(5);

/// Tracks identifiers of recently sent messages so their echoes can be
/// ignored. Entries expire after a fixed window to bound memory.
pub struct EchoFilter {
    window: Duration,
    sent: Mutex<HashMap<String, Instant>>,
}

impl EchoFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            sent: Mutex::new(HashMap::new()),
        }
    }

    /// Remember an outgoing message id.
    pub fn note(&self, message_id: String) {
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        sent.retain(|_, at| now.duration_since(*at) < self.window);
        sent.insert(message_id, now);
    }

    /// Whether an inbound message id matches something we sent within the
    /// window. Expired entries are evicted on the way.
    pub fn is_echo(&self, message_id: &str) -> bool {
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        sent.retain(|_, at| now.duration_since(*at) < self.window);
        sent.contains_key(message_id)
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EchoFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ECHO_WINDOW)
    }
}
