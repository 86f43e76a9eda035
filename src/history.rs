use crate::protocol::ChatLogEntry;
use crate::utils::lock;
use std::sync::{Arc, Mutex};

/// Receives one entry per delivered chat or system envelope.
///
/// Persisting them is up to the implementation; the session only hands them over.
pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: ChatLogEntry);
}

/// Keeps entries in memory for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Arc<Mutex<Vec<ChatLogEntry>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ChatLogEntry> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, entry: ChatLogEntry) {
        lock(&self.entries).push(entry);
    }
}
