//! Synchronous pub/sub between the session and the UI layer.
//!
//! Every publish merges the event into [`BusState`], then calls the generic
//! update listeners followed by the listeners of the event's topic, each group in
//! subscription order. Dispatch walks a snapshot of the listener list taken when
//! it starts, so listeners can subscribe or unsubscribe from inside a callback.

use crate::protocol::{ChatLogEntry, UserProfile};
use crate::session::SessionStatus;
use crate::utils::lock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PeerJoined,
    PeerLeft,
    Connected,
    Disconnected,
    Message,
    StatusChanged,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::PeerJoined => "peer-joined",
            Topic::PeerLeft => "peer-left",
            Topic::Connected => "connected",
            Topic::Disconnected => "disconnected",
            Topic::Message => "message",
            Topic::StatusChanged => "status-changed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    PeerJoined { peer_id: String, user: UserProfile },
    PeerLeft { peer_id: String, user: Option<UserProfile> },
    Connected { peer_id: String },
    Disconnected { peer_id: String, reason: String },
    Message(ChatLogEntry),
    StatusChanged(SessionStatus),
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::PeerJoined { .. } => Topic::PeerJoined,
            BusEvent::PeerLeft { .. } => Topic::PeerLeft,
            BusEvent::Connected { .. } => Topic::Connected,
            BusEvent::Disconnected { .. } => Topic::Disconnected,
            BusEvent::Message(_) => Topic::Message,
            BusEvent::StatusChanged(_) => Topic::StatusChanged,
        }
    }
}

/// Central UI-facing state the bus keeps current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusState {
    pub status: SessionStatus,
    pub peers: BTreeMap<String, UserProfile>,
    pub connected_links: usize,
    pub last_message: Option<ChatLogEntry>,
    pub message_count: u64,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            status: SessionStatus::LoggedOut,
            peers: BTreeMap::new(),
            connected_links: 0,
            last_message: None,
            message_count: 0,
        }
    }
}

impl BusState {
    fn merge(&mut self, event: &BusEvent) {
        match event {
            BusEvent::PeerJoined { peer_id, user } => {
                self.peers.insert(peer_id.clone(), user.clone());
            }
            BusEvent::PeerLeft { peer_id, .. } => {
                self.peers.remove(peer_id);
            }
            BusEvent::Connected { .. } => self.connected_links += 1,
            BusEvent::Disconnected { .. } => {
                self.connected_links = self.connected_links.saturating_sub(1)
            }
            BusEvent::Message(entry) => {
                self.last_message = Some(entry.clone());
                self.message_count += 1;
            }
            BusEvent::StatusChanged(status) => {
                self.status = *status;
                if matches!(status, SessionStatus::Ended | SessionStatus::Lobby) {
                    self.peers.clear();
                    self.connected_links = 0;
                }
            }
        }
    }
}

pub type Listener = Arc<dyn Fn(&BusEvent, &BusState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    // None listens to every update
    topic: Option<Topic>,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    state: BusState,
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

/// Cheap clonable handle; clones share listeners and state.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("EventBus")
            .field("state", &inner.state)
            .field("subscriptions", &inner.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listens to every published event.
    pub fn subscribe_updates<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&BusEvent, &BusState) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(listener))
    }

    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> SubscriptionId
    where
        F: Fn(&BusEvent, &BusState) + Send + Sync + 'static,
    {
        self.add(Some(topic), Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|s| s.id != id);
        inner.subscriptions.len() != before
    }

    pub fn publish(&self, event: BusEvent) {
        let topic = event.topic();
        let (state, listeners) = {
            let mut inner = lock(&self.inner);
            inner.state.merge(&event);
            let generic = inner
                .subscriptions
                .iter()
                .filter(|s| s.topic.is_none())
                .map(|s| s.listener.clone());
            let dedicated = inner
                .subscriptions
                .iter()
                .filter(|s| s.topic == Some(topic))
                .map(|s| s.listener.clone());
            let listeners: Vec<Listener> = generic.chain(dedicated).collect();
            (inner.state.clone(), listeners)
        };

        for listener in listeners {
            listener(&event, &state);
        }
    }

    pub fn state(&self) -> BusState {
        lock(&self.inner).state.clone()
    }

    fn add(&self, topic: Option<Topic>, listener: Listener) -> SubscriptionId {
        let mut inner = lock(&self.inner);
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscriptions.push(Subscription {
            id,
            topic,
            listener,
        });
        id
    }
}
