use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Event raised by a transport connection on behalf of one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub link_id: String,
    pub kind: LinkEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// The data channel is open.
    Open,
    /// A text frame arrived on the data channel.
    Message(String),
    /// The channel or the connection went away.
    Closed { reason: String },
}

/// Where connections deliver their events; the session drains the other end.
#[derive(Debug, Clone)]
pub struct LinkEventSink {
    link_id: String,
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkEventSink {
    pub fn new(link_id: impl Into<String>, tx: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            link_id: link_id.into(),
            tx,
        }
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn open(&self) {
        self.emit(LinkEventKind::Open);
    }

    pub fn message(&self, frame: String) {
        self.emit(LinkEventKind::Message(frame));
    }

    pub fn closed(&self, reason: impl Into<String>) {
        self.emit(LinkEventKind::Closed {
            reason: reason.into(),
        });
    }

    fn emit(&self, kind: LinkEventKind) {
        // receiver gone means the session already ended
        let _ = self.tx.send(LinkEvent {
            link_id: self.link_id.clone(),
            kind,
        });
    }
}

/// ICE server entry
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}
