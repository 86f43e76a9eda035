//! In-process transport: endpoints pair up through a shared hub and exchange
//! frames over the sessions' event channels. Frames are delivered synchronously,
//! so per-link ordering is preserved.

use crate::error::NegotiationError;
use crate::peer::transport::{Connection, Transport};
use crate::peer::types::LinkEventSink;
use crate::utils::{lock, random_id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

const OFFER_PREFIX: &str = "loopback-offer:";
const ANSWER_PREFIX: &str = "loopback-answer:";

#[derive(Clone, Default)]
pub struct LoopbackTransport {
    hub: Arc<Mutex<HashMap<String, Arc<Endpoint>>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoints that announced themselves and are not yet closed.
    pub fn live_endpoints(&self) -> usize {
        lock(&self.hub).len()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(
        &self,
        events: LinkEventSink,
    ) -> Result<Box<dyn Connection>, NegotiationError> {
        Ok(Box::new(LoopbackConnection {
            hub: self.hub.clone(),
            me: Arc::new(Endpoint {
                id: random_id(),
                events,
                link: Mutex::new(EndpointLink::default()),
            }),
        }))
    }
}

struct Endpoint {
    id: String,
    events: LinkEventSink,
    link: Mutex<EndpointLink>,
}

#[derive(Default)]
struct EndpointLink {
    peer: Option<Arc<Endpoint>>,
    open: bool,
    closed: bool,
}

impl Endpoint {
    fn deliver(&self, frame: String) -> bool {
        if lock(&self.link).closed {
            return false;
        }
        self.events.message(frame);
        true
    }

    fn remote_closed(&self) {
        let mut link = lock(&self.link);
        if link.closed {
            return;
        }
        link.closed = true;
        link.open = false;
        link.peer = None;
        drop(link);
        self.events.closed("remote closed");
    }
}

struct LoopbackConnection {
    hub: Arc<Mutex<HashMap<String, Arc<Endpoint>>>>,
    me: Arc<Endpoint>,
}

impl LoopbackConnection {
    fn announce(&self) -> Result<(), NegotiationError> {
        if lock(&self.me.link).closed {
            return Err(NegotiationError::Closed);
        }
        lock(&self.hub).insert(self.me.id.clone(), self.me.clone());
        Ok(())
    }

    fn find(&self, sdp: &str, prefix: &str) -> Result<Arc<Endpoint>, NegotiationError> {
        let id = sdp
            .strip_prefix(prefix)
            .ok_or_else(|| {
                NegotiationError::Transport(format!("not a loopback description: {sdp}"))
            })?;
        lock(&self.hub)
            .get(id)
            .cloned()
            .ok_or_else(|| NegotiationError::Transport(format!("no endpoint {id}")))
    }
}

#[async_trait]
impl Connection for LoopbackConnection {
    async fn create_offer(&self) -> Result<String, NegotiationError> {
        self.announce()?;
        Ok(format!("{OFFER_PREFIX}{}", self.me.id))
    }

    async fn create_answer(&self, remote_offer: &str) -> Result<String, NegotiationError> {
        let offerer = self.find(remote_offer, OFFER_PREFIX)?;
        self.announce()?;
        lock(&self.me.link).peer = Some(offerer);
        Ok(format!("{ANSWER_PREFIX}{}", self.me.id))
    }

    async fn apply_answer(&self, remote_answer: &str) -> Result<(), NegotiationError> {
        let answerer = self.find(remote_answer, ANSWER_PREFIX)?;
        let paired = lock(&answerer.link)
            .peer
            .as_ref()
            .map(|p| p.id == self.me.id)
            .unwrap_or(false);
        if !paired {
            return Err(NegotiationError::Transport("answer was made for another offer".into()));
        }

        {
            let mut mine = lock(&self.me.link);
            if mine.closed {
                return Err(NegotiationError::Closed);
            }
            mine.peer = Some(answerer.clone());
            mine.open = true;
        }
        lock(&answerer.link).open = true;

        debug!(a = %self.me.id, b = %answerer.id, "loopback channel open");
        self.me.events.open();
        answerer.events.open();
        Ok(())
    }

    fn send_text(&self, frame: String) -> bool {
        let peer = {
            let link = lock(&self.me.link);
            if !link.open {
                return false;
            }
            link.peer.clone()
        };
        peer.map(|p| p.deliver(frame)).unwrap_or(false)
    }

    fn close(&self) {
        lock(&self.hub).remove(&self.me.id);
        let peer = {
            let mut link = lock(&self.me.link);
            if link.closed {
                return;
            }
            link.closed = true;
            link.open = false;
            link.peer.take()
        };
        if let Some(peer) = peer {
            peer.remote_closed();
        }
    }
}
