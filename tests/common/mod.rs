#![allow(dead_code)]

use qrchat_lib::peer::{LinkEvent, LoopbackTransport};
use qrchat_lib::{ChatLogEntry, MemoryHistory, Session, SessionContext, UserProfile};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// One participant on a shared in-process transport.
pub struct Node {
    pub session: Session,
    pub events: UnboundedReceiver<LinkEvent>,
    pub history: MemoryHistory,
}

impl Node {
    pub fn new(transport: &LoopbackTransport, name: &str) -> Self {
        let history = MemoryHistory::new();
        let ctx = SessionContext::new(Arc::new(transport.clone()))
            .with_history(Arc::new(history.clone()));
        let (mut session, events) = Session::new(ctx);
        session.login(UserProfile::new(name)).unwrap();
        Self {
            session,
            events,
            history,
        }
    }

    pub fn host(transport: &LoopbackTransport, name: &str) -> Self {
        let mut node = Self::new(transport, name);
        node.session.start_hosting().unwrap();
        node
    }

    pub fn guest(transport: &LoopbackTransport, name: &str) -> Self {
        let mut node = Self::new(transport, name);
        node.session.start_joining().unwrap();
        node
    }

    pub fn pump(&mut self) -> usize {
        self.session.process_pending(&mut self.events)
    }

    pub fn entries(&self) -> Vec<ChatLogEntry> {
        self.history.entries()
    }

    pub fn count_text(&self, text: &str) -> usize {
        self.entries().iter().filter(|e| e.text == text).count()
    }

    pub fn peer_id_of(&self, name: &str) -> String {
        self.session
            .peers()
            .find(|p| p.user.name == name)
            .map(|p| p.peer_id.clone())
            .unwrap_or_else(|| panic!("no peer named {name}"))
    }
}

/// Delivers queued link events until every node is idle.
pub fn settle(nodes: &mut [&mut Node]) {
    for _ in 0..100 {
        let handled: usize = nodes.iter_mut().map(|n| n.pump()).sum();
        if handled == 0 {
            return;
        }
    }
    panic!("link events did not settle");
}

/// Runs the three-step code exchange between a host and a joining guest.
pub async fn connect(host: &mut Node, guest: &mut Node) {
    let offer = host.session.invite_guest().await.unwrap();
    let answer = guest.session.accept_invite(&offer).await.unwrap();
    host.session.accept_answer(&answer).await.unwrap();
    settle(&mut [host, guest]);
}
