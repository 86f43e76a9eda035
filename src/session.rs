//! Session controller: local identity, the peer registry, and star-topology relay.
//!
//! The host keeps one link per guest and forwards every chat or system envelope
//! to all other guests; guests only ever talk to the host. All state lives in
//! [`Session`], which the application drives from a single task by feeding it
//! the [`LinkEvent`]s its links produce.

use crate::error::{InvalidCode, NegotiationError, ProtocolError, SessionError};
use crate::events::{BusEvent, EventBus};
use crate::history::{HistoryStore, MemoryHistory};
use crate::peer::link::PeerLink;
use crate::peer::state::{LinkRole, LinkState};
use crate::peer::transport::Transport;
use crate::peer::types::{LinkEvent, LinkEventKind};
use crate::protocol::{ChatLogEntry, Envelope, UserProfile};
use crate::signaling::{Codec, DescriptorKind, GzipBase64Codec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Host or guest, chosen when the session starts.
pub type Role = LinkRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    LoggedOut,
    Lobby,
    Hosting,
    Joining,
    InSession,
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::LoggedOut => "logged out",
            SessionStatus::Lobby => "in the lobby",
            SessionStatus::Hosting => "hosting",
            SessionStatus::Joining => "joining",
            SessionStatus::InSession => "in session",
            SessionStatus::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Collaborators a session works with, owned by the embedding application.
#[derive(Clone)]
pub struct SessionContext {
    pub transport: Arc<dyn Transport>,
    pub codec: Arc<dyn Codec>,
    pub bus: EventBus,
    pub history: Arc<dyn HistoryStore>,
}

impl SessionContext {
    /// Default codec, a fresh bus and in-memory history over `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            codec: Arc::new(GzipBase64Codec),
            bus: EventBus::new(),
            history: Arc::new(MemoryHistory::new()),
        }
    }

    /// Replaces the code format used for invitations and answers.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Publishes to an existing bus the UI already listens on.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Hands delivered chat lines to `history`.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }
}

/// An identified participant reachable over `link`.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub peer_id: String,
    pub user: UserProfile,
    pub link: PeerLink,
}

impl PeerRecord {
    /// State of the link behind this peer.
    pub fn status(&self) -> LinkState {
        self.link.state()
    }
}

pub struct Session {
    ctx: SessionContext,
    status: SessionStatus,
    role: Option<Role>,
    local_user: Option<UserProfile>,
    /// Links that have not identified themselves yet, by link id
    pending: HashMap<String, PeerLink>,
    /// Identified peers, by link id
    peers: HashMap<String, PeerRecord>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("role", &self.role)
            .field("pending", &self.pending.len())
            .field("peers", &self.peers.len())
            .finish()
    }
}

impl Session {
    /// Creates a logged-out session and the receiver its links report to.
    pub fn new(ctx: SessionContext) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            ctx,
            status: SessionStatus::LoggedOut,
            role: None,
            local_user: None,
            pending: HashMap::new(),
            peers: HashMap::new(),
            events_tx,
        };
        (session, events_rx)
    }

    /// Where the session is in its lifecycle.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// `None` until hosting or joining starts.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Profile given at login.
    pub fn local_user(&self) -> Option<&UserProfile> {
        self.local_user.as_ref()
    }

    /// Collaborators this session was built with.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Identified peers, in no particular order.
    pub fn peers(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.values()
    }

    /// Looks up an identified peer by its link id.
    pub fn peer(&self, peer_id: &str) -> Option<&PeerRecord> {
        self.peers.get(peer_id)
    }

    /// Number of identified peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Links still negotiating or waiting for the remote identity.
    pub fn pending_links(&self) -> impl Iterator<Item = &PeerLink> {
        self.pending.values()
    }

    /// Sets the local profile and enters the lobby.
    pub fn login(&mut self, profile: UserProfile) -> Result<(), SessionError> {
        if !matches!(self.status, SessionStatus::LoggedOut | SessionStatus::Lobby) {
            return Err(self.wrong_state("login"));
        }
        info!(user = %profile.name, "logged in");
        self.local_user = Some(profile);
        self.set_status(SessionStatus::Lobby);
        Ok(())
    }

    /// Edits the local profile and re-announces it to everyone connected.
    pub fn update_profile(
        &mut self,
        name: impl Into<String>,
        avatar_ref: Option<String>,
    ) -> Result<(), SessionError> {
        let status = self.status;
        let Some(user) = self.local_user.as_mut() else {
            return Err(SessionError::WrongState {
                op: "update_profile",
                status,
            });
        };
        user.name = name.into();
        user.avatar_ref = avatar_ref;
        let identity = Envelope::Identity { user: user.clone() };
        for link in self.connected_links() {
            link.send(&identity);
        }
        Ok(())
    }

    /// Back to the lobby after a session ended, keeping the profile.
    pub fn return_to_lobby(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Ended {
            return Err(self.wrong_state("return_to_lobby"));
        }
        self.role = None;
        self.set_status(SessionStatus::Lobby);
        Ok(())
    }

    /// Lobby to `Hosting`; the session then invites guests.
    pub fn start_hosting(&mut self) -> Result<(), SessionError> {
        self.enter_role(Role::Host, SessionStatus::Hosting, "start_hosting")
    }

    /// Lobby to `Joining`; the session then waits for one invitation.
    pub fn start_joining(&mut self) -> Result<(), SessionError> {
        self.enter_role(Role::Guest, SessionStatus::Joining, "start_joining")
    }

    /// Host: opens a link for one more guest and returns its offer code.
    pub async fn invite_guest(&mut self) -> Result<String, SessionError> {
        if self.role != Some(Role::Host)
            || !matches!(self.status, SessionStatus::Hosting | SessionStatus::InSession)
        {
            return Err(self.wrong_state("invite_guest"));
        }

        let link = self.open_link().await?;
        match link.create_offer().await {
            Ok(token) => {
                self.pending.insert(link.id().to_string(), link);
                Ok(token)
            }
            Err(e) => {
                link.close();
                Err(e.into())
            }
        }
    }

    /// Host: withdraws an invitation that has not connected yet.
    pub fn cancel_invite(&mut self, link_id: &str) -> bool {
        let withdrawable = self
            .pending
            .get(link_id)
            .is_some_and(|link| !link.is_connected());
        if !withdrawable {
            return false;
        }
        if let Some(link) = self.pending.remove(link_id) {
            link.close_with_reason("invitation withdrawn");
        }
        true
    }

    /// Host: applies a guest's answer code to the invitation it belongs to.
    pub async fn accept_answer(&mut self, token: &str) -> Result<(), SessionError> {
        if self.role != Some(Role::Host) {
            return Err(self.wrong_state("accept_answer"));
        }
        let descriptor = self.ctx.codec.decode(token)?;
        if descriptor.kind != DescriptorKind::Answer {
            return Err(unusable("this is an invitation code, not an answer"));
        }
        let Some(link) = self.pending.get(&descriptor.id).cloned() else {
            return Err(unusable("this answer does not match any open invitation"));
        };

        match link.accept_answer(token).await {
            Ok(()) => Ok(()),
            Err(NegotiationError::WrongState { .. }) => {
                Err(unusable("this invitation was already answered"))
            }
            Err(e) => {
                if link.state().is_closed() {
                    self.pending.remove(link.id());
                }
                Err(e.into())
            }
        }
    }

    /// Guest: applies the host's invitation code and returns the answer code.
    pub async fn accept_invite(&mut self, token: &str) -> Result<String, SessionError> {
        if self.role != Some(Role::Guest) || self.status != SessionStatus::Joining {
            return Err(self.wrong_state("accept_invite"));
        }
        // a guest keeps exactly one link
        if !self.pending.is_empty() || !self.peers.is_empty() {
            return Err(self.wrong_state("accept_invite"));
        }
        let descriptor = self.ctx.codec.decode(token)?;
        if descriptor.kind != DescriptorKind::Offer {
            return Err(unusable("this is an answer code, not an invitation"));
        }

        let link = self.open_link().await?;
        match link.accept_offer(token).await {
            Ok(answer) => {
                self.pending.insert(link.id().to_string(), link);
                Ok(answer)
            }
            Err(e) => {
                link.close();
                Err(e.into())
            }
        }
    }

    /// Scanner input: an answer for the host, an invitation for a guest.
    ///
    /// Returns the answer code a guest has to show back to the host.
    pub async fn submit_code(&mut self, text: &str) -> Result<Option<String>, SessionError> {
        match self.role {
            Some(Role::Host) => self.accept_answer(text).await.map(|()| None),
            Some(Role::Guest) => self.accept_invite(text).await.map(Some),
            None => Err(self.wrong_state("submit_code")),
        }
    }

    /// Sends a chat line. Returns false if it could not reach every recipient.
    pub fn send_chat(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(user) = self.local_user.clone() else {
            return false;
        };
        let envelope = Envelope::Chat {
            text: text.to_string(),
            user: user.clone(),
        };

        match self.role {
            Some(Role::Host)
                if matches!(self.status, SessionStatus::Hosting | SessionStatus::InSession) =>
            {
                self.deliver_local(ChatLogEntry::chat(text, &user.name));
                let failed = self.broadcast(&envelope, None);
                failed == 0
            }
            Some(Role::Guest) if self.status == SessionStatus::InSession => {
                // the host relays onward and never echoes back
                let sent = self
                    .connected_links()
                    .first()
                    .map(|link| link.send(&envelope))
                    .unwrap_or(false);
                if sent {
                    self.deliver_local(ChatLogEntry::chat(text, &user.name));
                }
                sent
            }
            _ => false,
        }
    }

    /// Host: removes a guest from the session.
    pub fn kick(&mut self, peer_id: &str) -> bool {
        if self.role != Some(Role::Host) {
            return false;
        }
        let Some(link) = self.link(peer_id).cloned() else {
            return false;
        };
        link.send(&Envelope::Kick);
        if let Some(record) = self.drop_link(peer_id, "kicked") {
            self.notify(format!("{} was removed", record.user.name), None);
        }
        true
    }

    /// Leaves the session: a host closes it for everyone, a guest says goodbye.
    pub fn exit(&mut self) {
        if matches!(self.status, SessionStatus::Ended | SessionStatus::LoggedOut) {
            return;
        }
        match self.role {
            Some(Role::Host) => {
                self.broadcast(&Envelope::Close, None);
            }
            Some(Role::Guest) => {
                if let Some(user) = &self.local_user {
                    let leave = Envelope::Leave {
                        user_id: user.id.clone(),
                    };
                    for link in self.connected_links() {
                        link.send(&leave);
                    }
                }
            }
            None => {}
        }
        self.teardown("left the session");
    }

    /// Drains every event already queued; returns how many were handled.
    pub fn process_pending(&mut self, events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_link_event(event);
            handled += 1;
        }
        handled
    }

    /// Applies one event reported by a link. Events for unknown links are dropped.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        if self.status == SessionStatus::Ended {
            debug!(link = %event.link_id, "event after session end ignored");
            return;
        }
        let Some(link) = self.link(&event.link_id).cloned() else {
            debug!(link = %event.link_id, "event for unknown link ignored");
            return;
        };

        match event.kind {
            LinkEventKind::Open => self.on_open(&link),
            LinkEventKind::Message(frame) => match Envelope::from_frame(&frame) {
                Ok(envelope) => self.handle_envelope(&event.link_id, envelope),
                Err(e) => warn!(link = %event.link_id, "dropping frame: {e}"),
            },
            LinkEventKind::Closed { reason } => self.on_link_closed(&event.link_id, &reason),
        }
    }

    /// Dispatches one inbound envelope received on `link_id`.
    pub fn handle_envelope(&mut self, link_id: &str, envelope: Envelope) {
        let Some(link) = self.link(link_id).cloned() else {
            debug!(link = %link_id, "envelope for unknown link ignored");
            return;
        };
        debug!(link = %link_id, kind = envelope.type_name(), "envelope received");
        let is_host = self.role == Some(Role::Host);

        match envelope {
            Envelope::Identity { user } => {
                let name = user.name.clone();
                let is_new = self.upsert_peer(link_id, user);
                if is_host {
                    if is_new {
                        self.notify(format!("{name} joined"), Some(link_id));
                    }
                    if let Some(me) = &self.local_user {
                        link.send(&Envelope::Identity { user: me.clone() });
                    }
                }
            }
            Envelope::ReqIdentity => {
                if let Some(me) = &self.local_user {
                    link.send(&Envelope::Identity { user: me.clone() });
                }
            }
            Envelope::Chat { ref text, ref user } => {
                self.deliver_local(ChatLogEntry::chat(text, &user.name));
                if is_host {
                    self.broadcast(&envelope, Some(link_id));
                }
            }
            Envelope::System { ref text } => {
                self.deliver_local(ChatLogEntry::system(text));
                if is_host {
                    self.broadcast(&envelope, Some(link_id));
                }
            }
            Envelope::Leave { user_id } => {
                // a link may only announce the departure of its own user
                let own = self.peers.get(link_id).is_some_and(|p| p.user.id == user_id);
                if !own {
                    warn!(link = %link_id, user = %user_id, "leave for another user ignored");
                    return;
                }
                if let Some(record) = self.drop_link(link_id, "left") {
                    if is_host {
                        self.notify(format!("{} left", record.user.name), None);
                    }
                }
                if !is_host {
                    self.teardown("host left");
                }
            }
            Envelope::Kick => {
                if is_host {
                    warn!(link = %link_id, "{}", ProtocolError::Unexpected("kick"));
                } else {
                    self.deliver_local(ChatLogEntry::system("You were removed from the session"));
                    self.teardown("kicked by host");
                }
            }
            Envelope::Close => {
                if is_host {
                    warn!(link = %link_id, "{}", ProtocolError::Unexpected("close"));
                } else {
                    self.deliver_local(ChatLogEntry::system("The host ended the session"));
                    self.teardown("host closed the session");
                }
            }
        }
    }

    fn on_open(&mut self, link: &PeerLink) {
        if !link.mark_open() {
            return;
        }
        self.ctx.bus.publish(BusEvent::Connected {
            peer_id: link.id().to_string(),
        });
        self.set_status(SessionStatus::InSession);

        // both ends do this; duplicate identities are absorbed by upsert_peer
        if let Some(me) = &self.local_user {
            link.send(&Envelope::Identity { user: me.clone() });
        }
        link.send(&Envelope::ReqIdentity);
    }

    fn on_link_closed(&mut self, link_id: &str, reason: &str) {
        let record = self.drop_link(link_id, reason);
        match self.role {
            Some(Role::Host) => {
                if let Some(record) = record {
                    self.notify(format!("{} left", record.user.name), None);
                }
            }
            Some(Role::Guest) => {
                if self.pending.is_empty() && self.peers.is_empty() {
                    self.deliver_local(ChatLogEntry::system("Connection to the host was lost"));
                    self.teardown(reason);
                }
            }
            None => {}
        }
    }

    /// Inserts or overwrites the record for `link_id`. Returns true if it is new.
    fn upsert_peer(&mut self, link_id: &str, user: UserProfile) -> bool {
        if let Some(record) = self.peers.get_mut(link_id) {
            if record.user != user {
                debug!(peer = %link_id, name = %user.name, "profile updated");
                record.user = user.clone();
                self.ctx.bus.publish(BusEvent::PeerJoined {
                    peer_id: link_id.to_string(),
                    user,
                });
            }
            return false;
        }
        let Some(link) = self.pending.remove(link_id) else {
            return false;
        };
        info!(peer = %link_id, name = %user.name, "peer identified");
        self.peers.insert(
            link_id.to_string(),
            PeerRecord {
                peer_id: link_id.to_string(),
                user: user.clone(),
                link,
            },
        );
        self.ctx.bus.publish(BusEvent::PeerJoined {
            peer_id: link_id.to_string(),
            user,
        });
        true
    }

    /// Closes and forgets a link, publishing what the UI needs to know.
    fn drop_link(&mut self, link_id: &str, reason: &str) -> Option<PeerRecord> {
        let record = self.peers.remove(link_id);
        let link = match &record {
            Some(record) => record.link.clone(),
            None => self.pending.remove(link_id)?,
        };

        let was_connected = link.is_connected();
        link.close_with_reason(reason);

        if let Some(record) = &record {
            self.ctx.bus.publish(BusEvent::PeerLeft {
                peer_id: link_id.to_string(),
                user: Some(record.user.clone()),
            });
        }
        if was_connected {
            self.ctx.bus.publish(BusEvent::Disconnected {
                peer_id: link_id.to_string(),
                reason: reason.to_string(),
            });
        }
        record
    }

    fn teardown(&mut self, reason: &str) {
        info!(reason, "session ended");
        let ids: Vec<String> = self.pending.keys().chain(self.peers.keys()).cloned().collect();
        for id in ids {
            self.drop_link(&id, reason);
        }
        self.set_status(SessionStatus::Ended);
    }

    /// A system notice shown locally and, on the host, sent to every guest
    /// except `except`.
    fn notify(&mut self, text: String, except: Option<&str>) {
        self.deliver_local(ChatLogEntry::system(&text));
        if self.role == Some(Role::Host) {
            self.broadcast(&Envelope::System { text }, except);
        }
    }

    /// Sends to every identified peer except `except`; returns the failure count.
    fn broadcast(&self, envelope: &Envelope, except: Option<&str>) -> usize {
        self.peers
            .values()
            .filter(|p| Some(p.peer_id.as_str()) != except)
            .filter(|p| !p.link.send(envelope))
            .count()
    }

    fn deliver_local(&self, entry: ChatLogEntry) {
        self.ctx.history.append(entry.clone());
        self.ctx.bus.publish(BusEvent::Message(entry));
    }

    fn connected_links(&self) -> Vec<PeerLink> {
        self.peers
            .values()
            .map(|p| &p.link)
            .chain(self.pending.values())
            .filter(|l| l.is_connected())
            .cloned()
            .collect()
    }

    fn link(&self, link_id: &str) -> Option<&PeerLink> {
        self.peers
            .get(link_id)
            .map(|p| &p.link)
            .or_else(|| self.pending.get(link_id))
    }

    async fn open_link(&self) -> Result<PeerLink, SessionError> {
        Ok(PeerLink::open(
            self.ctx.transport.as_ref(),
            self.ctx.codec.clone(),
            self.events_tx.clone(),
        )
        .await?)
    }

    fn enter_role(
        &mut self,
        role: Role,
        status: SessionStatus,
        op: &'static str,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::Lobby {
            return Err(self.wrong_state(op));
        }
        self.role = Some(role);
        self.set_status(status);
        Ok(())
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        debug!(from = %self.status, to = %status, "session status");
        self.status = status;
        self.ctx.bus.publish(BusEvent::StatusChanged(status));
    }

    fn wrong_state(&self, op: &'static str) -> SessionError {
        SessionError::WrongState {
            op,
            status: self.status,
        }
    }
}

fn unusable(reason: &str) -> SessionError {
    SessionError::InvalidCode(InvalidCode::Unusable(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Topic;
    use crate::peer::loopback::LoopbackTransport;
    use std::sync::Mutex;

    fn session(transport: &LoopbackTransport) -> (Session, mpsc::UnboundedReceiver<LinkEvent>) {
        Session::new(SessionContext::new(Arc::new(transport.clone())))
    }

    #[test]
    fn roles_need_a_login_first() {
        let transport = LoopbackTransport::new();
        let (mut s, _rx) = session(&transport);
        assert!(matches!(
            s.start_hosting(),
            Err(SessionError::WrongState { op: "start_hosting", .. })
        ));
        s.login(UserProfile::new("Ann")).unwrap();
        assert_eq!(s.status(), SessionStatus::Lobby);
        s.start_joining().unwrap();
        assert_eq!(s.role(), Some(Role::Guest));
        assert!(s.start_hosting().is_err());
    }

    #[test]
    fn status_changes_are_published() {
        let transport = LoopbackTransport::new();
        let (mut s, _rx) = session(&transport);
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            s.context().bus.subscribe(Topic::StatusChanged, move |event, _| {
                if let BusEvent::StatusChanged(status) = event {
                    seen.lock().unwrap().push(*status);
                }
            });
        }
        s.login(UserProfile::new("Ann")).unwrap();
        s.start_hosting().unwrap();
        s.exit();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionStatus::Lobby, SessionStatus::Hosting, SessionStatus::Ended]
        );
        s.return_to_lobby().unwrap();
        assert_eq!(s.status(), SessionStatus::Lobby);
        assert_eq!(s.role(), None);
    }

    #[tokio::test]
    async fn guest_cannot_invite_and_host_cannot_accept_invites() {
        let transport = LoopbackTransport::new();
        let (mut host, _h) = session(&transport);
        let (mut guest, _g) = session(&transport);
        host.login(UserProfile::new("Ann")).unwrap();
        guest.login(UserProfile::new("Bob")).unwrap();
        host.start_hosting().unwrap();
        guest.start_joining().unwrap();

        assert!(guest.invite_guest().await.is_err());
        let offer = host.invite_guest().await.unwrap();
        assert!(host.accept_invite(&offer).await.is_err());
    }

    #[tokio::test]
    async fn cancelled_invites_are_closed() {
        let transport = LoopbackTransport::new();
        let (mut host, _h) = session(&transport);
        host.login(UserProfile::new("Ann")).unwrap();
        host.start_hosting().unwrap();
        host.invite_guest().await.unwrap();
        let id = host.pending_links().next().unwrap().id().to_string();
        let link = host.pending_links().next().unwrap().clone();

        assert!(host.cancel_invite(&id));
        assert!(!host.cancel_invite(&id));
        assert_eq!(link.state(), LinkState::Closed);
        assert_eq!(transport.live_endpoints(), 0);
    }

    #[test]
    fn injected_bus_and_codec_are_used() {
        let transport = LoopbackTransport::new();
        let bus = EventBus::new();
        let ctx = SessionContext::new(Arc::new(transport))
            .with_bus(bus.clone())
            .with_codec(Arc::new(GzipBase64Codec));
        let (mut s, _rx) = Session::new(ctx);
        s.login(UserProfile::new("Ann").with_avatar("avatars/ann.png")).unwrap();
        assert_eq!(bus.state().status, SessionStatus::Lobby);
        assert_eq!(
            s.local_user().and_then(|u| u.avatar_ref.as_deref()),
            Some("avatars/ann.png")
        );
    }

    #[test]
    fn empty_chat_is_not_sent() {
        let transport = LoopbackTransport::new();
        let (mut s, _rx) = session(&transport);
        s.login(UserProfile::new("Ann")).unwrap();
        s.start_hosting().unwrap();
        assert!(!s.send_chat("   "));
        assert!(s.send_chat("talking to myself"));
    }
}
