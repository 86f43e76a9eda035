use crate::error::{ChannelUnavailableError, NegotiationError};
use crate::peer::state::{LinkRole, LinkState};
use crate::peer::transport::{Connection, Transport};
use crate::peer::types::{LinkEvent, LinkEventSink};
use crate::protocol::Envelope;
use crate::signaling::{Codec, ConnectionDescriptor, DescriptorKind};
use crate::utils::{lock, random_id};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One peer connection and its negotiation state machine.
///
/// Cloning yields another handle to the same link, so a negotiation awaited on
/// one task can be cancelled with [`PeerLink::close`] from another.
#[derive(Clone)]
pub struct PeerLink {
    inner: Arc<LinkInner>,
}

struct LinkInner {
    id: String,
    codec: Arc<dyn Codec>,
    conn: Box<dyn Connection>,
    shared: Mutex<Shared>,
}

struct Shared {
    state: LinkState,
    role: Option<LinkRole>,
    remote_applied: bool,
    close_reason: Option<String>,
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("role", &self.role())
            .finish()
    }
}

impl PeerLink {
    /// Opens a transport connection for a new link with a random id.
    pub async fn open(
        transport: &dyn Transport,
        codec: Arc<dyn Codec>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self, NegotiationError> {
        let id = random_id();
        let conn = transport.connect(LinkEventSink::new(id.clone(), events)).await?;
        Ok(Self::with_connection(id, codec, conn))
    }

    /// Wraps an already created connection.
    pub fn with_connection(id: String, codec: Arc<dyn Codec>, conn: Box<dyn Connection>) -> Self {
        debug!(link = %id, "link created");
        Self {
            inner: Arc::new(LinkInner {
                id,
                codec,
                conn,
                shared: Mutex::new(Shared {
                    state: LinkState::Idle,
                    role: None,
                    remote_applied: false,
                    close_reason: None,
                }),
            }),
        }
    }

    /// Random id, echoed back in the answer descriptor.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Current negotiation state.
    pub fn state(&self) -> LinkState {
        lock(&self.inner.shared).state
    }

    /// Set by the first negotiation call.
    pub fn role(&self) -> Option<LinkRole> {
        lock(&self.inner.shared).role
    }

    /// Why the link closed, once it has.
    pub fn close_reason(&self) -> Option<String> {
        lock(&self.inner.shared).close_reason.clone()
    }

    /// True while the data channel is open.
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Host side: gathers a complete offer and returns it as a code.
    pub async fn create_offer(&self) -> Result<String, NegotiationError> {
        self.begin_gathering("create_offer", LinkRole::Host)?;

        let result = self.inner.conn.create_offer().await;
        let sdp = self.finish_gathering(result)?;

        let descriptor = ConnectionDescriptor::offer(self.inner.id.clone(), sdp);
        info!(link = %self.inner.id, "offer ready");
        Ok(self.inner.codec.encode(&descriptor))
    }

    /// Guest side: applies a scanned offer and returns the answer code.
    pub async fn accept_offer(&self, token: &str) -> Result<String, NegotiationError> {
        {
            let shared = lock(&self.inner.shared);
            if shared.state != LinkState::Idle {
                return Err(NegotiationError::WrongState {
                    op: "accept_offer",
                    state: shared.state,
                });
            }
        }
        let offer = self.inner.codec.decode(token)?;
        if offer.kind != DescriptorKind::Offer {
            return Err(NegotiationError::WrongKind { expected: "offer" });
        }

        self.begin_gathering("accept_offer", LinkRole::Guest)?;
        lock(&self.inner.shared).remote_applied = true;

        let result = self.inner.conn.create_answer(&offer.sdp).await;
        let sdp = self.finish_gathering(result)?;

        let descriptor = ConnectionDescriptor::answer(offer.id, sdp);
        info!(link = %self.inner.id, offer = %descriptor.id, "answer ready");
        Ok(self.inner.codec.encode(&descriptor))
    }

    /// Host side: applies the guest's answer. Channel open later drives `Connected`.
    pub async fn accept_answer(&self, token: &str) -> Result<(), NegotiationError> {
        {
            let shared = lock(&self.inner.shared);
            if shared.role != Some(LinkRole::Host) {
                return Err(NegotiationError::WrongRole { op: "accept_answer" });
            }
            let ready = matches!(shared.state, LinkState::LocalReady | LinkState::AwaitingRemote);
            if !ready || shared.remote_applied {
                return Err(NegotiationError::WrongState {
                    op: "accept_answer",
                    state: shared.state,
                });
            }
        }
        let answer = self.inner.codec.decode(token)?;
        if answer.kind != DescriptorKind::Answer {
            return Err(NegotiationError::WrongKind { expected: "answer" });
        }
        if answer.id != self.inner.id {
            return Err(NegotiationError::ForeignCode { id: answer.id });
        }

        {
            let mut shared = lock(&self.inner.shared);
            if shared.state.is_closed() {
                return Err(NegotiationError::Closed);
            }
            shared.state = LinkState::AwaitingRemote;
            shared.remote_applied = true;
        }

        let result = self.inner.conn.apply_answer(&answer.sdp).await;
        if self.state().is_closed() {
            return Err(NegotiationError::Closed);
        }
        if let Err(e) = result {
            self.close_with_reason(format!("applying answer failed: {e}"));
            return Err(e);
        }
        debug!(link = %self.inner.id, "answer applied, awaiting channel");
        Ok(())
    }

    /// Channel-open event. Returns false when the link can no longer open.
    pub fn mark_open(&self) -> bool {
        let mut shared = lock(&self.inner.shared);
        if !shared.state.can_open() {
            debug!(link = %self.inner.id, state = %shared.state, "late channel open ignored");
            return false;
        }
        shared.state = LinkState::Connected;
        info!(link = %self.inner.id, "channel open");
        true
    }

    /// Sends an envelope, reporting why it could not be queued.
    pub fn try_send(&self, envelope: &Envelope) -> Result<(), ChannelUnavailableError> {
        let state = self.state();
        if state != LinkState::Connected {
            return Err(ChannelUnavailableError { state });
        }
        if self.inner.conn.send_text(envelope.to_frame()) {
            Ok(())
        } else {
            Err(ChannelUnavailableError { state })
        }
    }

    /// Sends an envelope; false if the channel is not open or the write failed.
    pub fn send(&self, envelope: &Envelope) -> bool {
        match self.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                debug!(link = %self.inner.id, kind = envelope.type_name(), "send failed: {e}");
                false
            }
        }
    }

    /// Closes the link and releases the transport. Idempotent.
    pub fn close(&self) {
        self.close_with_reason("closed locally");
    }

    /// Moves to `Closed` once; returns false if the link was already closed.
    pub fn close_with_reason(&self, reason: impl Into<String>) -> bool {
        {
            let mut shared = lock(&self.inner.shared);
            if shared.state.is_closed() {
                return false;
            }
            let reason = reason.into();
            info!(link = %self.inner.id, from = %shared.state, "link closed: {reason}");
            shared.state = LinkState::Closed;
            shared.close_reason = Some(reason);
        }
        self.inner.conn.close();
        true
    }

    fn begin_gathering(&self, op: &'static str, role: LinkRole) -> Result<(), NegotiationError> {
        let mut shared = lock(&self.inner.shared);
        if shared.state != LinkState::Idle {
            return Err(NegotiationError::WrongState {
                op,
                state: shared.state,
            });
        }
        shared.state = LinkState::GatheringLocal;
        shared.role = Some(role);
        debug!(link = %self.inner.id, ?role, "gathering local candidates");
        Ok(())
    }

    // Gathering completes at most once per link; a completion after close is dropped.
    fn finish_gathering(
        &self,
        result: Result<String, NegotiationError>,
    ) -> Result<String, NegotiationError> {
        {
            let mut shared = lock(&self.inner.shared);
            if shared.state != LinkState::GatheringLocal {
                debug!(
                    link = %self.inner.id,
                    state = %shared.state,
                    "late gathering completion ignored"
                );
                return Err(NegotiationError::Closed);
            }
            if result.is_ok() {
                shared.state = LinkState::LocalReady;
            }
        }
        result.map_err(|e| {
            warn!(link = %self.inner.id, "gathering failed: {e}");
            self.close_with_reason(format!("negotiation failed: {e}"));
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::loopback::LoopbackTransport;
    use crate::peer::types::LinkEventKind;
    use crate::protocol::UserProfile;
    use crate::signaling::GzipBase64Codec;
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    fn codec() -> Arc<dyn Codec> {
        Arc::new(GzipBase64Codec)
    }

    async fn pair() -> (
        PeerLink,
        PeerLink,
        mpsc::UnboundedReceiver<LinkEvent>,
        mpsc::UnboundedReceiver<LinkEvent>,
    ) {
        let transport = LoopbackTransport::new();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (guest_tx, guest_rx) = mpsc::unbounded_channel();
        let host = PeerLink::open(&transport, codec(), host_tx).await.unwrap();
        let guest = PeerLink::open(&transport, codec(), guest_tx).await.unwrap();
        (host, guest, host_rx, guest_rx)
    }

    #[tokio::test]
    async fn handshake_walks_the_state_machine() {
        let (host, guest, mut host_rx, mut guest_rx) = pair().await;
        assert_eq!(host.state(), LinkState::Idle);

        let offer = host.create_offer().await.unwrap();
        assert_eq!(host.state(), LinkState::LocalReady);
        assert_eq!(host.role(), Some(LinkRole::Host));

        let answer = guest.accept_offer(&offer).await.unwrap();
        assert_eq!(guest.state(), LinkState::LocalReady);
        assert_eq!(guest.role(), Some(LinkRole::Guest));

        host.accept_answer(&answer).await.unwrap();
        assert_eq!(host.state(), LinkState::AwaitingRemote);

        assert_eq!(host_rx.recv().await.unwrap().kind, LinkEventKind::Open);
        assert_eq!(guest_rx.recv().await.unwrap().kind, LinkEventKind::Open);
        assert!(host.mark_open());
        assert!(guest.mark_open());
        assert!(host.is_connected() && guest.is_connected());

        let env = Envelope::Identity {
            user: UserProfile::new("Ann"),
        };
        assert!(host.send(&env));
        match guest_rx.recv().await.unwrap().kind {
            LinkEventKind::Message(frame) => assert_eq!(Envelope::from_frame(&frame).unwrap(), env),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn answer_echoes_the_offer_id() {
        let (host, guest, _h, _g) = pair().await;
        let offer = host.create_offer().await.unwrap();
        let answer = guest.accept_offer(&offer).await.unwrap();
        let decoded = GzipBase64Codec.decode(&answer).unwrap();
        assert_eq!(decoded.kind, DescriptorKind::Answer);
        assert_eq!(decoded.id, host.id());
    }

    #[tokio::test]
    async fn operations_are_rejected_outside_their_states() {
        let (host, guest, _h, _g) = pair().await;
        let offer = host.create_offer().await.unwrap();
        assert!(matches!(
            host.create_offer().await,
            Err(NegotiationError::WrongState { .. })
        ));
        assert!(matches!(
            host.accept_offer(&offer).await,
            Err(NegotiationError::WrongState { .. })
        ));
        let answer = guest.accept_offer(&offer).await.unwrap();
        assert!(matches!(
            guest.accept_answer(&answer).await,
            Err(NegotiationError::WrongRole { .. })
        ));
        host.accept_answer(&answer).await.unwrap();
        assert!(matches!(
            host.accept_answer(&answer).await,
            Err(NegotiationError::WrongState { .. })
        ));
    }

    #[tokio::test]
    async fn wrong_kind_and_foreign_codes_are_refused() {
        let (host, guest, _h, _g) = pair().await;
        let offer = host.create_offer().await.unwrap();
        assert!(matches!(
            host.accept_answer(&offer).await,
            Err(NegotiationError::WrongKind { expected: "answer" })
        ));
        let foreign = GzipBase64Codec.encode(&ConnectionDescriptor::answer("someone-else", "sdp"));
        assert!(matches!(
            host.accept_answer(&foreign).await,
            Err(NegotiationError::ForeignCode { .. })
        ));
        assert!(matches!(
            guest.accept_offer("garbage!").await,
            Err(NegotiationError::Decode(_))
        ));
        // a bad code leaves both links usable
        assert_eq!(host.state(), LinkState::LocalReady);
        assert_eq!(guest.state(), LinkState::Idle);
    }

    #[tokio::test]
    async fn send_fails_until_connected() {
        let (host, _guest, _h, _g) = pair().await;
        assert!(!host.send(&Envelope::Kick));
        host.create_offer().await.unwrap();
        let err = host.try_send(&Envelope::Kick).unwrap_err();
        assert_eq!(err.state, LinkState::LocalReady);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_terminal() {
        let (host, guest, _h, _g) = pair().await;
        let offer = host.create_offer().await.unwrap();
        assert!(host.close_with_reason("user cancelled"));
        assert!(!host.close_with_reason("again"));
        host.close();
        assert_eq!(host.state(), LinkState::Closed);
        assert_eq!(host.close_reason().as_deref(), Some("user cancelled"));

        assert!(!host.mark_open());
        assert!(!host.send(&Envelope::Close));
        assert!(host.create_offer().await.is_err());
        assert_eq!(host.state(), LinkState::Closed);

        // the guest can no longer pair with the withdrawn offer
        assert!(guest.accept_offer(&offer).await.is_err());
        assert_eq!(guest.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn remote_close_reaches_the_other_side() {
        let (host, guest, mut host_rx, mut guest_rx) = pair().await;
        let offer = host.create_offer().await.unwrap();
        let answer = guest.accept_offer(&offer).await.unwrap();
        host.accept_answer(&answer).await.unwrap();
        host_rx.recv().await.unwrap();
        guest_rx.recv().await.unwrap();

        guest.close();
        match host_rx.recv().await.unwrap().kind {
            LinkEventKind::Closed { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Connection whose gathering completes only when the test says so.
    struct HeldGathering {
        release: Mutex<Option<oneshot::Receiver<()>>>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl Connection for HeldGathering {
        async fn create_offer(&self) -> Result<String, NegotiationError> {
            let rx = lock(&self.release).take();
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            Ok("v=0 late".into())
        }

        async fn create_answer(&self, _remote_offer: &str) -> Result<String, NegotiationError> {
            Err(NegotiationError::Transport("unsupported".into()))
        }

        async fn apply_answer(&self, _remote_answer: &str) -> Result<(), NegotiationError> {
            Ok(())
        }

        fn send_text(&self, _frame: String) -> bool {
            false
        }

        fn close(&self) {
            *lock(&self.closed) = true;
        }
    }

    #[tokio::test]
    async fn late_gathering_after_close_is_a_no_op() {
        let (release_tx, release_rx) = oneshot::channel();
        let closed = Arc::new(Mutex::new(false));
        let link = PeerLink::with_connection(
            "held".into(),
            codec(),
            Box::new(HeldGathering {
                release: Mutex::new(Some(release_rx)),
                closed: closed.clone(),
            }),
        );

        let pending = tokio::spawn({
            let link = link.clone();
            async move { link.create_offer().await }
        });
        while link.state() != LinkState::GatheringLocal {
            tokio::task::yield_now().await;
        }

        link.close();
        assert!(*lock(&closed));
        release_tx.send(()).unwrap();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(NegotiationError::Closed)));
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn gathering_failure_closes_the_link() {
        let link = PeerLink::with_connection(
            "fails".into(),
            codec(),
            Box::new(HeldGathering {
                release: Mutex::new(None),
                closed: Arc::new(Mutex::new(false)),
            }),
        );
        let offer = GzipBase64Codec.encode(&ConnectionDescriptor::offer("h", "sdp"));
        assert!(matches!(
            link.accept_offer(&offer).await,
            Err(NegotiationError::Transport(_))
        ));
        assert_eq!(link.state(), LinkState::Closed);
        assert!(link.close_reason().unwrap().contains("unsupported"));
    }
}
