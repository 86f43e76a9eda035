//! Capability seam between a [`PeerLink`](super::link::PeerLink) and the
//! connection technology underneath it.

use crate::error::NegotiationError;
use crate::peer::types::LinkEventSink;
use async_trait::async_trait;

/// Factory for peer connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Creates an unnegotiated connection that reports to `events`.
    async fn connect(&self, events: LinkEventSink) -> Result<Box<dyn Connection>, NegotiationError>;
}

/// One peer connection with a single ordered, reliable text channel.
///
/// The negotiation calls resolve only once local candidate gathering is complete,
/// so the returned SDP is self-contained. Channel open, inbound frames and closure
/// are reported through the [`LinkEventSink`] given to [`Transport::connect`].
#[async_trait]
pub trait Connection: Send + Sync {
    /// Creates the data channel and a local offer.
    async fn create_offer(&self) -> Result<String, NegotiationError>;

    /// Applies a remote offer and produces the local answer.
    async fn create_answer(&self, remote_offer: &str) -> Result<String, NegotiationError>;

    /// Applies the remote answer to a previously created offer.
    async fn apply_answer(&self, remote_answer: &str) -> Result<(), NegotiationError>;

    /// Queues a frame behind earlier ones; false if the channel is not writable.
    fn send_text(&self, frame: String) -> bool;

    /// Releases the channel and the connection once queued frames are flushed.
    fn close(&self);
}
