use crate::peer::types::LinkEventSink;
use crate::utils::lock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::data_channel::{data_channel_message::DataChannelMessage, RTCDataChannel};
use webrtc::peer_connection::RTCPeerConnection;

/// Outbound side of a link's data channel.
///
/// Frames are queued on an unbounded channel and written by one task per link,
/// which keeps them in send order. Closing drops the queue's sender: the writer
/// flushes what is queued, then closes the channel and the peer connection.
pub struct ChannelSlot {
    open: AtomicBool,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pending: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    peer: Mutex<Option<Arc<RTCPeerConnection>>>,
}

impl ChannelSlot {
    pub fn new(pc: Arc<RTCPeerConnection>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            open: AtomicBool::new(false),
            outbound: Mutex::new(Some(tx)),
            pending: Mutex::new(Some(rx)),
            peer: Mutex::new(Some(pc)),
        })
    }

    pub fn send_text(&self, frame: String) -> bool {
        if !self.open.load(Ordering::SeqCst) {
            return false;
        }
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        lock(&self.outbound).take();
        // the writer never started: nothing to flush
        if lock(&self.pending).take().is_some() {
            self.shutdown_peer();
        }
    }

    fn shutdown_peer(&self) {
        if let Some(pc) = lock(&self.peer).take() {
            tokio::spawn(async move {
                if let Err(e) = pc.close().await {
                    debug!("peer connection close: {e}");
                }
            });
        }
    }
}

/// Wires a data channel's callbacks to the link's event sink and writer.
pub fn attach_dc(dc: &Arc<RTCDataChannel>, slot: Arc<ChannelSlot>, events: LinkEventSink) {
    info!(link = events.link_id(), label = dc.label(), "data channel attached");

    dc.on_open(Box::new({
        let dc = dc.clone();
        let slot = slot.clone();
        let events = events.clone();
        move || {
            Box::pin(async move {
                let Some(rx) = lock(&slot.pending).take() else {
                    debug!(link = events.link_id(), "channel opened after close");
                    return;
                };
                slot.open.store(true, Ordering::SeqCst);
                events.open();
                tokio::spawn(write_frames(dc, rx, slot, events));
            })
        }
    }));

    dc.on_message(Box::new({
        let events = events.clone();
        move |msg: DataChannelMessage| {
            if !msg.is_string {
                warn!(link = events.link_id(), len = msg.data.len(), "binary frame dropped");
            } else {
                match String::from_utf8(msg.data.to_vec()) {
                    Ok(frame) => events.message(frame),
                    Err(e) => warn!(link = events.link_id(), "non-utf8 text frame dropped: {e}"),
                }
            }
            Box::pin(async {})
        }
    }));

    dc.on_close(Box::new(move || {
        events.closed("data channel closed");
        Box::pin(async {})
    }));
}

async fn write_frames(
    dc: Arc<RTCDataChannel>,
    mut rx: mpsc::UnboundedReceiver<String>,
    slot: Arc<ChannelSlot>,
    events: LinkEventSink,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = dc.send_text(frame).await {
            warn!(link = events.link_id(), "data channel send failed: {e}");
            slot.open.store(false, Ordering::SeqCst);
            events.closed(format!("send failed: {e}"));
            break;
        }
    }
    let _ = dc.close().await;
    slot.shutdown_peer();
}
