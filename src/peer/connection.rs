use crate::config::Config;
use crate::error::NegotiationError;
use crate::logger::dump_candidate;
use crate::peer::data_channel::{attach_dc, ChannelSlot};
use crate::peer::ice::gather_local_description;
use crate::peer::transport::{Connection, Transport};
use crate::peer::types::{LinkEventSink, ServerConfig};
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::{
    api::APIBuilder,
    data_channel::{data_channel_init::RTCDataChannelInit, RTCDataChannel},
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
};

/// WebRTC data-channel transport.
#[derive(Debug, Clone)]
pub struct WebRtcTransport {
    ice_servers: Vec<ServerConfig>,
    channel_label: String,
}

impl WebRtcTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            ice_servers: config.ice_servers.clone(),
            channel_label: config.channel_label.clone(),
        }
    }
}

#[async_trait]
impl Transport for WebRtcTransport {
    async fn connect(
        &self,
        events: LinkEventSink,
    ) -> Result<Box<dyn Connection>, NegotiationError> {
        let pc = new_peer(&self.ice_servers, &events).await?;
        let slot = ChannelSlot::new(pc.clone());
        Ok(Box::new(WebRtcConnection {
            pc,
            slot,
            label: self.channel_label.clone(),
            events,
        }))
    }
}

struct WebRtcConnection {
    pc: Arc<RTCPeerConnection>,
    slot: Arc<ChannelSlot>,
    label: String,
    events: LinkEventSink,
}

#[async_trait]
impl Connection for WebRtcConnection {
    async fn create_offer(&self) -> Result<String, NegotiationError> {
        // offering side owns the data channel
        let dc = self
            .pc
            .create_data_channel(&self.label, Some(RTCDataChannelInit::default()))
            .await?;
        attach_dc(&dc, self.slot.clone(), self.events.clone());

        let offer = self.pc.create_offer(None).await?;
        gather_local_description(&self.pc, offer).await
    }

    async fn create_answer(&self, remote_offer: &str) -> Result<String, NegotiationError> {
        let slot = self.slot.clone();
        let events = self.events.clone();
        self.pc
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                attach_dc(&dc, slot.clone(), events.clone());
                Box::pin(async {})
            }));

        let offer = RTCSessionDescription::offer(remote_offer.to_owned())?;
        self.pc.set_remote_description(offer).await?;
        let answer = self.pc.create_answer(None).await?;
        gather_local_description(&self.pc, answer).await
    }

    async fn apply_answer(&self, remote_answer: &str) -> Result<(), NegotiationError> {
        let answer = RTCSessionDescription::answer(remote_answer.to_owned())?;
        self.pc.set_remote_description(answer).await?;
        Ok(())
    }

    fn send_text(&self, frame: String) -> bool {
        self.slot.send_text(frame)
    }

    fn close(&self) {
        self.slot.close();
    }
}

/// Creates a peer connection that reports state changes to `events`.
pub async fn new_peer(
    servers: &[ServerConfig],
    events: &LinkEventSink,
) -> Result<Arc<RTCPeerConnection>, NegotiationError> {
    let api = APIBuilder::new().build();
    let pc = Arc::new(api.new_peer_connection(rtc_config(servers)).await?);

    pc.on_ice_candidate(Box::new({
        let link_id = events.link_id().to_string();
        move |cand: Option<RTCIceCandidate>| {
            match cand {
                Some(c) => dump_candidate(&link_id, &c),
                // None marks the end of gathering
                None => debug!(link = %link_id, "candidate gathering completed"),
            }
            Box::pin(async {})
        }
    }));

    pc.on_ice_gathering_state_change(Box::new(move |state| {
        debug!("ICE gathering state changed to: {:?}", state);
        Box::pin(async {})
    }));

    let sink = events.clone();
    pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
        info!(link = sink.link_id(), "peer connection state: {:?}", st);
        match st {
            // no grace period: a dropped link needs a fresh handshake
            RTCPeerConnectionState::Failed => sink.closed("connection failed"),
            RTCPeerConnectionState::Closed => sink.closed("connection closed"),
            RTCPeerConnectionState::Disconnected => {
                warn!(link = sink.link_id(), "connection interrupted, waiting for ICE")
            }
            _ => {}
        }
        Box::pin(async {})
    }));

    Ok(pc)
}

/// Peer connection configuration for the given ICE servers.
pub fn rtc_config(servers: &[ServerConfig]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: get_user_ice_servers(servers),
        ice_candidate_pool_size: 10,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

pub fn get_user_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ice_servers_get_schemes_and_credentials() {
        let servers = vec![
            ServerConfig {
                id: "s".into(),
                r#type: "stun".into(),
                url: "stun.example.org:3478".into(),
                username: None,
                credential: None,
            },
            ServerConfig {
                id: "t".into(),
                r#type: "turn".into(),
                url: "relay.example.org:3478".into(),
                username: Some("user".into()),
                credential: Some("secret".into()),
            },
        ];
        let ice = get_user_ice_servers(&servers);
        assert_eq!(ice[0].urls, vec!["stun:stun.example.org:3478".to_string()]);
        assert!(ice[0].username.is_empty());
        assert_eq!(ice[1].urls, vec!["turn:relay.example.org:3478".to_string()]);
        assert_eq!(ice[1].credential, "secret");
    }

    #[test]
    fn config_bundles_everything() {
        let cfg = rtc_config(&[]);
        assert_eq!(cfg.bundle_policy, RTCBundlePolicy::MaxBundle);
        assert_eq!(cfg.ice_candidate_pool_size, 10);
    }
}
