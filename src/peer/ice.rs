use crate::error::NegotiationError;
use crate::peer::types::ServerConfig;
use crate::utils::add_ice_url_scheme;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webrtc::{
    api::APIBuilder,
    ice_transport::{ice_candidate::RTCIceCandidate, ice_server::RTCIceServer},
    peer_connection::{
        configuration::RTCConfiguration, sdp::session_description::RTCSessionDescription,
        RTCPeerConnection,
    },
};

/// How long a server probe waits for a matching candidate.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Sets the local description and waits for the full candidate set.
///
/// No trickle: the returned SDP has to stand alone in a QR code.
pub async fn gather_local_description(
    pc: &RTCPeerConnection,
    desc: RTCSessionDescription,
) -> Result<String, NegotiationError> {
    let mut gather_complete = pc.gathering_complete_promise().await;
    pc.set_local_description(desc).await?;
    let _ = gather_complete.recv().await;

    let local = pc
        .local_description()
        .await
        .ok_or_else(|| NegotiationError::Transport("no local description after gathering".into()))?;
    analyze_candidates(&local.sdp);
    Ok(local.sdp)
}

/// Candidate counts by type found in an SDP body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSummary {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
}

pub fn summarize_candidates(sdp: &str) -> CandidateSummary {
    let mut summary = CandidateSummary::default();
    for line in sdp.lines().filter(|l| l.starts_with("a=candidate:")) {
        if line.contains("typ host") {
            summary.host += 1;
        } else if line.contains("typ srflx") {
            summary.srflx += 1;
        } else if line.contains("typ relay") {
            summary.relay += 1;
        }
    }
    summary
}

pub fn analyze_candidates(sdp: &str) -> CandidateSummary {
    let summary = summarize_candidates(sdp);
    info!(
        "Candidate analysis: {} host, {} srflx, {} relay",
        summary.host, summary.srflx, summary.relay
    );
    if summary.relay == 0 {
        warn!("No TURN relay candidates found! Connection through NAT may fail.");
    }
    summary
}

/// Checks that a STUN (srflx) or TURN (relay) server hands out candidates.
pub async fn probe_ice_server(config: &ServerConfig) -> bool {
    let url = add_ice_url_scheme(config);
    debug!("Probing ICE server '{}' -> '{}'", config.url, url);

    let rtc_config = RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: vec![url],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        }],
        ..Default::default()
    };

    let api = APIBuilder::new().build();
    match api.new_peer_connection(rtc_config).await {
        Ok(pc) => {
            let pc = Arc::new(pc);
            let found = check_via_ice_gathering(&pc, &config.r#type).await;
            let _ = pc.close().await;
            found
        }
        Err(e) => {
            warn!("Failed to create peer connection: {:?}", e);
            false
        }
    }
}

async fn check_via_ice_gathering(pc: &Arc<RTCPeerConnection>, server_type: &str) -> bool {
    let wanted = if server_type == "turn" { "typ relay" } else { "typ srflx" };
    let (tx, mut rx) = mpsc::channel::<bool>(10);

    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let tx = tx.clone();
        Box::pin(async move {
            let Some(c) = candidate else {
                // gathering finished without a match
                let _ = tx.send(false).await;
                return;
            };
            match c.to_json() {
                Ok(json) if json.candidate.contains(wanted) => {
                    let _ = tx.send(true).await;
                }
                Ok(json) => debug!("Candidate type mismatch: {}", json.candidate),
                Err(e) => debug!("Failed to get candidate JSON: {:?}", e),
            }
        })
    }));

    if let Err(e) = pc.create_data_channel("probe", None).await {
        warn!("Failed to create data channel: {:?}", e);
        return false;
    }
    let offer = match pc.create_offer(None).await {
        Ok(offer) => offer,
        Err(e) => {
            warn!("Failed to create offer: {:?}", e);
            return false;
        }
    };
    if let Err(e) = pc.set_local_description(offer).await {
        warn!("Failed to set local description: {:?}", e);
        return false;
    }

    match timeout(PROBE_TIMEOUT, rx.recv()).await {
        Ok(Some(found)) => found,
        Ok(None) => false,
        Err(_) => {
            debug!("Timeout waiting for a {} candidate", wanted);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_counted_by_type() {
        let sdp = "v=0\r\n\
            a=candidate:1 1 udp 2130706431 192.168.1.5 50000 typ host\r\n\
            a=candidate:2 1 udp 1694498815 203.0.113.7 50001 typ srflx raddr 0.0.0.0 rport 0\r\n\
            a=candidate:3 1 udp 16777215 198.51.100.2 3478 typ relay raddr 0.0.0.0 rport 0\r\n\
            a=candidate:4 1 udp 2130706431 10.0.0.2 50002 typ host\r\n\
            a=end-of-candidates\r\n";
        assert_eq!(
            summarize_candidates(sdp),
            CandidateSummary {
                host: 2,
                srflx: 1,
                relay: 1
            }
        );
    }

    #[test]
    fn sdp_without_candidates_is_empty() {
        assert_eq!(summarize_candidates("v=0\r\ns=-\r\n"), CandidateSummary::default());
    }
}
