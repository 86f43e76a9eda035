use crate::config::LoggingConfig;
use tracing::debug;
use tracing_subscriber::{fmt, fmt::time::ChronoLocal, EnvFilter};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;

/// Timestamp format for log lines
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Returns false when
/// logging is disabled or a subscriber was already installed.
pub fn init(config: &LoggingConfig) -> bool {
    if !config.enabled {
        return false;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Logs a local candidate as it is gathered
pub fn dump_candidate(label: &str, cand: &RTCIceCandidate) {
    if let Ok(init) = cand.to_json() {
        debug!(
            "candidate {label}: candidate={} sdp_mid={:?} sdp_mline_index={:?}",
            init.candidate, init.sdp_mid, init.sdp_mline_index
        );
    }
}
