use crate::peer::state::LinkState;
use thiserror::Error;

/// Malformed signaling token.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty code")]
    Empty,

    #[error("code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("code does not decompress: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("decompressed code exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("code is not a connection descriptor: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport or candidate negotiation failure.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("{op} is not allowed in state {state}")]
    WrongState { op: &'static str, state: LinkState },

    #[error("{op} is only valid on the offering side")]
    WrongRole { op: &'static str },

    #[error("expected an {expected} descriptor")]
    WrongKind { expected: &'static str },

    #[error("code belongs to another invitation ({id})")]
    ForeignCode { id: String },

    #[error("invalid code: {0}")]
    Decode(#[from] DecodeError),

    #[error("link closed while negotiating")]
    Closed,

    #[error("transport: {0}")]
    Transport(String),
}

impl From<webrtc::Error> for NegotiationError {
    fn from(e: webrtc::Error) -> Self {
        NegotiationError::Transport(e.to_string())
    }
}

/// Send attempted while the link has no open channel.
#[derive(Debug, Error)]
#[error("channel unavailable in state {state}")]
pub struct ChannelUnavailableError {
    pub state: LinkState,
}

/// Inbound frame that is not a recognized envelope.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unrecognized envelope type {0:?}")]
    UnknownType(String),

    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{0} is not valid in this role")]
    Unexpected(&'static str),
}

/// Why a scanned or typed code could not be used.
#[derive(Debug, Error)]
pub enum InvalidCode {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Unusable(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid code")]
    InvalidCode(#[source] InvalidCode),

    #[error("{op} is not allowed while {status}")]
    WrongState {
        op: &'static str,
        status: crate::session::SessionStatus,
    },

    #[error("negotiation failed: {0}")]
    Negotiation(NegotiationError),
}

impl From<NegotiationError> for SessionError {
    fn from(e: NegotiationError) -> Self {
        match e {
            NegotiationError::Decode(d) => SessionError::InvalidCode(InvalidCode::Decode(d)),
            NegotiationError::WrongKind { expected } => SessionError::InvalidCode(
                InvalidCode::Unusable(format!("expected an {expected} code")),
            ),
            NegotiationError::ForeignCode { id } => SessionError::InvalidCode(
                InvalidCode::Unusable(format!("no pending invitation {id}")),
            ),
            other => SessionError::Negotiation(other),
        }
    }
}

impl From<DecodeError> for SessionError {
    fn from(e: DecodeError) -> Self {
        SessionError::InvalidCode(InvalidCode::Decode(e))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
