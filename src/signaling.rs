//! Out-of-band signaling: connection descriptors packed into QR-safe text codes.
//!
//! A code is `base64(gzip(json(descriptor)))`. The descriptor carries the complete
//! SDP with every gathered candidate, so one code is enough for each handshake step.

use crate::error::DecodeError;
use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Upper bound on the decompressed payload (zip-bomb guard).
pub const MAX_DECOMPRESSED_SIZE: u64 = 256 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Offer,
    Answer,
}

/// One side's negotiation data plus the id of the link that offered it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    #[serde(rename = "type")]
    pub kind: DescriptorKind,
    pub sdp: String,
    /// Link id of the offering side; an answer echoes the offer's id.
    pub id: String,
    pub ts: i64,
}

impl ConnectionDescriptor {
    pub fn offer(id: impl Into<String>, sdp: impl Into<String>) -> Self {
        Self::new(DescriptorKind::Offer, id, sdp)
    }

    pub fn answer(id: impl Into<String>, sdp: impl Into<String>) -> Self {
        Self::new(DescriptorKind::Answer, id, sdp)
    }

    fn new(kind: DescriptorKind, id: impl Into<String>, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
            id: id.into(),
            ts: chrono::Utc::now().timestamp(),
        }
    }
}

/// Reversible descriptor <-> text token encoding.
pub trait Codec: Send + Sync {
    fn encode(&self, descriptor: &ConnectionDescriptor) -> String;
    fn decode(&self, token: &str) -> Result<ConnectionDescriptor, DecodeError>;
}

/// JSON, gzip, standard base64.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipBase64Codec;

impl Codec for GzipBase64Codec {
    fn encode(&self, descriptor: &ConnectionDescriptor) -> String {
        enc(descriptor)
    }

    fn decode(&self, token: &str) -> Result<ConnectionDescriptor, DecodeError> {
        dec(token)
    }
}

pub fn enc(p: &ConnectionDescriptor) -> String {
    // serializing a struct of strings into memory cannot fail
    let json = serde_json::to_vec(p).unwrap_or_default();

    let mut gz = GzEncoder::new(Vec::new(), Compression::best());
    // writes into a Vec are infallible
    let _ = gz.write_all(&json);
    let compressed = gz.finish().unwrap_or_default();

    general_purpose::STANDARD.encode(compressed)
}

pub fn dec(s: &str) -> Result<ConnectionDescriptor, DecodeError> {
    // typed codes tend to pick up line breaks and spaces
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(DecodeError::Empty);
    }

    let compressed = general_purpose::STANDARD.decode(cleaned.as_bytes())?;

    let gz = GzDecoder::new(&compressed[..]);
    let mut json = Vec::new();
    // read one byte past the limit so an oversized payload is detected, not truncated
    let mut limited_reader = gz.take(MAX_DECOMPRESSED_SIZE + 1);
    limited_reader
        .read_to_end(&mut json)
        .map_err(DecodeError::Decompress)?;
    if json.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(DecodeError::TooLarge {
            limit: MAX_DECOMPRESSED_SIZE,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}
