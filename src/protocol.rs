//! Wire envelopes exchanged over a peer data channel, one JSON text frame each.

use crate::error::ProtocolError;
use crate::utils::random_id;
use serde::{Deserialize, Serialize};

/// Self-asserted identity of a participant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "avatarRef", default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

impl UserProfile {
    /// Fresh profile with a random id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: random_id(),
            name: name.into(),
            avatar_ref: None,
        }
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = Some(avatar_ref.into());
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    Chat {
        text: String,
        user: UserProfile,
    },
    System {
        text: String,
    },
    Identity {
        user: UserProfile,
    },
    ReqIdentity,
    Leave {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Kick,
    Close,
}

const KNOWN_TYPES: [&str; 7] = [
    "chat",
    "system",
    "identity",
    "req-identity",
    "leave",
    "kick",
    "close",
];

impl Envelope {
    pub fn type_name(&self) -> &'static str {
        match self {
            Envelope::Chat { .. } => "chat",
            Envelope::System { .. } => "system",
            Envelope::Identity { .. } => "identity",
            Envelope::ReqIdentity => "req-identity",
            Envelope::Leave { .. } => "leave",
            Envelope::Kick => "kick",
            Envelope::Close => "close",
        }
    }

    pub fn to_frame(&self) -> String {
        // every variant is plain strings; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a text frame, telling unknown types apart from broken known ones.
    pub fn from_frame(frame: &str) -> Result<Envelope, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(frame)?;
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        if !KNOWN_TYPES.contains(&tag.as_str()) {
            return Err(ProtocolError::UnknownType(tag));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Chat-log line handed to the history store and surfaced to the UI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogEntry {
    pub text: String,
    pub sender: String,
    pub is_system: bool,
    pub timestamp: i64,
}

/// Sender name recorded for system notices.
pub const SYSTEM_SENDER: &str = "System";

impl ChatLogEntry {
    pub fn chat(text: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            is_system: false,
            timestamp: crate::utils::now_ms(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: SYSTEM_SENDER.to_string(),
            is_system: true,
            timestamp: crate::utils::now_ms(),
        }
    }
}
