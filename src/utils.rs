use crate::peer::types::ServerConfig;
use rand::Rng;
use std::sync::{Mutex, MutexGuard};

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

/// Unix time in milliseconds, as carried by chat-log entries.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Prepends the stun:/turn: scheme to an ICE server URL when it is missing
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    if config.url.starts_with("turn:") || config.url.starts_with("stun:") {
        config.url.clone()
    } else {
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(kind: &str, url: &str) -> ServerConfig {
        ServerConfig {
            id: "t".into(),
            r#type: kind.into(),
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    #[test]
    fn random_ids_are_hex_and_distinct() {
        let a = random_id();
        let b = random_id();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn scheme_is_added_by_server_type() {
        assert_eq!(
            add_ice_url_scheme(&server("stun", "stun.example.org:3478")),
            "stun:stun.example.org:3478"
        );
        assert_eq!(
            add_ice_url_scheme(&server("turn", "relay.example.org:3478")),
            "turn:relay.example.org:3478"
        );
    }

    #[test]
    fn existing_scheme_is_kept() {
        assert_eq!(
            add_ice_url_scheme(&server("turn", "stun:stun.l.google.com:19302")),
            "stun:stun.l.google.com:19302"
        );
    }
}
