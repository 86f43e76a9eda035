use std::fmt;

/// Negotiation state of one peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    GatheringLocal,
    LocalReady,
    AwaitingRemote,
    Connected,
    Closed,
}

impl LinkState {
    pub fn is_closed(&self) -> bool {
        matches!(self, LinkState::Closed)
    }

    /// Whether the channel-open event may move this state to `Connected`.
    pub fn can_open(&self) -> bool {
        matches!(self, LinkState::LocalReady | LinkState::AwaitingRemote)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Idle => "idle",
            LinkState::GatheringLocal => "gathering-local",
            LinkState::LocalReady => "local-ready",
            LinkState::AwaitingRemote => "awaiting-remote",
            LinkState::Connected => "connected",
            LinkState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Side of the handshake a link plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// Offering side; creates the data channel.
    Host,
    /// Answering side; receives the data channel.
    Guest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_negotiated_states_can_open() {
        assert!(LinkState::LocalReady.can_open());
        assert!(LinkState::AwaitingRemote.can_open());
        assert!(!LinkState::Idle.can_open());
        assert!(!LinkState::GatheringLocal.can_open());
        assert!(!LinkState::Closed.can_open());
    }

    #[test]
    fn display_is_kebab_case() {
        assert_eq!(LinkState::AwaitingRemote.to_string(), "awaiting-remote");
    }
}
