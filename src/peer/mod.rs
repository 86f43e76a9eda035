pub mod connection;
pub mod data_channel;
pub mod ice;
pub mod link;
pub mod loopback;
pub mod state;
pub mod transport;
pub mod types;

pub use connection::WebRtcTransport;
pub use link::PeerLink;
pub use loopback::LoopbackTransport;
pub use state::{LinkRole, LinkState};
pub use transport::{Connection, Transport};
pub use types::{LinkEvent, LinkEventKind, LinkEventSink, ServerConfig};
