pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod logger;
pub mod peer;
pub mod protocol;
pub mod session;
pub mod signaling;
pub mod utils;

pub use config::Config;
pub use error::{DecodeError, InvalidCode, NegotiationError, ProtocolError, SessionError};
pub use events::{BusEvent, BusState, EventBus, Topic};
pub use history::{HistoryStore, MemoryHistory};
pub use protocol::{ChatLogEntry, Envelope, UserProfile};
pub use session::{PeerRecord, Session, SessionContext, SessionStatus};
pub use signaling::{Codec, ConnectionDescriptor, DescriptorKind, GzipBase64Codec};

use clap::Parser;
use commands::Cli;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    logger::init(&config.logging);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(commands::dispatch(cli, config))
}
