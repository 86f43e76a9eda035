//! `qrchat` command line front end.

mod chat;
mod input;
mod probe;

pub use input::{parse_input, Input};

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qrchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file with ICE servers and logging options
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a session and invite guests
    Host {
        /// Display name shown to the other participants
        #[arg(short, long)]
        name: String,
    },
    /// Join a session with the host's invitation code
    Join {
        #[arg(short, long)]
        name: String,

        /// Invitation code; can also be pasted later with /code
        code: Option<String>,
    },
    /// Check that the configured STUN/TURN servers answer
    Probe,
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Ok(Config::load(path)?),
            None => Ok(Config::default()),
        }
    }
}

pub async fn dispatch(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Command::Host { name } => chat::run(&config, name, None, true).await,
        Command::Join { name, code } => chat::run(&config, name, code, false).await,
        Command::Probe => probe::run(&config).await,
    }
}
