use super::input::{parse_input, Input};
use crate::config::Config;
use crate::events::{BusEvent, BusState};
use crate::peer::WebRtcTransport;
use crate::protocol::UserProfile;
use crate::session::{Session, SessionContext, SessionStatus};
use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Time given to writer tasks to flush goodbye frames before the runtime stops
const FLUSH_GRACE: Duration = Duration::from_millis(500);

/// Runs an interactive session on the terminal until it ends or stdin closes.
pub async fn run(
    config: &Config,
    name: String,
    code: Option<String>,
    host: bool,
) -> anyhow::Result<()> {
    let ctx = SessionContext::new(Arc::new(WebRtcTransport::new(config)));
    ctx.bus.subscribe_updates(print_event);

    let (mut session, mut events) = Session::new(ctx);
    session.login(UserProfile::new(name))?;

    if host {
        session.start_hosting()?;
        println!("Hosting. Type /invite for a new invitation code.");
        invite(&mut session).await;
    } else {
        session.start_joining()?;
        match code {
            Some(code) => submit(&mut session, &code).await,
            None => println!("Paste the host's invitation with /code <code>."),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    session.exit();
                    break;
                };
                if !handle_line(&mut session, &line).await {
                    break;
                }
            }
            Some(event) = events.recv() => {
                session.handle_link_event(event);
                session.process_pending(&mut events);
            }
        }
        if session.status() == SessionStatus::Ended {
            break;
        }
    }

    tokio::time::sleep(FLUSH_GRACE).await;
    info!("chat finished");
    Ok(())
}

/// Returns false once the user asked to leave.
async fn handle_line(session: &mut Session, line: &str) -> bool {
    match parse_input(line) {
        Input::Empty => {}
        Input::Chat(text) => {
            if !session.send_chat(&text) {
                println!("! message not delivered ({})", session.status());
            }
        }
        Input::Invite => invite(session).await,
        Input::Code(code) => submit(session, &code).await,
        Input::Kick(peer) => {
            if !session.kick(&peer) {
                println!("! no guest {peer} to remove");
            }
        }
        Input::Peers => {
            for peer in session.peers() {
                println!("  {}  {}  [{}]", peer.peer_id, peer.user.name, peer.status());
            }
            for link in session.pending_links() {
                println!("  {}  (not identified)  [{}]", link.id(), link.state());
            }
        }
        Input::Quit => {
            session.exit();
            return false;
        }
        Input::Unknown(cmd) => {
            println!("! unknown command {cmd}; try /invite, /code, /kick, /peers or /quit")
        }
    }
    true
}

async fn invite(session: &mut Session) {
    match session.invite_guest().await {
        Ok(code) => {
            println!("Invitation code, show it to one guest:");
            println!("{code}");
        }
        Err(e) => println!("! could not create an invitation: {e}"),
    }
}

async fn submit(session: &mut Session, code: &str) {
    match session.submit_code(code).await {
        Ok(Some(answer)) => {
            println!("Answer code, show it back to the host:");
            println!("{answer}");
        }
        Ok(None) => println!("Answer accepted, connecting..."),
        Err(e) => match e.source() {
            Some(cause) => println!("! {e}: {cause}"),
            None => println!("! {e}"),
        },
    }
}

fn print_event(event: &BusEvent, state: &BusState) {
    match event {
        BusEvent::Message(entry) if entry.is_system => println!("* {}", entry.text),
        BusEvent::Message(entry) => println!("<{}> {}", entry.sender, entry.text),
        BusEvent::Connected { peer_id } => {
            debug!(peer = %peer_id, links = state.connected_links, "connected")
        }
        BusEvent::Disconnected { peer_id, reason } => {
            println!("* link {peer_id} closed: {reason}")
        }
        BusEvent::StatusChanged(status) => println!("* {status}"),
        BusEvent::PeerJoined { .. } | BusEvent::PeerLeft { .. } => {}
    }
}
