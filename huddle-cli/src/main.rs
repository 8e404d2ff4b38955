use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_client::{
    LocalMedia, MediaKind, PeerConfig, PeerState, RemoteStream, RoomMembership, SessionConfig,
    SessionController, SessionObserver, SessionStatus, WebRtcConnector,
};
use huddle_core::{ChatMessage, SessionIdentity, UserId, UserJoined};
use huddle_relay::RelayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Interview room signaling relay and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:5002")]
        bind: SocketAddr,
    },

    /// Join a room as a participant and chat from the terminal.
    Join {
        /// Relay base URL. Defaults to HUDDLE_SIGNALING_URL or localhost.
        #[arg(long)]
        server: Option<Url>,

        #[arg(long)]
        room: String,

        #[arg(long)]
        user_id: String,

        /// Display name; prompted for when missing.
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        interviewer: bool,

        /// Attach no local tracks.
        #[arg(long)]
        receive_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind } => {
            println!("{}", format!("Relay listening on {bind}").green().bold());
            huddle_relay::run(RelayConfig { bind }).await?;
        }

        Commands::Join {
            server,
            room,
            user_id,
            name,
            interviewer,
            receive_only,
        } => {
            let name = match name {
                Some(name) => name,
                None => dialoguer::Input::<String>::new()
                    .with_prompt("Your name")
                    .interact_text()
                    .context("Failed to read name")?,
            };
            let identity = SessionIdentity::new(room, user_id.clone(), name, interviewer)?;

            let mut config = SessionConfig::from_env();
            if let Some(server) = server {
                config.endpoints = vec![server];
            }

            let media = if receive_only {
                LocalMedia::none()
            } else {
                LocalMedia::audio_video(&user_id)
            };

            join(identity, config, media).await?;
        }
    }

    Ok(())
}

async fn join(identity: SessionIdentity, config: SessionConfig, media: LocalMedia) -> Result<()> {
    let mut session = SessionController::new(
        config,
        Arc::new(TerminalObserver),
        Arc::new(WebRtcConnector::new(PeerConfig::default())),
        media,
    );

    println!(
        "{}",
        format!("Joining {} as {}...", identity.room(), identity.user_name()).cyan()
    );
    session.initialize(identity).await?;
    println!(
        "{}",
        "Type to chat. /mute, /video, /rejoin, /quit.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_line(&session, line.trim())? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown().await;
    info!("Session ended");
    println!("{}", "Left the room.".cyan());
    Ok(())
}

/// Returns false when the user asked to leave.
fn run_line(session: &SessionController, line: &str) -> Result<bool> {
    match line {
        "/quit" => return Ok(false),
        "/mute" => report_toggle(session.media().toggle(MediaKind::Audio), "Microphone"),
        "/video" => report_toggle(session.media().toggle(MediaKind::Video), "Camera"),
        "/rejoin" => session.rejoin()?,
        text => session.send_chat_message(text)?,
    }
    Ok(true)
}

fn report_toggle(enabled: Option<bool>, what: &str) {
    match enabled {
        Some(true) => println!("{}", format!("{what} on").green()),
        Some(false) => println!("{}", format!("{what} off").yellow()),
        None => println!("{}", format!("No {} track", what.to_lowercase()).dimmed()),
    }
}

struct TerminalObserver;

impl SessionObserver for TerminalObserver {
    fn on_status(&self, status: SessionStatus) {
        let line = format!("[{status:?}]");
        match status {
            SessionStatus::Connected => println!("{}", line.green()),
            SessionStatus::Failed => println!("{}", line.red().bold()),
            _ => println!("{}", line.dimmed()),
        }
    }

    fn on_room_joined(&self, membership: &RoomMembership) {
        println!(
            "{}",
            format!(
                "Joined {} ({} present)",
                membership.room, membership.members
            )
            .green()
            .bold()
        );
    }

    fn on_user_joined(&self, joined: &UserJoined) {
        let role = if joined.is_interviewer {
            "interviewer"
        } else {
            "candidate"
        };
        println!(
            "{}",
            format!("{} joined as {}", joined.user_name, role).cyan()
        );
    }

    fn on_user_left(&self, user_id: &UserId) {
        println!("{}", format!("{user_id} left").cyan());
    }

    fn on_chat(&self, message: &ChatMessage) {
        println!("{} {}", format!("{}:", message.user_name).bold(), message.message);
    }

    fn on_remote_stream(&self, peer: &UserId, stream: &RemoteStream) {
        println!(
            "{}",
            format!("Receiving {:?} from {} ({})", stream.kind, peer, stream.stream_id).dimmed()
        );
    }

    fn on_peer_state(&self, peer: &UserId, state: PeerState) {
        if matches!(state, PeerState::Connected | PeerState::Failed) {
            println!("{}", format!("Media with {peer}: {state:?}").dimmed());
        }
    }

    fn on_notice(&self, notice: &str) {
        println!("{}", notice.yellow().bold());
    }
}
