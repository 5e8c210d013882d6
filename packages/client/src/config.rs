//! Command line and environment configuration.

use std::time::Duration;

use clap::Parser;

use crate::{
    domain::{ConversationType, RoomId, UserId, ValueObjectError},
    infrastructure::history::{DEFAULT_PAGE_SIZE, HistoryConfig},
    session::{Credential, SessionConfig},
    usecase::RoomContext,
};

/// Kaiwa chat room client
#[derive(Parser, Debug, Clone)]
#[command(name = "kaiwa-client")]
#[command(about = "Join a Kaiwa chat room from the terminal")]
#[command(version)]
pub struct Args {
    /// STOMP over WebSocket endpoint of the message broker
    #[arg(long, env = "KAIWA_BROKER_URL", default_value = "ws://127.0.0.1:8080/ws")]
    pub broker_url: String,

    /// Origin of the REST API serving room history
    #[arg(long, env = "KAIWA_API_URL", default_value = "http://127.0.0.1:8080")]
    pub api_url: String,

    /// Bearer token of the logged-in user
    #[arg(long, env = "KAIWA_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Room to open
    #[arg(long)]
    pub room_id: i64,

    /// Conversation type of the room (e.g. group, direct)
    #[arg(long, default_value = "group")]
    pub conversation_type: String,

    /// User ID of the logged-in user
    #[arg(long)]
    pub sender_id: i64,

    /// Messages per history page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Seconds to wait for the STOMP handshake
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub session: SessionConfig,
    pub history: HistoryConfig,
    pub credential: Credential,
    pub room: RoomContext,
}

impl TryFrom<Args> for ClientConfig {
    type Error = ValueObjectError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let room = RoomContext {
            room_id: RoomId::new(args.room_id)?,
            conversation_type: ConversationType::new(args.conversation_type)?,
            sender_id: UserId::new(args.sender_id)?,
            page_size: args.page_size,
        };
        let history = HistoryConfig::new(args.api_url);
        let session = SessionConfig::new(args.broker_url)
            .with_connect_timeout(Duration::from_secs(args.connect_timeout_secs));

        Ok(Self {
            session,
            history,
            credential: Credential::new(args.token)?,
            room,
        })
    }
}
