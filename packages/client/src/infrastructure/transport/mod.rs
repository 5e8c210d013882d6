//! Text links to the message broker.
//!
//! A [`Connector`] opens one link per session connect. The link is a pair of
//! unbounded channels carrying raw STOMP frames as text; a background task
//! owned by the connector pumps them to and from the socket.

pub mod memory;
pub mod websocket;

use async_trait::async_trait;
use thiserror::Error;
use tokio::{sync::mpsc, task::AbortHandle};

pub use memory::{BrokerEnd, MemoryBroker, MemoryConnector};
pub use websocket::WebSocketConnector;

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// An open link to the broker.
///
/// Dropping `outbound` lets the writer flush queued frames and close the
/// socket. `inbound` ends when the socket closes.
pub struct Link {
    /// Frames to the broker.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Frames from the broker.
    pub inbound: mpsc::UnboundedReceiver<String>,
    /// Socket reader task, aborted when the session tears the link down.
    pub reader: Option<AbortHandle>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a link to `url`. Each call is one socket handshake.
    async fn open(&self, url: &str) -> Result<Link, TransportError>;
}
