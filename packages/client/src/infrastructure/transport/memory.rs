//! In-memory connector.
//!
//! Hands the broker side of every link to a [`MemoryBroker`] so tests can
//! script the server without a socket.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connector, Link, TransportError};
use crate::infrastructure::stomp::{Command, Frame};

pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<BrokerEnd>,
    handshakes: Arc<AtomicUsize>,
    refuse: AtomicBool,
}

/// Receives the broker side of each link opened through the connector.
pub struct MemoryBroker {
    accepted: mpsc::UnboundedReceiver<BrokerEnd>,
    handshakes: Arc<AtomicUsize>,
}

/// Broker side of one link.
pub struct BrokerEnd {
    pub to_client: mpsc::UnboundedSender<String>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryBroker) {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let handshakes = Arc::new(AtomicUsize::new(0));
        let connector = Self {
            accepted: accepted_tx,
            handshakes: handshakes.clone(),
            refuse: AtomicBool::new(false),
        };
        let broker = MemoryBroker {
            accepted: accepted_rx,
            handshakes,
        };
        (connector, broker)
    }

    /// Make subsequent `open` calls fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, url: &str) -> Result<Link, TransportError> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connection(format!("{url} refused the connection")));
        }

        let (to_broker_tx, to_broker_rx) = mpsc::unbounded_channel();
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        self.accepted
            .send(BrokerEnd {
                to_client: to_client_tx,
                from_client: to_broker_rx,
            })
            .map_err(|_| TransportError::Connection("memory broker is gone".to_string()))?;

        Ok(Link {
            outbound: to_broker_tx,
            inbound: to_client_rx,
            reader: None,
        })
    }
}

impl MemoryBroker {
    /// Wait for the next link.
    pub async fn accept(&mut self) -> Option<BrokerEnd> {
        self.accepted.recv().await
    }

    /// Number of `open` calls so far, successful or not.
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }
}

impl BrokerEnd {
    /// Next decodable frame from the client, skipping heart-beats.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        while let Some(raw) = self.from_client.recv().await {
            if let Ok(Some(frame)) = Frame::decode(&raw) {
                return Some(frame);
            }
        }
        None
    }

    pub fn send_frame(&self, frame: &Frame) -> bool {
        self.to_client.send(frame.encode()).is_ok()
    }

    /// Read the client's CONNECT and answer CONNECTED.
    pub async fn accept_connect(&mut self) -> Option<Frame> {
        let connect = self.recv_frame().await?;
        if connect.command != Command::Connect {
            return None;
        }
        self.send_frame(&Frame::new(Command::Connected).header("version", "1.2"));
        Some(connect)
    }

    /// Push a MESSAGE for `subscription` on `destination`.
    pub fn push(&self, subscription: &str, destination: &str, body: &str) -> bool {
        let frame = Frame::new(Command::Message)
            .header("subscription", subscription)
            .header("destination", destination)
            .header("message-id", "0")
            .body(body);
        self.send_frame(&frame)
    }
}
