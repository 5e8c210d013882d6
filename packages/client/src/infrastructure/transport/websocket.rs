//! WebSocket connector.

use async_trait::async_trait;
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{Connector, Link, TransportError};

/// Opens STOMP-over-WebSocket links with `tokio-tungstenite`.
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &str) -> Result<Link, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        tracing::debug!("WebSocket connected to {}", url);

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        // Drains until the session drops its sender, then closes the socket
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    tracing::warn!("Failed to write to WebSocket: {}", e);
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                tracing::debug!("WebSocket close failed: {}", e);
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(message) = source.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text.as_str().to_owned(),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            tracing::warn!("Dropping non UTF-8 binary frame ({} bytes)", bytes.len());
                            continue;
                        }
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("Broker closed the WebSocket");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                };
                if inbound_tx.send(text).is_err() {
                    break;
                }
            }
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
            reader: Some(reader.abort_handle()),
        })
    }
}
