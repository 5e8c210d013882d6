//! Test fixtures: a fake STOMP broker and a fake history REST backend.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use kaiwa_client::infrastructure::stomp::{Command, Frame};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// STOMP broker listening on an ephemeral port.
pub struct FakeBroker {
    addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<BrokerConnection>,
}

/// Broker side of one WebSocket connection.
pub struct BrokerConnection {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl FakeBroker {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake broker");
        let addr = listener.local_addr().expect("Failed to read local address");
        let (tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(socket) = accept_async(stream).await else {
                    continue;
                };
                let (mut sink, mut source) = socket.split();
                let (to_client, mut outbound) = mpsc::unbounded_channel::<String>();
                let (inbound, from_client) = mpsc::unbounded_channel::<String>();

                tokio::spawn(async move {
                    while let Some(text) = outbound.recv().await {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                    let _ = sink.close().await;
                });
                tokio::spawn(async move {
                    while let Some(Ok(message)) = source.next().await {
                        if let Message::Text(text) = message
                            && inbound.send(text.as_str().to_owned()).is_err()
                        {
                            return;
                        }
                    }
                });

                if tx
                    .send(BrokerConnection {
                        to_client,
                        from_client,
                    })
                    .is_err()
                {
                    return;
                }
            }
        });

        Self { addr, connections }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Wait for the next client and complete its STOMP handshake.
    pub async fn accept(&mut self) -> (BrokerConnection, Frame) {
        let mut connection = self
            .connections
            .recv()
            .await
            .expect("Fake broker stopped accepting");
        let connect = connection.recv_frame().await.expect("No CONNECT frame");
        assert_eq!(connect.command, Command::Connect);
        connection.send_frame(&Frame::new(Command::Connected).header("version", "1.2"));
        (connection, connect)
    }
}

impl BrokerConnection {
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        while let Some(raw) = self.from_client.recv().await {
            if let Ok(Some(frame)) = Frame::decode(&raw) {
                return Some(frame);
            }
        }
        None
    }

    pub fn send_frame(&self, frame: &Frame) {
        let _ = self.to_client.send(frame.encode());
    }

    /// Read one SUBSCRIBE and return its subscription id.
    pub async fn expect_subscribe(&mut self, destination: &str) -> String {
        let frame = self.recv_frame().await.expect("No SUBSCRIBE frame");
        assert_eq!(frame.command, Command::Subscribe);
        assert_eq!(frame.get("destination"), Some(destination));
        frame.get("id").expect("SUBSCRIBE without id").to_string()
    }

    pub fn push(&self, subscription: &str, destination: &str, body: &str) {
        self.send_frame(
            &Frame::new(Command::Message)
                .header("subscription", subscription)
                .header("destination", destination)
                .header("message-id", "1")
                .header("content-type", "application/json")
                .body(body),
        );
    }
}

/// Chat message JSON as the backend sends it.
pub fn message_json(id: i64, sequence: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "senderId": 1,
        "content": format!("message {id}"),
        "createdAt": "2024-05-01T09:00:00",
        "messageType": "TEXT",
        "sequence": sequence,
        "unreadCount": 1
    })
}

/// One request received by [`FakeHistory`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub room_id: i64,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct HistoryState {
    token: String,
    /// Response body by cursor ("" for the newest page)
    pages: Arc<HashMap<String, serde_json::Value>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// History REST backend serving canned pages.
pub struct FakeHistory {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeHistory {
    /// Serve `pages` (keyed by cursor, "" for the newest page) to requests
    /// bearing `token`.
    pub async fn start(token: &str, pages: Vec<(&str, serde_json::Value)>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = HistoryState {
            token: token.to_string(),
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(cursor, body)| (cursor.to_string(), body))
                    .collect(),
            ),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/api/chat/rooms/{room_id}/messages", get(messages_handler))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake history server");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn messages_handler(
    State(state): State<HistoryState>,
    Path(room_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(RecordedRequest {
        room_id,
        query: query.clone(),
        authorization: authorization.clone(),
    });

    if authorization.as_deref() != Some(format!("Bearer {}", state.token).as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let cursor = query.get("cursor").cloned().unwrap_or_default();
    match state.pages.get(&cursor) {
        Some(body) => Json(body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
