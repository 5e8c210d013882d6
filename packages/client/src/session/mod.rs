//! Transport session.
//!
//! One [`Session`] per client owns the broker connection. The application
//! shell owns the `Session` and is the only party that can connect or
//! disconnect it; room views receive a [`SessionHandle`], which can observe
//! the connection state, subscribe and publish, but cannot tear the
//! connection down.
//!
//! A single reader task decodes inbound frames and routes MESSAGE frames to
//! the [`SubscriptionRegistry`]. Delivery is FIFO per subscription.
//! Destinations read by several room views go through a [`SharedSubscription`]
//! so the views do not replace each other's broker subscription.

pub mod credential;
pub mod error;
mod feed;
pub mod registry;
pub mod state;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use tokio::{
    sync::{mpsc, watch},
    task::AbortHandle,
};

pub use credential::{Credential, CredentialStore};
pub use error::SessionError;
pub use feed::SharedSubscription;
pub use registry::{InboundMessage, SubscriptionHandle, SubscriptionRegistry};
pub use state::ConnectionState;

use crate::{
    domain::Destination,
    infrastructure::{
        stomp::{self, Command, Frame},
        transport::{Connector, Link},
    },
};

/// Default time allowed for the STOMP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the broker, e.g. `ws://localhost:8080/ws`
    pub broker_url: String,
    /// Value of the CONNECT `host` header
    pub host: String,
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(broker_url: impl Into<String>) -> Self {
        let broker_url = broker_url.into();
        let host = host_of(&broker_url);
        Self {
            broker_url,
            host,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

/// Host part of a `ws://host:port/path` URL.
fn host_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = without_scheme.split('/').next().unwrap_or_default();
    authority
        .rsplit_once(':')
        .map_or(authority, |(host, _)| host)
        .to_string()
}

/// Live socket: outbound sender plus the tasks to stop on teardown.
struct ActiveLink {
    outbound: mpsc::UnboundedSender<String>,
    dispatcher: AbortHandle,
    reader: Option<AbortHandle>,
}

struct Shared {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    credentials: CredentialStore,
    registry: SubscriptionRegistry,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Option<ActiveLink>>,
    /// Fan-out readers by destination.
    feeds: Mutex<HashMap<Destination, Weak<feed::Feed>>>,
    /// Serializes connect attempts.
    connect_gate: tokio::sync::Mutex<()>,
    /// Number of settled connect attempts.
    settled_attempts: AtomicU64,
    /// Bumped on every new link so a stale dispatcher cannot reset the state.
    link_generation: AtomicU64,
}

impl Shared {
    fn link(&self) -> MutexGuard<'_, Option<ActiveLink>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn feeds(&self) -> MutexGuard<'_, HashMap<Destination, Weak<feed::Feed>>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::debug!("Session state -> {}", state);
        self.state.send_replace(state);
    }

    fn send_frame(&self, frame: &Frame) -> Result<(), SessionError> {
        let link = self.link();
        let active = link
            .as_ref()
            .ok_or_else(|| SessionError::TransportUnavailable("not connected".to_string()))?;
        active
            .outbound
            .send(frame.encode())
            .map_err(|_| SessionError::TransportUnavailable("link closed".to_string()))
    }

    fn subscribe(self: &Arc<Self>, destination: Destination) -> Result<Subscription, SessionError> {
        if !self.state().is_connected() {
            return Err(SessionError::NotConnected(destination.to_string()));
        }

        let registration = self.registry.register(destination.clone());
        if let Some(replaced) = &registration.replaced {
            tracing::warn!(
                "Destination {} was already subscribed as {}; replacing it with {}",
                destination,
                replaced.id(),
                registration.handle.id()
            );
            if let Err(e) = self.send_frame(&stomp::unsubscribe_frame(replaced.id())) {
                tracing::warn!("Failed to unsubscribe replaced {}: {}", replaced.id(), e);
            }
        }

        if let Err(e) =
            self.send_frame(&stomp::subscribe_frame(registration.handle.id(), destination.as_str()))
        {
            self.registry.release(&registration.handle);
            return Err(e);
        }
        tracing::info!("Subscribed to {} as {}", destination, registration.handle.id());

        Ok(Subscription {
            shared: self.clone(),
            handle: registration.handle,
            receiver: registration.receiver,
        })
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        if !self.registry.release(handle) {
            return false;
        }
        // The socket may already be gone; the registry entry is what matters.
        if let Err(e) = self.send_frame(&stomp::unsubscribe_frame(handle.id())) {
            tracing::debug!("UNSUBSCRIBE {} not sent: {}", handle.id(), e);
        }
        tracing::info!("Unsubscribed {} from {}", handle.id(), handle.destination());
        true
    }
}

/// Broker session owned by the application shell.
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        credentials: CredentialStore,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                credentials,
                registry: SubscriptionRegistry::new(),
                state,
                link: Mutex::new(None),
                feeds: Mutex::new(HashMap::new()),
                connect_gate: tokio::sync::Mutex::new(()),
                settled_attempts: AtomicU64::new(0),
                link_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Restricted handle for room views.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.shared.credentials
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Connect to the broker.
    ///
    /// Idempotent: when already connected this returns immediately, and
    /// callers arriving while an attempt is in flight wait for it and get
    /// its outcome instead of starting another handshake. After a failure
    /// the session stays `Failed` until a caller retries. The credential is
    /// only checked when a handshake is about to start.
    pub async fn connect(&self) -> Result<(), SessionError> {
        if self.shared.state().is_connected() {
            return Ok(());
        }

        let observed = self.shared.settled_attempts.load(Ordering::Acquire);
        let _gate = self.shared.connect_gate.lock().await;

        if self.shared.settled_attempts.load(Ordering::Acquire) != observed {
            // Another caller's attempt settled while we waited.
            return match self.shared.state() {
                ConnectionState::Connected => Ok(()),
                other => Err(SessionError::TransportUnavailable(other.to_string())),
            };
        }
        if self.shared.state().is_connected() {
            return Ok(());
        }

        let credential = self
            .shared
            .credentials
            .current()
            .ok_or(SessionError::MissingCredential)?;
        if credential.is_expired_at(Utc::now()) {
            let expired_at = credential.expires_at().unwrap_or_else(Utc::now);
            return Err(SessionError::CredentialExpired(expired_at));
        }

        self.shared.set_state(ConnectionState::Connecting);
        let result = self.handshake(&credential).await;
        match &result {
            Ok(()) => {
                tracing::info!("Connected to {}", self.shared.config.broker_url);
                self.shared.set_state(ConnectionState::Connected);
            }
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", self.shared.config.broker_url, e);
                self.shared.set_state(ConnectionState::Failed {
                    reason: e.to_string(),
                });
            }
        }
        self.shared.settled_attempts.fetch_add(1, Ordering::AcqRel);
        result
    }

    async fn handshake(&self, credential: &Credential) -> Result<(), SessionError> {
        let config = &self.shared.config;
        let Link {
            outbound,
            mut inbound,
            reader,
        } = self
            .shared
            .connector
            .open(&config.broker_url)
            .await
            .map_err(|e| SessionError::TransportUnavailable(e.to_string()))?;

        let abort_reader = || {
            if let Some(reader) = &reader {
                reader.abort();
            }
        };

        let connect = stomp::connect_frame(&config.host, credential.token());
        if outbound.send(connect.encode()).is_err() {
            abort_reader();
            return Err(SessionError::TransportUnavailable(
                "link closed before CONNECT".to_string(),
            ));
        }

        match tokio::time::timeout(config.connect_timeout, await_connected(&mut inbound)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                abort_reader();
                return Err(e);
            }
            Err(_) => {
                abort_reader();
                return Err(SessionError::TransportUnavailable(format!(
                    "no CONNECTED frame within {:?}",
                    config.connect_timeout
                )));
            }
        }

        let generation = self.shared.link_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let dispatcher = tokio::spawn(dispatch_loop(
            Arc::downgrade(&self.shared),
            inbound,
            generation,
        ));
        *self.shared.link() = Some(ActiveLink {
            outbound,
            dispatcher: dispatcher.abort_handle(),
            reader,
        });
        Ok(())
    }

    /// Release every subscription, then close the socket.
    pub async fn disconnect(&self) {
        let _gate = self.shared.connect_gate.lock().await;
        // Readers whose stream ends from here on see a non-connected session.
        self.shared.set_state(ConnectionState::Disconnected);

        for handle in self.shared.registry.drain() {
            if let Err(e) = self.shared.send_frame(&stomp::unsubscribe_frame(handle.id())) {
                tracing::debug!("UNSUBSCRIBE {} not sent: {}", handle.id(), e);
            }
        }

        let active = self.shared.link().take();
        if let Some(active) = active {
            if active.outbound.send(stomp::disconnect_frame().encode()).is_err() {
                tracing::debug!("DISCONNECT not sent: link already closed");
            }
            active.dispatcher.abort();
            if let Some(reader) = active.reader {
                reader.abort();
            }
            // Dropping `outbound` lets the writer flush and close the socket.
            tracing::info!("Disconnected from {}", self.shared.config.broker_url);
        }
        // A subscribe racing the teardown cannot outlive the link.
        self.shared.registry.drain();
    }
}

/// Wait for CONNECTED, skipping heart-beats.
async fn await_connected(inbound: &mut mpsc::UnboundedReceiver<String>) -> Result<(), SessionError> {
    while let Some(raw) = inbound.recv().await {
        match Frame::decode(&raw) {
            Ok(None) => continue,
            Ok(Some(frame)) if frame.command == Command::Connected => return Ok(()),
            Ok(Some(frame)) if frame.command == Command::Error => {
                let message = frame.get("message").unwrap_or("broker refused CONNECT");
                return Err(SessionError::TransportUnavailable(message.to_string()));
            }
            Ok(Some(frame)) => {
                tracing::warn!("Ignoring {} before CONNECTED", frame.command);
            }
            Err(e) => {
                return Err(SessionError::TransportUnavailable(format!(
                    "malformed handshake reply: {e}"
                )));
            }
        }
    }
    Err(SessionError::TransportUnavailable(
        "link closed during handshake".to_string(),
    ))
}

/// Route inbound frames until the link closes.
async fn dispatch_loop(
    shared: Weak<Shared>,
    mut inbound: mpsc::UnboundedReceiver<String>,
    generation: u64,
) {
    while let Some(raw) = inbound.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let frame = match Frame::decode(&raw) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {}", e);
                continue;
            }
        };

        match frame.command {
            Command::Message => {
                let destination = frame.get("destination").map(Destination::from_wire);
                let subscription = frame.get("subscription");
                let delivered =
                    shared
                        .registry
                        .dispatch(subscription, destination.as_ref(), frame.body.clone());
                if !delivered {
                    tracing::debug!(
                        "No live subscription for MESSAGE (subscription={:?}, destination={:?})",
                        subscription,
                        destination
                    );
                }
            }
            Command::Error => {
                tracing::warn!(
                    "Broker ERROR: {} {}",
                    frame.get("message").unwrap_or_default(),
                    frame.body
                );
            }
            Command::Receipt => {
                tracing::debug!("RECEIPT {}", frame.get("receipt-id").unwrap_or_default());
            }
            other => {
                tracing::debug!("Ignoring unexpected {} frame", other);
            }
        }
    }

    // The socket closed on its own. Streams end so views notice.
    if let Some(shared) = shared.upgrade()
        && shared.link_generation.load(Ordering::Acquire) == generation
    {
        tracing::warn!("Connection to {} lost", shared.config.broker_url);
        shared.link().take();
        shared.set_state(ConnectionState::Disconnected);
        let dropped = shared.registry.drain();
        if !dropped.is_empty() {
            tracing::info!("Dropped {} subscription(s) with the connection", dropped.len());
        }
    }
}

/// Room-view side of the session: observe, subscribe, publish.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Subscribe to `destination`. Only valid once the session is connected.
    pub fn subscribe(&self, destination: Destination) -> Result<Subscription, SessionError> {
        self.shared.subscribe(destination)
    }

    /// Subscribe to `destination` through a feed shared with other readers
    /// of this session. The broker subscription is released when the last
    /// reader is dropped.
    pub fn subscribe_shared(
        &self,
        destination: Destination,
    ) -> Result<SharedSubscription, SessionError> {
        feed::attach(&self.shared, destination)
    }

    /// Release a subscription by handle. Returns `false` for stale handles.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        self.shared.unsubscribe(handle)
    }

    /// SEND a JSON body to `destination`.
    pub fn publish(&self, destination: &Destination, json_body: String) -> Result<(), SessionError> {
        if !self.shared.state().is_connected() {
            return Err(SessionError::TransportUnavailable(
                "session is not connected".to_string(),
            ));
        }
        self.shared
            .send_frame(&stomp::send_frame(destination.as_str(), json_body))
    }

    pub fn is_subscribed(&self, destination: &Destination) -> bool {
        self.shared.registry.is_subscribed(destination)
    }
}

/// A live subscription, released when dropped.
pub struct Subscription {
    shared: Arc<Shared>,
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<InboundMessage>,
}

impl Subscription {
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    pub fn destination(&self) -> &Destination {
        self.handle.destination()
    }

    /// Next message, or `None` once the subscription is released, replaced,
    /// or the connection is gone.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.receiver.recv().await
    }

}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.unsubscribe(&self.handle);
        self.receiver.close();
    }
}
