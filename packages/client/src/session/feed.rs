//! Shared feeds: one broker subscription read by many room views.
//!
//! The first reader of a destination subscribes at the broker and a pump task
//! forwards its messages into a [`broadcast`] channel. Later readers attach
//! to the same channel. When the last reader is dropped the broker
//! subscription is released; when the broker subscription ends (link loss,
//! disconnect, replacement) every reader's stream ends.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::{self, error::RecvError};

use crate::domain::Destination;

use super::{InboundMessage, SessionError, Shared, Subscription, SubscriptionHandle};

/// Messages buffered per reader before it starts skipping.
const FEED_CAPACITY: usize = 256;

pub(super) struct Feed {
    shared: Arc<Shared>,
    handle: SubscriptionHandle,
    /// `None` once the broker subscription has ended.
    sender: Mutex<Option<broadcast::Sender<InboundMessage>>>,
}

impl Feed {
    fn sender(&self) -> MutexGuard<'_, Option<broadcast::Sender<InboundMessage>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reader(&self) -> Option<broadcast::Receiver<InboundMessage>> {
        self.sender().as_ref().map(broadcast::Sender::subscribe)
    }

    fn publish(&self, message: InboundMessage) {
        if let Some(sender) = self.sender().as_ref() {
            // Err only means no reader is attached right now.
            let _ = sender.send(message);
        }
    }

    fn close(&self) {
        self.sender().take();
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.shared.unsubscribe(&self.handle);
    }
}

/// Attach to the live feed for `destination`, subscribing at the broker when
/// there is none.
pub(super) fn attach(
    shared: &Arc<Shared>,
    destination: Destination,
) -> Result<SharedSubscription, SessionError> {
    let mut feeds = shared.feeds();
    if let Some(feed) = feeds.get(&destination).and_then(Weak::upgrade)
        && let Some(receiver) = feed.reader()
    {
        tracing::debug!("Attached to the shared feed of {}", destination);
        return Ok(SharedSubscription { feed, receiver });
    }

    let subscription = shared.subscribe(destination.clone())?;
    let (sender, receiver) = broadcast::channel(FEED_CAPACITY);
    let feed = Arc::new(Feed {
        shared: shared.clone(),
        handle: subscription.handle().clone(),
        sender: Mutex::new(Some(sender)),
    });
    feeds.insert(destination, Arc::downgrade(&feed));
    tokio::spawn(pump(subscription, Arc::downgrade(&feed)));

    Ok(SharedSubscription { feed, receiver })
}

async fn pump(mut subscription: Subscription, feed: Weak<Feed>) {
    while let Some(message) = subscription.recv().await {
        let Some(feed) = feed.upgrade() else {
            return;
        };
        feed.publish(message);
    }

    if let Some(feed) = feed.upgrade() {
        tracing::debug!("Shared feed of {} ended", subscription.destination());
        feed.close();
    }
}

/// One reader of a shared feed. Dropping it detaches the reader.
pub struct SharedSubscription {
    feed: Arc<Feed>,
    receiver: broadcast::Receiver<InboundMessage>,
}

impl SharedSubscription {
    pub fn destination(&self) -> &Destination {
        self.feed.handle.destination()
    }

    /// Next message, or `None` once the broker subscription has ended.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Reader of {} skipped {} message(s)",
                        self.feed.handle.destination(),
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        domain::Destination,
        infrastructure::{
            stomp::Command,
            transport::{BrokerEnd, MemoryConnector},
        },
        session::{ConnectionState, Credential, CredentialStore, Session, SessionConfig},
    };

    async fn connected() -> (Session, BrokerEnd) {
        let (connector, mut broker) = MemoryConnector::new();
        let credentials = CredentialStore::new();
        credentials.set(Credential::new("token".to_string()).unwrap());
        let session = Session::new(
            SessionConfig::new("ws://localhost:8080/ws"),
            Arc::new(connector),
            credentials,
        );
        let (result, end) = tokio::join!(session.connect(), async {
            let mut end = broker.accept().await.unwrap();
            end.accept_connect().await.unwrap();
            end
        });
        result.unwrap();
        (session, end)
    }

    #[tokio::test]
    async fn test_readers_share_one_broker_subscription() {
        // テスト項目: 同じ宛先の 2 つの読み手は 1 つの購読を共有し、両方に配信される
        // given (前提条件):
        let (session, mut end) = connected().await;
        let handle = session.handle();
        let mut first = handle.subscribe_shared(Destination::room_events()).unwrap();
        let mut second = handle.subscribe_shared(Destination::room_events()).unwrap();
        let subscribe = end.recv_frame().await.unwrap();
        let id = subscribe.get("id").unwrap().to_string();

        // when (操作):
        end.push(&id, "/topic/room-events", "closed");

        // then (期待する結果):
        assert_eq!(subscribe.command, Command::Subscribe);
        assert_eq!(first.recv().await.unwrap().body, "closed");
        assert_eq!(second.recv().await.unwrap().body, "closed");
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_last_reader_releases_broker_subscription() {
        // テスト項目: 最後の読み手が破棄されたときだけ UNSUBSCRIBE が送られる
        // given (前提条件):
        let (session, mut end) = connected().await;
        let handle = session.handle();
        let first = handle.subscribe_shared(Destination::room_events()).unwrap();
        let second = handle.subscribe_shared(Destination::room_events()).unwrap();
        let subscribe = end.recv_frame().await.unwrap();

        // when (操作):
        drop(first);
        let still_subscribed = handle.is_subscribed(&Destination::room_events());
        drop(second);

        // then (期待する結果):
        assert!(still_subscribed);
        assert!(!handle.is_subscribed(&Destination::room_events()));
        let unsubscribe = end.recv_frame().await.unwrap();
        assert_eq!(unsubscribe.command, Command::Unsubscribe);
        assert_eq!(unsubscribe.get("id"), subscribe.get("id"));
    }

    #[tokio::test]
    async fn test_link_loss_ends_every_reader() {
        // テスト項目: 接続が失われると共有している全ての読み手のストリームが終了する
        // given (前提条件):
        let (session, end) = connected().await;
        let handle = session.handle();
        let mut first = handle.subscribe_shared(Destination::room_events()).unwrap();
        let mut second = handle.subscribe_shared(Destination::room_events()).unwrap();

        // when (操作):
        drop(end);

        // then (期待する結果):
        assert!(first.recv().await.is_none());
        assert!(second.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reader_after_feed_ended_resubscribes() {
        // テスト項目: 置き換えで終了したフィードには再利用されず、新しい購読が作られる
        // given (前提条件):
        let (session, mut end) = connected().await;
        let handle = session.handle();
        let mut reader = handle.subscribe_shared(Destination::room_events()).unwrap();
        end.recv_frame().await.unwrap();
        let _direct = handle.subscribe(Destination::room_events()).unwrap();
        assert!(reader.recv().await.is_none());

        // when (操作):
        let _again = handle.subscribe_shared(Destination::room_events()).unwrap();

        // then (期待する結果):
        let frames: Vec<Command> = [
            end.recv_frame().await.unwrap(),
            end.recv_frame().await.unwrap(),
            end.recv_frame().await.unwrap(),
            end.recv_frame().await.unwrap(),
        ]
        .into_iter()
        .map(|frame| frame.command)
        .collect();
        assert_eq!(
            frames,
            vec![
                Command::Unsubscribe,
                Command::Subscribe,
                Command::Unsubscribe,
                Command::Subscribe
            ]
        );
    }
}
