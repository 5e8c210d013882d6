//! Topic subscription registry.
//!
//! Maps each destination to at most one live subscription. A second
//! subscription to the same destination replaces the first: the old
//! delivery channel is dropped (its stream ends) and the caller is told which
//! handle was replaced so the broker can be told as well.
//!
//! Lookups and deliveries happen under one lock, so once [`release`] returns
//! no further message reaches the released subscription.
//!
//! [`release`]: SubscriptionRegistry::release

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::mpsc;

use crate::domain::Destination;

/// A message delivered to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub destination: Destination,
    pub body: String,
}

/// Identifies one subscription. Stale handles (released or replaced) are
/// harmless to release again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: String,
    destination: Destination,
}

impl SubscriptionHandle {
    /// STOMP subscription id (`sub-N`).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

/// Result of [`SubscriptionRegistry::register`].
pub struct Registration {
    pub handle: SubscriptionHandle,
    pub receiver: mpsc::UnboundedReceiver<InboundMessage>,
    /// Subscription that previously held the destination.
    pub replaced: Option<SubscriptionHandle>,
}

struct Entry {
    id: String,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Default)]
struct Inner {
    by_destination: HashMap<Destination, Entry>,
    next_id: u64,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, destination: Destination) -> Registration {
        let mut inner = self.lock();
        let id = format!("sub-{}", inner.next_id);
        inner.next_id += 1;

        let (sender, receiver) = mpsc::unbounded_channel();
        let replaced = inner
            .by_destination
            .insert(
                destination.clone(),
                Entry {
                    id: id.clone(),
                    sender,
                },
            )
            .map(|old| SubscriptionHandle {
                id: old.id,
                destination: destination.clone(),
            });

        Registration {
            handle: SubscriptionHandle { id, destination },
            receiver,
            replaced,
        }
    }

    /// Remove the subscription if `handle` is still the live one for its
    /// destination. Returns `true` when something was removed.
    pub fn release(&self, handle: &SubscriptionHandle) -> bool {
        let mut inner = self.lock();
        let is_live = inner
            .by_destination
            .get(&handle.destination)
            .is_some_and(|entry| entry.id == handle.id);
        if is_live {
            inner.by_destination.remove(&handle.destination);
        }
        is_live
    }

    /// Deliver a body to the live subscription.
    ///
    /// Routed by destination when known, otherwise by subscription id. A
    /// subscription id that no longer matches the live entry (a message for
    /// a replaced subscription still in flight) is dropped.
    pub fn dispatch(
        &self,
        subscription_id: Option<&str>,
        destination: Option<&Destination>,
        body: String,
    ) -> bool {
        let inner = self.lock();
        let found = match destination {
            Some(destination) => inner
                .by_destination
                .get_key_value(destination)
                .filter(|(_, entry)| subscription_id.is_none_or(|id| id == entry.id)),
            None => subscription_id.and_then(|id| {
                inner
                    .by_destination
                    .iter()
                    .find(|(_, entry)| entry.id == id)
            }),
        };

        match found {
            Some((destination, entry)) => entry
                .sender
                .send(InboundMessage {
                    destination: destination.clone(),
                    body,
                })
                .is_ok(),
            None => false,
        }
    }

    /// Remove every subscription; their streams end.
    pub fn drain(&self) -> Vec<SubscriptionHandle> {
        let mut inner = self.lock();
        inner
            .by_destination
            .drain()
            .map(|(destination, entry)| SubscriptionHandle {
                id: entry.id,
                destination,
            })
            .collect()
    }

    pub fn is_subscribed(&self, destination: &Destination) -> bool {
        self.lock().by_destination.contains_key(destination)
    }

    pub fn live_count(&self) -> usize {
        self.lock().by_destination.len()
    }
}
