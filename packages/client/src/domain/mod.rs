//! Domain layer for the room synchronization core.
//!
//! This module contains the message store, read-state reconciliation and the
//! room lifecycle state machine. Nothing here performs I/O.

pub mod destination;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod message;
pub mod reconciler;
pub mod repository;
pub mod store;
pub mod value_object;

pub use destination::Destination;
pub use error::ValueObjectError;
pub use event::{
    ReadStatus, RoomClosedEvent, RoomEvent, RoomTopicEvent, UnreadUpdate, UnreadUpdateBatch,
};
pub use lifecycle::{EvictionNotice, LifecycleTransition, RoomLifecycle, RoomLifecycleWatcher};
pub use message::{Message, MessageType};
pub use reconciler::ReadReceipts;
pub use repository::{HistoryApi, HistoryError, HistoryPage, HistoryRequest};
pub use store::{AppendOutcome, HistoryMerge, RoomMessageStore};
pub use value_object::{
    ConversationType, MessageContent, MessageId, RoomId, Sequence, Timestamp, UserId,
};
