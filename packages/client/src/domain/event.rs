//! Server-pushed events, after decoding and validation.

use super::{
    message::Message,
    value_object::{MessageId, RoomId, Sequence, UserId},
};

/// New unread count for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadUpdate {
    pub message_id: MessageId,
    pub unread_count: u32,
}

/// Batch of unread count updates pushed on a room topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnreadUpdateBatch {
    pub updates: Vec<UnreadUpdate>,
}

/// A member has read the room up to `read_sequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStatus {
    pub reader_id: UserId,
    pub read_sequence: Sequence,
}

/// Anything delivered on `/topic/{conversationType}/rooms/{roomId}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomTopicEvent {
    Message(Message),
    UnreadUpdates(UnreadUpdateBatch),
    ReadStatus(ReadStatus),
}

/// A room was closed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomClosedEvent {
    pub room_id: RoomId,
    pub room_name: String,
    /// Human readable reason, shown to evicted users
    pub reason_label: String,
}

/// Anything delivered on `/topic/room-events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    RoomClosed(RoomClosedEvent),
    /// An event type this client does not act on.
    Other(String),
}
