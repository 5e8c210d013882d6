//! Broker destinations used by the room synchronization core.

use std::fmt;

use super::value_object::{ConversationType, RoomId};

/// Cross-room channel carrying lifecycle notifications.
pub const ROOM_EVENTS_TOPIC: &str = "/topic/room-events";

/// Outbound destination for chat messages.
pub const SEND_MESSAGE_DESTINATION: &str = "/app/chats/sendMessage";

/// A named broker channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    /// Inbound chat messages for a room.
    pub fn room_messages(conversation_type: &ConversationType, room_id: RoomId) -> Self {
        Self(format!("/topic/{conversation_type}/rooms/{room_id}"))
    }

    /// Inbound lifecycle events for every room the session can see.
    pub fn room_events() -> Self {
        Self(ROOM_EVENTS_TOPIC.to_string())
    }

    /// Outbound chat messages.
    pub fn send_message() -> Self {
        Self(SEND_MESSAGE_DESTINATION.to_string())
    }

    /// Wrap a destination received from the broker.
    pub fn from_wire(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
