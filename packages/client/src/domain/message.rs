//! Chat message entity.

use serde::{Deserialize, Serialize};

use super::value_object::{MessageId, Sequence, Timestamp, UserId};

/// Kind of chat message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    File,
    System,
}

impl MessageType {
    /// Wire name used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "TEXT",
            MessageType::Image => "IMAGE",
            MessageType::File => "FILE",
            MessageType::System => "SYSTEM",
        }
    }
}

/// A chat message held by a room view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Backend identifier, unique across deliveries
    pub id: MessageId,
    /// Sender's user ID
    pub sender_id: UserId,
    /// Message content as sent
    pub content: String,
    /// Machine translation of the content, when the backend provides one
    pub translated_content: Option<String>,
    /// Timestamp when the message was created on the server
    pub created_at: Timestamp,
    pub message_type: MessageType,
    /// Canonical order key within the room
    pub sequence: Sequence,
    /// Number of room members who have not read this message yet
    pub unread_count: u32,
}
