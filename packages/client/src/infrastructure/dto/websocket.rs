//! STOMP message body DTOs for the chat topics.
//!
//! Inbound bodies are decoded into DTOs first and then validated into domain
//! types, so a malformed payload becomes a [`DecodeError`] value instead of a
//! panic inside a subscription handler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ConversationType, Message, MessageContent, MessageId, MessageType, ReadStatus,
    RoomClosedEvent, RoomEvent, RoomId, RoomTopicEvent, Sequence, Timestamp, UnreadUpdate,
    UnreadUpdateBatch, UserId, ValueObjectError,
};

/// Room event type that evicts viewers of the closed room
pub const ROOM_CLOSED: &str = "ROOM_CLOSED";

/// Errors from decoding an inbound body
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload does not match any known shape: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload failed validation: {0}")]
    Invalid(#[from] ValueObjectError),

    #[error("room event has no \"type\" field")]
    MissingEventType,
}

/// Chat message as pushed on a room topic or returned by the history API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub sender_id: i64,
    pub content: String,
    #[serde(default)]
    pub translated_content: Option<String>,
    pub created_at: String,
    pub message_type: MessageType,
    pub sequence: i64,
    #[serde(default)]
    pub unread_count: u32,
}

impl TryFrom<MessageDto> for Message {
    type Error = ValueObjectError;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        Ok(Message {
            id: MessageId::new(dto.id)?,
            sender_id: UserId::new(dto.sender_id)?,
            content: dto.content,
            translated_content: dto.translated_content,
            created_at: Timestamp::parse(&dto.created_at)?,
            message_type: dto.message_type,
            sequence: Sequence::new(dto.sequence)?,
            unread_count: dto.unread_count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadUpdateDto {
    pub message_id: i64,
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadUpdatesDto {
    pub updates: Vec<UnreadUpdateDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatusDto {
    pub reader_id: i64,
    pub read_sequence: i64,
}

/// Shapes delivered on a room topic, told apart by their required fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RoomTopicDto {
    UnreadUpdates(UnreadUpdatesDto),
    ReadStatus(ReadStatusDto),
    Message(MessageDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosedDto {
    pub room_id: i64,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub reason_label: String,
}

/// Outbound chat message published to `/app/chats/sendMessage`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageDto {
    pub room_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub sender_id: i64,
    pub conversation_type: String,
}

impl SendMessageDto {
    pub fn new(
        room_id: RoomId,
        conversation_type: &ConversationType,
        sender_id: UserId,
        content: MessageContent,
        message_type: MessageType,
    ) -> Self {
        Self {
            room_id: room_id.value(),
            content: content.into_string(),
            message_type,
            sender_id: sender_id.value(),
            conversation_type: conversation_type.as_str().to_string(),
        }
    }
}

/// Decode a body received on a room message topic.
pub fn decode_room_topic(body: &str) -> Result<RoomTopicEvent, DecodeError> {
    let event = match serde_json::from_str::<RoomTopicDto>(body)? {
        RoomTopicDto::Message(dto) => RoomTopicEvent::Message(Message::try_from(dto)?),
        RoomTopicDto::UnreadUpdates(dto) => {
            let updates = dto
                .updates
                .into_iter()
                .map(|update| {
                    Ok(UnreadUpdate {
                        message_id: MessageId::new(update.message_id)?,
                        unread_count: update.unread_count,
                    })
                })
                .collect::<Result<Vec<_>, ValueObjectError>>()?;
            RoomTopicEvent::UnreadUpdates(UnreadUpdateBatch { updates })
        }
        RoomTopicDto::ReadStatus(dto) => RoomTopicEvent::ReadStatus(ReadStatus {
            reader_id: UserId::new(dto.reader_id)?,
            read_sequence: Sequence::new(dto.read_sequence)?,
        }),
    };
    Ok(event)
}

/// Decode a body received on `/topic/room-events`.
pub fn decode_room_event(body: &str) -> Result<RoomEvent, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(DecodeError::MissingEventType)?
        .to_string();

    if kind != ROOM_CLOSED {
        return Ok(RoomEvent::Other(kind));
    }

    let dto: RoomClosedDto = serde_json::from_value(value)?;
    Ok(RoomEvent::RoomClosed(RoomClosedEvent {
        room_id: RoomId::new(dto.room_id)?,
        room_name: dto.room_name,
        reason_label: dto.reason_label,
    }))
}
