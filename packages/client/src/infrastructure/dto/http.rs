//! History API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::MessageDto;
use crate::domain::{HistoryPage, Message, RoomId, ValueObjectError};

/// Body of `GET /api/chat/rooms/{roomId}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPageDto {
    pub messages: Vec<MessageDto>,
    #[serde(default)]
    pub next_cursor: Option<i64>,
    #[serde(default)]
    pub has_more: bool,
}

impl HistoryPageDto {
    /// Validate into a domain page tagged with the requested room.
    pub fn into_page(self, room_id: RoomId) -> Result<HistoryPage, ValueObjectError> {
        let messages = self
            .messages
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HistoryPage {
            room_id,
            messages,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        })
    }
}
