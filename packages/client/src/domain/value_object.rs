//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $error:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(i64);

        impl $name {
            /// Create a new identifier, rejecting zero and negative values.
            pub fn new(id: i64) -> Result<Self, ValueObjectError> {
                if id <= 0 {
                    return Err(ValueObjectError::$error(id));
                }
                Ok(Self(id))
            }

            /// Get the inner value.
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValueObjectError;

            fn try_from(id: i64) -> Result<Self, Self::Error> {
                Self::new(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Chat room identifier assigned by the backend.
    RoomId,
    RoomIdNotPositive
);

positive_id!(
    /// Message identifier assigned by the backend. Used for deduplication.
    MessageId,
    MessageIdNotPositive
);

positive_id!(
    /// User identifier (message sender or read-receipt reader).
    UserId,
    UserIdNotPositive
);

/// Per-room monotonic message ordinal.
///
/// The canonical ordering key for messages within a room. Distinct from
/// arrival order and from wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sequence(u64);

impl Sequence {
    /// Create a new Sequence. Sequences start at 1.
    pub fn new(value: i64) -> Result<Self, ValueObjectError> {
        if value <= 0 {
            return Err(ValueObjectError::SequenceNotPositive(value));
        }
        Ok(Self(value as u64))
    }

    /// Get the inner value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation type segment used in room topics (e.g. `group`, `direct`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationType(String);

impl ConversationType {
    const MAX_LEN: usize = 32;

    /// Create a new ConversationType.
    ///
    /// # Arguments
    ///
    /// * `value` - Lowercase slug (`[a-z0-9_-]+`)
    ///
    /// # Returns
    ///
    /// A Result containing the ConversationType or an error if validation fails
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::ConversationTypeEmpty);
        }
        let len = value.len();
        if len > Self::MAX_LEN {
            return Err(ValueObjectError::ConversationTypeTooLong {
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        let is_slug = value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !is_slug {
            return Err(ValueObjectError::ConversationTypeInvalidFormat(value));
        }
        Ok(Self(value))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConversationType {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message content value object.
///
/// Represents the content of an outbound chat message with validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent(String);

impl MessageContent {
    const MAX_LEN: usize = 10000;

    /// Create a new MessageContent.
    ///
    /// # Arguments
    ///
    /// * `content` - The message content string
    ///
    /// # Returns
    ///
    /// A Result containing the MessageContent or an error if validation fails
    pub fn new(content: String) -> Result<Self, ValueObjectError> {
        if content.trim().is_empty() {
            return Err(ValueObjectError::MessageContentEmpty);
        }
        let len = content.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValueObjectError::MessageContentTooLong {
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        Ok(Self(content))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(content: String) -> Result<Self, Self::Error> {
        Self::new(content)
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message creation time.
///
/// The backend sends either RFC 3339 strings or ISO local date-times without
/// an offset; the latter are read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from a UTC instant.
    pub fn new(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    /// Parse a backend timestamp string.
    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        if let Ok(at) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self(at.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self(naive.and_utc()))
            .map_err(|_| ValueObjectError::TimestampInvalidFormat(value.to_string()))
    }

    /// Get the inner instant.
    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_new_success() {
        // テスト項目: 正の値でルーム ID を作成できる
        // given (前提条件):
        let id = 7;

        // when (操作):
        let result = RoomId::new(id);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().value(), 7);
    }

    #[test]
    fn test_room_id_new_zero_fails() {
        // テスト項目: 0 以下のルーム ID は作成できない
        // when (操作):
        let zero = RoomId::new(0);
        let negative = RoomId::new(-3);

        // then (期待する結果):
        assert_eq!(zero.unwrap_err(), ValueObjectError::RoomIdNotPositive(0));
        assert_eq!(
            negative.unwrap_err(),
            ValueObjectError::RoomIdNotPositive(-3)
        );
    }

    #[test]
    fn test_message_id_equality() {
        // テスト項目: 同じ値を持つ MessageId は等価
        // given (前提条件):
        let id1 = MessageId::new(10).unwrap();
        let id2 = MessageId::new(10).unwrap();
        let id3 = MessageId::new(11).unwrap();

        // then (期待する結果):
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_sequence_ordering() {
        // テスト項目: シーケンスは順序付けでき、0 は拒否される
        // given (前提条件):
        let s1 = Sequence::new(1).unwrap();
        let s2 = Sequence::new(2).unwrap();

        // then (期待する結果):
        assert!(s1 < s2);
        assert_eq!(
            Sequence::new(0).unwrap_err(),
            ValueObjectError::SequenceNotPositive(0)
        );
    }

    #[test]
    fn test_conversation_type_new_success() {
        // テスト項目: 小文字スラッグの会話種別を作成できる
        // when (操作):
        let result = ConversationType::new("group".to_string());

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "group");
    }

    #[test]
    fn test_conversation_type_rejects_path_characters() {
        // テスト項目: トピックのパスを壊す文字を含む会話種別は作成できない
        // when (操作):
        let result = ConversationType::new("group/../admin".to_string());

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::ConversationTypeInvalidFormat("group/../admin".to_string())
        );
    }

    #[test]
    fn test_conversation_type_too_long_fails() {
        // テスト項目: 33 文字以上の会話種別は作成できない
        // when (操作):
        let result = ConversationType::new("a".repeat(33));

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::ConversationTypeTooLong {
                max: 32,
                actual: 33
            }
        );
    }

    #[test]
    fn test_message_content_new_empty_fails() {
        // テスト項目: 空白のみのメッセージ内容は作成できない
        // when (操作):
        let result = MessageContent::new("   ".to_string());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::MessageContentEmpty);
    }

    #[test]
    fn test_message_content_new_too_long_fails() {
        // テスト項目: 10001 文字以上のメッセージ内容は作成できない
        // when (操作):
        let result = MessageContent::new("a".repeat(10001));

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::MessageContentTooLong {
                max: 10000,
                actual: 10001
            }
        );
    }

    #[test]
    fn test_timestamp_parse_rfc3339() {
        // テスト項目: オフセット付きの RFC 3339 を UTC として読み込める
        // when (操作):
        let ts = Timestamp::parse("2024-05-01T18:30:00+09:00").unwrap();

        // then (期待する結果):
        assert_eq!(ts.value().to_rfc3339(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn test_timestamp_parse_local_date_time() {
        // テスト項目: オフセットなしの日時は UTC として読み込まれる
        // when (操作):
        let ts = Timestamp::parse("2024-05-01T09:30:00.123").unwrap();

        // then (期待する結果):
        assert_eq!(ts.value().timestamp_millis() % 1000, 123);
    }

    #[test]
    fn test_timestamp_parse_garbage_fails() {
        // テスト項目: 日時として解釈できない文字列はエラー
        // when (操作):
        let result = Timestamp::parse("yesterday");

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::TimestampInvalidFormat("yesterday".to_string())
        );
    }
}
