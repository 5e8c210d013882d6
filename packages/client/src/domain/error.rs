//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// RoomId must be positive
    #[error("RoomId must be positive (got {0})")]
    RoomIdNotPositive(i64),

    /// MessageId must be positive
    #[error("MessageId must be positive (got {0})")]
    MessageIdNotPositive(i64),

    /// UserId must be positive
    #[error("UserId must be positive (got {0})")]
    UserIdNotPositive(i64),

    /// Sequence numbers start at 1
    #[error("Sequence must be positive (got {0})")]
    SequenceNotPositive(i64),

    /// ConversationType validation error
    #[error("ConversationType cannot be empty")]
    ConversationTypeEmpty,

    /// ConversationType too long error
    #[error("ConversationType cannot exceed {max} characters (got {actual})")]
    ConversationTypeTooLong { max: usize, actual: usize },

    /// ConversationType contains characters not allowed in a destination
    #[error("ConversationType must be a lowercase slug (got: {0})")]
    ConversationTypeInvalidFormat(String),

    /// MessageContent validation error
    #[error("MessageContent cannot be empty")]
    MessageContentEmpty,

    /// MessageContent too long error
    #[error("MessageContent cannot exceed {max} characters (got {actual})")]
    MessageContentTooLong { max: usize, actual: usize },

    /// Credential validation error
    #[error("Credential token cannot be empty")]
    CredentialEmpty,

    /// Timestamp could not be parsed
    #[error("Timestamp is neither RFC 3339 nor an ISO local date-time (got: {0})")]
    TimestampInvalidFormat(String),
}
