//! History source abstraction.
//!
//! The domain defines what it needs from the REST backend; the
//! infrastructure layer provides the implementation (dependency inversion).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{
    message::Message,
    value_object::{ConversationType, RoomId},
};

/// One backward pagination step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub room_id: RoomId,
    pub conversation_type: ConversationType,
    /// `None` requests the newest page
    pub cursor: Option<i64>,
    pub size: u32,
}

/// One page of room history, tagged with the room it was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub room_id: RoomId,
    /// Newest first, as returned by the backend
    pub messages: Vec<Message>,
    pub next_cursor: Option<i64>,
    pub has_more: bool,
}

/// Errors from fetching history
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("no credential available for the history request")]
    MissingCredential,

    #[error("credential expired at {0}")]
    CredentialExpired(DateTime<Utc>),

    #[error("history request failed: {0}")]
    Request(String),

    #[error("history request returned HTTP {0}")]
    Status(u16),

    #[error("history response could not be decoded: {0}")]
    Decode(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// Fetch one page. Not streaming: each call is a single request.
    async fn fetch_page(&self, request: &HistoryRequest) -> Result<HistoryPage, HistoryError>;
}
