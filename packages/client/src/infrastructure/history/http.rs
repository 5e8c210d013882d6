//! REST history client.
//!
//! `GET {base_url}/api/chat/rooms/{roomId}/messages?conversationType=..&size=..[&cursor=..]`
//! with the session's bearer credential. One call is one page.

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    domain::{HistoryApi, HistoryError, HistoryPage, HistoryRequest},
    infrastructure::dto::http::HistoryPageDto,
    session::CredentialStore,
};

/// Messages per history page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// REST API origin, e.g. `http://localhost:8080`
    pub base_url: String,
}

impl HistoryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

pub struct HttpHistoryClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

impl HttpHistoryClient {
    pub fn new(config: &HistoryConfig, credentials: CredentialStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn messages_url(&self, request: &HistoryRequest) -> String {
        format!(
            "{}/api/chat/rooms/{}/messages",
            self.base_url, request.room_id
        )
    }
}

#[async_trait]
impl HistoryApi for HttpHistoryClient {
    async fn fetch_page(&self, request: &HistoryRequest) -> Result<HistoryPage, HistoryError> {
        let credential = self
            .credentials
            .current()
            .ok_or(HistoryError::MissingCredential)?;
        if credential.is_expired_at(Utc::now()) {
            let expired_at = credential.expires_at().unwrap_or_else(Utc::now);
            return Err(HistoryError::CredentialExpired(expired_at));
        }

        let mut query = vec![
            (
                "conversationType",
                request.conversation_type.as_str().to_string(),
            ),
            ("size", request.size.to_string()),
        ];
        if let Some(cursor) = request.cursor {
            query.push(("cursor", cursor.to_string()));
        }

        tracing::debug!(
            "Fetching history for room {} (cursor={:?}, size={})",
            request.room_id,
            request.cursor,
            request.size
        );
        let response = self
            .http
            .get(self.messages_url(request))
            .bearer_auth(credential.token())
            .query(&query)
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status(status.as_u16()));
        }

        let dto: HistoryPageDto = response
            .json()
            .await
            .map_err(|e| HistoryError::Decode(e.to_string()))?;
        dto.into_page(request.room_id)
            .map_err(|e| HistoryError::Decode(e.to_string()))
    }
}
