//! Session error definitions.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No credential is set (logged out)
    #[error("no credential available; log in before entering a room")]
    MissingCredential,

    #[error("credential expired at {0}")]
    CredentialExpired(DateTime<Utc>),

    /// Connect failed, or the session is not connected
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Subscribe attempted before the connected state was observed
    #[error("cannot subscribe to {0} while the session is not connected")]
    NotConnected(String),
}
