//! Kaiwa chat client library.
//!
//! Keeps one chat room view in sync with the backend: a single STOMP over
//! WebSocket session, paginated REST history merged with live pushes, unread
//! and read-state reconciliation, and eviction when the room closes.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod session;
pub mod shell;
pub mod usecase;

// Re-export entry points
pub use config::{Args, ClientConfig};
pub use error::ClientError;
pub use shell::run_client;
