//! History API clients.

pub mod http;

pub use http::{DEFAULT_PAGE_SIZE, HistoryConfig, HttpHistoryClient};
