//! Data transfer objects for the broker and the REST backend.

pub mod http;
pub mod websocket;
