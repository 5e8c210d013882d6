//! Infrastructure layer: wire formats, broker transport and the REST client.

pub mod dto;
pub mod history;
pub mod stomp;
pub mod transport;
