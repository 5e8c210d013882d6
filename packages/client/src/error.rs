//! Errors surfaced by the terminal client.

use thiserror::Error;

use crate::{domain::ValueObjectError, session::SessionError, usecase::RoomViewError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValueObjectError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomViewError),

    #[error("terminal input failed: {0}")]
    Input(String),
}
