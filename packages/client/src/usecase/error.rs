//! UseCase 層のエラー定義

use thiserror::Error;

use crate::{
    domain::{HistoryError, ValueObjectError},
    session::SessionError,
};

/// ルーム表示の開始・操作時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomViewError {
    /// 購読に失敗した（未接続など）
    #[error("failed to subscribe: {0}")]
    Subscribe(#[from] SessionError),

    /// 履歴の取得に失敗した
    #[error("failed to load history: {0}")]
    History(#[from] HistoryError),

    /// これ以上古い履歴はない
    #[error("no older history")]
    NoMoreHistory,

    /// ルームが終了し、表示から退出済み
    #[error("room {0} was closed")]
    Evicted(i64),
}

/// メッセージ送信時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    #[error("invalid message: {0}")]
    InvalidContent(#[from] ValueObjectError),

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to publish message: {0}")]
    Publish(#[from] SessionError),
}
