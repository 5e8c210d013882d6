//! UseCase 層
//!
//! ルーム表示の同期処理を実装するレイヤー。
//! CLI から呼び出され、Domain 層とセッションを操作します。

pub mod error;
pub mod load_history;
pub mod room_view;
pub mod send_message;

pub use error::{RoomViewError, SendMessageError};
pub use load_history::LoadHistoryUseCase;
pub use room_view::{HistoryLoadState, RoomContext, RoomUpdate, RoomView};
pub use send_message::SendMessageUseCase;
