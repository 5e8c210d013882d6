//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 送信ペイロードの組み立てと `/app/chats/sendMessage` への SEND
//!
//! ### なぜこのテストが必要か
//! - サーバーが期待する JSON 形式（camelCase）で送信されることを保証
//! - 空メッセージや未接続時に送信されないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：テキストメッセージの送信
//! - 異常系：空メッセージ、未接続での送信

use crate::{
    domain::{ConversationType, Destination, MessageContent, MessageType, RoomId, UserId},
    infrastructure::dto::websocket::SendMessageDto,
    session::SessionHandle,
};

use super::error::SendMessageError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    session: SessionHandle,
    room_id: RoomId,
    conversation_type: ConversationType,
    sender_id: UserId,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        session: SessionHandle,
        room_id: RoomId,
        conversation_type: ConversationType,
        sender_id: UserId,
    ) -> Self {
        Self {
            session,
            room_id,
            conversation_type,
            sender_id,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `content` - 入力されたメッセージ本文（検証前）
    /// * `message_type` - メッセージ種別
    ///
    /// # Returns
    ///
    /// * `Ok(())` - ブローカーへの送信キュー投入に成功
    /// * `Err(SendMessageError)` - 検証または送信の失敗
    pub fn execute(
        &self,
        content: String,
        message_type: MessageType,
    ) -> Result<(), SendMessageError> {
        // 1. 本文を検証
        let content = MessageContent::new(content)?;

        // 2. 送信ペイロードを組み立て
        let dto = SendMessageDto::new(
            self.room_id,
            &self.conversation_type,
            self.sender_id,
            content,
            message_type,
        );
        let json =
            serde_json::to_string(&dto).map_err(|e| SendMessageError::Encode(e.to_string()))?;

        // 3. SEND
        self.session.publish(&Destination::send_message(), json)?;
        tracing::debug!("Sent {} message to room {}", message_type.as_str(), self.room_id);
        Ok(())
    }
}
