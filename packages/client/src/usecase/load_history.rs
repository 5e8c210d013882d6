//! UseCase: 履歴ページ取得処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LoadHistoryUseCase::execute() メソッド
//! - ページサイズとカーソルを含むリクエストの組み立て
//!
//! ### なぜこのテストが必要か
//! - 最新ページ（カーソルなし）と過去ページ（カーソルあり）を正しく要求することを保証
//! - 取得失敗がそのまま呼び出し元に返ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：最新ページ・過去ページの取得
//! - 異常系：HTTP エラー

use std::sync::Arc;

use crate::domain::{
    ConversationType, HistoryApi, HistoryError, HistoryPage, HistoryRequest, RoomId,
};

/// 履歴ページ取得のユースケース
pub struct LoadHistoryUseCase {
    /// 履歴 API（データアクセス層の抽象化）
    history: Arc<dyn HistoryApi>,
    page_size: u32,
}

impl LoadHistoryUseCase {
    /// 新しい LoadHistoryUseCase を作成
    pub fn new(history: Arc<dyn HistoryApi>, page_size: u32) -> Self {
        Self { history, page_size }
    }

    /// 1 ページ分の履歴を取得
    ///
    /// # Arguments
    ///
    /// * `room_id` - 対象ルーム
    /// * `conversation_type` - 会話種別
    /// * `cursor` - `None` なら最新ページ、`Some` ならそれより古いページ
    pub async fn execute(
        &self,
        room_id: RoomId,
        conversation_type: &ConversationType,
        cursor: Option<i64>,
    ) -> Result<HistoryPage, HistoryError> {
        let request = HistoryRequest {
            room_id,
            conversation_type: conversation_type.clone(),
            cursor,
            size: self.page_size,
        };
        let page = self.history.fetch_page(&request).await?;
        tracing::debug!(
            "Loaded {} message(s) for room {} (has_more={})",
            page.messages.len(),
            room_id,
            page.has_more
        );
        Ok(page)
    }
}
