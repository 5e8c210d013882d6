//! UseCase: ルーム表示（同期処理の統合）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RoomView::open() / next_update() / load_older() / send()
//! - 履歴とライブメッセージの統合、未読数・既読の反映、ルーム終了による退出
//!
//! ### なぜこのテストが必要か
//! - 到着順ではなくシーケンス順でメッセージが並ぶことを保証
//! - 履歴取得の失敗がライブ購読に影響しないことを確認
//! - 退出後に購読が残らないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：履歴 [1, 2] の後にライブ 3 を受信
//! - 異常系：履歴取得の失敗、不正なペイロード
//! - エッジケース：5 の後に 4 が届く、別ルームの終了イベント、接続断、
//!   同じセッションで複数のルームを開く

use std::sync::Arc;

use crate::{
    domain::{
        AppendOutcome, ConversationType, Destination, EvictionNotice, HistoryApi, HistoryError,
        HistoryMerge, LifecycleTransition, Message, MessageType, ReadReceipts, RoomId,
        RoomLifecycle, RoomLifecycleWatcher, RoomMessageStore, RoomTopicEvent, Sequence, UserId,
    },
    infrastructure::dto::websocket::{decode_room_event, decode_room_topic},
    session::{InboundMessage, SessionError, SessionHandle, SharedSubscription},
};

use super::{
    error::{RoomViewError, SendMessageError},
    load_history::LoadHistoryUseCase,
    send_message::SendMessageUseCase,
};

/// 表示するルームと利用者の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomContext {
    pub room_id: RoomId,
    pub conversation_type: ConversationType,
    /// ログイン中のユーザー（送信者）
    pub sender_id: UserId,
    pub page_size: u32,
}

/// 履歴の読み込み状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryLoadState {
    /// まだ 1 ページも読み込んでいない
    NotLoaded,
    Loaded,
    /// 直近の取得が失敗した（ライブ購読は継続している）
    Failed(HistoryError),
}

/// 受信イベント 1 件を処理した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    /// チャットメッセージを受信した
    Message(AppendOutcome),
    /// 未読数を更新した（変化したメッセージ数）
    UnreadCounts { changed: usize },
    /// 既読位置を受信した
    ReadStatus { reader_id: UserId, advanced: bool },
    /// 不正なペイロードを破棄した
    Dropped,
    /// このルームに関係しないイベント
    Ignored,
    /// ルームが終了し退出した
    Evicted(EvictionNotice),
    /// 接続中に購読が外部で解除されたため購読し直した
    Resubscribed,
    /// 接続が失われた
    TransportLost,
}

enum Inbound {
    RoomTopic(Option<InboundMessage>),
    RoomEvents(Option<InboundMessage>),
}

/// 1 つのルームの表示状態
pub struct RoomView {
    context: RoomContext,
    session: SessionHandle,
    history: LoadHistoryUseCase,
    sender: SendMessageUseCase,
    store: RoomMessageStore,
    receipts: ReadReceipts,
    lifecycle: RoomLifecycleWatcher,
    load_state: HistoryLoadState,
    first_page_loaded: bool,
    room_topic: Option<SharedSubscription>,
    room_events: Option<SharedSubscription>,
}

impl RoomView {
    /// ルームを開く
    ///
    /// ルームのトピックとルームイベントを購読してから最新の履歴ページを読み込む。
    /// 購読は同じセッションの他のビューと共有される。
    /// 履歴の取得に失敗しても購読は維持され、失敗は [`HistoryLoadState::Failed`]
    /// として記録される。
    ///
    /// # Returns
    ///
    /// * `Ok(RoomView)` - 購読に成功
    /// * `Err(RoomViewError::Subscribe)` - セッションが未接続
    pub async fn open(
        session: SessionHandle,
        history: Arc<dyn HistoryApi>,
        context: RoomContext,
    ) -> Result<Self, RoomViewError> {
        // 1. 購読（履歴取得中に届いたライブメッセージはチャンネルに溜まる）
        let (room_topic, room_events) = subscribe_room(&session, &context)?;

        let mut view = Self {
            history: LoadHistoryUseCase::new(history, context.page_size),
            sender: SendMessageUseCase::new(
                session.clone(),
                context.room_id,
                context.conversation_type.clone(),
                context.sender_id,
            ),
            store: RoomMessageStore::new(context.room_id),
            receipts: ReadReceipts::new(),
            lifecycle: RoomLifecycleWatcher::new(context.room_id),
            load_state: HistoryLoadState::NotLoaded,
            first_page_loaded: false,
            room_topic: Some(room_topic),
            room_events: Some(room_events),
            session,
            context,
        };

        // 2. 最新ページの読み込み
        if let Err(e) = view.load_older().await {
            tracing::warn!(
                "Initial history load for room {} failed: {}",
                view.context.room_id,
                e
            );
        }

        tracing::info!("Opened room {}", view.context.room_id);
        Ok(view)
    }

    pub fn context(&self) -> &RoomContext {
        &self.context
    }

    /// メッセージ一覧（シーケンス順）
    pub fn snapshot(&self) -> &[Message] {
        self.store.snapshot()
    }

    pub fn store(&self) -> &RoomMessageStore {
        &self.store
    }

    pub fn receipts(&self) -> &ReadReceipts {
        &self.receipts
    }

    pub fn lifecycle(&self) -> &RoomLifecycle {
        self.lifecycle.state()
    }

    pub fn load_state(&self) -> &HistoryLoadState {
        &self.load_state
    }

    /// 指定シーケンスまで既読のメンバー数
    pub fn readers_at(&self, sequence: Sequence) -> usize {
        self.receipts.readers_at(sequence)
    }

    /// まだ読み込める古い履歴があるか
    pub fn has_older(&self) -> bool {
        self.next_cursor().is_some()
    }

    /// 次の履歴要求のカーソル。`Some(None)` は最新ページ。
    fn next_cursor(&self) -> Option<Option<i64>> {
        if !self.first_page_loaded {
            return Some(None);
        }
        if !self.store.has_more() {
            return None;
        }
        self.store.next_cursor().map(Some)
    }

    /// 受信イベントを 1 件処理する
    ///
    /// 退出後、または接続断を通知した後は `None` を返す。
    pub async fn next_update(&mut self) -> Option<RoomUpdate> {
        let (Some(room_topic), Some(room_events)) =
            (self.room_topic.as_mut(), self.room_events.as_mut())
        else {
            return None;
        };

        let inbound = tokio::select! {
            message = room_topic.recv() => Inbound::RoomTopic(message),
            message = room_events.recv() => Inbound::RoomEvents(message),
        };

        let update = match inbound {
            Inbound::RoomTopic(Some(message)) => self.handle_room_topic(&message.body),
            Inbound::RoomEvents(Some(message)) => self.handle_room_event(&message.body),
            Inbound::RoomTopic(None) | Inbound::RoomEvents(None) => self.handle_stream_end(),
        };
        Some(update)
    }

    /// 購読ストリームの終了を処理する
    ///
    /// セッションが接続中のままなら購読し直し、そうでなければ接続断として退出する。
    fn handle_stream_end(&mut self) -> RoomUpdate {
        if self.session.state().is_connected() {
            match subscribe_room(&self.session, &self.context) {
                Ok((room_topic, room_events)) => {
                    tracing::warn!(
                        "Subscriptions of room {} were released elsewhere; resubscribed",
                        self.context.room_id
                    );
                    self.room_topic = Some(room_topic);
                    self.room_events = Some(room_events);
                    return RoomUpdate::Resubscribed;
                }
                Err(e) => {
                    tracing::warn!("Failed to resubscribe room {}: {}", self.context.room_id, e);
                }
            }
        }

        tracing::warn!("Subscriptions of room {} ended", self.context.room_id);
        self.release_subscriptions();
        RoomUpdate::TransportLost
    }

    /// ルームトピックのペイロードを反映する
    pub fn handle_room_topic(&mut self, body: &str) -> RoomUpdate {
        if self.lifecycle.is_evicted() {
            return RoomUpdate::Ignored;
        }

        let event = match decode_room_topic(body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    "Dropping malformed payload on room {}: {}",
                    self.context.room_id,
                    e
                );
                return RoomUpdate::Dropped;
            }
        };

        match event {
            RoomTopicEvent::Message(message) => {
                let id = message.id;
                let outcome = self.store.append_live(message);
                match outcome {
                    AppendOutcome::Inserted { .. } => {}
                    AppendOutcome::Duplicate => {
                        tracing::debug!("Message {} already held", id);
                    }
                    AppendOutcome::SequenceConflict { existing } => {
                        tracing::warn!(
                            "Message {} rejected: its sequence is held by message {}",
                            id,
                            existing
                        );
                    }
                }
                RoomUpdate::Message(outcome)
            }
            RoomTopicEvent::UnreadUpdates(batch) => RoomUpdate::UnreadCounts {
                changed: self.store.apply_unread_updates(&batch),
            },
            RoomTopicEvent::ReadStatus(status) => RoomUpdate::ReadStatus {
                reader_id: status.reader_id,
                advanced: self.receipts.apply_read_status(status),
            },
        }
    }

    /// ルームイベントのペイロードを反映する
    pub fn handle_room_event(&mut self, body: &str) -> RoomUpdate {
        let event = match decode_room_event(body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping malformed room event: {}", e);
                return RoomUpdate::Dropped;
            }
        };

        match self.lifecycle.observe(&event) {
            LifecycleTransition::Evicted(notice) => {
                tracing::info!(
                    "Room {} ({}) was closed: {}",
                    notice.room_id,
                    notice.room_name,
                    notice.reason_label
                );
                self.release_subscriptions();
                RoomUpdate::Evicted(notice)
            }
            LifecycleTransition::Unchanged => RoomUpdate::Ignored,
        }
    }

    /// 次の（より古い）履歴ページを読み込む
    pub async fn load_older(&mut self) -> Result<HistoryMerge, RoomViewError> {
        if self.lifecycle.is_evicted() {
            return Err(RoomViewError::Evicted(self.context.room_id.value()));
        }
        let cursor = self.next_cursor().ok_or(RoomViewError::NoMoreHistory)?;

        let result = self
            .history
            .execute(self.context.room_id, &self.context.conversation_type, cursor)
            .await;
        match result {
            Ok(page) => {
                let merge = self.store.apply_history_page(page);
                if let HistoryMerge::Discarded { page_room_id } = merge {
                    tracing::warn!(
                        "Discarded history page of room {} in room {}",
                        page_room_id,
                        self.context.room_id
                    );
                } else {
                    self.load_state = HistoryLoadState::Loaded;
                    self.first_page_loaded = true;
                }
                Ok(merge)
            }
            Err(e) => {
                self.load_state = HistoryLoadState::Failed(e.clone());
                Err(RoomViewError::History(e))
            }
        }
    }

    /// メッセージを送信する
    pub fn send(&self, content: String) -> Result<(), SendMessageError> {
        self.sender.execute(content, MessageType::Text)
    }

    fn release_subscriptions(&mut self) {
        self.room_topic = None;
        self.room_events = None;
    }

    /// 購読が残っているか
    pub fn is_live(&self) -> bool {
        self.room_topic.is_some() && self.room_events.is_some()
    }
}

/// ルームトピックとルームイベントを購読する
fn subscribe_room(
    session: &SessionHandle,
    context: &RoomContext,
) -> Result<(SharedSubscription, SharedSubscription), SessionError> {
    let room_topic = session.subscribe_shared(Destination::room_messages(
        &context.conversation_type,
        context.room_id,
    ))?;
    let room_events = session.subscribe_shared(Destination::room_events())?;
    Ok((room_topic, room_events))
}
