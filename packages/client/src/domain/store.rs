//! Ordered message buffer for the open room.
//!
//! Holds the union of paginated history and the live tail, sorted by
//! [`Sequence`] and deduplicated by [`MessageId`]. Arrival order is never
//! trusted: a message delivered late (e.g. around a reconnect) is inserted at
//! its sequence position rather than appended.

use std::collections::HashMap;

use super::{
    message::Message,
    repository::HistoryPage,
    value_object::{MessageId, RoomId, Sequence},
};

/// Result of [`RoomMessageStore::append_live`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored at `position` in the snapshot.
    Inserted { position: usize },
    /// A message with the same id is already held; nothing changed.
    Duplicate,
    /// Another message already occupies this sequence; nothing changed.
    SequenceConflict { existing: MessageId },
}

/// Result of [`RoomMessageStore::apply_history_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMerge {
    Applied { inserted: usize },
    /// The page was fetched for another room and arrived late.
    Discarded { page_room_id: RoomId },
}

/// Message list of one room view.
#[derive(Debug, Clone)]
pub struct RoomMessageStore {
    room_id: RoomId,
    /// Sorted by sequence, strictly increasing
    messages: Vec<Message>,
    /// Held message ids and their sequence
    index: HashMap<MessageId, Sequence>,
    /// Cursor for the next (older) history page
    next_cursor: Option<i64>,
    has_more: bool,
}

impl RoomMessageStore {
    /// Create an empty store for a room. Until the first page arrives the
    /// store assumes there is history to load.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            messages: Vec::new(),
            index: HashMap::new(),
            next_cursor: None,
            has_more: true,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Merge one history page.
    ///
    /// Pages whose room differs from this store's room are discarded, so a
    /// response that returns after navigation cannot leak into another room.
    pub fn apply_history_page(&mut self, page: HistoryPage) -> HistoryMerge {
        if page.room_id != self.room_id {
            return HistoryMerge::Discarded {
                page_room_id: page.room_id,
            };
        }

        let mut inserted = 0;
        for message in page.messages {
            if let AppendOutcome::Inserted { .. } = self.insert(message) {
                inserted += 1;
            }
        }
        self.next_cursor = page.next_cursor;
        self.has_more = page.has_more;

        HistoryMerge::Applied { inserted }
    }

    /// Insert a pushed message at its sequence position.
    pub fn append_live(&mut self, message: Message) -> AppendOutcome {
        self.insert(message)
    }

    fn insert(&mut self, message: Message) -> AppendOutcome {
        if self.index.contains_key(&message.id) {
            return AppendOutcome::Duplicate;
        }

        match self
            .messages
            .binary_search_by_key(&message.sequence, |held| held.sequence)
        {
            Ok(position) => AppendOutcome::SequenceConflict {
                existing: self.messages[position].id,
            },
            Err(position) => {
                self.index.insert(message.id, message.sequence);
                self.messages.insert(position, message);
                AppendOutcome::Inserted { position }
            }
        }
    }

    /// Current messages in sequence order.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a held message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        let position = self.position_of(id)?;
        self.messages.get(position)
    }

    pub(super) fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        let position = self.position_of(id)?;
        self.messages.get_mut(position)
    }

    fn position_of(&self, id: MessageId) -> Option<usize> {
        let sequence = self.index.get(&id)?;
        self.messages
            .binary_search_by_key(sequence, |held| held.sequence)
            .ok()
    }

    pub fn next_cursor(&self) -> Option<i64> {
        self.next_cursor
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Highest sequence currently held.
    pub fn max_sequence(&self) -> Option<Sequence> {
        self.messages.last().map(|message| message.sequence)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{
        message::MessageType,
        value_object::{Timestamp, UserId},
    };

    pub(crate) fn message(id: i64, sequence: i64) -> Message {
        Message {
            id: MessageId::new(id).unwrap(),
            sender_id: UserId::new(1).unwrap(),
            content: format!("message {id}"),
            translated_content: None,
            created_at: Timestamp::parse("2024-05-01T09:00:00Z").unwrap(),
            message_type: MessageType::Text,
            sequence: Sequence::new(sequence).unwrap(),
            unread_count: 2,
        }
    }

    fn sequences(store: &RoomMessageStore) -> Vec<u64> {
        store.snapshot().iter().map(|m| m.sequence.value()).collect()
    }

    fn room(id: i64) -> RoomId {
        RoomId::new(id).unwrap()
    }

    #[test]
    fn test_append_increasing_sequences_keeps_order() {
        // テスト項目: 昇順に届いたメッセージはそのまま昇順で保持される
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));

        // when (操作):
        for seq in 1..=5 {
            store.append_live(message(100 + seq, seq));
        }

        // then (期待する結果):
        assert_eq!(sequences(&store), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.max_sequence(), Some(Sequence::new(5).unwrap()));
    }

    #[test]
    fn test_append_out_of_order_inserts_at_sequence_position() {
        // テスト項目: 最大値より小さいシーケンスが後から届いても正しい位置に挿入される
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));
        store.append_live(message(1, 1));
        store.append_live(message(2, 2));

        // when (操作): seq=5 の後に seq=4 が届く
        store.append_live(message(5, 5));
        let outcome = store.append_live(message(4, 4));

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::Inserted { position: 2 });
        assert_eq!(sequences(&store), vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_append_duplicate_id_is_noop() {
        // テスト項目: 既に保持している ID のメッセージは無視され、内容は変わらない
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));
        store.append_live(message(10, 1));
        let mut redelivered = message(10, 1);
        redelivered.content = "edited in transit".to_string();

        // when (操作):
        let outcome = store.append_live(redelivered);

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::Duplicate);
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot()[0].content, "message 10");
    }

    #[test]
    fn test_append_sequence_conflict_is_rejected() {
        // テスト項目: 別 ID が同じシーケンスで届いた場合は挿入されない
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));
        store.append_live(message(10, 1));

        // when (操作):
        let outcome = store.append_live(message(11, 1));

        // then (期待する結果):
        assert_eq!(
            outcome,
            AppendOutcome::SequenceConflict {
                existing: MessageId::new(10).unwrap()
            }
        );
        assert_eq!(store.len(), 1);
        assert!(store.get(MessageId::new(11).unwrap()).is_none());
    }

    #[test]
    fn test_history_then_live_tail() {
        // テスト項目: 履歴 [seq1, seq2] の後にライブで seq3 が届くと [1, 2, 3] になる
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));
        let page = HistoryPage {
            room_id: room(7),
            messages: vec![message(2, 2), message(1, 1)],
            next_cursor: Some(0),
            has_more: false,
        };

        // when (操作):
        let merge = store.apply_history_page(page);
        store.append_live(message(3, 3));

        // then (期待する結果):
        assert_eq!(merge, HistoryMerge::Applied { inserted: 2 });
        assert_eq!(sequences(&store), vec![1, 2, 3]);
        assert_eq!(store.next_cursor(), Some(0));
        assert!(!store.has_more());
    }

    #[test]
    fn test_history_overlapping_live_push_is_deduplicated() {
        // テスト項目: ライブで先に届いたメッセージが履歴にも含まれていても重複しない
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));
        store.append_live(message(3, 3));

        // when (操作):
        let merge = store.apply_history_page(HistoryPage {
            room_id: room(7),
            messages: vec![message(3, 3), message(2, 2), message(1, 1)],
            next_cursor: Some(1),
            has_more: true,
        });

        // then (期待する結果):
        assert_eq!(merge, HistoryMerge::Applied { inserted: 2 });
        assert_eq!(sequences(&store), vec![1, 2, 3]);
        assert!(store.has_more());
    }

    #[test]
    fn test_history_page_for_other_room_is_discarded() {
        // テスト項目: 別のルーム向けに遅れて届いた履歴ページは破棄される
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));

        // when (操作):
        let merge = store.apply_history_page(HistoryPage {
            room_id: room(9),
            messages: vec![message(1, 1)],
            next_cursor: None,
            has_more: false,
        });

        // then (期待する結果):
        assert_eq!(merge, HistoryMerge::Discarded { page_room_id: room(9) });
        assert!(store.is_empty());
        assert!(store.has_more());
    }

    #[test]
    fn test_get_after_inserts_shift_positions() {
        // テスト項目: 前方への挿入で位置がずれても ID で取得できる
        // given (前提条件):
        let mut store = RoomMessageStore::new(room(7));
        store.append_live(message(30, 30));
        store.append_live(message(10, 10));
        store.append_live(message(20, 20));

        // when (操作):
        let found = store.get(MessageId::new(30).unwrap());

        // then (期待する結果):
        assert_eq!(found.map(|m| m.sequence.value()), Some(30));
        assert_eq!(sequences(&store), vec![10, 20, 30]);
    }
}
