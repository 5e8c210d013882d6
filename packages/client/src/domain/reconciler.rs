//! Unread counters and read receipts.
//!
//! Unread updates overwrite the stored count (last write wins), so a batch
//! delivered twice converges to the same state as a single delivery.

use std::collections::HashMap;

use super::{
    event::{ReadStatus, UnreadUpdateBatch},
    store::RoomMessageStore,
    value_object::{Sequence, UserId},
};

impl RoomMessageStore {
    /// Apply a batch of unread counts to held messages.
    ///
    /// Updates for messages not held by the store are ignored; they are not
    /// fetched retroactively. Returns the number of messages whose count
    /// changed.
    pub fn apply_unread_updates(&mut self, batch: &UnreadUpdateBatch) -> usize {
        let mut changed = 0;
        for update in &batch.updates {
            if let Some(message) = self.get_mut(update.message_id)
                && message.unread_count != update.unread_count
            {
                message.unread_count = update.unread_count;
                changed += 1;
            }
        }
        changed
    }
}

/// Read position of each room member, for read-receipt display.
#[derive(Debug, Clone, Default)]
pub struct ReadReceipts {
    by_reader: HashMap<UserId, Sequence>,
}

impl ReadReceipts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read status. A reader's position never moves backwards;
    /// returns `true` when it advanced.
    pub fn apply_read_status(&mut self, status: ReadStatus) -> bool {
        match self.by_reader.get(&status.reader_id) {
            Some(current) if *current >= status.read_sequence => false,
            _ => {
                self.by_reader
                    .insert(status.reader_id, status.read_sequence);
                true
            }
        }
    }

    /// Last sequence read by `reader`.
    pub fn read_sequence(&self, reader: UserId) -> Option<Sequence> {
        self.by_reader.get(&reader).copied()
    }

    /// Number of readers who have read at least up to `sequence`.
    pub fn readers_at(&self, sequence: Sequence) -> usize {
        self.by_reader.values().filter(|read| **read >= sequence).count()
    }
}
