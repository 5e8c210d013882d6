//! Room lifecycle state machine.
//!
//! ```text
//! Open ──(RoomClosed for this room)──> Evicted
//! ```
//!
//! `Evicted` is terminal for the view. Re-entering the room builds a new view.

use super::{
    event::{RoomClosedEvent, RoomEvent},
    value_object::RoomId,
};

/// Why a view was evicted, for display to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionNotice {
    pub room_id: RoomId,
    pub room_name: String,
    pub reason_label: String,
}

impl From<&RoomClosedEvent> for EvictionNotice {
    fn from(event: &RoomClosedEvent) -> Self {
        Self {
            room_id: event.room_id,
            room_name: event.room_name.clone(),
            reason_label: event.reason_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomLifecycle {
    Open,
    Evicted(EvictionNotice),
}

/// Outcome of feeding one room event to the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleTransition {
    Unchanged,
    Evicted(EvictionNotice),
}

/// Watches room events on behalf of the view of `room_id`.
#[derive(Debug, Clone)]
pub struct RoomLifecycleWatcher {
    room_id: RoomId,
    state: RoomLifecycle,
}

impl RoomLifecycleWatcher {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            state: RoomLifecycle::Open,
        }
    }

    pub fn state(&self) -> &RoomLifecycle {
        &self.state
    }

    pub fn is_evicted(&self) -> bool {
        matches!(self.state, RoomLifecycle::Evicted(_))
    }

    /// Feed one room event. Closures of other rooms and events received after
    /// eviction leave the state unchanged.
    pub fn observe(&mut self, event: &RoomEvent) -> LifecycleTransition {
        if self.is_evicted() {
            return LifecycleTransition::Unchanged;
        }

        match event {
            RoomEvent::RoomClosed(closed) if closed.room_id == self.room_id => {
                let notice = EvictionNotice::from(closed);
                self.state = RoomLifecycle::Evicted(notice.clone());
                LifecycleTransition::Evicted(notice)
            }
            RoomEvent::RoomClosed(_) | RoomEvent::Other(_) => LifecycleTransition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(room_id: i64) -> RoomEvent {
        RoomEvent::RoomClosed(RoomClosedEvent {
            room_id: RoomId::new(room_id).unwrap(),
            room_name: format!("room {room_id}"),
            reason_label: "Closed by host".to_string(),
        })
    }

    #[test]
    fn test_close_of_open_room_evicts() {
        // テスト項目: 表示中のルーム 7 の終了イベントで Evicted に遷移する
        // given (前提条件):
        let mut watcher = RoomLifecycleWatcher::new(RoomId::new(7).unwrap());

        // when (操作):
        let transition = watcher.observe(&closed(7));

        // then (期待する結果):
        let notice = EvictionNotice {
            room_id: RoomId::new(7).unwrap(),
            room_name: "room 7".to_string(),
            reason_label: "Closed by host".to_string(),
        };
        assert_eq!(transition, LifecycleTransition::Evicted(notice.clone()));
        assert_eq!(watcher.state(), &RoomLifecycle::Evicted(notice));
    }

    #[test]
    fn test_close_of_other_room_is_ignored() {
        // テスト項目: ルーム 7 を表示中にルーム 9 の終了イベントが届いても遷移しない
        // given (前提条件):
        let mut watcher = RoomLifecycleWatcher::new(RoomId::new(7).unwrap());

        // when (操作):
        let transition = watcher.observe(&closed(9));

        // then (期待する結果):
        assert_eq!(transition, LifecycleTransition::Unchanged);
        assert_eq!(watcher.state(), &RoomLifecycle::Open);
    }

    #[test]
    fn test_evicted_is_terminal() {
        // テスト項目: Evicted の後はどのイベントでも状態が変わらない
        // given (前提条件):
        let mut watcher = RoomLifecycleWatcher::new(RoomId::new(7).unwrap());
        watcher.observe(&closed(7));

        // when (操作):
        let again = watcher.observe(&closed(7));
        let other = watcher.observe(&RoomEvent::Other("ROOM_RENAMED".to_string()));

        // then (期待する結果):
        assert_eq!(again, LifecycleTransition::Unchanged);
        assert_eq!(other, LifecycleTransition::Unchanged);
        assert!(watcher.is_evicted());
    }
}
