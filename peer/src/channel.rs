//! Presence channel contract and an in-process hub implementation.
//!
//! The engine only depends on the [`PresenceChannel`] contract: a named room
//! channel that reports which members are subscribed and relays opaque
//! payloads between them. The hosted pub/sub provider fulfills this contract
//! in production; [`LocalHub`] fulfills it in-process for the demo binary and
//! the integration tests.

use log::debug;
use shared::Member;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

/// Events delivered to a subscriber of a presence channel.
///
/// Per-sender ordering is guaranteed by the transport; no ordering is assumed
/// across senders.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Subscription is live; carries the full member snapshot, local member
    /// included.
    SubscriptionSucceeded { members: Vec<Member> },
    MemberAdded { member: Member },
    MemberRemoved { member: Member },
    /// An application payload published by another member. The channel never
    /// echoes a member's own messages back to it.
    Message { sender_id: String, payload: String },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("not subscribed to room {0}")]
    NotSubscribed(String),
    #[error("peer {0} has left the room")]
    Gone(String),
}

/// The transport surface the engine publishes through.
///
/// `unsubscribe` is idempotent; implementations are expected to also
/// unsubscribe on drop so every teardown path releases the channel.
pub trait PresenceChannel: Send {
    fn publish(&self, payload: String) -> Result<(), ChannelError>;
    fn unsubscribe(&self);
}

struct RoomSlot {
    member: Member,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

/// In-process presence pub/sub: rooms of up to two members exchanging
/// payloads over unbounded channels.
#[derive(Clone, Default)]
pub struct LocalHub {
    rooms: Arc<Mutex<HashMap<String, Vec<RoomSlot>>>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_rooms(&self) -> MutexGuard<'_, HashMap<String, Vec<RoomSlot>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins `member` to the room, returning the publish handle and the
    /// event stream. Existing members observe a `MemberAdded`; the new
    /// member's stream starts with `SubscriptionSucceeded`.
    pub fn subscribe(
        &self,
        room_id: &str,
        member: Member,
    ) -> (LocalSubscription, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut rooms = self.lock_rooms();
        let slots = rooms.entry(room_id.to_string()).or_default();

        for slot in slots.iter() {
            let _ = slot.tx.send(ChannelEvent::MemberAdded {
                member: member.clone(),
            });
        }

        let mut members: Vec<Member> = slots.iter().map(|s| s.member.clone()).collect();
        members.push(member.clone());
        let _ = tx.send(ChannelEvent::SubscriptionSucceeded { members });

        slots.push(RoomSlot {
            member: member.clone(),
            tx,
        });
        debug!("{} subscribed to room {}", member.id, room_id);

        let subscription = LocalSubscription {
            hub: self.clone(),
            room_id: room_id.to_string(),
            member_id: member.id,
        };
        (subscription, rx)
    }

    /// Current member count of a room; zero once everyone has left.
    pub fn member_count(&self, room_id: &str) -> usize {
        self.lock_rooms().get(room_id).map_or(0, Vec::len)
    }

    fn publish_from(
        &self,
        room_id: &str,
        sender_id: &str,
        payload: String,
    ) -> Result<(), ChannelError> {
        let rooms = self.lock_rooms();
        let slots = rooms
            .get(room_id)
            .ok_or_else(|| ChannelError::NotSubscribed(room_id.to_string()))?;
        if !slots.iter().any(|s| s.member.id == sender_id) {
            return Err(ChannelError::Gone(sender_id.to_string()));
        }

        for slot in slots.iter().filter(|s| s.member.id != sender_id) {
            let _ = slot.tx.send(ChannelEvent::Message {
                sender_id: sender_id.to_string(),
                payload: payload.clone(),
            });
        }
        Ok(())
    }

    fn remove(&self, room_id: &str, member_id: &str) {
        let mut rooms = self.lock_rooms();
        let Some(slots) = rooms.get_mut(room_id) else {
            return;
        };
        let Some(index) = slots.iter().position(|s| s.member.id == member_id) else {
            return;
        };

        let removed = slots.remove(index);
        debug!("{} left room {}", removed.member.id, room_id);
        for slot in slots.iter() {
            let _ = slot.tx.send(ChannelEvent::MemberRemoved {
                member: removed.member.clone(),
            });
        }
        if slots.is_empty() {
            rooms.remove(room_id);
        }
    }
}

/// One member's live subscription to a room on a [`LocalHub`].
///
/// Dropping the subscription leaves the room, so holding it for the scope of
/// the event loop guarantees no orphaned broadcasts after teardown.
pub struct LocalSubscription {
    hub: LocalHub,
    room_id: String,
    member_id: String,
}

impl PresenceChannel for LocalSubscription {
    fn publish(&self, payload: String) -> Result<(), ChannelError> {
        self.hub.publish_from(&self.room_id, &self.member_id, payload)
    }

    fn unsubscribe(&self) {
        self.hub.remove(&self.room_id, &self.member_id);
    }
}

impl Drop for LocalSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_subscription_snapshot_includes_existing_members() {
        let hub = LocalHub::new();
        let (_sub_a, mut rx_a) = hub.subscribe("room-1", Member::new("a1", "Alice"));
        let (_sub_b, mut rx_b) = hub.subscribe("room-1", Member::new("b2", "Bob"));

        match drain(&mut rx_b).first() {
            Some(ChannelEvent::SubscriptionSucceeded { members }) => {
                let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
                assert_eq!(ids, vec!["a1", "b2"]);
            }
            other => panic!("expected subscription snapshot, got {:?}", other),
        }

        let a_events = drain(&mut rx_a);
        assert!(a_events
            .iter()
            .any(|e| matches!(e, ChannelEvent::MemberAdded { member } if member.id == "b2")));
    }

    #[test]
    fn test_publish_does_not_echo_to_sender() {
        let hub = LocalHub::new();
        let (sub_a, mut rx_a) = hub.subscribe("room-1", Member::new("a1", "Alice"));
        let (_sub_b, mut rx_b) = hub.subscribe("room-1", Member::new("b2", "Bob"));
        drain(&mut rx_a);
        drain(&mut rx_b);

        sub_a.publish("hello".to_string()).unwrap();

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            drain(&mut rx_b),
            vec![ChannelEvent::Message {
                sender_id: "a1".to_string(),
                payload: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn test_drop_notifies_remaining_member() {
        let hub = LocalHub::new();
        let (sub_a, _rx_a) = hub.subscribe("room-1", Member::new("a1", "Alice"));
        let (_sub_b, mut rx_b) = hub.subscribe("room-1", Member::new("b2", "Bob"));
        drain(&mut rx_b);

        drop(sub_a);

        assert_eq!(
            drain(&mut rx_b),
            vec![ChannelEvent::MemberRemoved {
                member: Member::new("a1", "Alice"),
            }]
        );
        assert_eq!(hub.member_count("room-1"), 1);
    }

    #[test]
    fn test_publish_after_unsubscribe_fails() {
        let hub = LocalHub::new();
        let (sub_a, _rx_a) = hub.subscribe("room-1", Member::new("a1", "Alice"));
        let (_sub_b, _rx_b) = hub.subscribe("room-1", Member::new("b2", "Bob"));

        sub_a.unsubscribe();
        assert!(sub_a.publish("late".to_string()).is_err());
        // Idempotent: a second unsubscribe (and the one in Drop) is a no-op.
        sub_a.unsubscribe();
        assert_eq!(hub.member_count("room-1"), 1);
    }

    #[test]
    fn test_room_is_dropped_when_empty() {
        let hub = LocalHub::new();
        let (sub_a, _rx_a) = hub.subscribe("room-1", Member::new("a1", "Alice"));
        drop(sub_a);
        assert_eq!(hub.member_count("room-1"), 0);
    }
}
