//! Public completion events.
//!
//! Events are published over channels: every subscriber gets its own
//! receiver and sees every event published after it subscribed, in order.
//! Subscribers drain their receiver from the same loop that polls the
//! orchestrator, so reacting to an event can call straight back into it.

use std::sync::mpsc;

use serde::Serialize;

use super::backend::JoinResult;
use super::settings::SessionSearchResult;

/// Completion notifications broadcast by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionEvent {
    CreateSessionComplete {
        success: bool,
    },
    FindSessionsComplete {
        results: Vec<SessionSearchResult>,
        success: bool,
    },
    /// Address to travel to after a join; published before the matching
    /// `JoinSessionComplete`.
    ConnectAddressResolved {
        address: String,
    },
    JoinSessionComplete {
        result: JoinResult,
    },
    StartSessionComplete {
        success: bool,
    },
    DestroySessionComplete {
        success: bool,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateSessionComplete { .. } => "create_session_complete",
            Self::FindSessionsComplete { .. } => "find_sessions_complete",
            Self::ConnectAddressResolved { .. } => "connect_address_resolved",
            Self::JoinSessionComplete { .. } => "join_session_complete",
            Self::StartSessionComplete { .. } => "start_session_complete",
            Self::DestroySessionComplete { .. } => "destroy_session_complete",
        }
    }
}

/// Subscriber handle id.
pub type SubscriptionId = u64;

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<SessionEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next queued event, if any.
    pub fn try_next(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }

    /// All queued events.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.rx.try_iter().collect()
    }
}

/// Subscriber registry.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, mpsc::Sender<SessionEvent>)>,
    next_id: SubscriptionId,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&mut self) -> Subscription {
        self.next_id += 1;
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((self.next_id, tx));
        Subscription {
            id: self.next_id,
            rx,
        }
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every current subscriber.
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub fn publish(&mut self, event: SessionEvent) {
        tracing::debug!("Publishing {} to {} subscribers", event.name(), self.subscribers.len());
        self.subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_publish_to_all() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(SessionEvent::CreateSessionComplete { success: true });

        assert_eq!(a.drain(), vec![SessionEvent::CreateSessionComplete { success: true }]);
        assert_eq!(b.drain(), vec![SessionEvent::CreateSessionComplete { success: true }]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        assert!(bus.unsubscribe(a.id()));
        assert!(!bus.unsubscribe(a.id()));

        bus.publish(SessionEvent::DestroySessionComplete { success: false });
        assert!(a.try_next().is_none());
        assert_eq!(
            b.try_next(),
            Some(SessionEvent::DestroySessionComplete { success: false })
        );
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(SessionEvent::StartSessionComplete { success: true });
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(a.drain().len(), 1);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(SessionEvent::CreateSessionComplete { success: true });
        let late = bus.subscribe();
        assert!(late.drain().is_empty());
    }
}
