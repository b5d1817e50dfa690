//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the
//! supervisor publish lifecycle events without blocking, and lets embedders
//! observe a run from outside the subscriber fan-out.
//!
//! ## Architecture
//! ```text
//! Publisher (one):                    Receivers (any number):
//!                       ┌──────────► embedder taps (tests, dashboards)
//!   Supervisor ──► Bus ─┤
//!                       └──────────► (registered subscribers are fed
//!                   (broadcast chan)  directly; see SubscriberSet)
//! ```
//!
//! Registered subscribers do not go through the bus: the supervisor hands
//! each published event straight to [`SubscriberSet`](crate::SubscriberSet),
//! whose bounded queues and drain-on-close give alert delivery a flush
//! guarantee the lossy broadcast channel cannot.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Thin wrapper over [`tokio::sync::broadcast`] that provides `publish`/`subscribe` API.
/// Subscribing is cheap and independent; receivers get clones of each event.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately (send clones internally).
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// ### Notes
    /// - Capacity is **shared** across all receivers (not per-receiver).
    /// - When receivers lag, they will observe `RecvError::Lagged`.
    /// - The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// - Takes ownership of the event; the broadcast channel clones it for each receiver.
    /// - If there are no receivers, the event is dropped (this function still returns immediately).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// - Each call creates an **independent** receiver.
    /// - A receiver only gets events **sent after** it subscribes.
    /// - Slow receivers get `RecvError::Lagged(n)` and skip over missed items.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publishes a borrowed event by cloning it.
    ///
    /// Shorthand for `publish(ev.clone())`, useful when you already have a reference.
    pub fn publish_ref(&self, ev: &Event) {
        let _ = self.tx.send(ev.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_subscriber_receives_published_events() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::JobStarting).with_job("j"));
        bus.publish(Event::new(EventKind::JobCompleted).with_job("j"));

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::JobStarting);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::JobCompleted);
    }

    #[tokio::test]
    async fn test_publish_without_receivers_is_dropped() {
        let bus = Bus::new(1);
        // No receiver yet; nothing to assert beyond "does not block or panic".
        bus.publish(Event::new(EventKind::RunClosed));

        let mut rx = bus.subscribe();
        bus.publish_ref(&Event::new(EventKind::ShutdownRequested));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownRequested);
    }
}
