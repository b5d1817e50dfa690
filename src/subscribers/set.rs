//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`](crate::events::Event) to multiple
//! subscribers **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and logged (isolation).
//! - [`SubscriberSet::drain`] waits until every queued event has been
//!   processed, so alerts emitted just before process exit are flushed.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for that
//!   subscriber).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::Subscribe;

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(&sub);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = s.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        tracing::warn!(
                            subscriber = s.name(),
                            payload = ?panic_err,
                            "subscriber panicked while handling event"
                        );
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self { channels, workers }
    }

    /// Fan-out one event to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the event is dropped for it
    /// and a warning is logged with the subscriber's name.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        "subscriber dropped event: queue full"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        "subscriber dropped event: worker closed"
                    );
                }
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    ///
    /// Queued events are still processed; workers exit once their queue is
    /// empty. Calling this twice is a no-op. Events emitted after a drain are
    /// dropped with a "worker closed" warning.
    pub async fn drain(&mut self) {
        self.channels.clear();
        for h in self.workers.drain(..) {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn test_drain_flushes_queued_events() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let mut set = SubscriberSet::new(vec![recorder.clone() as Arc<dyn Subscribe>]);
        assert_eq!(set.len(), 1);

        set.emit(&Event::new(EventKind::JobStarting));
        set.emit(&Event::new(EventKind::JobCompleted));
        set.drain().await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(&*seen, &[EventKind::JobStarting, EventKind::JobCompleted]);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_does_not_poison_others() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let mut set = SubscriberSet::new(vec![
            Arc::new(Exploder) as Arc<dyn Subscribe>,
            recorder.clone() as Arc<dyn Subscribe>,
        ]);

        set.emit(&Event::new(EventKind::JobFailed));
        set.emit(&Event::new(EventKind::RunClosed));
        set.drain().await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(&*seen, &[EventKind::JobFailed, EventKind::RunClosed]);
    }

    #[tokio::test]
    async fn test_drain_twice_is_harmless() {
        let mut set = SubscriberSet::new(Vec::new());
        assert!(set.is_empty());
        set.drain().await;
        set.drain().await;
    }
}
