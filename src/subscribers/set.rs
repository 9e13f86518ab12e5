//! # SubscriberSet: per-subscriber lanes with a flush barrier
//!
//! Each subscriber owns a *lane*: a bounded queue drained by its own task.
//! [`SubscriberSet::emit`] drops an event into every lane without waiting;
//! [`SubscriberSet::flush`] waits until every lane has processed what was
//! queued before the call.
//!
//! ```text
//!   emit(&Event) ──┬──► lane "log-writer" ─► on_event() ...
//!                  └──► lane "alerts"     ─► on_event() ...
//!
//!   flush() ───────┬──► lane "log-writer" ... ─► Flush ─► ack ┐
//!                  └──► lane "alerts"     ... ─► Flush ─► ack ┴─► returns
//! ```
//!
//! Lanes are FIFO and independent: a slow or panicking subscriber only
//! affects its own lane. A full lane drops the event for that subscriber and
//! logs a warning; there is no ordering across lanes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};

use crate::events::Event;

use super::Subscribe;

/// What travels down a lane.
enum Envelope {
    Event(Arc<Event>),
    /// Acknowledged once everything queued before it was processed.
    Flush(oneshot::Sender<()>),
}

struct Lane {
    subscriber: &'static str,
    tx: mpsc::Sender<Envelope>,
}

/// Fan-out over subscriber lanes.
///
/// Lane tasks end once the set is dropped and their queues are drained.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
}

impl SubscriberSet {
    /// Spawns one lane per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            lanes: subs.into_iter().map(open_lane).collect(),
        }
    }

    /// Queues `event` on every lane without waiting.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for lane in &self.lanes {
            let dropped = match lane.tx.try_send(Envelope::Event(Arc::clone(&event))) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "lane full",
                Err(mpsc::error::TrySendError::Closed(_)) => "lane closed",
            };
            tracing::warn!(subscriber = lane.subscriber, kind = ?event.kind, reason = dropped, "event dropped");
        }
    }

    /// Waits until every lane has processed the events queued before this call.
    ///
    /// Lanes drain concurrently; a closed lane counts as flushed.
    pub async fn flush(&self) {
        let mut acks = Vec::with_capacity(self.lanes.len());
        for lane in &self.lanes {
            let (ack, done) = oneshot::channel();
            if lane.tx.send(Envelope::Flush(ack)).await.is_ok() {
                acks.push(done);
            }
        }
        for done in acks {
            let _ = done.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

fn open_lane(sub: Arc<dyn Subscribe>) -> Lane {
    let (tx, mut rx) = mpsc::channel(sub.queue_capacity().max(1));
    let subscriber = sub.name();

    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match envelope {
                Envelope::Event(event) => {
                    let delivery = AssertUnwindSafe(sub.on_event(&event)).catch_unwind();
                    if let Err(panic) = delivery.await {
                        tracing::warn!(subscriber = sub.name(), kind = ?event.kind, panic = ?panic, "subscriber panicked");
                    }
                }
                Envelope::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    });

    Lane { subscriber, tx }
}
