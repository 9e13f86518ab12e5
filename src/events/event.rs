//! # Runtime events emitted by the supervisor and resource workers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Connect events**: backend connection flow (connected, skipped, failed, retry scheduled)
//! - **Resource events**: build/watch lifecycle of one resource
//! - **Shutdown events**: supervisor-wide stop
//!
//! The [`Event`] struct carries additional metadata such as timestamps, resource
//! and backend names, errors and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use resvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackendConnectFailed)
//!     .with_resource("haproxy")
//!     .with_backend("file")
//!     .with_reason("no such file")
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind, EventKind::BackendConnectFailed);
//! assert_eq!(ev.resource.as_deref(), Some("haproxy"));
//! assert_eq!(ev.reason.as_deref(), Some("no such file"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Shutdown events ===
    /// Stop signal observed; all workers are being cancelled.
    ///
    /// Sets:
    /// - `at`, `seq`
    ShutdownRequested,

    /// Every worker unwound after a stop request.
    ///
    /// Sets:
    /// - `at`, `seq`
    AllStopped,

    // === Connect events ===
    /// Worker started its connect phase.
    ///
    /// Sets:
    /// - `resource`: resource name
    ResourceStarting,

    /// A backend connected and its client was added to the set.
    ///
    /// Sets:
    /// - `resource`, `backend`
    /// - `attempt`: attempt number that succeeded (1-based)
    BackendConnected,

    /// A backend type has no configuration for this resource.
    ///
    /// Sets:
    /// - `resource`, `backend`
    BackendSkipped,

    /// A connection attempt failed and will be retried.
    ///
    /// Sets:
    /// - `resource`, `backend`
    /// - `attempt`: failed attempt number
    /// - `reason`: failure message
    BackendConnectFailed,

    /// Next connection attempt scheduled.
    ///
    /// Sets:
    /// - `resource`, `backend`
    /// - `attempt`: failed attempt number
    /// - `delay_ms`: delay before the next attempt (ms)
    RetryScheduled,

    // === Resource events ===
    /// The monitorable resource could not be built; the worker terminates.
    ///
    /// Sets:
    /// - `resource`
    /// - `reason`: build error message
    ResourceBuildFailed,

    /// The watch phase started.
    ///
    /// Sets:
    /// - `resource`
    ResourceWatching,

    /// The worker is exiting (watch returned, build failed or cancelled).
    ///
    /// Sets:
    /// - `resource`
    ResourceStopped,

    /// The worker's backend clients were released.
    ///
    /// Sets:
    /// - `resource`
    /// - `released`: number of clients closed
    BackendsReleased,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the resource, if applicable.
    pub resource: Option<Arc<str>>,
    /// Name of the backend, if applicable.
    pub backend: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors).
    pub reason: Option<Arc<str>>,
    /// Number of released clients.
    pub released: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            resource: None,
            backend: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            released: None,
        }
    }

    /// Attaches a resource name.
    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Arc<str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attaches a backend name.
    #[inline]
    pub fn with_backend(mut self, backend: impl Into<Arc<str>>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the number of released clients.
    #[inline]
    pub fn with_released(mut self, n: usize) -> Self {
        self.released = Some(n.min(u32::MAX as usize) as u32);
        self
    }
}
