//! # LogWriter: events to structured log records
//!
//! Turns runtime [`Event`]s into `tracing` records. The supervisor always
//! installs one, so connect and build failures are visible even without
//! user subscribers.
//!
//! ## Example output (text format)
//! ```text
//! ERROR resvisor: backend connect failed resource="haproxy" backend="file" attempt=1 error="connect file: No such file or directory (os error 2)"
//!  INFO resvisor: retry scheduled resource="haproxy" backend="file" attempt=1 delay_ms=2000
//!  INFO resvisor: backend connected resource="haproxy" backend="file" attempt=2
//!  INFO resvisor: watching resource resource="haproxy"
//!  INFO resvisor: shutdown requested
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Log record target used for every runtime event.
pub(crate) const TARGET: &str = "resvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let resource = e.resource.as_deref().unwrap_or("-");
        let backend = e.backend.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ShutdownRequested => {
                tracing::info!(target: TARGET, "shutdown requested");
            }
            EventKind::AllStopped => {
                tracing::info!(target: TARGET, "all resources stopped");
            }
            EventKind::ResourceStarting => {
                tracing::debug!(target: TARGET, resource, "connecting backends");
            }
            EventKind::BackendConnected => {
                tracing::info!(target: TARGET, resource, backend, attempt = e.attempt, "backend connected");
            }
            EventKind::BackendSkipped => {
                tracing::trace!(target: TARGET, resource, backend, "backend not configured");
            }
            EventKind::BackendConnectFailed => {
                tracing::error!(
                    target: TARGET,
                    resource,
                    backend,
                    attempt = e.attempt,
                    error = reason,
                    "backend connect failed"
                );
            }
            EventKind::RetryScheduled => {
                tracing::info!(
                    target: TARGET,
                    resource,
                    backend,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    "retry scheduled"
                );
            }
            EventKind::ResourceBuildFailed => {
                tracing::error!(target: TARGET, resource, error = reason, "resource build failed");
            }
            EventKind::ResourceWatching => {
                tracing::info!(target: TARGET, resource, "watching resource");
            }
            EventKind::ResourceStopped => {
                tracing::info!(target: TARGET, resource, "resource stopped");
            }
            EventKind::BackendsReleased => {
                tracing::debug!(target: TARGET, resource, released = e.released, "backends released");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
