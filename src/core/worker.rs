//! # ResourceWorker: one resource's lifecycle.
//!
//! Brings the backends of one [`Resource`] online, hands them to the template
//! engine and keeps the result monitored until cancelled.
//!
//! ## States
//! ```text
//! Connecting ──► (fail) Retrying ──► (sleep retry_delay) Connecting
//!     │                  │
//!     │ all resolved     │ cancelled
//!     ▼                  ▼
//! Building ──(error)──► Terminated ◄── cancelled ── Connecting
//!     │                     ▲
//!     ▼                     │
//! Watching ──(monitor returns)
//! ```
//!
//! ## Architecture
//! ```text
//! ResourceWorker::run(token)
//!
//! clients = BackendClientSet::new()          (released on every exit path)
//! for connector in resource.backend.connectors() {
//!   loop {
//!     ├─► token cancelled?          → Terminated
//!     ├─► connect() (cancellable)
//!     │     ├─ Ok            → publish BackendConnected, push, next connector
//!     │     ├─ NotConfigured → publish BackendSkipped, next connector
//!     │     └─ Err           → publish BackendConnectFailed + RetryScheduled
//!     │                        sleep(retry_delay) (cancellable)
//!   }
//! }
//! factory.new_resource(..)    ── Err → publish ResourceBuildFailed → Terminated
//! publish ResourceWatching
//! monitor.monitor(token).await
//! drop(monitor); clients.release(); publish ResourceStopped, BackendsReleased
//! ```
//!
//! ## Rules
//! - Connectors are processed **in declaration order**, one at a time.
//! - Retries are **unbounded** and evenly spaced by `retry_delay`; only success,
//!   `NotConfigured` or cancellation end them.
//! - The build phase never starts before every connector is resolved.
//! - Every connected client is closed **exactly once**, after the monitor is dropped.
//!   An aborted or panicking worker releases through `Drop`.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::backends::{BackendClient, BackendClientSet, Connect};
use crate::config::Resource;
use crate::events::{Bus, Event, EventKind};
use crate::template::FactoryRef;

/// Cancellation was observed during the connect phase.
struct Cancelled;

/// Supervises the lifecycle of a single [`Resource`].
pub struct ResourceWorker {
    /// Resource owned by this worker.
    resource: Resource,
    /// Template engine entry point.
    factory: FactoryRef,
    /// Pause between two connect attempts of one backend.
    retry_delay: Duration,
    /// Internal event bus.
    bus: Bus,
    /// Resource name attached to every event.
    name: Arc<str>,
}

impl ResourceWorker {
    /// Creates a new worker.
    pub fn new(resource: Resource, factory: FactoryRef, retry_delay: Duration, bus: Bus) -> Self {
        let name: Arc<str> = Arc::from(resource.name());
        Self {
            resource,
            factory,
            retry_delay,
            bus,
            name,
        }
    }

    /// Runs the worker until the watch phase returns, the build fails or `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        self.publish(EventKind::ResourceStarting);
        let mut clients = BackendClientSet::new();

        if self.connect_all(&mut clients, &token).await.is_ok() {
            self.build_and_watch(&clients, &token).await;
        }

        let released = clients.release();
        self.publish(EventKind::ResourceStopped);
        self.bus.publish(
            Event::new(EventKind::BackendsReleased)
                .with_resource(self.name.clone())
                .with_released(released),
        );
    }

    /// Resolves every connector in declaration order.
    async fn connect_all(
        &self,
        clients: &mut BackendClientSet,
        token: &CancellationToken,
    ) -> Result<(), Cancelled> {
        for connector in self.resource.backend.connectors() {
            if let Some(client) = self.connect_one(connector.as_ref(), token).await? {
                clients.push(client);
            }
        }
        Ok(())
    }

    /// Connects one backend, retrying until success, `NotConfigured` or cancellation.
    async fn connect_one(
        &self,
        connector: &dyn Connect,
        token: &CancellationToken,
    ) -> Result<Option<BackendClient>, Cancelled> {
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return Err(Cancelled);
            }
            attempt = attempt.saturating_add(1);

            let res = select! {
                biased;
                _ = token.cancelled() => return Err(Cancelled),
                res = connector.connect() => res,
            };

            match res {
                Ok(client) => {
                    self.bus.publish(
                        self.backend_event(EventKind::BackendConnected, connector)
                            .with_attempt(attempt),
                    );
                    return Ok(Some(client));
                }
                Err(e) if !e.is_retryable() => {
                    self.bus
                        .publish(self.backend_event(EventKind::BackendSkipped, connector));
                    return Ok(None);
                }
                Err(e) => {
                    self.bus.publish(
                        self.backend_event(EventKind::BackendConnectFailed, connector)
                            .with_attempt(attempt)
                            .with_reason(e.to_string()),
                    );
                    self.bus.publish(
                        self.backend_event(EventKind::RetryScheduled, connector)
                            .with_attempt(attempt)
                            .with_delay(self.retry_delay),
                    );

                    let sleep = time::sleep(self.retry_delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = token.cancelled() => return Err(Cancelled),
                    }
                }
            }
        }
    }

    /// Builds the monitorable resource and runs it; the monitor is dropped on return.
    async fn build_and_watch(&self, clients: &BackendClientSet, token: &CancellationToken) {
        let mut monitor = match self
            .factory
            .new_resource(&self.name, clients, &self.resource.template)
        {
            Ok(m) => m,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::ResourceBuildFailed)
                        .with_resource(self.name.clone())
                        .with_reason(e.to_string()),
                );
                return;
            }
        };

        self.publish(EventKind::ResourceWatching);
        monitor.monitor(token.clone()).await;
    }

    fn publish(&self, kind: EventKind) {
        self.bus
            .publish(Event::new(kind).with_resource(self.name.clone()));
    }

    fn backend_event(&self, kind: EventKind, connector: &dyn Connect) -> Event {
        Event::new(kind)
            .with_resource(self.name.clone())
            .with_backend(connector.name())
    }
}
