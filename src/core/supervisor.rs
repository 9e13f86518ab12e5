//! # Supervisor: one worker per resource, one stop signal for all.
//!
//! The [`Supervisor`] spawns a [`ResourceWorker`] per resource, forwards
//! runtime events to subscribers and fans a single stop signal out to every
//! worker.
//!
//! ## Architecture
//! ```text
//! Configuration.resource ──► Supervisor::run(resources, stop)
//!
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!   ResourceWorker #1    ResourceWorker #2 ...  ResourceWorker #N
//!   (child token)        (child token)          (child token)
//!          │                    │                    │
//!          └──── publish ───────┴────────────────────┘
//!                               ▼
//!                              Bus ──► subscriber_listener ──► SubscriberSet
//!                                                               (LogWriter, ...)
//! ```
//!
//! ## Rules
//! - Workers are independent: a resource stuck connecting never delays another.
//! - `stop` has priority over completion when both are ready.
//! - The first completion of `stop` cancels the root token once; `run` then waits
//!   for every worker, which in turn releases its backends.
//! - When every worker ends on its own, `run` returns without waiting for `stop`.
//! - `run` returns only after subscribers processed every event of the run
//!   (bounded by `flush_timeout`).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Resource;
use crate::core::{builder::SupervisorBuilder, config::SupervisorConfig, shutdown, worker::ResourceWorker};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::template::FactoryRef;

/// Orchestrates resource workers and their shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    factory: FactoryRef,
    /// Flush requests for the listener task.
    flushes: mpsc::Sender<oneshot::Sender<()>>,
}

impl Supervisor {
    /// Creates a builder for the given settings and template factory.
    pub fn builder(cfg: SupervisorConfig, factory: FactoryRef) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, factory)
    }

    /// Creates a supervisor and starts forwarding bus events to `subs`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        factory: FactoryRef,
    ) -> Self {
        let (flushes, requests) = mpsc::channel(1);
        let sup = Self {
            cfg,
            bus,
            subs,
            factory,
            flushes,
        };
        sup.subscriber_listener(requests);
        sup
    }

    /// Runs one worker per resource until they all end or `stop` completes.
    ///
    /// Unnamed resources are named `resource-{index}`. An empty list returns
    /// at once. Before returning, waits for subscribers to process every event
    /// published during the run.
    pub async fn run<S>(&self, resources: Vec<Resource>, stop: S)
    where
        S: Future<Output = ()>,
    {
        let token = CancellationToken::new();
        let mut set = JoinSet::new();

        self.spawn_workers(&mut set, &token, resources);
        self.drive_shutdown(&mut set, &token, stop).await;
        self.flush_subscribers().await;
    }

    /// Same as [`run`](Self::run), stopping on SIGINT, SIGTERM, SIGQUIT or Ctrl-C.
    ///
    /// If signal handlers cannot be installed, the error is logged and the
    /// workers run until they end on their own.
    pub async fn run_until_signal(&self, resources: Vec<Resource>) {
        let stop = async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "termination signal received"),
                Err(e) => {
                    tracing::error!(error = %e, "cannot install signal handlers");
                    std::future::pending::<()>().await;
                }
            }
        };
        self.run(resources, stop).await;
    }

    /// Forwards bus events to the subscriber set until the bus closes.
    ///
    /// A flush request first forwards whatever the bus still buffers, then
    /// waits for the subscriber lanes to drain before acknowledging.
    fn subscriber_listener(&self, mut requests: mpsc::Receiver<oneshot::Sender<()>>) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    Some(ack) = requests.recv() => {
                        forward_buffered(&mut rx, &set);
                        set.flush().await;
                        let _ = ack.send(());
                    }
                }
            }
        });
    }

    /// Waits until subscribers processed every event published so far.
    async fn flush_subscribers(&self) {
        let (ack, done) = oneshot::channel();
        if self.flushes.send(ack).await.is_err() {
            return;
        }
        if time::timeout(self.cfg.flush_timeout, done).await.is_err() {
            tracing::warn!(
                timeout_ms = self.cfg.flush_timeout.as_millis() as u64,
                "subscribers still busy when run returned"
            );
        }
    }

    fn spawn_workers(&self, set: &mut JoinSet<()>, token: &CancellationToken, resources: Vec<Resource>) {
        for (i, mut resource) in resources.into_iter().enumerate() {
            resource.name.get_or_insert_with(|| format!("resource-{i}"));
            let worker = ResourceWorker::new(
                resource,
                Arc::clone(&self.factory),
                self.cfg.retry_delay,
                self.bus.clone(),
            );
            set.spawn(worker.run(token.child_token()));
        }
    }

    async fn drive_shutdown<S>(&self, set: &mut JoinSet<()>, token: &CancellationToken, stop: S)
    where
        S: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = stop => {
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
                token.cancel();
                join_all(set).await;
                self.bus.publish(Event::new(EventKind::AllStopped));
            }
            _ = join_all(set) => {}
        }
    }
}

fn forward_buffered(rx: &mut broadcast::Receiver<Event>, set: &SubscriberSet) {
    loop {
        match rx.try_recv() {
            Ok(ev) => set.emit(&ev),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event listener lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// Waits for every task of `set`; panicked workers are logged.
async fn join_all(set: &mut JoinSet<()>) {
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            if e.is_panic() {
                tracing::error!(error = %e, "resource worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{Tally, resource};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::{self, Instant};

    fn supervisor(tally: &Arc<Tally>) -> Supervisor {
        Supervisor::builder(SupervisorConfig::default(), tally.factory()).build()
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_connect_releases_what_was_connected() {
        for n in [0usize, 1, 5] {
            let tally = Tally::new();
            let sup = supervisor(&tally);
            let resources = (0..n)
                .map(|i| {
                    resource(
                        &format!("watch-{i}"),
                        vec![tally.flaky("up", 0), tally.flaky("flaky", 1)],
                    )
                })
                .collect();

            // Fires once the first backend is connected, while the second one
            // of every resource is still waiting for its retry.
            let waiter = tally.clone();
            let stop = async move {
                while waiter.connects.load(Ordering::SeqCst) == 0 {
                    time::sleep(Duration::from_millis(1)).await;
                }
            };
            sup.run(resources, stop).await;

            let connects = tally.connects.load(Ordering::SeqCst);
            assert_eq!(tally.closes.load(Ordering::SeqCst), connects, "n = {n}");
            assert_eq!(tally.watching.load(Ordering::SeqCst), 0, "n = {n}");
            if n == 0 {
                assert_eq!(connects, 0);
            } else {
                assert!((1..=n).contains(&connects), "n = {n}, connects = {connects}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_watching_releases_every_resource() {
        let tally = Tally::new();
        let sup = supervisor(&tally);
        let resources = (0..5)
            .map(|i| resource(&format!("watch-{i}"), vec![tally.flaky("a", 0), tally.flaky("b", 1)]))
            .collect();

        let waiter = tally.clone();
        sup.run(resources, async move { waiter.wait_watching(5).await }).await;

        assert_eq!(tally.connects.load(Ordering::SeqCst), 10);
        assert_eq!(tally.closes.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_when_every_worker_ends() {
        let tally = Tally::new();
        let sup = supervisor(&tally);
        let resources = vec![
            resource("bad-one", vec![tally.flaky("a", 0)]),
            resource("done", vec![tally.flaky("b", 0)]),
        ];

        let run = sup.run(resources, std::future::pending());
        time::timeout(Duration::from_secs(60), run)
            .await
            .expect("run returns without a stop signal");

        assert_eq!(tally.builds.load(Ordering::SeqCst), 2);
        assert_eq!(tally.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_resource_list_returns_at_once() {
        let tally = Tally::new();
        supervisor(&tally).run(Vec::new(), std::future::pending()).await;
        assert_eq!(tally.builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn build_failure_does_not_affect_siblings() {
        let tally = Tally::new();
        let sup = supervisor(&tally);
        let mut rx = sup.bus.subscribe();
        let resources = vec![
            resource("bad-template", vec![tally.flaky("a", 0)]),
            resource("watch-good", vec![tally.flaky("b", 0)]),
        ];

        let waiter = tally.clone();
        sup.run(resources, async move {
            waiter.wait_watching(1).await;
            while waiter.closes.load(Ordering::SeqCst) < 1 {
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        assert_eq!(tally.closes.load(Ordering::SeqCst), 2);

        let mut failed = Vec::new();
        let mut all_stopped = false;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::ResourceBuildFailed => failed.extend(ev.resource),
                EventKind::AllStopped => all_stopped = true,
                _ => {}
            }
        }
        assert_eq!(failed.len(), 1);
        assert_eq!(&*failed[0], "bad-template");
        assert!(all_stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_resource_does_not_block_others() {
        let tally = Tally::new();
        let stuck = Tally::new();
        let sup = supervisor(&tally);
        let resources = vec![
            resource("watch-stuck", vec![stuck.flaky("down", usize::MAX)]),
            resource("watch-ok", vec![tally.flaky("up", 0)]),
        ];

        let waiter = tally.clone();
        let stopped_at = Arc::new(std::sync::Mutex::new(None));
        let mark = stopped_at.clone();
        sup.run(resources, async move {
            waiter.wait_watching(1).await;
            time::sleep(Duration::from_secs(5)).await;
            *mark.lock().unwrap() = Some(Instant::now());
        })
        .await;

        let stopped_at = stopped_at.lock().unwrap().expect("stop fired");
        assert!(Instant::now() - stopped_at < Duration::from_secs(2));
        assert!(stuck.attempts().len() >= 3);
        assert_eq!(stuck.connects.load(Ordering::SeqCst), 0);
        assert_eq!(tally.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_retry_delay_spaces_attempts_evenly() {
        let tally = Tally::new();
        let cfg = SupervisorConfig {
            retry_delay: Duration::from_secs(5),
            ..SupervisorConfig::default()
        };
        let sup = Supervisor::builder(cfg, tally.factory()).build();

        sup.run(vec![resource("once", vec![tally.flaky("a", 3)])], std::future::pending())
            .await;

        let attempts = tally.attempts();
        assert_eq!(attempts.len(), 4);
        let gaps: Vec<Duration> = attempts.windows(2).map(|p| p[1] - p[0]).collect();
        for gap in &gaps {
            assert!(*gap >= Duration::from_secs(5), "{gap:?}");
        }
        // No growth between consecutive retries.
        assert!(gaps[2] < gaps[0] + Duration::from_millis(5), "{gaps:?}");
    }

    #[derive(Default)]
    struct SlowRecorder(std::sync::Mutex<Vec<EventKind>>);

    #[async_trait::async_trait]
    impl crate::subscribers::Subscribe for SlowRecorder {
        async fn on_event(&self, ev: &Event) {
            time::sleep(Duration::from_millis(5)).await;
            self.0.lock().unwrap().push(ev.kind);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_returns_after_subscribers_caught_up() {
        let tally = Tally::new();
        let recorder = Arc::new(SlowRecorder::default());
        let sup = Supervisor::builder(SupervisorConfig::default(), tally.factory())
            .with_subscribers(vec![recorder.clone() as Arc<dyn crate::subscribers::Subscribe>])
            .build();

        let waiter = tally.clone();
        sup.run(vec![resource("watch-a", vec![tally.flaky("a", 0)])], async move {
            waiter.wait_watching(1).await
        })
        .await;

        let seen = recorder.0.lock().unwrap().clone();
        for kind in [
            EventKind::BackendConnected,
            EventKind::ShutdownRequested,
            EventKind::ResourceStopped,
            EventKind::BackendsReleased,
        ] {
            assert!(seen.contains(&kind), "{kind:?} missing from {seen:?}");
        }
        assert_eq!(seen.last(), Some(&EventKind::AllStopped), "{seen:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_monitor_still_releases() {
        let tally = Tally::new();
        let sup = supervisor(&tally);
        let resources = vec![
            resource("panic-now", vec![tally.flaky("a", 0)]),
            resource("watch-calm", vec![tally.flaky("b", 0)]),
        ];

        let waiter = tally.clone();
        sup.run(resources, async move {
            waiter.wait_watching(2).await;
            while waiter.closes.load(Ordering::SeqCst) < 1 {
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        assert_eq!(tally.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unnamed_resources_get_indexed_names() {
        let tally = Tally::new();
        let sup = supervisor(&tally);
        let mut rx = sup.bus.subscribe();

        let mut res = resource("x", vec![]);
        res.name = None;
        sup.run(vec![resource("first", vec![]), res], std::future::pending())
            .await;

        let mut names = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::ResourceStarting {
                names.extend(ev.resource.as_deref().map(str::to_string));
            }
        }
        names.sort();
        assert_eq!(names, ["first", "resource-1"]);
    }
}
