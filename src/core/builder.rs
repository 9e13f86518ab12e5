use std::sync::Arc;

use crate::{
    core::{config::SupervisorConfig, supervisor::Supervisor},
    events::Bus,
    subscribers::{LogWriter, Subscribe, SubscriberSet},
    template::FactoryRef,
};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    factory: FactoryRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given settings and template factory.
    pub fn new(cfg: SupervisorConfig, factory: FactoryRef) -> Self {
        Self {
            cfg,
            factory,
            subscribers: Vec::new(),
        }
    }

    /// Adds event subscribers.
    ///
    /// Subscribers receive runtime events (connects, retries, build failures, shutdown)
    /// through dedicated workers with bounded queues. A [`LogWriter`] is always
    /// installed in front of them.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    /// Builds the supervisor.
    ///
    /// Must be called from within a tokio runtime: subscriber workers and the
    /// bus listener are spawned here.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let mut subs: Vec<Arc<dyn Subscribe>> = Vec::with_capacity(1 + self.subscribers.len());
        subs.push(Arc::new(LogWriter::new()));
        subs.extend(self.subscribers);
        let subs = Arc::new(SubscriberSet::new(subs));

        Supervisor::new_internal(self.cfg, bus, subs, self.factory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{Tally, resource};
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Kinds(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "kinds"
        }
    }

    #[tokio::test]
    async fn user_subscribers_receive_runtime_events() {
        let tally = Tally::new();
        let kinds = Arc::new(Kinds::default());
        let sup = SupervisorBuilder::new(SupervisorConfig::default(), tally.factory())
            .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
            .build();

        sup.run(vec![resource("done", vec![tally.flaky("a", 0)])], std::future::pending())
            .await;

        let seen = kinds.0.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&EventKind::ResourceStarting));
        assert!(seen.contains(&EventKind::BackendConnected));
        assert!(seen.contains(&EventKind::ResourceWatching));
        assert!(seen.contains(&EventKind::BackendsReleased));
    }
}
