//! Test doubles shared by the worker and supervisor tests.
//!
//! Resource names select the monitor behaviour:
//! - `bad*`: the factory fails;
//! - `watch*`: the monitor waits for cancellation;
//! - `panic*`: the monitor panics;
//! - anything else: the monitor returns at once.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backends::{Backend, BackendClient, BackendSettings, BackendsConfig, Connect, ConnectorRef};
use crate::config::{Resource, TemplateConfig};
use crate::error::{BackendError, BuildError, ConnectError};
use crate::template::{FactoryFn, FactoryRef, Monitor, MonitorBox};

/// Shared counters of one test.
#[derive(Default)]
pub(crate) struct Tally {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub builds: AtomicUsize,
    pub built_with: AtomicUsize,
    pub watching: AtomicUsize,
    attempts: Mutex<Vec<(String, Instant)>>,
}

impl Tally {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connector failing `failures` times before succeeding; `usize::MAX` never succeeds.
    pub fn flaky(self: &Arc<Self>, name: &str, failures: usize) -> ConnectorRef {
        Arc::new(Flaky {
            name: name.to_string(),
            remaining: AtomicUsize::new(failures),
            not_configured: false,
            tally: self.clone(),
        })
    }

    pub fn not_configured(self: &Arc<Self>, name: &str) -> ConnectorRef {
        Arc::new(Flaky {
            name: name.to_string(),
            remaining: AtomicUsize::new(0),
            not_configured: true,
            tally: self.clone(),
        })
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn order(&self) -> Vec<String> {
        self.attempts.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn factory(self: &Arc<Self>) -> FactoryRef {
        let tally = self.clone();
        FactoryFn::arc(
            move |name: &str, clients: &crate::backends::BackendClientSet, _: &[TemplateConfig]| {
                tally.builds.fetch_add(1, Ordering::SeqCst);
                tally.built_with.fetch_add(clients.len(), Ordering::SeqCst);
                if name.starts_with("bad") {
                    return Err(BuildError::InvalidTemplate {
                        reason: format!("{name}: unknown function"),
                    });
                }
                Ok(Box::new(CountedMonitor {
                    wait: name.starts_with("watch"),
                    panic: name.starts_with("panic"),
                    tally: tally.clone(),
                }) as MonitorBox)
            },
        )
    }

    /// Polls until `n` monitors are watching.
    pub async fn wait_watching(&self, n: usize) {
        while self.watching.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Resource whose only connectors are `connectors` (the typed sections stay absent).
pub(crate) fn resource(name: &str, connectors: Vec<ConnectorRef>) -> Resource {
    let backend = connectors
        .into_iter()
        .fold(BackendsConfig::default(), BackendsConfig::with_connector);
    let template = vec![TemplateConfig {
        src: format!("{name}.tmpl"),
        dst: format!("/tmp/{name}.conf"),
        ..TemplateConfig::default()
    }];
    Resource::new(name, template, backend)
}

struct Flaky {
    name: String,
    remaining: AtomicUsize,
    not_configured: bool,
    tally: Arc<Tally>,
}

#[async_trait]
impl Connect for Flaky {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<BackendClient, ConnectError> {
        self.tally
            .attempts
            .lock()
            .unwrap()
            .push((self.name.clone(), Instant::now()));

        if self.not_configured {
            return Err(ConnectError::NotConfigured);
        }
        let remaining = self.remaining.load(Ordering::SeqCst);
        if remaining == usize::MAX {
            return Err(ConnectError::failed(&self.name, "connection refused"));
        }
        if remaining > 0 {
            self.remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ConnectError::failed(&self.name, "connection refused"));
        }

        self.tally.connects.fetch_add(1, Ordering::SeqCst);
        let store = Arc::new(Counted {
            tally: self.tally.clone(),
        });
        Ok(BackendClient::new(self.name.as_str(), BackendSettings::default(), store))
    }
}

struct Counted {
    tally: Arc<Tally>,
}

#[async_trait]
impl Backend for Counted {
    async fn get_values(&self, _keys: &[String]) -> Result<BTreeMap<String, String>, BackendError> {
        Ok(BTreeMap::new())
    }

    fn close(&self) {
        self.tally.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountedMonitor {
    wait: bool,
    panic: bool,
    tally: Arc<Tally>,
}

#[async_trait]
impl Monitor for CountedMonitor {
    async fn monitor(&mut self, ctx: CancellationToken) {
        self.tally.watching.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("monitor blew up");
        }
        if self.wait {
            ctx.cancelled().await;
        }
    }
}
