//! # Backend connectors and the per-resource backend group.
//!
//! A [`Connect`] implementation is the configuration of one backend type; its
//! `connect` either yields a [`BackendClient`], fails (retryable), or reports
//! [`ConnectError::NotConfigured`] when the resource does not use that type.
//!
//! [`BackendsConfig`] is the `[resource.backend]` table: typed sections for the
//! built-in backends, plus connectors appended by the embedding program.
//!
//! ```toml
//! [resource.backend.env]
//! keys = ["/app"]
//!
//! [resource.backend.file]
//! filepath = "/etc/app/values.yml"
//! prefix = "/app"
//! keys = ["/db"]
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backends::client::BackendClient;
use crate::backends::env::EnvConfig;
use crate::backends::file::FileConfig;
use crate::error::ConnectError;

/// Shared connector handle.
pub type ConnectorRef = Arc<dyn Connect>;

/// Configuration of one backend type, able to open a session.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    /// Backend type name used in logs and events.
    fn name(&self) -> &str;

    /// Opens a session.
    ///
    /// Returns [`ConnectError::NotConfigured`] when there is nothing to connect.
    async fn connect(&self) -> Result<BackendClient, ConnectError>;
}

/// Stand-in for a backend section that is absent from the configuration.
struct Unconfigured(&'static str);

#[async_trait]
impl Connect for Unconfigured {
    fn name(&self) -> &str {
        self.0
    }

    async fn connect(&self) -> Result<BackendClient, ConnectError> {
        Err(ConnectError::NotConfigured)
    }
}

/// Backend group of one resource.
///
/// Unknown sections are rejected at load time.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendsConfig {
    /// Process environment backend.
    pub env: Option<EnvConfig>,
    /// YAML/JSON file backend.
    pub file: Option<FileConfig>,
    /// Connectors added by the embedding program, tried after the typed sections.
    #[serde(skip)]
    extra: Vec<ConnectorRef>,
}

impl BackendsConfig {
    /// Appends a connector; it is tried after the typed sections, in insertion order.
    pub fn with_connector(mut self, connector: ConnectorRef) -> Self {
        self.extra.push(connector);
        self
    }

    /// Every connector of the group in declaration order: `env`, `file`, then appended ones.
    ///
    /// Absent typed sections are included and report `NotConfigured`.
    pub fn connectors(&self) -> Vec<ConnectorRef> {
        let mut all: Vec<ConnectorRef> = Vec::with_capacity(2 + self.extra.len());
        all.push(slot(EnvConfig::KIND, &self.env));
        all.push(slot(FileConfig::KIND, &self.file));
        all.extend(self.extra.iter().cloned());
        all
    }
}

fn slot<C: Connect + Clone>(kind: &'static str, cfg: &Option<C>) -> ConnectorRef {
    match cfg {
        Some(c) => Arc::new(c.clone()),
        None => Arc::new(Unconfigured(kind)),
    }
}

impl std::fmt::Debug for BackendsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let extra: Vec<&str> = self.extra.iter().map(|c| c.name()).collect();
        f.debug_struct("BackendsConfig")
            .field("env", &self.env)
            .field("file", &self.file)
            .field("extra", &extra)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_sections_report_not_configured() {
        let group = BackendsConfig::default();
        let connectors = group.connectors();
        let names: Vec<&str> = connectors.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["env", "file"]);

        for c in &connectors {
            assert!(matches!(c.connect().await, Err(ConnectError::NotConfigured)));
        }
    }

    #[test]
    fn unknown_section_is_rejected() {
        let res: Result<BackendsConfig, _> = toml::from_str("[etcd]\nnodes = [\"a\"]\n");
        assert!(res.is_err());
    }

    #[test]
    fn appended_connectors_come_last() {
        let group: BackendsConfig = toml::from_str("[env]\nkeys = [\"/app\"]\n").unwrap();
        let group = group.with_connector(Arc::new(Unconfigured("vault")));
        let names: Vec<String> = group.connectors().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["env", "file", "vault"]);
    }
}
