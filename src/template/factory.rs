//! # Resource factory and its function-backed implementation.
//!
//! [`ResourceFactory`] is the template engine's entry point: given the clients a
//! worker connected and the resource's template definitions, it builds a
//! [`Monitor`](crate::Monitor). [`FactoryFn`] wraps a closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use async_trait::async_trait;
//! use resvisor::{BackendClientSet, FactoryFn, FactoryRef, Monitor, MonitorBox, TemplateConfig};
//!
//! struct Idle;
//!
//! #[async_trait]
//! impl Monitor for Idle {
//!     async fn monitor(&mut self, ctx: CancellationToken) { ctx.cancelled().await }
//! }
//!
//! let factory: FactoryRef = FactoryFn::arc(
//!     |_name: &str, _clients: &BackendClientSet, _templates: &[TemplateConfig]| {
//!         Ok(Box::new(Idle) as MonitorBox)
//!     },
//! );
//! # let _ = factory;
//! ```

use std::sync::Arc;

use crate::backends::BackendClientSet;
use crate::config::TemplateConfig;
use crate::error::BuildError;
use crate::template::monitor::MonitorBox;

/// Builds a monitorable resource from connected backends and template definitions.
pub trait ResourceFactory: Send + Sync + 'static {
    /// Builds the resource named `name`.
    ///
    /// Clients may be cloned out of `clients`; their stores stay owned by the set.
    fn new_resource(
        &self,
        name: &str,
        clients: &BackendClientSet,
        templates: &[TemplateConfig],
    ) -> Result<MonitorBox, BuildError>;
}

/// Shared factory handle.
pub type FactoryRef = Arc<dyn ResourceFactory>;

/// Function-backed factory.
pub struct FactoryFn<F> {
    f: F,
}

impl<F> FactoryFn<F>
where
    F: Fn(&str, &BackendClientSet, &[TemplateConfig]) -> Result<MonitorBox, BuildError>
        + Send
        + Sync
        + 'static,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> ResourceFactory for FactoryFn<F>
where
    F: Fn(&str, &BackendClientSet, &[TemplateConfig]) -> Result<MonitorBox, BuildError>
        + Send
        + Sync
        + 'static,
{
    fn new_resource(
        &self,
        name: &str,
        clients: &BackendClientSet,
        templates: &[TemplateConfig],
    ) -> Result<MonitorBox, BuildError> {
        (self.f)(name, clients, templates)
    }
}
