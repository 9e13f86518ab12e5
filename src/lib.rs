//! # resvisor
//!
//! **Resvisor** supervises configuration resources: for each resource it
//! connects the configured backends, hands them to a template engine and keeps
//! the result monitored until the process is told to stop.
//!
//! Rendering itself is out of scope; the engine plugs in through
//! [`ResourceFactory`] and [`Monitor`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Resource   │   │   Resource   │   │   Resource   │
//!     │ (templates + │   │ (templates + │   │ (templates + │
//!     │   backends)  │   │   backends)  │   │   backends)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - root CancellationToken (one child per worker)                  │
//! │  - JoinSet of workers                                             │
//! │  - Bus + SubscriberSet (LogWriter, user subscribers)              │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌────────────────┐ ┌────────────────┐ ┌────────────────┐    │
//!  │ ResourceWorker │ │ ResourceWorker │ │ ResourceWorker │    │
//!  │ connect/retry  │ │ connect/retry  │ │ connect/retry  │    │
//!  │ build, watch   │ │ build, watch   │ │ build, watch   │    │
//!  └┬───────────────┘ └┬───────────────┘ └┬───────────────┘    │
//!   │ BackendConnected  │ RetryScheduled  │ ResourceWatching │ ShutdownRequested
//!   ▼                   ▼                   ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                      subscriber_listener ──► SubscriberSet
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! for connector in resource.backend.connectors() {   (declaration order)
//!   Ok            ─► keep client
//!   NotConfigured ─► skip
//!   Err           ─► sleep(retry_delay) (cancellable), try again, forever
//! }
//! factory.new_resource(name, &clients, &templates)
//!   Err ─► ResourceBuildFailed, release, exit
//! monitor.monitor(token).await
//! drop(monitor); clients.release()   (exactly once, on every path)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                           |
//! |-------------------|----------------------------------------------------------|----------------------------------------------|
//! | **Supervision**   | One worker per resource, fixed retry delay, shutdown.    | [`Supervisor`], [`SupervisorConfig`]         |
//! | **Backends**      | Connectors, clients and their release.                   | [`Connect`], [`Backend`], [`BackendClientSet`] |
//! | **Templates**     | Engine seam.                                             | [`ResourceFactory`], [`FactoryFn`], [`Monitor`] |
//! | **Secrets**       | Decrypt gzip+OpenPGP+base64 values, prefix keys.         | [`secrets::decrypt`], [`secrets::Keyring`]   |
//! | **Configuration** | TOML files with env expansion and an include directory.  | [`config::Configuration`]                    |
//! | **Subscriber API**| Hook into runtime events.                                | [`Subscribe`], [`Event`], [`EventKind`]      |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use resvisor::{BackendClientSet, FactoryFn, FactoryRef, Monitor, MonitorBox, TemplateConfig};
//! use resvisor::config::Configuration;
//!
//! struct Idle;
//!
//! #[async_trait]
//! impl Monitor for Idle {
//!     async fn monitor(&mut self, ctx: CancellationToken) { ctx.cancelled().await }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let factory: FactoryRef = FactoryFn::arc(
//!         |_name: &str, _clients: &BackendClientSet, _templates: &[TemplateConfig]| {
//!             Ok(Box::new(Idle) as MonitorBox)
//!         },
//!     );
//!
//!     let cfg = Configuration::default();
//!     resvisor::logging::init(&cfg.log_settings());
//!     resvisor::run(cfg, factory, tokio::time::sleep(Duration::from_millis(10))).await;
//! }
//! ```

use std::future::Future;

mod backends;
pub mod config;
mod core;
mod error;
mod events;
pub mod logging;
pub mod secrets;
mod subscribers;
mod template;

// ---- Public re-exports ----

pub use backends::{
    Backend, BackendClient, BackendClientSet, BackendSettings, BackendsConfig, Connect, ConnectorRef,
    EnvConfig, FileConfig,
};
pub use config::{Resource, TemplateConfig};
pub use core::{Supervisor, SupervisorBuilder, SupervisorConfig};
pub use error::{BackendError, BuildError, ConfigError, ConnectError, SecretError};
pub use events::{Event, EventKind};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use template::{FactoryFn, FactoryRef, Monitor, MonitorBox, ResourceFactory};

/// Runs every resource of `config` with default supervisor settings until
/// they all end or `stop` completes, then until the events of the run are logged.
///
/// Must be called from within a tokio runtime.
pub async fn run<S>(config: config::Configuration, factory: FactoryRef, stop: S)
where
    S: Future<Output = ()>,
{
    let sup = Supervisor::builder(SupervisorConfig::default(), factory).build();
    sup.run(config.resource, stop).await;
}
