//! # Backends: configuration sections, connectors and connected clients.
//!
//! - [`Connect`] is one backend type's configuration; [`BackendsConfig`] groups them per resource.
//! - [`BackendClient`] / [`BackendClientSet`] are what a worker accumulates while connecting.
//! - [`Backend`] is the store behind a client.
//!
//! Built-in types: [`EnvConfig`] (`env`) and [`FileConfig`] (`file`). Other stores
//! plug in through [`BackendsConfig::with_connector`].

mod client;
mod connect;
mod env;
mod file;

pub use client::{Backend, BackendClient, BackendClientSet, BackendSettings};
pub use connect::{BackendsConfig, Connect, ConnectorRef};
pub use env::EnvConfig;
pub use file::FileConfig;
