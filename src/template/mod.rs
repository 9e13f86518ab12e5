//! # Template engine seam.
//!
//! Rendering, diffing and check/reload commands live in the template engine;
//! the runtime only needs:
//! - [`ResourceFactory`] - build a monitorable resource from connected backends
//! - [`Monitor`] - run it until cancelled
//! - [`FactoryFn`] - closure-backed factory

mod factory;
mod monitor;

pub use factory::{FactoryFn, FactoryRef, ResourceFactory};
pub use monitor::{Monitor, MonitorBox};
