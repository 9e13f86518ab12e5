//! Runtime core: orchestration and lifecycle.
//!
//! The public API of this module is [`Supervisor`] (built through
//! [`SupervisorBuilder`]) and its [`SupervisorConfig`].
//!
//! Internal modules:
//! - [`supervisor`]: spawns one worker per resource, fans out the stop signal;
//! - [`worker`]: connects one resource's backends, builds and watches it;
//! - [`builder`]: wires the bus and subscribers;
//! - [`shutdown`]: OS termination signals.

mod builder;
mod config;
mod shutdown;
mod supervisor;
mod worker;

#[cfg(test)]
mod testing;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervisor::Supervisor;
