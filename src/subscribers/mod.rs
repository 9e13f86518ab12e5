//! # Event subscribers for the resvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   ResourceWorker ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                          │
//!                                                               ┌──────────┼──────────┐
//!                                                               ▼          ▼          ▼
//!                                                           LogWriter   Custom  ...
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
