//! # Supervisor runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the supervisor runtime.

use std::time::Duration;

/// Runtime settings of a [`Supervisor`](crate::Supervisor).
///
/// ## Field semantics
/// - `retry_delay`: pause between two connect attempts of one backend (no attempt cap)
/// - `flush_timeout`: how long `run` waits for subscribers before returning
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Fixed delay between two connect attempts of the same backend.
    pub retry_delay: Duration,

    /// Upper bound on the final subscriber flush of a run.
    ///
    /// A subscriber still busy when it expires keeps its remaining events,
    /// but `run` returns anyway.
    pub flush_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older items.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `retry_delay = 2s`
    /// - `flush_timeout = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(2),
            flush_timeout: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
