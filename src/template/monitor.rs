//! # Monitorable resource.
//!
//! A [`Monitor`] is what the template engine builds from a connected
//! [`BackendClientSet`](crate::BackendClientSet): it keeps rendered output in
//! sync until the token is cancelled.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// # Long-running, cancelable watch loop.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use resvisor::Monitor;
///
/// struct Idle;
///
/// #[async_trait]
/// impl Monitor for Idle {
///     async fn monitor(&mut self, ctx: CancellationToken) {
///         ctx.cancelled().await;
///     }
/// }
/// ```
#[async_trait]
pub trait Monitor: Send + 'static {
    /// Runs until `ctx` is cancelled or an unrecoverable internal error.
    ///
    /// Implementations must observe `ctx` and return promptly once it fires;
    /// the worker releases its backends only after this returns.
    async fn monitor(&mut self, ctx: CancellationToken);
}

/// Owned monitorable resource.
pub type MonitorBox = Box<dyn Monitor>;
