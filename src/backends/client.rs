//! # Connected backend handles.
//!
//! - [`Backend`] is the store behind a connection (async lookups + `close`).
//! - [`BackendClient`] is a cheap, cloneable handle: name, settings and the shared store.
//! - [`BackendClientSet`] is the ordered, append-only collection one worker
//!   accumulates during its connect phase, released as a unit.
//!
//! ## Release rules
//! - Only the set closes stores; handles cloned out of it never do.
//! - [`BackendClientSet::release`] drains the set, so each store is closed exactly once.
//! - Dropping the set releases whatever it still holds (abort, panic).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BackendError;
use crate::secrets::prefix_keys;

/// A live store session.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Returns every known `key → value` pair under any of `keys`.
    async fn get_values(&self, keys: &[String]) -> Result<BTreeMap<String, String>, BackendError>;

    /// Releases the session. Called exactly once by the owning [`BackendClientSet`].
    fn close(&self) {}
}

/// Per-backend settings shared by every backend type.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendSettings {
    /// Namespace the keys are resolved under.
    pub prefix: String,
    /// Keys the template engine reads from this backend.
    pub keys: Vec<String>,
}

/// Handle to one connected backend.
#[derive(Clone)]
pub struct BackendClient {
    name: Arc<str>,
    settings: BackendSettings,
    store: Arc<dyn Backend>,
}

impl BackendClient {
    /// Wraps a connected store.
    pub fn new(name: impl Into<Arc<str>>, settings: BackendSettings, store: Arc<dyn Backend>) -> Self {
        Self {
            name: name.into(),
            settings,
            store,
        }
    }

    /// Human-readable backend name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings the backend was configured with.
    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// The configured keys joined under the configured prefix.
    pub fn prefixed_keys(&self) -> Vec<String> {
        prefix_keys(&self.settings.prefix, &self.settings.keys)
    }

    /// Looks up the configured keys.
    pub async fn values(&self) -> Result<BTreeMap<String, String>, BackendError> {
        self.store.get_values(&self.prefixed_keys()).await
    }

    /// Looks up arbitrary keys (already absolute).
    pub async fn get_values(&self, keys: &[String]) -> Result<BTreeMap<String, String>, BackendError> {
        self.store.get_values(keys).await
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Clients connected for one resource, in connect order.
#[derive(Debug, Default)]
pub struct BackendClientSet {
    clients: Vec<BackendClient>,
}

impl BackendClientSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a connected client.
    pub fn push(&mut self, client: BackendClient) {
        self.clients.push(client);
    }

    /// Iterates clients in connect order.
    pub fn iter(&self) -> impl Iterator<Item = &BackendClient> {
        self.clients.iter()
    }

    /// Clients in connect order.
    pub fn as_slice(&self) -> &[BackendClient] {
        &self.clients
    }

    /// Number of clients not yet released.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// True if no client is held.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Closes every held client once and empties the set.
    ///
    /// Returns how many clients were closed; a second call returns `0`.
    pub fn release(&mut self) -> usize {
        let n = self.clients.len();
        for client in self.clients.drain(..) {
            client.store.close();
        }
        n
    }
}

impl Drop for BackendClientSet {
    fn drop(&mut self) {
        self.release();
    }
}
