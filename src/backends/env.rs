//! Process environment backend.
//!
//! Keys map to variable names by stripping the leading `/`, replacing `/`
//! with `_` and upper-casing: `/app/db_host` reads `APP_DB_HOST`. Results are
//! keyed by the reverse mapping (`APP_DB_HOST` → `/app/db/host`).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backends::client::{Backend, BackendClient, BackendSettings};
use crate::backends::connect::Connect;
use crate::error::{BackendError, ConnectError};

/// `[resource.backend.env]` section.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct EnvConfig {
    /// Common backend settings.
    #[serde(flatten)]
    pub settings: BackendSettings,
}

impl EnvConfig {
    pub(crate) const KIND: &'static str = "env";
}

#[async_trait]
impl Connect for EnvConfig {
    fn name(&self) -> &str {
        Self::KIND
    }

    async fn connect(&self) -> Result<BackendClient, ConnectError> {
        Ok(BackendClient::new(
            Self::KIND,
            self.settings.clone(),
            Arc::new(EnvStore::new(|| std::env::vars().collect())),
        ))
    }
}

type Snapshot = dyn Fn() -> Vec<(String, String)> + Send + Sync;

/// Store reading a fresh snapshot of the environment on every lookup.
pub(crate) struct EnvStore {
    snapshot: Box<Snapshot>,
}

impl EnvStore {
    pub(crate) fn new(snapshot: impl Fn() -> Vec<(String, String)> + Send + Sync + 'static) -> Self {
        Self {
            snapshot: Box::new(snapshot),
        }
    }
}

#[async_trait]
impl Backend for EnvStore {
    async fn get_values(&self, keys: &[String]) -> Result<BTreeMap<String, String>, BackendError> {
        let wanted: Vec<String> = keys.iter().map(|k| to_env_name(k)).collect();
        let mut out = BTreeMap::new();
        for (name, value) in (self.snapshot)() {
            if wanted.iter().any(|w| name.starts_with(w.as_str())) {
                out.insert(to_key(&name), value);
            }
        }
        Ok(out)
    }
}

fn to_env_name(key: &str) -> String {
    key.trim_start_matches('/').replace('/', "_").to_uppercase()
}

fn to_key(name: &str) -> String {
    format!("/{}", name.to_lowercase().replace('_', "/"))
}
