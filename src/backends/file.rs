//! YAML/JSON file backend.
//!
//! The document is flattened into slash-separated keys: nested maps add path
//! segments, sequences add their index, scalars become values.
//!
//! ```text
//! app:                  /app/db/host  = db.local
//!   db:                 /app/ports/0  = 80
//!     host: db.local    /app/ports/1  = 443
//!   ports: [80, 443]
//! ```
//!
//! `connect` parses the file once so a missing or broken file is a retryable
//! connect failure; lookups re-read it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;

use crate::backends::client::{Backend, BackendClient, BackendSettings};
use crate::backends::connect::Connect;
use crate::error::{BackendError, ConnectError};

/// `[resource.backend.file]` section.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    /// Path of the YAML or JSON document.
    pub filepath: PathBuf,
    /// Common backend settings.
    #[serde(flatten)]
    pub settings: BackendSettings,
}

impl FileConfig {
    pub(crate) const KIND: &'static str = "file";
}

#[async_trait]
impl Connect for FileConfig {
    fn name(&self) -> &str {
        Self::KIND
    }

    async fn connect(&self) -> Result<BackendClient, ConnectError> {
        load(&self.filepath)
            .await
            .map_err(|e| ConnectError::failed(Self::KIND, e))?;

        Ok(BackendClient::new(
            Self::KIND,
            self.settings.clone(),
            Arc::new(FileStore {
                path: self.filepath.clone(),
            }),
        ))
    }
}

struct FileStore {
    path: PathBuf,
}

#[async_trait]
impl Backend for FileStore {
    async fn get_values(&self, keys: &[String]) -> Result<BTreeMap<String, String>, BackendError> {
        let all = load(&self.path).await.map_err(|e| match e {
            LoadError::Io(err) => BackendError::Unavailable {
                backend: FileConfig::KIND.into(),
                error: err.to_string(),
            },
            LoadError::Yaml(err) => BackendError::Malformed {
                backend: FileConfig::KIND.into(),
                error: err.to_string(),
            },
        })?;

        Ok(all
            .into_iter()
            .filter(|(k, _)| keys.iter().any(|want| under(k, want)))
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
}

async fn load(path: &Path) -> Result<BTreeMap<String, String>, LoadError> {
    let text = tokio::fs::read_to_string(path).await?;
    let doc: Value = serde_yaml::from_str(&text)?;
    let mut out = BTreeMap::new();
    flatten("", &doc, &mut out);
    Ok(out)
}

fn flatten(path: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                if let Some(seg) = scalar(k) {
                    flatten(&format!("{path}/{seg}"), v, out);
                }
            }
        }
        Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                flatten(&format!("{path}/{i}"), v, out);
            }
        }
        Value::Tagged(tagged) => flatten(path, &tagged.value, out),
        other => {
            if let Some(s) = scalar(other) {
                out.insert(if path.is_empty() { "/".into() } else { path.into() }, s);
            }
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// True if `key` equals `prefix` or lies below it.
fn under(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || key == prefix
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = "app:\n  db:\n    host: db.local\n    port: 5432\n  ports: [80, 443]\n  debug: false\nother: x\n";

    fn write_doc(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn config(path: &Path) -> FileConfig {
        FileConfig {
            filepath: path.to_path_buf(),
            settings: BackendSettings {
                prefix: "/app".into(),
                keys: vec!["/db".into()],
            },
        }
    }

    #[tokio::test]
    async fn flattens_and_filters_by_prefix() {
        let f = write_doc(DOC);
        let client = config(f.path()).connect().await.unwrap();

        let values = client.values().await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["/app/db/host"], "db.local");
        assert_eq!(values["/app/db/port"], "5432");

        let ports = client.get_values(&["/app/ports".into()]).await.unwrap();
        assert_eq!(ports.values().collect::<Vec<_>>(), ["80", "443"]);
    }

    #[tokio::test]
    async fn missing_file_is_a_retryable_connect_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = config(&dir.path().join("absent.yml")).connect().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ConnectError::Failed { ref backend, .. } if backend == "file"));
    }

    #[tokio::test]
    async fn broken_document_fails_connect() {
        let f = write_doc("app: [unclosed");
        assert!(config(f.path()).connect().await.is_err());
    }

    #[test]
    fn prefix_match_respects_segments() {
        assert!(under("/app/db/host", "/app/db"));
        assert!(under("/app/db", "/app/db/"));
        assert!(!under("/app/dbx", "/app/db"));
        assert!(under("/anything", "/"));
    }
}
