//! # Configuration file loading.
//!
//! [`Configuration::load`] reads the primary TOML file, expands environment
//! variables, then appends one resource per `*.toml` file of `include_dir`.
//!
//! ## Flow
//! ```text
//! load(path)
//!   ├─► read + expand_env + toml::from_str        → Configuration
//!   ├─► drop resources without templates, name the unnamed ones
//!   └─► include_dir set?
//!         └─► for *.toml in file-name order:
//!               read + expand_env + toml::from_str → Resource
//!               (kept only if it has templates)
//! ```
//!
//! Every failure is a [`ConfigError`] and aborts startup.
//!
//! ## Example
//! ```toml
//! log_level = "debug"
//! log_format = "json"
//! include_dir = "/etc/resvisor/resources.d"
//!
//! [[resource]]
//! [[resource.template]]
//! src = "app.tmpl"
//! dst = "/etc/app.conf"
//! [resource.backend.env]
//! keys = ["/app"]
//! ```

mod env;
mod resource;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use env::{expand_env, expand_with};
pub use resource::{Resource, TemplateConfig};

use crate::error::ConfigError;
use crate::logging::LogSettings;

/// Parsed configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Log level (`trace`, `debug`, `info`, `warn`, `error`); empty = default.
    pub log_level: String,
    /// Log format (`text` or `json`); empty = default.
    pub log_format: String,
    /// Directory with one resource per `*.toml` file.
    pub include_dir: Option<PathBuf>,
    /// Declared resources, primary file first.
    pub resource: Vec<Resource>,
}

impl Configuration {
    /// Loads the configuration at `path` and its include directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut cfg: Configuration = parse_file(path)?;

        cfg.resource.retain(|r| !r.is_empty());
        for (i, r) in cfg.resource.iter_mut().enumerate() {
            r.name.get_or_insert_with(|| format!("resource-{i}"));
        }

        if let Some(dir) = cfg.include_dir.clone() {
            cfg.resource.extend(load_include_dir(&dir)?);
        }
        Ok(cfg)
    }

    /// Logging settings of this configuration.
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }
}

fn load_include_dir(dir: &Path) -> Result<Vec<Resource>, ConfigError> {
    let include_err = |source| ConfigError::IncludeDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(include_err)? {
        let entry = entry.map_err(include_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".toml") {
            files.push((name, entry.path()));
        }
    }
    files.sort();

    let mut resources = Vec::with_capacity(files.len());
    for (name, path) in files {
        tracing::info!(path = %path.display(), "loading resource configuration");
        let mut r: Resource = parse_file(&path)?;
        if r.is_empty() {
            continue;
        }
        r.name.get_or_insert(name);
        resources.push(r);
    }
    Ok(resources)
}

fn parse_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&expand_env(&raw)).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
