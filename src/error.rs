//! Error types used by the resvisor runtime, its loaders and its backends.
//!
//! This module defines one enum per concern:
//!
//! - [`ConfigError`]: load-time failures (fatal before any worker runs).
//! - [`ConnectError`]: backend connection attempts; [`ConnectError::NotConfigured`] is a sentinel, not a failure.
//! - [`BuildError`]: construction of a monitorable resource (terminal for that resource only).
//! - [`BackendError`]: value lookups performed by backend stores.
//! - [`SecretError`]: secret decryption; every variant carries the original input.
//!
//! All types provide `as_label` for logging, and [`ConnectError::is_retryable`]
//! tells the worker whether an attempt should be repeated.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced while loading a configuration.
///
/// Any of these aborts startup; they are never reported per resource.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML (or does not match the schema).
    #[error("parse {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying decode error.
        source: toml::de::Error,
    },

    /// The include directory could not be listed.
    #[error("include dir {path}: {source}")]
    IncludeDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::IncludeDir { .. } => "config_include_dir",
        }
    }
}

/// # Errors produced by a backend connection attempt.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConnectError {
    /// This backend type has no configuration for the resource.
    ///
    /// Treated as a no-op: the connector is skipped, never retried.
    #[error("backend not configured")]
    NotConfigured,

    /// Connection failed; the worker retries after the retry delay.
    #[error("connect {backend}: {error}")]
    Failed {
        /// Name of the backend that failed.
        backend: String,
        /// The underlying error message.
        error: String,
    },
}

impl ConnectError {
    /// Shorthand for [`ConnectError::Failed`].
    pub fn failed(backend: impl Into<String>, error: impl ToString) -> Self {
        ConnectError::Failed {
            backend: backend.into(),
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use resvisor::ConnectError;
    ///
    /// assert_eq!(ConnectError::NotConfigured.as_label(), "backend_not_configured");
    /// assert_eq!(ConnectError::failed("etcd", "refused").as_label(), "backend_connect_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectError::NotConfigured => "backend_not_configured",
            ConnectError::Failed { .. } => "backend_connect_failed",
        }
    }

    /// Whether the attempt should be repeated.
    ///
    /// Every failure except [`ConnectError::NotConfigured`] is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConnectError::NotConfigured)
    }
}

/// # Errors produced while building a monitorable resource.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BuildError {
    /// The template definitions were rejected.
    #[error("invalid template: {reason}")]
    InvalidTemplate {
        /// Why the definition was rejected.
        reason: String,
    },

    /// Construction failed for another reason.
    #[error("build failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl BuildError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::InvalidTemplate { .. } => "build_invalid_template",
            BuildError::Fail { .. } => "build_failed",
        }
    }
}

/// # Errors produced by backend stores on value lookup.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BackendError {
    /// The store could not be reached or read.
    #[error("backend {backend} unavailable: {error}")]
    Unavailable {
        /// Name of the backend.
        backend: String,
        /// The underlying error message.
        error: String,
    },

    /// The store answered with data that could not be interpreted.
    #[error("backend {backend} returned malformed data: {error}")]
    Malformed {
        /// Name of the backend.
        backend: String,
        /// The underlying error message.
        error: String,
    },
}

/// # Errors produced by [`decrypt`](crate::secrets::decrypt).
///
/// Each variant keeps the undecrypted input so callers can fall back to it
/// explicitly.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SecretError {
    /// Input is not valid standard base64.
    #[error("decode secret: {source}")]
    Decode {
        /// The original input.
        input: String,
        /// Underlying decode error.
        source: base64::DecodeError,
    },

    /// The OpenPGP message could not be parsed or opened with the keyring.
    #[error("open secret: {source}")]
    Crypto {
        /// The original input.
        input: String,
        /// Underlying OpenPGP error.
        source: pgp::errors::Error,
    },

    /// The message body is not a valid gzip stream of UTF-8 text.
    #[error("decompress secret: {source}")]
    Decompress {
        /// The original input.
        input: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl SecretError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SecretError::Decode { .. } => "secret_decode",
            SecretError::Crypto { .. } => "secret_crypto",
            SecretError::Decompress { .. } => "secret_decompress",
        }
    }

    /// The original, undecrypted input.
    pub fn input(&self) -> &str {
        match self {
            SecretError::Decode { input, .. }
            | SecretError::Crypto { input, .. }
            | SecretError::Decompress { input, .. } => input,
        }
    }

    /// Consumes the error, returning the original input.
    pub fn into_input(self) -> String {
        match self {
            SecretError::Decode { input, .. }
            | SecretError::Crypto { input, .. }
            | SecretError::Decompress { input, .. } => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_is_not_retryable() {
        assert!(!ConnectError::NotConfigured.is_retryable());
        assert!(ConnectError::failed("file", "missing").is_retryable());
    }

    #[test]
    fn connect_failure_message_names_backend() {
        let err = ConnectError::failed("file", "no such file");
        assert_eq!(err.to_string(), "connect file: no such file");
    }

    #[test]
    fn secret_error_keeps_input() {
        let err = SecretError::Decompress {
            input: "abc".into(),
            source: std::io::Error::other("bad gzip"),
        };
        assert_eq!(err.input(), "abc");
        assert_eq!(err.as_label(), "secret_decompress");
        assert_eq!(err.into_input(), "abc");
    }
}
