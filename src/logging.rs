//! # Process-wide logger setup.
//!
//! [`init`] installs a `tracing-subscriber` formatter once, from the
//! configuration's `log_level` / `log_format`. `RUST_LOG`, when set, takes
//! precedence over `log_level`.
//!
//! Bad values never abort startup:
//! - unknown level → `info`, and an error record is emitted;
//! - unknown format → `text`, and a warning record is emitted.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::util::SubscriberInitExt;

/// Level used when none (or an invalid one) is configured.
pub const DEFAULT_LEVEL: &str = "info";

/// Logger settings taken from the configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`; empty = [`DEFAULT_LEVEL`].
    pub level: String,
    /// `text` or `json`; empty = `text`.
    pub format: String,
}

/// Output format of log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl LogSettings {
    /// Normalized level, or `Err(raw)` when it is not a known level.
    pub fn level(&self) -> Result<&'static str, &str> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "" => Ok(DEFAULT_LEVEL),
            "trace" => Ok("trace"),
            "debug" => Ok("debug"),
            "info" => Ok("info"),
            "warn" | "warning" => Ok("warn"),
            "error" => Ok("error"),
            _ => Err(self.level.as_str()),
        }
    }

    /// Parsed format, or `Err(raw)` when it is not a known format.
    pub fn format(&self) -> Result<LogFormat, &str> {
        match self.format.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(self.format.as_str()),
        }
    }
}

/// Installs the global subscriber.
///
/// Returns `false` if a global subscriber was already installed (the call is then a no-op).
pub fn init(settings: &LogSettings) -> bool {
    let level = settings.level();
    let format = settings.format();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LEVEL)));
    let builder = fmt().with_env_filter(filter).with_target(true);

    let installed = match format.unwrap_or(LogFormat::Text) {
        LogFormat::Text => builder.finish().try_init().is_ok(),
        LogFormat::Json => builder.json().finish().try_init().is_ok(),
    };

    if installed {
        if let Err(raw) = level {
            tracing::error!(level = raw, fallback = DEFAULT_LEVEL, "invalid log level");
        }
        if let Err(raw) = format {
            tracing::warn!(format = raw, fallback = "text", "unknown log format");
        }
    }
    installed
}
