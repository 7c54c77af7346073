//! # pdfchat-telemetry
//!
//! Logging setup for pdfchat binaries and log capture for tests.
//!
//! Logs go to stderr so answers printed on stdout stay clean. The filter is
//! read from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
//!
//! ```rust,ignore
//! pdfchat_telemetry::init(&TelemetryConfig::new("pdfchat").with_format(LogFormat::Json))?;
//! ```

pub mod capture;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as tracing_fmt};

pub use capture::{CapturedEvent, EventCaptureLayer, EventStore, capture_subscriber};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,lopdf=warn,pdf_extract=warn";

/// Errors from telemetry setup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Telemetry init error: {0}")]
    Init(String),

    /// An unknown log format name.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Output format of the stderr log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(TelemetryError::ConfigError(format!("unknown log format '{other}'"))),
        }
    }
}

/// Settings for [`init`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name attached to the startup event.
    pub service_name: String,
    pub format: LogFormat,
    /// Directives used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            format: LogFormat::default(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber with compact output.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init(&TelemetryConfig::new(service_name))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Init`] if a global subscriber is already set.
/// Calling this twice never panics.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => tracing_fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => tracing_fmt::layer().compact().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => tracing_fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(config.env_filter())
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::debug!(service = %config.service_name, format = %config.format, "telemetry initialised");
    Ok(())
}
