//! Tracing subscriber setup.
//!
//! [`TracingConfig`] installs a `tracing-subscriber` registry with an
//! [`EnvFilter`] and a `fmt` layer in the chosen [`TracingFormat`].
//!
//! ```no_run
//! use sprout_core::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! // Development: pretty output, debug level, span enter/exit.
//! TracingConfig::new()
//!     .with_level(Level::DEBUG)
//!     .with_span_events(true)
//!     .init();
//!
//! // Production: JSON output with per-target levels.
//! TracingConfig::new()
//!     .with_format(TracingFormat::Json)
//!     .with_env_filter("sprout_watch=info,reqwest=warn")
//!     .init();
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Error installing the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingInitError {
    /// The filter string could not be parsed.
    #[error("invalid tracing filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing subscriber configuration.
///
/// Without an explicit filter, `RUST_LOG` is honored when set and `level`
/// applies otherwise.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Filter directives (e.g. `"sprout_watch=debug,hyper=warn"`).
    env_filter: Option<String>,
    /// Whether to include span enter/exit events.
    span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets filter directives, in `target=level,target=level` form.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// The configured maximum level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// The configured output format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    fn filter(&self) -> Result<EnvFilter, TracingInitError> {
        match &self.env_filter {
            Some(filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(self.level).into())
                .from_env_lossy()),
        }
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`TracingInitError::InvalidFilter`] for a malformed filter and
    /// [`TracingInitError::AlreadyInitialized`] if a subscriber is already set.
    pub fn try_init(&self) -> Result<(), TracingInitError> {
        let env_filter = self.filter()?;

        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()?,
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()?,
            TracingFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()?,
        }

        tracing::debug!(level = %self.level, format = ?self.format, "tracing initialized");
        Ok(())
    }

    /// Installs the global subscriber, keeping any subscriber already set.
    ///
    /// A malformed filter falls back to the configured level.
    pub fn init(&self) {
        match self.try_init() {
            Ok(()) | Err(TracingInitError::AlreadyInitialized(_)) => {}
            Err(TracingInitError::InvalidFilter(_)) => {
                let fallback = Self {
                    env_filter: Some(self.level.as_str().to_string()),
                    ..self.clone()
                };
                fallback.try_init().ok();
            }
        }
    }
}
