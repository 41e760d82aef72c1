//! Logging infrastructure for Scout.
//!
//! Diagnostics go to stderr through `tracing`; stdout is reserved for query
//! results so that `scout query --json` output can be piped.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a format name ("pretty" or "json").
    pub fn parse(name: &str) -> AppResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(AppError::Config(format!(
                "Unknown log format '{}'. Supported: pretty, json",
                other
            ))),
        }
    }
}

/// Resolve the filter directive: explicit level, then `RUST_LOG`, then "info".
fn resolve_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let directive = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
    };

    EnvFilter::try_new(&directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "debug", "scout_retrieval=trace")
/// * `no_color` - Disable ANSI colors (also honored via `NO_COLOR`)
/// * `format` - Pretty or JSON lines
///
/// # Example
/// ```no_run
/// use scout_core::logging::{init_logging, LogFormat};
///
/// init_logging(Some("debug"), false, LogFormat::Pretty).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let env_filter = resolve_filter(log_level)?;
    let ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(ansi),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}
