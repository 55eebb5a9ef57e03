//! Tracing setup for the gateway binary.
//!
//! The subscriber starts at `info` so configuration loading is logged, and
//! the filter is swapped for the configured level once the config is read.
//! `RUST_LOG` always wins over both.

use std::sync::OnceLock;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

/// Dependencies that are chatty at `debug` and rarely useful here.
const QUIET_DIRECTIVES: &[&str] = &["sqlx=warn", "hyper=info", "h2=info"];

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{level}': {source}")]
    InvalidLevel {
        level: String,
        #[source]
        source: ParseError,
    },

    #[error("log filter could not be reloaded: {0}")]
    Reload(#[from] reload::Error),
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let filter = env_filter()
        .or_else(|| gateway_filter("info").ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let (filter, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switches to the configured level unless `RUST_LOG` is set.
///
/// # Errors
///
/// [`LoggingError::InvalidLevel`] if `logging.level` is not a valid filter.
pub fn apply_logging_level(logging: &LoggingConfig) -> Result<(), LoggingError> {
    if std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }
    let filter = gateway_filter(&logging.level)?;
    if let Some(handle) = FILTER_HANDLE.get() {
        handle.reload(filter)?;
    }
    Ok(())
}

fn env_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

/// Builds a filter at `level` with the dependency directives appended.
fn gateway_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::try_new(level).map_err(invalid_level(level))?;
    for directive in QUIET_DIRECTIVES {
        filter = filter.add_directive(directive.parse().map_err(invalid_level(directive))?);
    }
    Ok(filter)
}

fn invalid_level(level: &str) -> impl FnOnce(ParseError) -> LoggingError + '_ {
    move |source| LoggingError::InvalidLevel {
        level: level.to_string(),
        source,
    }
}
