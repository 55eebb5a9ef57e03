use std::env;

use anyhow::Context;
use healthgateway_server::ServerBuilder;
use healthgateway_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From HEALTHGATEWAY_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (healthgateway.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (HEALTHGATEWAY_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    healthgateway_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    if let Err(e) = healthgateway_server::observability::apply_logging_level(&cfg.logging) {
        tracing::warn!(error = %e, "Keeping the default log level");
    }
    healthgateway_server::metrics::init_metrics();

    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .context("server initialization failed")?;

    server.run().await.context("server error")?;

    Ok(())
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: HEALTHGATEWAY_CONFIG
/// 3. Default: healthgateway.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("HEALTHGATEWAY_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
