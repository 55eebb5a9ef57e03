use healthgateway_cache::RedisConfig;
use healthgateway_storage::{BANNER_CHANGE_CHANNEL, PostgresConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Change notification handling
    #[serde(default)]
    pub communication: CommunicationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.application.name.trim().is_empty() {
            return Err("application.name must not be empty".into());
        }
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Storage validation
        if self.storage.backend == StorageBackend::Postgres {
            let pg = &self.storage.postgres;
            if pg.url.is_none() && pg.host.is_empty() {
                return Err("storage.postgres requires either 'url' or 'host' to be set".into());
            }
            if pg.url.is_none() && pg.database.is_empty() {
                return Err("storage.postgres.database must not be empty".into());
            }
            if pg.pool_size == 0 {
                return Err("storage.postgres.pool_size must be > 0".into());
            }
        }
        if self.redis.enabled && self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        if self.communication.listen_for_changes && self.communication.channel.is_empty() {
            return Err("communication.channel must not be empty".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Prefix of translated error codes, e.g. `GatewayApiServer-CI-DB`.
    #[serde(default = "default_application_name")]
    pub name: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_application_name(),
        }
    }
}

fn default_application_name() -> String {
    "GatewayApi".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

/// Which store holds communications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationConfig {
    /// Keep the cache in step with storage change notifications.
    #[serde(default = "default_listen_for_changes")]
    pub listen_for_changes: bool,
    /// PostgreSQL NOTIFY channel.
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for CommunicationConfig {
    fn default() -> Self {
        Self {
            listen_for_changes: default_listen_for_changes(),
            channel: default_channel(),
        }
    }
}

fn default_listen_for_changes() -> bool {
    true
}
fn default_channel() -> String {
    BANNER_CHANGE_CHANNEL.into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "healthgateway.toml";

    /// Loads the file at `path` (or [`DEFAULT_CONFIG_PATH`]) if it exists,
    /// layers `HEALTHGATEWAY__*` environment variables on top and validates
    /// the result.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., HEALTHGATEWAY__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("HEALTHGATEWAY")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.application.name, "GatewayApi");
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert_eq!(cfg.communication.channel, "BannerChange");
        assert!(!cfg.redis.enabled);
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.storage.postgres.pool_size = 0;
        assert!(cfg.validate().unwrap_err().contains("pool_size"));

        // Memory backend ignores postgres settings
        cfg.storage.backend = StorageBackend::Memory;
        assert!(cfg.validate().is_ok());

        let mut cfg = AppConfig::default();
        cfg.application.name = " ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_addr_falls_back_to_unspecified() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "not-an-ip".into();
        cfg.server.port = 9000;
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:9000");
    }
}
