use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use fabrica_cache::RedisConfig;
use fabrica_core::CoreError;
use fabrica_jobs::QueuePolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// External store configuration; the capability probe runs against this
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheSettings,
    /// Permission cache configuration
    #[serde(default)]
    pub auth_cache: AuthCacheSettings,
    /// Queue retention and retry policy
    #[serde(default)]
    pub jobs: QueuePolicy,
}

impl AppConfig {
    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoreError::configuration(format!("cannot read config file: {e}")))?;
        let config: AppConfig = toml::from_str(&raw)
            .map_err(|e| CoreError::configuration(format!("invalid config file: {e}")))?;
        config.validate().map_err(CoreError::configuration)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(format!(
                "server.host must be an IP address, got '{}'",
                self.server.host
            ));
        }
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.redis.enabled && self.redis.url.is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        if self.auth_cache.ttl_seconds == 0 {
            return Err("auth_cache.ttl_seconds must be > 0".into());
        }
        if self.jobs.max_attempts == 0 {
            return Err("jobs.max_attempts must be > 0".into());
        }
        Ok(())
    }

    /// Listen address. Assumes a validated config; a host that does not
    /// parse falls back to all interfaces.
    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8095
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default TTL in seconds for application cache entries
    #[serde(default = "default_cache_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

fn default_cache_ttl_seconds() -> u64 {
    3600
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

/// Permission cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCacheSettings {
    /// TTL in seconds for cached permission grants
    #[serde(default = "default_auth_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_auth_cache_ttl_seconds() -> u64 {
    300
}

impl AuthCacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for AuthCacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: default_auth_cache_ttl_seconds(),
        }
    }
}
