use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Base URLs and timeout for the two backend services
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
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
        // Upstream validations
        url::Url::parse(&self.upstream.auth_url)
            .map_err(|e| format!("upstream.auth_url is not a valid URL: {e}"))?;
        url::Url::parse(&self.upstream.todo_url)
            .map_err(|e| format!("upstream.todo_url is not a valid URL: {e}"))?;
        if self.upstream.timeout_secs == 0 {
            return Err("upstream.timeout_secs must be > 0".into());
        }
        // Cache validations
        if self.cache.todos_ttl_secs == 0 {
            return Err("cache.todos_ttl_secs must be > 0".into());
        }
        if self.redis.enabled && self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
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
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Backend service endpoints.
///
/// The gateway forwards every request to one of these two services and
/// never answers from its own data, so both URLs must point at something
/// real for the process to be useful. They are still defaulted for local
/// development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the authentication service
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Base URL of the todo service
    #[serde(default = "default_todo_url")]
    pub todo_url: String,

    /// Request timeout towards either backend, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_auth_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_todo_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            todo_url: default_todo_url(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Redis configuration for the response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (the gateway degrades gracefully without it)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Todo listing cache TTL in seconds
    #[serde(default = "default_todos_ttl_secs")]
    pub todos_ttl_secs: u64,
}

fn default_todos_ttl_secs() -> u64 {
    300 // 5 minutes
}

impl CacheConfig {
    pub fn todos_ttl(&self) -> Duration {
        Duration::from_secs(self.todos_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            todos_ttl_secs: default_todos_ttl_secs(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("taskgate.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., TASKGATE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TASKGATE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}
