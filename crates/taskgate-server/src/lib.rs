pub mod cache;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

pub use cache::{CacheError, CacheStore, RedisCacheStore};
pub use config::{
    AppConfig, CacheConfig, LoggingConfig, RedisConfig, ServerConfig, UpstreamConfig,
};
pub use gateway::{GatewayError, HttpUpstreamClient, Upstream, UpstreamClient, UpstreamResponse};
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, TaskgateServer, build_app};

/// Create the cache store based on configuration.
///
/// The connection is attempted exactly once, at startup. A disabled or
/// unreachable Redis yields `None` and the gateway then serves every read
/// straight from the backend for the rest of the process lifetime; request
/// handlers never try to reconnect.
pub async fn create_cache_store(config: &RedisConfig) -> Option<Arc<dyn CacheStore>> {
    if !config.enabled {
        tracing::info!("Redis disabled, responses will not be cached");
        return None;
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let redis_config = redis_pool_config(config);

    // Create pool
    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Responses will not be cached."
            );
            return None;
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            Some(Arc::new(RedisCacheStore::new(pool)))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Responses will not be cached."
            );
            None
        }
    }
}

/// Builds the deadpool configuration with the pool settings applied.
fn redis_pool_config(config: &RedisConfig) -> deadpool_redis::Config {
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Duration::from_millis(config.timeout_ms);
    // from_url leaves the pool section unset, so seed it before tuning
    let pool_config = redis_config.pool.get_or_insert_with(Default::default);
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config
}
