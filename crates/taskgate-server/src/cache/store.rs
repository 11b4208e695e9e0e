//! Cache store capability and its Redis-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use thiserror::Error;

/// Failure of a single cache operation.
///
/// These never reach the caller of the gateway; the read path absorbs them
/// (see [`crate::gateway::todos`]).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to obtain Redis connection: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),
}

/// Expiring key/value store shared by all in-flight requests.
///
/// Implementations must be safe for concurrent use. Absence of the
/// capability as a whole is a distinct mode represented by `Option` at the
/// call sites, not by an implementation of this trait.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
}

/// Cache store backed by a shared Redis connection pool.
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value = conn.get::<_, Option<Vec<u8>>>(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }
}
