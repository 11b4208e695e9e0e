//! Response caching for the gateway read path.
//!
//! The store is a shared external resource and every operation on it may
//! fail independently of the request outcome. Failures stay inside the
//! gateway: a failed read becomes a miss, a failed write is dropped after
//! logging. When Redis is disabled or unreachable at startup the process
//! runs without a store at all and serves every read straight from the
//! backend (see [`crate::create_cache_store`]).

pub mod store;

pub use store::{CacheError, CacheStore, RedisCacheStore};
