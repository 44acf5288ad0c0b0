//! Cache infrastructure - backings and the cache store

mod in_memory;
mod redis;
mod store;

pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{redact_url, RedisCache, RedisCacheConfig};
pub use store::{CacheBacking, CacheConfig, CacheStore};
