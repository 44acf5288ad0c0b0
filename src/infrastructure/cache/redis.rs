//! Redis cache implementation

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Connection URL with its password masked, for logs and debug output
pub fn redact_url(url: &str) -> String {
    match redis::parse_redis_url(url) {
        Some(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                return "[hidden]".to_string();
            }
            parsed.to_string()
        }
        None => "[hidden]".to_string(),
    }
}

/// Configuration for Redis cache
#[derive(Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing; `clear` only touches prefixed keys
    pub key_prefix: Option<String>,
    /// Budget for establishing the connection
    pub connection_timeout: Duration,
    /// Budget for each individual command
    pub operation_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: Some("organizze-gateway".to_string()),
            connection_timeout: Duration::from_millis(500),
            operation_timeout: Duration::from_secs(1),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

impl fmt::Debug for RedisCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheConfig")
            .field("url", &redact_url(&self.url))
            .field("key_prefix", &self.key_prefix)
            .field("connection_timeout", &self.connection_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

/// Redis cache backing
///
/// Values are stored as JSON strings with a native expiry (`PSETEX`), so
/// Redis itself enforces entry TTLs.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Opens a connection, bounded by the configured connection timeout
    pub async fn connect(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection =
            tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| {
                    DomainError::cache(format!(
                        "Timed out connecting to Redis after {}ms",
                        config.connection_timeout.as_millis()
                    ))
                })?
                .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::cache(format!("Redis {} failed: {}", operation, e))),
            Err(_) => Err(DomainError::cache(format!("Redis {} timed out", operation))),
        }
    }

    async fn delete_prefixed(&self) -> Result<usize, DomainError> {
        let pattern = self.prefix_key("*");
        let mut conn = self.connection.clone();

        // SCAN instead of KEYS to avoid blocking the server
        let mut cursor = 0u64;
        let mut total_deleted = 0usize;

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = self
                .bounded(
                    "scan",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let deleted: i64 = self.bounded("del", conn.del(&keys)).await?;
                total_deleted += deleted as usize;
            }

            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(total_deleted)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        self.bounded("get", conn.get(&prefixed_key)).await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_millis = ttl.as_millis().max(1) as u64;

        self.bounded("set", conn.pset_ex(&prefixed_key, value, ttl_millis))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i64 = self.bounded("del", conn.del(&prefixed_key)).await?;
        Ok(deleted > 0)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        match &self.config.key_prefix {
            Some(_) => {
                let deleted = self.delete_prefixed().await?;
                tracing::debug!(deleted, "Cleared prefixed Redis keys");
            }
            None => {
                let mut conn = self.connection.clone();
                self.bounded("flushdb", redis::cmd("FLUSHDB").query_async::<()>(&mut conn))
                    .await?;
            }
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let reply: String = self
            .bounded("ping", redis::cmd("PING").query_async(&mut conn))
            .await?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(DomainError::cache(format!("Unexpected PING reply: {}", reply)))
        }
    }

    async fn size(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        match &self.config.key_prefix {
            Some(_) => {
                let pattern = self.prefix_key("*");
                let mut cursor = 0u64;
                let mut count = 0usize;

                loop {
                    let (new_cursor, keys): (u64, Vec<String>) = self
                        .bounded(
                            "scan",
                            redis::cmd("SCAN")
                                .arg(cursor)
                                .arg("MATCH")
                                .arg(&pattern)
                                .arg("COUNT")
                                .arg(1000)
                                .query_async(&mut conn),
                        )
                        .await?;

                    count += keys.len();
                    cursor = new_cursor;

                    if cursor == 0 {
                        break;
                    }
                }

                Ok(count)
            }
            None => {
                self.bounded("dbsize", redis::cmd("DBSIZE").query_async(&mut conn))
                    .await
            }
        }
    }
}
