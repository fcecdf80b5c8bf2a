//! Redis-compatible cache implementation using deadpool-redis
//!
//! Lets several dashboard instances share cached API responses.
//!
//! # URL Formats
//!
//! ```text
//! redis://[user:password@]host:port[/db]
//! rediss://[user:password@]host:port[/db]  (TLS)
//! redis+sentinel://[user:password@]sentinel1:port,sentinel2:port/master_name[/db]
//! ```

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};

use super::backend::CacheBackend;
use super::error::CacheError;

/// Redis-compatible cache (Redis, Sentinel, Valkey, Dragonfly)
pub struct RedisCache {
    pool: Pool,
    backend_type: RedisBackendType,
}

#[derive(Debug, Clone, Copy)]
enum RedisBackendType {
    /// Standard Redis or compatible (Valkey, Dragonfly)
    Redis,
    /// Redis Sentinel for high availability
    Sentinel,
}

impl RedisCache {
    /// Connect and validate with PING
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let sanitized_url = sanitize_redis_url(redis_url);
        let backend_type = detect_backend_type(redis_url);

        let mut config = Config::from_url(redis_url);
        config.pool = Some(deadpool_redis::PoolConfig {
            max_size: 16,
            timeouts: deadpool_redis::Timeouts {
                wait: Some(Duration::from_secs(5)),
                create: Some(Duration::from_secs(5)),
                recycle: Some(Duration::from_secs(5)),
            },
            ..Default::default()
        });
        let pool = config.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            let hint = match backend_type {
                RedisBackendType::Sentinel => {
                    " (Sentinel URL format: redis+sentinel://host1:port,host2:port/master_name/db)"
                }
                RedisBackendType::Redis => "",
            };
            CacheError::Connection(format!(
                "Failed to create Redis pool for {sanitized_url}: {e}{hint}"
            ))
        })?;

        let mut conn = pool.get().await.map_err(|e| {
            CacheError::Connection(format!(
                "Failed to get Redis connection from pool for {sanitized_url}: {e}"
            ))
        })?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                CacheError::Connection(format!("Redis PING failed for {sanitized_url}: {e}"))
            })?;

        let cache = Self { pool, backend_type };
        tracing::debug!(url = %sanitized_url, backend = cache.backend_name(), "Redis cache connected");
        Ok(cache)
    }
}

fn detect_backend_type(url: &str) -> RedisBackendType {
    if url.starts_with("redis+sentinel://") || url.starts_with("rediss+sentinel://") {
        RedisBackendType::Sentinel
    } else {
        RedisBackendType::Redis
    }
}

/// Mask the password of a Redis URL for logging
pub(crate) fn sanitize_redis_url(url: &str) -> String {
    // Passwords may contain '@', so split on the last one
    if let Some(at_pos) = url.rfind('@') {
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':') {
            let abs_colon = scheme_end + colon_pos;
            return format!("{}***{}", &url[..abs_colon + 1], &url[at_pos..]);
        }
    }
    url.to_string()
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let result: Option<Vec<u8>> = conn.get(key).await?;
        Ok(result)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        match ttl {
            Some(ttl) => {
                // Millisecond precision; never 0 (0 means no expiry)
                let ttl_ms: u64 = ttl.as_millis().try_into().unwrap_or(u64::MAX);
                let _: () = deadpool_redis::redis::cmd("PSETEX")
                    .arg(key)
                    .arg(ttl_ms.max(1))
                    .arg(value)
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.pool.get().await?;
        let mut count = 0u64;
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = deadpool_redis::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = deadpool_redis::redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await?;
                count += deleted;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(count)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        match self.backend_type {
            RedisBackendType::Redis => "redis",
            RedisBackendType::Sentinel => "redis-sentinel",
        }
    }
}
