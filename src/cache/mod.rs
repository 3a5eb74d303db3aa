//! Cache layer for user aggregates
//!
//! The cache only ever holds derived data. Every backend speaks plain string
//! keys and values; encoding is the caller's business.

use crate::config::{CacheConfig, RedisConfig};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use lru::LruCache;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache key construction
pub mod keys {
    pub const USER: &str = "keyauth:user";

    /// Key under which a user's aggregate view is stored.
    pub fn user_key(user_id: &str) -> String {
        format!("{}:{}", USER, user_id)
    }
}

/// Operations every cache backend provides.
///
/// An `Err` from `set` or `delete` is advisory: callers log it and carry on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheOperations: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Redis-backed cache
#[derive(Clone)]
pub struct CacheManager {
    conn: ConnectionManager,
}

impl CacheManager {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheOperations for CacheManager {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// In-process LRU cache with per-entry expiry
pub struct LocalCacheManager {
    entries: Mutex<LruCache<String, (String, Instant)>>,
}

impl LocalCacheManager {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.local_capacity)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, (String, Instant)>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Local cache lock poisoned")))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheOperations for LocalCacheManager {
    async fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        let expired = match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                return Ok(Some(value.clone()))
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("cache ttl out of range: {:?}", ttl))
        })?;
        let mut entries = self.lock()?;
        entries.put(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.pop(key);
        Ok(())
    }
}

/// Backend used when caching is switched off: always misses, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCacheManager;

impl NoOpCacheManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheOperations for NoOpCacheManager {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}
