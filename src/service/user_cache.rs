//! Read-through cache for user aggregates

use crate::cache::{keys, CacheOperations};
use crate::config::CacheConfig;
use crate::domain::UserAggregate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Caching switch and TTL, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn enabled(ttl: Duration) -> Self {
        Self { enabled: true, ttl }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            enabled: config.is_active(),
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }
}

fn record(op: &'static str, result: &'static str) {
    metrics::counter!("keyauth_cache_operations_total", "op" => op, "result" => result)
        .increment(1);
}

/// Cache handle shared by every service that reads or invalidates user views.
///
/// Failures never reach the caller: a failed read is a miss, a failed write
/// or eviction is logged.
#[derive(Clone)]
pub struct UserCache {
    cache: Arc<dyn CacheOperations>,
    policy: CachePolicy,
}

impl UserCache {
    pub fn new(cache: Arc<dyn CacheOperations>, policy: CachePolicy) -> Self {
        Self { cache, policy }
    }

    /// Cached aggregate for `user_id`, if a usable one exists.
    pub async fn load(&self, domain_id: &str, user_id: &str) -> Option<UserAggregate> {
        if !self.policy.enabled {
            return None;
        }

        let key = keys::user_key(user_id);
        let raw = match self.cache.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%key, "user cache miss");
                record("get", "miss");
                return None;
            }
            Err(e) => {
                warn!(%key, error = %e, "user cache read failed, falling back to store");
                record("get", "error");
                return None;
            }
        };

        match serde_json::from_str::<UserAggregate>(&raw) {
            Ok(aggregate)
                if aggregate.is_consistent_for(user_id) && aggregate.domain.id == domain_id =>
            {
                debug!(%key, "user cache hit");
                record("get", "hit");
                Some(aggregate)
            }
            Ok(_) => {
                warn!(%key, "cached user view does not match request, ignoring");
                record("get", "invalid");
                None
            }
            Err(e) => {
                warn!(%key, error = %e, "cached user view is undecodable, ignoring");
                record("get", "invalid");
                None
            }
        }
    }

    pub async fn store(&self, aggregate: &UserAggregate) {
        if !self.policy.enabled {
            return;
        }

        let key = keys::user_key(&aggregate.user.id);
        let value = match serde_json::to_string(aggregate) {
            Ok(value) => value,
            Err(e) => {
                warn!(%key, error = %e, "failed to encode user view for cache");
                record("set", "error");
                return;
            }
        };

        match self.cache.set(&key, &value, self.policy.ttl).await {
            Ok(()) => record("set", "ok"),
            Err(e) => {
                warn!(%key, error = %e, "failed to cache user view");
                record("set", "error");
            }
        }
    }

    pub async fn evict(&self, user_id: &str) {
        if !self.policy.enabled {
            return;
        }

        let key = keys::user_key(user_id);
        match self.cache.delete(&key).await {
            Ok(()) => {
                debug!(%key, "evicted user view");
                record("delete", "ok");
            }
            Err(e) => {
                warn!(%key, error = %e, "failed to evict user view");
                record("delete", "error");
            }
        }
    }

    pub async fn evict_all(&self, user_ids: &[String]) {
        for user_id in user_ids {
            self.evict(user_id).await;
        }
    }
}
