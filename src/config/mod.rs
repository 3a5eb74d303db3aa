//! Configuration management for KeyAuth Core

use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;

/// Name of the department every domain is created with and that new users
/// fall back to when they are created without one.
pub const DEFAULT_DEPARTMENT_NAME: &str = "default";

/// Upper bound for `CACHE_TTL_SECS`: one week.
pub const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Aggregate cache configuration
    pub cache: CacheConfig,
    /// Organization defaults
    pub organization: OrganizationConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Which store backs the aggregate cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
    None,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" | "local" => Ok(CacheBackend::Memory),
            "none" | "off" => Ok(CacheBackend::None),
            other => bail!("Unknown cache backend: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub ttl_secs: u64,
    /// Entry capacity of the in-process backend
    pub local_capacity: usize,
}

impl CacheConfig {
    /// Caching is effective only when enabled and backed by a real store.
    pub fn is_active(&self) -> bool {
        self.enabled && self.backend != CacheBackend::None
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Redis,
            ttl_secs: 300,
            local_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrganizationConfig {
    pub default_department_name: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            default_department_name: DEFAULT_DEPARTMENT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_defaults = CacheConfig::default();
        let ttl_secs = match get("CACHE_TTL_SECS") {
            Some(v) => v.parse().context("Invalid CACHE_TTL_SECS")?,
            None => cache_defaults.ttl_secs,
        };
        if ttl_secs > MAX_CACHE_TTL_SECS {
            bail!(
                "CACHE_TTL_SECS must be at most {} seconds, got {}",
                MAX_CACHE_TTL_SECS,
                ttl_secs
            );
        }

        Ok(Self {
            http_host: get("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: get("HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: get("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: get("DATABASE_MAX_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                min_connections: get("DATABASE_MIN_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
            },
            redis: RedisConfig {
                url: get("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            },
            cache: CacheConfig {
                enabled: get("CACHE_ENABLED")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(cache_defaults.enabled),
                backend: match get("CACHE_BACKEND") {
                    Some(v) => v.parse().context("Invalid CACHE_BACKEND")?,
                    None => cache_defaults.backend,
                },
                ttl_secs,
                local_capacity: match get("CACHE_LOCAL_CAPACITY") {
                    Some(v) => v.parse().context("Invalid CACHE_LOCAL_CAPACITY")?,
                    None => cache_defaults.local_capacity,
                },
            },
            organization: OrganizationConfig {
                default_department_name: get("DEFAULT_DEPARTMENT_NAME")
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_DEPARTMENT_NAME.to_string()),
            },
            telemetry: TelemetryConfig {
                log_format: get("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
                metrics_enabled: get("METRICS_ENABLED")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(true),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
