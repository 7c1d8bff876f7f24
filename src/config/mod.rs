use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CATALOG_URL: &str = "https://app.ticketmaster.com/discovery/v2/events.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// Top-level configuration, read once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub catalog: CatalogConfig,
    pub geo: GeoConfig,
    pub cache: CacheConfig,
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub log_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Ticketmaster Discovery API settings
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_key: String,
    pub default_keyword: String,
    pub default_radius: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    pub precision: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

/// Sizing of the worker pool that runs recommendation fan-out searches.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    pub core_pool_size: usize,
    pub max_pool_size: usize,
    pub queue_capacity: usize,
    pub keep_alive_seconds: u64,
    pub shutdown_grace_seconds: u64,
}

impl ExecutorConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            core_pool_size: 1,
            max_pool_size: 2,
            queue_capacity: 10,
            keep_alive_seconds: 60,
            shutdown_grace_seconds: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: parse_or("PORT", 8000)?,
                rust_log: env_or("RUST_LOG", "nearby_events=debug,tower_http=debug"),
                log_json: env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parse_or("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            catalog: CatalogConfig {
                base_url: env_or("TICKETMASTER_BASE_URL", DEFAULT_CATALOG_URL),
                api_key: required("TICKETMASTER_API_KEY")?,
                default_keyword: env_or("TICKETMASTER_DEFAULT_KEYWORD", ""),
                default_radius: parse_or("TICKETMASTER_DEFAULT_RADIUS", 50)?,
                timeout_seconds: parse_or("TICKETMASTER_TIMEOUT_SECONDS", 10)?,
            },
            geo: GeoConfig {
                precision: parse_or("GEO_HASH_PRECISION", 8)?,
            },
            cache: CacheConfig {
                ttl_seconds: parse_or("CACHE_TTL_SECONDS", 3600)?,
            },
            executor: ExecutorConfig {
                core_pool_size: parse_or("EXECUTOR_CORE_POOL_SIZE", 1)?,
                max_pool_size: parse_or("EXECUTOR_MAX_POOL_SIZE", 2)?,
                queue_capacity: parse_or("EXECUTOR_QUEUE_SIZE", 10)?,
                keep_alive_seconds: parse_or("EXECUTOR_KEEP_ALIVE_SECONDS", 60)?,
                shutdown_grace_seconds: parse_or("EXECUTOR_SHUTDOWN_GRACE_SECONDS", 30)?,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}
