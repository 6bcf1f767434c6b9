use confique::Config;
use serde::Deserialize;

/// Specifies which store implementation to use
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    Memory,
    Redis,
}

/// Configuration for the key-value store
#[derive(Debug, Config, Clone)]
pub struct StoreConfig {
    /// Store backend: "memory" (default) or "redis"
    #[config(env = "OAUTH_STORE_BACKEND", default = "memory")]
    pub backend: StoreBackend,

    #[config(nested)]
    pub memory: MemoryConfig,

    #[config(nested)]
    pub redis: RedisConfig,
}

/// In-memory store configuration options
#[derive(Debug, Config, Clone)]
pub struct MemoryConfig {
    /// Maximum capacity in MiB, 0 for unbounded (default: 0)
    #[config(env = "OAUTH_STORE_MEMORY_CAPACITY", default = 0)]
    pub capacity: u64,
}

/// Redis store configuration options
#[derive(Debug, Config, Clone)]
pub struct RedisConfig {
    #[config(env = "OAUTH_STORE_REDIS_URL", default = "redis://127.0.0.1:6379/")]
    pub url: String,
}
