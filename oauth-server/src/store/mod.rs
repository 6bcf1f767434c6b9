use crate::config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use log::info;
use oauth_engine::{KvStore, MemoryStore, StoreError};

pub mod redis;

pub use self::redis::RedisStore;

/// Store implementation chosen at runtime from the configuration.
///
/// Wraps the concrete backends behind one type so the authorization server
/// is instantiated once, whatever the deployment uses.
#[derive(Clone)]
pub enum Store {
    /// Process-local store using Moka
    Memory(MemoryStore),
    /// Redis-backed store, shared between replicas
    Redis(RedisStore),
}

#[async_trait]
impl KvStore for Store {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            Store::Memory(store) => store.get(key).await,
            Store::Redis(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.set(key, value).await,
            Store::Redis(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.remove(key).await,
            Store::Redis(store) => store.remove(key).await,
        }
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => store.compare_and_swap(key, expected, new).await,
            Store::Redis(store) => store.compare_and_swap(key, expected, new).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Store::Memory(store) => store.health_check().await,
            Store::Redis(store) => store.health_check().await,
        }
    }
}

/// Creates the store configured in `config`
pub async fn create_store(config: &StoreConfig) -> Result<Store, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!(
                "Using in-memory store (capacity: {} MiB, 0 = unbounded)",
                config.memory.capacity
            );
            Ok(Store::Memory(MemoryStore::new(config.memory.capacity)?))
        }
        StoreBackend::Redis => {
            info!("Using Redis store at {}", config.redis.url);
            let store = RedisStore::new(&config.redis.url)
                .await
                .map_err(StoreError::Config)?;
            Ok(Store::Redis(store))
        }
    }
}
