use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Errors raised by key-value backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Access contract of the durable key-value store.
///
/// Keys and values are opaque bytes. A missing key is `Ok(None)`, never an
/// error. Implementations must be safe to share across request handlers.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Retrieve the value stored under `key`
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Atomically replace the value under `key` with `new` if the current
    /// value equals `expected` (`None` meaning "absent").
    ///
    /// Returns `true` when the swap happened.
    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, StoreError>;

    /// Returns Ok(()) if healthy, or Err with a descriptive message if unhealthy.
    async fn health_check(&self) -> Result<(), String>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StoreError> {
        (**self).remove(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, StoreError> {
        (**self).compare_and_swap(key, expected, new).await
    }

    async fn health_check(&self) -> Result<(), String> {
        (**self).health_check().await
    }
}
