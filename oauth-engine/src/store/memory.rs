use super::{KvStore, StoreError};
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};

/// Process-local store backed by moka.
///
/// Entries are never expired. A non-zero capacity bounds the total size of
/// keys and values, after which the least recently used records are evicted.
#[derive(Clone)]
pub struct MemoryStore {
    entries: MokaCache<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Initialize a store bounded to `capacity_mib` MiB, or unbounded when zero
    pub fn new(capacity_mib: u64) -> Result<Self, StoreError> {
        if capacity_mib == 0 {
            return Ok(Self::unbounded());
        }
        let max_capacity_bytes = capacity_mib
            .checked_mul(1024 * 1024)
            .ok_or_else(|| StoreError::Config(format!("capacity overflow: {capacity_mib} MiB")))?;

        let entries = MokaCache::builder()
            .weigher(|key: &Vec<u8>, value: &Vec<u8>| -> u32 {
                (key.len() + value.len()).try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_capacity_bytes)
            .build();
        Ok(Self { entries })
    }

    pub fn unbounded() -> Self {
        Self {
            entries: MokaCache::builder().build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).await)
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_vec(), value.to_vec()).await;
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.remove(key).await;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, StoreError> {
        let new = new.to_vec();
        let result = self
            .entries
            .entry(key.to_vec())
            .and_compute_with(|current| {
                let matches = current.as_ref().map(|entry| entry.value().as_slice()) == expected;
                async move {
                    if matches {
                        Op::Put(new)
                    } else {
                        Op::Nop
                    }
                }
            })
            .await;
        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}
