use async_trait::async_trait;
use log::error;
use oauth_engine::{KvStore, StoreError};
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};

/// Swaps `KEYS[1]` to `ARGV[3]` when its value equals `ARGV[2]`, or when it
/// is absent and `ARGV[1]` is "0".
const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '0' then
    if current then
        return 0
    end
elseif current ~= ARGV[2] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[3])
return 1
"#;

// TODO derive Debug once ConnectionManager implements it
#[derive(Clone)]
pub struct RedisStore {
    _client: Client,
    conn_manager: ConnectionManager,
    cas_script: Script,
}

impl RedisStore {
    /// Initialize a new Redis store instance
    pub async fn new(redis_url: &str) -> Result<Self, String> {
        let client = match Client::open(redis_url) {
            Ok(client) => client,
            Err(err) => {
                return Err(format!("Failed to connect to Redis: {}", err));
            }
        };

        let conn_manager = match ConnectionManager::new(client.clone()).await {
            Ok(manager) => manager,
            Err(err) => {
                return Err(format!(
                    "Failed to create Redis connection manager: {}",
                    err
                ));
            }
        };

        // Test the connection to ensure it's working
        let mut conn = conn_manager.clone();
        if let Err(err) = redis::cmd("PING").query_async::<String>(&mut conn).await {
            return Err(format!("Failed to ping Redis: {}", err));
        }

        Ok(Self {
            conn_manager,
            cas_script: Script::new(COMPARE_AND_SWAP),
            _client: client,
        })
    }
}

fn backend_error(op: &str, key: &[u8], err: redis::RedisError) -> StoreError {
    error!(
        "Redis error while {} key {}: {}",
        op,
        String::from_utf8_lossy(key),
        err
    );
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn_manager.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|err| backend_error("getting", key, err))
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn_manager.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|err| backend_error("setting", key, err))
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn_manager.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|err| backend_error("deleting", key, err))
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn_manager.clone();
        let (present, expected) = match expected {
            Some(value) => ("1", value),
            None => ("0", &[][..]),
        };
        let swapped: i64 = self
            .cas_script
            .key(key)
            .arg(present)
            .arg(expected)
            .arg(new)
            .invoke_async(&mut conn)
            .await
            .map_err(|err| backend_error("swapping", key, err))?;
        Ok(swapped == 1)
    }

    async fn health_check(&self) -> Result<(), String> {
        let mut conn = self.conn_manager.clone();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(err) => Err(format!("Redis health check failed: {}", err)),
        }
    }
}
