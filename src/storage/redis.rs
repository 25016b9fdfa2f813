use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;
use crate::storage::backend::DurableStorage;

/// Redis-backed storage for deployments that run the client server-side.
///
/// Keys are namespaced under `carecrm:` and expire with the session.
#[derive(Clone)]
pub struct RedisStorage {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisStorage {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        tracing::info!("✅ Redis Connection Manager initialized for session storage");
        Ok(Self {
            redis,
            ttl_secs: ttl_secs.max(1),
        })
    }

    fn key(key: &str) -> String {
        format!("carecrm:{}", key)
    }
}

#[async_trait]
impl DurableStorage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut redis = self.redis.clone();
        let value: Option<String> = redis.get(Self::key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(Self::key(key), value, self.ttl_secs)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                e
            })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(Self::key(key)).await?;
        Ok(())
    }
}
