use std::time::Duration;

use async_trait::async_trait;
use redis::RedisResult;
use tracing::warn;
use uuid::Uuid;

use veyra_core::hold::SeatHold;
use veyra_core::ports::{HoldCache, HoldCacheEntry, LockService};
use veyra_core::Error;

/// Thin Redis wrapper; raw commands keep the wire protocol explicit.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> RedisResult<redis::aio::MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await
    }

    /// SET NX EX: true when this caller now owns the key.
    pub async fn set_lock(&self, key: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.conn().await?;

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    pub async fn release_lock(&self, key: &str) -> RedisResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("DEL").arg(key).query_async(&mut conn).await
    }

    pub async fn set_hold(&self, hold_id: &str, payload: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("hold:{}", hold_id);
        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
    }

    pub async fn get_hold(&self, hold_id: &str) -> RedisResult<Option<String>> {
        let mut conn = self.conn().await?;
        let key = format!("hold:{}", hold_id);
        redis::cmd("GET").arg(key).query_async(&mut conn).await
    }

    pub async fn del_hold(&self, hold_id: &str) -> RedisResult<()> {
        let mut conn = self.conn().await?;
        let key = format!("hold:{}", hold_id);
        redis::cmd("DEL").arg(key).query_async(&mut conn).await
    }

    /// Fixed-window counter: INCR + EXPIRE in one atomic pipeline.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.conn().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

/// Advisory lock over Redis. Backend failures surface as `Internal`; the
/// fail-open/fail-closed decision is the HoldManager's, not this layer's.
pub struct RedisLockService {
    client: RedisClient,
}

impl RedisLockService {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LockService for RedisLockService {
    async fn acquire(&self, key: &str, ttl: Duration) -> veyra_core::Result<bool> {
        self.client
            .set_lock(key, ttl.as_secs())
            .await
            .map_err(Error::internal)
    }

    async fn release(&self, key: &str) -> veyra_core::Result<()> {
        self.client.release_lock(key).await.map_err(Error::internal)
    }
}

/// Best-effort mirror of the hold ledger under `hold:{id}` keys. Errors are
/// logged and swallowed; the ledger row is always authoritative.
pub struct RedisHoldCache {
    client: RedisClient,
}

impl RedisHoldCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HoldCache for RedisHoldCache {
    async fn put(&self, hold: &SeatHold, ttl: Duration) {
        let entry = HoldCacheEntry {
            session_id: hold.session_id,
            seats_count: hold.seats_count,
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        if let Err(err) = self
            .client
            .set_hold(&hold.id.to_string(), &payload, ttl.as_secs())
            .await
        {
            warn!(hold_id = %hold.id, error = %err, "hold cache write dropped");
        }
    }

    async fn get(&self, hold_id: Uuid) -> Option<HoldCacheEntry> {
        match self.client.get_hold(&hold_id.to_string()).await {
            Ok(Some(payload)) => serde_json::from_str(&payload).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(%hold_id, error = %err, "hold cache read failed");
                None
            }
        }
    }

    async fn remove(&self, hold_id: Uuid) {
        if let Err(err) = self.client.del_hold(&hold_id.to_string()).await {
            warn!(%hold_id, error = %err, "hold cache delete dropped");
        }
    }
}
