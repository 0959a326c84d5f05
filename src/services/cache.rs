use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

const KEY_PREFIX: &str = "civicdesk:";

/// Best-effort JSON cache. Every failure degrades to a miss; the store stays authoritative.
#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
}

impl CacheService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = match conn.get(Self::key(key)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Cache read for '{}' failed: {}", key, e);
                return None;
            }
        };
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let mut conn = self.redis.clone();
        if let Ok(json) = serde_json::to_string(value) {
            if let Err(e) = conn
                .set_ex::<_, _, ()>(Self::key(key), json, ttl_secs)
                .await
            {
                tracing::debug!("Cache write for '{}' failed: {}", key, e);
            }
        }
    }

    /// Atomically increments an integer key, creating it at 1.
    pub async fn incr(&self, key: &str) {
        let mut conn = self.redis.clone();
        if let Err(e) = conn.incr::<_, _, i64>(Self::key(key), 1).await {
            tracing::warn!("Cache increment for '{}' failed: {}", key, e);
        }
    }
}
