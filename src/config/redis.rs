use redis::aio::ConnectionManager;
use tokio::time::{timeout, Duration};

/// Connects to Redis when `REDIS_URL` is set. The leaderboard cache is optional,
/// so an unset URL yields `Ok(None)`.
pub async fn get_redis() -> anyhow::Result<Option<ConnectionManager>> {
    let redis_url = match std::env::var("REDIS_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => return Ok(None),
    };
    let client = redis::Client::open(redis_url)?;

    let manager = timeout(Duration::from_secs(5), ConnectionManager::new(client))
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 5 seconds"))??;

    Ok(Some(manager))
}
