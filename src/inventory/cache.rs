// Shared cache for catalog rows used during SKU resolution
//
// Values are opaque JSON strings. Backends are interchangeable; a failing
// backend only costs a catalog round-trip.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default time-to-live for cached catalog rows (60 seconds)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
/// Default number of entries kept by the in-memory backend
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait ResolveCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
struct MemoryEntries {
    values: HashMap<String, (String, Instant)>,
    order: VecDeque<String>,
}

/// Bounded in-process cache with FIFO eviction and per-entry TTL
pub struct MemoryResolveCache {
    entries: RwLock<MemoryEntries>,
    capacity: usize,
    ttl: Duration,
}

impl MemoryResolveCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(MemoryEntries::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.values.len()
    }
}

impl Default for MemoryResolveCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

#[async_trait]
impl ResolveCache for MemoryResolveCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values
            .get(key)
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;

        let replaced = entries
            .values
            .insert(key.to_string(), (value, Instant::now()))
            .is_some();
        if !replaced {
            entries.order.push_back(key.to_string());
        }

        while entries.values.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.values.remove(&oldest);
                }
                None => break,
            }
        }
        Ok(())
    }
}

// ============================================================================
// Redis backend
// ============================================================================

/// Cache shared across service instances through Redis
#[derive(Clone)]
pub struct RedisResolveCache {
    conn: redis::aio::ConnectionManager,
    ttl_secs: u64,
}

impl RedisResolveCache {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            ttl_secs: ttl.as_secs().max(1),
        })
    }
}

#[async_trait]
impl ResolveCache for RedisResolveCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
