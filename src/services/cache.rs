//! Key-value cache used for rendered pages and the server session token.
//!
//! Only single-key operations are exposed. `add` is the add-if-absent
//! primitive the access gate relies on to settle concurrent token creation.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait PageCache: Send + Sync {
    /// Fetch a value; `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value, replacing any previous one. A zero `ttl` never expires.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Store a value only if the key is absent. Returns whether it was stored.
    async fn add(&self, key: &str, value: &str) -> CacheResult<bool>;
}

/// Redis-backed cache shared by every instance of the service.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl PageCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            // Sub-second TTLs round up so the entry is still written with an expiry.
            let secs = ttl.as_secs().max(1);
            conn.set_ex::<_, _, ()>(key, value, secs).await?;
        }
        Ok(())
    }

    async fn add(&self, key: &str, value: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.set_nx(key, value).await?)
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache, used when no Redis URL is configured and in tests.
///
/// Expired entries are dropped on every write, so keys that are never read
/// again do not accumulate.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: (!ttl.is_zero()).then(|| now + ttl),
            },
        );
        Ok(())
    }

    async fn add(&self, key: &str, value: &str) -> CacheResult<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(true)
    }
}
