//! Session registry: the revocation ledger behind logout.
//!
//! Both implementations round a TTL below one second up to one second.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Shortest TTL an entry can carry. Redis `SET EX` rejects zero.
const MIN_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("session registry unavailable: {0}")]
    Unavailable(String),
}

/// Revocation ledger: issued token → subject email, with its own TTL.
///
/// Keys are the full signed token string. The TTL is independent of the
/// token's `exp` claim.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn register(&self, token: &str, email: &str, ttl: Duration) -> Result<(), RegistryError>;

    /// Returns the subject email if the session is still live.
    async fn lookup(&self, token: &str) -> Result<Option<String>, RegistryError>;

    /// Removes the session. Returns `false` if there was nothing to remove.
    async fn revoke(&self, token: &str) -> Result<bool, RegistryError>;
}

/// Redis-backed registry shared by every server instance.
#[derive(Clone)]
pub struct RedisSessionRegistry {
    redis: ConnectionManager,
}

impl RedisSessionRegistry {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }
}

#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    async fn register(&self, token: &str, email: &str, ttl: Duration) -> Result<(), RegistryError> {
        let ttl_secs = ttl.max(MIN_TTL).as_secs();
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(token, email, ttl_secs).await?;
        Ok(())
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>, RegistryError> {
        let mut conn = self.redis.clone();
        let email = conn.get::<_, Option<String>>(token).await?;
        Ok(email)
    }

    async fn revoke(&self, token: &str) -> Result<bool, RegistryError> {
        let mut conn = self.redis.clone();
        let removed: usize = conn.del(token).await?;
        Ok(removed > 0)
    }
}

#[derive(Clone)]
struct SessionEntry {
    email: String,
    expires_at: Instant,
}

/// Process-local registry. Entries are checked on read and evicted lazily.
///
/// Only suitable for a single instance; used by tests and local development.
#[derive(Clone, Default)]
pub struct MemorySessionRegistry {
    entries: Arc<DashMap<String, SessionEntry>>,
}

impl MemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all expired entries.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionRegistry for MemorySessionRegistry {
    async fn register(&self, token: &str, email: &str, ttl: Duration) -> Result<(), RegistryError> {
        self.entries.insert(
            token.to_string(),
            SessionEntry {
                email: email.to_string(),
                expires_at: Instant::now() + ttl.max(MIN_TTL),
            },
        );
        Ok(())
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>, RegistryError> {
        if let Some(entry) = self.entries.get(token) {
            if Instant::now() < entry.expires_at {
                return Ok(Some(entry.email.clone()));
            }
            // expired; release the read guard before removing
            drop(entry);
            self.entries.remove(token);
        }
        Ok(None)
    }

    async fn revoke(&self, token: &str) -> Result<bool, RegistryError> {
        Ok(self.entries.remove(token).is_some())
    }
}
