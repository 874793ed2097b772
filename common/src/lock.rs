// Per-schedule locking so overlapping invocations do not process the same schedule twice

use crate::db::RedisPool;
use crate::errors::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Token proving ownership of a lock; hand it back to `release`
#[derive(Debug)]
pub struct LockToken {
    resource: String,
    lock_value: String,
    acquired_at: Instant,
}

impl LockToken {
    fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            lock_value: Uuid::new_v4().to_string(),
            acquired_at: Instant::now(),
        }
    }

    /// Get the time elapsed since lock acquisition
    pub fn elapsed(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// Exclusive, expiring access to a named resource
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to take the lock once. `Ok(None)` means someone else holds it.
    async fn try_acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, StorageError>;

    /// Release a lock previously returned by `try_acquire`
    async fn release(&self, token: LockToken) -> Result<(), StorageError>;
}

/// Redis-backed lock using `SET NX EX` and a compare-and-delete release
pub struct RedLock {
    pool: RedisPool,
}

impl RedLock {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key(resource: &str) -> String {
        format!("lock:{}", resource)
    }
}

#[async_trait]
impl DistributedLock for RedLock {
    #[instrument(skip(self), fields(resource = %resource, ttl_seconds = ttl.as_secs()))]
    async fn try_acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, StorageError> {
        let mut conn = self.pool.get_connection();
        let token = LockToken::new(resource);

        let result: Option<String> = redis::cmd("SET")
            .arg(Self::key(resource))
            .arg(&token.lock_value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::RedisError(format!("Failed to acquire lock: {}", e)))?;

        if result.is_some() {
            debug!(lock_value = %token.lock_value, "Lock acquired");
            Ok(Some(token))
        } else {
            debug!("Lock already held");
            Ok(None)
        }
    }

    #[instrument(skip(self, token), fields(resource = %token.resource))]
    async fn release(&self, token: LockToken) -> Result<(), StorageError> {
        let mut conn = self.pool.get_connection();

        // Only delete the key if we still own it
        let script = r#"
            if redis.call("get", KEYS[1]) == ARGV[1] then
                return redis.call("del", KEYS[1])
            else
                return 0
            end
        "#;

        let result: i32 = redis::Script::new(script)
            .key(Self::key(&token.resource))
            .arg(&token.lock_value)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StorageError::RedisError(format!("Failed to release lock: {}", e)))?;

        if result == 1 {
            debug!(held_ms = token.elapsed().as_millis() as u64, "Lock released");
        } else {
            warn!("Lock was not owned or already expired");
        }

        Ok(())
    }
}

/// In-process lock for single-node deployments without Redis
#[derive(Debug, Clone, Default)]
pub struct LocalLock {
    held: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl LocalLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for LocalLock {
    async fn try_acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>, StorageError> {
        let mut held = self.held.lock().await;
        let now = Instant::now();

        if let Some((_, expires_at)) = held.get(resource) {
            if *expires_at > now {
                return Ok(None);
            }
        }

        let token = LockToken::new(resource);
        held.insert(resource.to_string(), (token.lock_value.clone(), now + ttl));
        Ok(Some(token))
    }

    async fn release(&self, token: LockToken) -> Result<(), StorageError> {
        let mut held = self.held.lock().await;
        if matches!(held.get(&token.resource), Some((value, _)) if *value == token.lock_value) {
            held.remove(&token.resource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_lock_is_exclusive() {
        let lock = LocalLock::new();
        let first = lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(second.is_none());

        let other = lock
            .try_acquire("schedule:b", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(other.is_some());
    }

    #[tokio::test]
    async fn test_local_lock_release_allows_reacquire() {
        let lock = LocalLock::new();
        let token = lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.resource, "schedule:a");
        lock.release(token).await.unwrap();

        assert!(lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_local_lock_expires() {
        let lock = LocalLock::new();
        let _token = lock
            .try_acquire("schedule:a", Duration::from_millis(5))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_stale_token_does_not_release_new_holder() {
        let lock = LocalLock::new();
        let stale = lock
            .try_acquire("schedule:a", Duration::from_millis(5))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _fresh = lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        lock.release(stale).await.unwrap();
        assert!(lock
            .try_acquire("schedule:a", Duration::from_secs(30))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_redlock_exclusivity() {
        let pool = RedisPool::new("redis://localhost:6379").await.unwrap();
        let lock = RedLock::new(pool);

        let token = lock
            .try_acquire("exclusive_schedule", Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();
        assert!(lock
            .try_acquire("exclusive_schedule", Duration::from_secs(10))
            .await
            .unwrap()
            .is_none());

        lock.release(token).await.unwrap();
        assert!(lock
            .try_acquire("exclusive_schedule", Duration::from_secs(10))
            .await
            .unwrap()
            .is_some());
    }
}
