// Redis connection for the distributed schedule lock

use crate::errors::StorageError;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Redis connection wrapper
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    /// Connect to Redis and keep a managed, auto-reconnecting connection
    #[instrument(skip(url))]
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        info!("Initializing Redis connection");

        let client = Client::open(url).map_err(|e| {
            StorageError::ConnectionFailed(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            StorageError::ConnectionFailed(format!("Failed to create connection manager: {}", e))
        })?;

        info!("Redis connection initialized");

        Ok(Self { manager })
    }

    /// Get a handle to the managed connection
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_redis_pool_rejects_malformed_url() {
        let result = RedisPool::new("not-a-redis-url").await;
        assert!(result.is_err());
    }
}
