//! Pooled Redis client handle

use crate::error::{ProxyError, Result};
use crate::pool::{ConnectionPool, PoolConfig, PoolStats};
use crate::resp::RespValue;

use std::sync::Arc;

/// Issues single-key commands over its own connection pool
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct RedisClient {
    pool: Arc<ConnectionPool>,
}

impl RedisClient {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new(config)),
        }
    }

    /// `SET key value`
    pub async fn set(&self, key: &str, value: impl AsRef<[u8]>) -> Result<()> {
        match self.execute(&[b"SET", key.as_bytes(), value.as_ref()]).await? {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            other => Err(unexpected("SET", &other)),
        }
    }

    /// `GET key`; `None` when the key does not exist
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.execute(&[b"GET", key.as_bytes()]).await? {
            RespValue::BulkString(value) => Ok(value),
            other => Err(unexpected("GET", &other)),
        }
    }

    /// Run one command; an error reply becomes `ProxyError::Server`.
    pub async fn execute(&self, args: &[&[u8]]) -> Result<RespValue> {
        let mut conn = self.pool.acquire().await?;
        match conn.request(args).await? {
            RespValue::Error(message) => Err(ProxyError::Server(message)),
            reply => Ok(reply),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        self.pool.config()
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// True when both handles share one pool
    pub fn shares_pool_with(&self, other: &RedisClient) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }

    /// Close the underlying pool for every clone of this handle.
    pub fn close(&self) {
        self.pool.close();
    }
}

fn unexpected(command: &str, reply: &RespValue) -> ProxyError {
    ProxyError::Protocol(format!("unexpected reply to {command}: {reply:?}"))
}
