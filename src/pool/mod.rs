//! Bounded blocking connection pool
//!
//! Connections are opened lazily and capped at `max_connections` by a
//! semaphore. Callers beyond the cap wait up to `acquisition_timeout` for a
//! connection to be returned, then fail.

mod config;
mod connection;

pub use config::{
    HostAddr, PoolConfig, PoolOptions, DEFAULT_ACQUISITION_TIMEOUT_SECS,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_SOCKET_TIMEOUT_SECS,
};
pub use connection::Connection;

use crate::error::{ProxyError, Result};
use crate::resp::RespValue;

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::timeout;
use tracing::debug;

/// Point-in-time pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub max_connections: usize,
    /// Open connections waiting in the pool
    pub idle: usize,
    /// Connections that could be handed out right now without waiting
    pub available: usize,
}

/// Connection pool for one backend (with failover hosts)
#[derive(Debug)]
pub struct ConnectionPool {
    config: PoolConfig,
    permits: Semaphore,
    idle: Mutex<Vec<Connection>>,
}

impl ConnectionPool {
    /// Create an empty pool. No connection is opened until first use.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            permits: Semaphore::new(config.max_connections()),
            idle: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Check out a connection, waiting up to the acquisition timeout.
    pub async fn acquire(&self) -> Result<PooledConnection<'_>> {
        let permit = match timeout(self.config.acquisition_timeout(), self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(ProxyError::PoolClosed),
            Err(_) => {
                return Err(ProxyError::AcquireTimeout {
                    timeout: self.config.acquisition_timeout(),
                })
            }
        };

        let reused = self.lock_idle().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => Connection::open(self.config.alternate_hosts(), self.config.socket_timeout()).await?,
        };

        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
            broken: false,
            _permit: permit,
        })
    }

    /// Fail pending and future acquisitions and drop idle connections.
    ///
    /// Connections checked out at this point are dropped when returned.
    pub fn close(&self) {
        self.permits.close();
        let dropped = {
            let mut idle = self.lock_idle();
            let n = idle.len();
            idle.clear();
            n
        };
        debug!(dropped, "Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max_connections: self.config.max_connections(),
            idle: self.lock_idle().len(),
            available: self.permits.available_permits(),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<Connection>> {
        // The guarded Vec is always in a consistent state
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, conn: Connection) {
        if self.is_closed() {
            return;
        }
        self.lock_idle().push(conn);
    }
}

/// A checked-out connection; returned to its pool on drop
#[derive(Debug)]
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
    broken: bool,
    _permit: SemaphorePermit<'a>,
}

impl PooledConnection<'_> {
    /// Send one command and wait for its reply.
    ///
    /// A transport, timeout or protocol failure discards the connection
    /// instead of returning it to the pool. So does a request future
    /// dropped before completion.
    pub async fn request(&mut self, args: &[&[u8]]) -> Result<RespValue> {
        let conn = self.conn.as_mut().ok_or(ProxyError::PoolClosed)?;

        self.broken = true;
        let result = conn.request(args).await;
        self.broken = matches!(&result, Err(e) if e.breaks_connection());
        result
    }

    pub fn addr(&self) -> Option<&str> {
        self.conn.as_ref().map(Connection::addr)
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.broken {
                debug!(addr = conn.addr(), "Discarding broken connection");
            } else {
                self.pool.release(conn);
            }
        }
    }
}
