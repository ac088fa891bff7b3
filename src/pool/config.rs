//! Pool configuration
//!
//! `PoolOptions` is the loosely-typed input read from configuration files;
//! `PoolConfig` is the validated form every pool is built from.

use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default upper bound on open connections per pool
pub const DEFAULT_MAX_CONNECTIONS: i64 = 1;

/// Default wait for a free pooled connection, in seconds
pub const DEFAULT_ACQUISITION_TIMEOUT_SECS: i64 = 1;

/// Default connect/read/write timeout, in seconds
pub const DEFAULT_SOCKET_TIMEOUT_SECS: i64 = 3;

/// One candidate backend address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostAddr {
    pub host: String,
    pub port: u16,
}

impl HostAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Unvalidated pool options
///
/// Every field is optional; numeric fields are signed so that a negative
/// value in a config file surfaces as a configuration error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOptions {
    pub max_connections: Option<i64>,
    /// Seconds to wait for a free connection
    pub acquisition_timeout: Option<i64>,
    /// Seconds allowed for connect, write and read
    pub socket_timeout: Option<i64>,
    /// Tried in order when opening a connection; first reachable host wins
    pub alternate_hosts: Option<Vec<HostAddr>>,
}

impl PoolOptions {
    pub fn with_hosts(hosts: impl IntoIterator<Item = HostAddr>) -> Self {
        Self {
            alternate_hosts: Some(hosts.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn max_connections(mut self, n: i64) -> Self {
        self.max_connections = Some(n);
        self
    }

    pub fn acquisition_timeout(mut self, secs: i64) -> Self {
        self.acquisition_timeout = Some(secs);
        self
    }

    pub fn socket_timeout(mut self, secs: i64) -> Self {
        self.socket_timeout = Some(secs);
        self
    }
}

/// Validated pool configuration
///
/// Only obtainable through validation:
///
/// ```compile_fail
/// use redis_shard_proxy::pool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig {
///     max_connections: 0,
///     acquisition_timeout: Duration::ZERO,
///     socket_timeout: Duration::ZERO,
///     alternate_hosts: Vec::new(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    max_connections: usize,
    acquisition_timeout: Duration,
    socket_timeout: Duration,
    alternate_hosts: Vec<HostAddr>,
}

impl PoolConfig {
    /// Fill defaults and validate.
    ///
    /// Fails with `InvalidPoolConfig` when a numeric option is below 1 or
    /// `alternate_hosts` is missing, empty, or holds a blank host name.
    pub fn from_options(opts: &PoolOptions) -> Result<Self> {
        let max_connections = at_least_one(
            "max_connections",
            opts.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
        )?;
        let acquisition_timeout = at_least_one(
            "acquisition_timeout",
            opts.acquisition_timeout
                .unwrap_or(DEFAULT_ACQUISITION_TIMEOUT_SECS),
        )?;
        let socket_timeout = at_least_one(
            "socket_timeout",
            opts.socket_timeout.unwrap_or(DEFAULT_SOCKET_TIMEOUT_SECS),
        )?;

        let alternate_hosts = match &opts.alternate_hosts {
            None => {
                return Err(ProxyError::InvalidPoolConfig {
                    field: "alternate_hosts",
                    reason: "is required".to_string(),
                })
            }
            Some(hosts) if hosts.is_empty() => {
                return Err(ProxyError::InvalidPoolConfig {
                    field: "alternate_hosts",
                    reason: "must list at least one host".to_string(),
                })
            }
            Some(hosts) => hosts.clone(),
        };
        if let Some(blank) = alternate_hosts.iter().position(|h| h.host.trim().is_empty()) {
            return Err(ProxyError::InvalidPoolConfig {
                field: "alternate_hosts",
                reason: format!("entry {blank} has an empty host"),
            });
        }

        let max_connections = usize::try_from(max_connections)
            .ok()
            .filter(|n| *n <= Semaphore::MAX_PERMITS)
            .ok_or_else(|| ProxyError::InvalidPoolConfig {
                field: "max_connections",
                reason: format!("{max_connections} exceeds the supported maximum"),
            })?;

        Ok(Self {
            max_connections,
            acquisition_timeout: Duration::from_secs(acquisition_timeout as u64),
            socket_timeout: Duration::from_secs(socket_timeout as u64),
            alternate_hosts,
        })
    }

    /// Default limits with the given hosts
    pub fn new(hosts: impl IntoIterator<Item = HostAddr>) -> Result<Self> {
        Self::from_options(&PoolOptions::with_hosts(hosts))
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn acquisition_timeout(&self) -> Duration {
        self.acquisition_timeout
    }

    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    /// Hosts in the order they are tried
    pub fn alternate_hosts(&self) -> &[HostAddr] {
        &self.alternate_hosts
    }
}

impl TryFrom<PoolOptions> for PoolConfig {
    type Error = ProxyError;

    fn try_from(opts: PoolOptions) -> Result<Self> {
        Self::from_options(&opts)
    }
}

fn at_least_one(field: &'static str, value: i64) -> Result<i64> {
    if value < 1 {
        return Err(ProxyError::InvalidPoolConfig {
            field,
            reason: format!("must be >= 1 (got {value})"),
        });
    }
    Ok(value)
}
