//! Domain error types for the shard proxy
//!
//! Routing failures, configuration failures and failures of the pooled
//! Redis client all live in one structured taxonomy so callers can
//! pattern-match on the failure mode instead of parsing strings.
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All library code returns Result<T, ProxyError>.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Shard proxy errors
///
/// Example log output:
/// ```text
/// ProxyError::ShardNotFound { shard: "key3", key: "key3" }
/// → "no shard registered under 'key3' (routed from key 'key3')"
/// ```
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Process configuration missing or unreadable
    #[error("configuration error: {0}")]
    Config(String),

    /// A pool option failed validation
    #[error("invalid pool configuration: {field} {reason}")]
    InvalidPoolConfig { field: &'static str, reason: String },

    /// Router produced a name with no registered shard group
    #[error("no shard registered under '{shard}' (routed from key '{key}')")]
    ShardNotFound { shard: String, key: String },

    /// Every alternate host refused or dropped the connection
    #[error("transport error talking to {addr}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// No pooled connection became free in time
    #[error("timed out after {timeout:?} waiting for a pooled connection")]
    AcquireTimeout { timeout: Duration },

    /// A socket read, write or connect exceeded the socket timeout
    #[error("socket timeout after {timeout:?} on {addr}")]
    SocketTimeout { addr: String, timeout: Duration },

    /// Pool was shut down
    #[error("connection pool is closed")]
    PoolClosed,

    /// Malformed or unexpected RESP reply
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server answered with an error reply
    #[error("server error: {0}")]
    Server(String),
}

impl ProxyError {
    /// Returns a static label string suitable for Prometheus metrics.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidPoolConfig { .. } => "invalid_pool_config",
            Self::ShardNotFound { .. } => "shard_not_found",
            Self::Transport { .. } => "transport",
            Self::AcquireTimeout { .. } => "acquire_timeout",
            Self::SocketTimeout { .. } => "socket_timeout",
            Self::PoolClosed => "pool_closed",
            Self::Protocol(_) => "protocol",
            Self::Server(_) => "server",
        }
    }

    /// True for failures raised while building shards, before any traffic.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidPoolConfig { .. })
    }

    /// True for failures that leave a connection in an unknown state.
    pub(crate) fn breaks_connection(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::SocketTimeout { .. } | Self::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")
    }

    #[test]
    fn every_variant_has_distinct_error_type_label() {
        let labels = [
            ProxyError::Config("test".to_string()).error_type_label(),
            ProxyError::InvalidPoolConfig {
                field: "max_connections",
                reason: "must be >= 1".to_string(),
            }
            .error_type_label(),
            ProxyError::ShardNotFound {
                shard: "a".to_string(),
                key: "a".to_string(),
            }
            .error_type_label(),
            ProxyError::Transport {
                addr: "localhost:6379".to_string(),
                source: io_error(),
            }
            .error_type_label(),
            ProxyError::AcquireTimeout {
                timeout: Duration::from_secs(1),
            }
            .error_type_label(),
            ProxyError::SocketTimeout {
                addr: "localhost:6379".to_string(),
                timeout: Duration::from_secs(3),
            }
            .error_type_label(),
            ProxyError::PoolClosed.error_type_label(),
            ProxyError::Protocol("bad".to_string()).error_type_label(),
            ProxyError::Server("ERR".to_string()).error_type_label(),
        ];

        let mut unique = labels.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(labels.len(), unique.len(), "Duplicate error_type_label found");
    }

    #[test]
    fn shard_not_found_names_shard_and_key() {
        let err = ProxyError::ShardNotFound {
            shard: "users".to_string(),
            key: "users:42".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'users'"));
        assert!(msg.contains("users:42"));
    }

    #[test]
    fn config_classification() {
        assert!(ProxyError::Config("x".to_string()).is_config_error());
        assert!(ProxyError::InvalidPoolConfig {
            field: "socket_timeout",
            reason: "must be >= 1".to_string(),
        }
        .is_config_error());
        assert!(!ProxyError::PoolClosed.is_config_error());
    }

    #[test]
    fn server_replies_keep_connection() {
        assert!(!ProxyError::Server("ERR wrong type".to_string()).breaks_connection());
        assert!(ProxyError::Protocol("bad prefix".to_string()).breaks_connection());
        assert!(ProxyError::Transport {
            addr: "a:1".to_string(),
            source: io_error(),
        }
        .breaks_connection());
    }
}
