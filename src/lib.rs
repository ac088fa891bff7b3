//! Redis Shard Proxy
//!
//! Client-side sharding over Redis-compatible backends:
//! - Routes each key to a named shard through a pluggable router
//! - Gives every shard independent read and write connection pools
//! - Surfaces routing, pool and backend failures unchanged
//!
//! ```no_run
//! use redis_shard_proxy::pool::{HostAddr, PoolOptions};
//! use redis_shard_proxy::shard::{IdentityRouter, ShardingProxy};
//!
//! # async fn demo() -> redis_shard_proxy::error::Result<()> {
//! let mut proxy = ShardingProxy::new(IdentityRouter);
//! let primary = PoolOptions::with_hosts([HostAddr::new("localhost", 8379)]);
//! proxy.add_shard("key1", &primary, &primary)?;
//!
//! proxy.set("key1", "xiao").await?;
//! assert_eq!(proxy.get("key1").await?, Some(b"xiao".to_vec()));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod resp;
pub mod server;
pub mod shard;

pub use client::RedisClient;
pub use error::{ProxyError, Result};
pub use shard::{ShardGroup, ShardRouter, ShardingProxy};
