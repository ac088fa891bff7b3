//! Shard management module
//!
//! A shard is a named pair of read/write connection pools; the proxy maps
//! keys to shards through a pluggable router.

mod group;
mod proxy;
mod router;

pub use group::ShardGroup;
pub use proxy::ShardingProxy;
pub use router::{IdentityRouter, PrefixRouter, RouterConfig, ShardRouter};
