//! Read/write connection pools for one shard

use crate::client::RedisClient;
use crate::error::Result;
use crate::pool::{PoolConfig, PoolOptions};

/// The pair of independent read and write pools backing one shard
///
/// Built once during setup; pools are lazily connected and torn down by
/// `shutdown` (or when the last client handle is dropped).
#[derive(Debug)]
pub struct ShardGroup {
    read_client: RedisClient,
    write_client: RedisClient,
}

impl ShardGroup {
    /// Validate both option sets and build one pool for each.
    ///
    /// The pools never share connections, even when the options are equal.
    pub fn new(write: &PoolOptions, read: &PoolOptions) -> Result<Self> {
        let write = PoolConfig::from_options(write)?;
        let read = PoolConfig::from_options(read)?;
        Ok(Self::from_configs(write, read))
    }

    /// Build from already validated configs
    pub fn from_configs(write: PoolConfig, read: PoolConfig) -> Self {
        Self {
            read_client: RedisClient::new(read),
            write_client: RedisClient::new(write),
        }
    }

    pub fn read_client(&self) -> &RedisClient {
        &self.read_client
    }

    pub fn write_client(&self) -> &RedisClient {
        &self.write_client
    }

    pub fn read_config(&self) -> &PoolConfig {
        self.read_client.config()
    }

    pub fn write_config(&self) -> &PoolConfig {
        self.write_client.config()
    }

    /// Close both pools
    pub fn shutdown(&self) {
        self.write_client.close();
        self.read_client.close();
    }
}
