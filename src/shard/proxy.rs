//! Key-routed access to a set of shard groups

use crate::error::{ProxyError, Result};
use crate::pool::PoolOptions;
use crate::shard::group::ShardGroup;
use crate::shard::router::ShardRouter;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes single-key reads and writes to registered shard groups
///
/// Shards are registered through `&mut self` during setup. Once the proxy
/// is shared (typically behind an `Arc`) the mapping can no longer change,
/// so every registration happens-before the first request.
pub struct ShardingProxy {
    router: Arc<dyn ShardRouter>,
    shards: HashMap<String, ShardGroup>,
}

impl ShardingProxy {
    pub fn new<R: ShardRouter + 'static>(router: R) -> Self {
        Self::with_router(Arc::new(router))
    }

    pub fn with_router(router: Arc<dyn ShardRouter>) -> Self {
        Self {
            router,
            shards: HashMap::new(),
        }
    }

    /// Build a shard group and register it under `name`.
    ///
    /// Re-registering a name replaces the previous group, which is returned
    /// still open so the caller decides when to shut it down.
    pub fn add_shard(
        &mut self,
        name: impl Into<String>,
        write: &PoolOptions,
        read: &PoolOptions,
    ) -> Result<Option<ShardGroup>> {
        let group = ShardGroup::new(write, read)?;
        Ok(self.insert_group(name.into(), group))
    }

    /// Register an already built group.
    pub fn insert_group(&mut self, name: impl Into<String>, group: ShardGroup) -> Option<ShardGroup> {
        let name = name.into();
        info!(
            shard = %name,
            write_hosts = group.write_config().alternate_hosts().len(),
            read_hosts = group.read_config().alternate_hosts().len(),
            "Registering shard"
        );
        let replaced = self.shards.insert(name.clone(), group);
        if replaced.is_some() {
            warn!(shard = %name, "Replaced existing shard registration");
        }
        replaced
    }

    /// Shard name a key routes to, whether or not it is registered
    pub fn shard_name(&self, key: &str) -> String {
        self.router.route(key)
    }

    /// The shard group responsible for `key`.
    pub fn resolve(&self, key: &str) -> Result<&ShardGroup> {
        let name = self.router.route(key);
        match self.shards.get(&name) {
            Some(group) => Ok(group),
            None => Err(ProxyError::ShardNotFound {
                shard: name,
                key: key.to_string(),
            }),
        }
    }

    /// Write through the responsible shard's write pool.
    pub async fn set(&self, key: &str, value: impl AsRef<[u8]>) -> Result<()> {
        let group = self.resolve(key)?;
        debug!(key, "Routing SET");
        group.write_client().set(key, value).await
    }

    /// Read through the responsible shard's read pool; `None` if unset.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let group = self.resolve(key)?;
        debug!(key, "Routing GET");
        group.read_client().get(key).await
    }

    pub fn shard(&self, name: &str) -> Option<&ShardGroup> {
        self.shards.get(name)
    }

    /// Registered shard names, sorted
    pub fn shard_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.shards.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Close every shard's pools
    pub fn shutdown(&self) {
        for (name, group) in &self.shards {
            group.shutdown();
            debug!(shard = %name, "Shard pools closed");
        }
        info!(shards = self.shards.len(), "Sharding proxy shut down");
    }
}

impl fmt::Debug for ShardingProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardingProxy")
            .field("shards", &self.shard_names())
            .finish_non_exhaustive()
    }
}
