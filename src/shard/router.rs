//! Key → shard name routing strategies

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maps a key to the name of the shard responsible for it
///
/// Implementations must be pure: the same key always routes to the same
/// name. Any `Fn(&str) -> String + Send + Sync` closure is a router.
pub trait ShardRouter: Send + Sync {
    fn route(&self, key: &str) -> String;
}

impl<F> ShardRouter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn route(&self, key: &str) -> String {
        self(key)
    }
}

/// The key is the shard name
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRouter;

impl ShardRouter for IdentityRouter {
    fn route(&self, key: &str) -> String {
        key.to_string()
    }
}

/// The shard name is everything before the first delimiter
///
/// `"users:42"` routes to `"users"` with the default `:` delimiter; a key
/// without the delimiter routes to itself.
#[derive(Debug, Clone)]
pub struct PrefixRouter {
    delimiter: String,
}

impl PrefixRouter {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }
}

impl Default for PrefixRouter {
    fn default() -> Self {
        Self::new(":")
    }
}

impl ShardRouter for PrefixRouter {
    fn route(&self, key: &str) -> String {
        if self.delimiter.is_empty() {
            return key.to_string();
        }
        match key.split_once(self.delimiter.as_str()) {
            Some((prefix, _)) => prefix.to_string(),
            None => key.to_string(),
        }
    }
}

/// Router selection as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RouterConfig {
    #[default]
    Identity,
    Prefix {
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
}

fn default_delimiter() -> String {
    ":".to_string()
}

impl RouterConfig {
    pub fn build(&self) -> Arc<dyn ShardRouter> {
        match self {
            RouterConfig::Identity => Arc::new(IdentityRouter),
            RouterConfig::Prefix { delimiter } => Arc::new(PrefixRouter::new(delimiter.clone())),
        }
    }
}
