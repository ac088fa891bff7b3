//! Proxy configuration module
//!
//! Shard topology and process settings are read from a config file, with
//! `SHARD_PROXY__*` environment variables layered on top.

use crate::error::{ProxyError, Result};
use crate::pool::PoolOptions;
use crate::shard::{RouterConfig, ShardingProxy};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;

/// Config file used when `SHARD_PROXY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "shard-proxy.toml";

const ENV_PREFIX: &str = "SHARD_PROXY";

/// One shard: a name plus its write and read pool options
#[derive(Debug, Clone, Deserialize)]
pub struct ShardSpec {
    pub name: String,

    #[serde(alias = "servers_for_write")]
    pub write: PoolOptions,

    #[serde(alias = "servers_for_read")]
    pub read: PoolOptions,
}

/// Proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// HTTP port for kv, health and metrics endpoints
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Key to shard name strategy
    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub shards: Vec<ShardSpec>,
}

fn default_http_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProxyConfig {
    /// Load from the file named by `SHARD_PROXY_CONFIG` plus environment overrides
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = env::var("SHARD_PROXY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let settings = Config::builder()
            .add_source(File::with_name(&path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to load {path}: {e}")))?;

        Self::from_settings(settings)
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .map_err(|e| ProxyError::Config(format!("invalid TOML: {e}")))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ProxyError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks; pool options are validated when shards are built
    pub fn validate(&self) -> Result<()> {
        if self.shards.is_empty() {
            return Err(ProxyError::Config("at least one shard must be configured".to_string()));
        }

        let mut seen = HashSet::new();
        for shard in &self.shards {
            if shard.name.is_empty() {
                return Err(ProxyError::Config("shard name must not be empty".to_string()));
            }
            if !seen.insert(shard.name.as_str()) {
                return Err(ProxyError::Config(format!(
                    "shard '{}' is configured more than once",
                    shard.name
                )));
            }
        }
        Ok(())
    }

    /// Build a proxy with every configured shard registered
    pub fn build_proxy(&self) -> Result<ShardingProxy> {
        let mut proxy = ShardingProxy::with_router(self.router.build());
        for shard in &self.shards {
            proxy
                .add_shard(shard.name.as_str(), &shard.write, &shard.read)
                .map_err(|e| match e {
                    ProxyError::InvalidPoolConfig { field, reason } => ProxyError::Config(format!(
                        "shard '{}': {field} {reason}",
                        shard.name
                    )),
                    other => other,
                })?;
        }
        Ok(proxy)
    }
}
