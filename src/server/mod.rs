//! HTTP front end
//!
//! Exposes the proxy's two runtime operations plus health, readiness,
//! shard listing and Prometheus metrics endpoints.

mod stats;

pub use stats::{Outcome, ShardSnapshot, ShardStats};

use crate::error::ProxyError;
use crate::metrics::ProxyMetrics;
use crate::pool::PoolStats;
use crate::shard::ShardingProxy;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub shards_total: usize,
    pub requests_total: u64,
    pub failures_total: u64,
}

/// Pool occupancy as reported by `/shards`
#[derive(Debug, Serialize)]
pub struct PoolReport {
    pub max_connections: usize,
    pub idle: usize,
    pub available: usize,
}

impl From<PoolStats> for PoolReport {
    fn from(stats: PoolStats) -> Self {
        Self {
            max_connections: stats.max_connections,
            idle: stats.idle,
            available: stats.available,
        }
    }
}

/// One entry of the `/shards` listing
#[derive(Debug, Serialize)]
pub struct ShardReport {
    pub name: String,
    pub requests: ShardSnapshot,
    pub read_pool: PoolReport,
    pub write_pool: PoolReport,
}

/// Error body returned for failed kv requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: &'static str,
}

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ShardingProxy>,
    pub stats: ShardStats,
    pub metrics: Arc<ProxyMetrics>,
}

impl AppState {
    pub fn new(proxy: Arc<ShardingProxy>, metrics: Arc<ProxyMetrics>) -> Self {
        let stats = ShardStats::new(proxy.shard_names());
        metrics.set_shards_registered(proxy.shard_count());
        Self {
            proxy,
            stats,
            metrics,
        }
    }

    /// Registered shard a key routes to; `None` for unknown names
    fn registered_shard(&self, key: &str) -> Option<String> {
        let name = self.proxy.shard_name(key);
        self.stats.is_tracked(&name).then_some(name)
    }

    fn record(&self, shard: Option<&str>, op: &'static str, outcome: Outcome, started: Instant) {
        if let Some(name) = shard {
            self.stats.record(name, outcome);
        }
        let label = match outcome {
            Outcome::Read | Outcome::Write => "ok",
            Outcome::Miss => "miss",
            Outcome::Failure => "error",
        };
        self.metrics.record_request(shard, op, label, started.elapsed());
    }

    fn record_failure(&self, shard: Option<&str>, op: &'static str, err: &ProxyError, started: Instant) {
        self.record(shard, op, Outcome::Failure, started);
        self.metrics.record_error(shard, op, err.error_type_label());
    }
}

/// Create the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/kv/{key}", get(get_handler).put(set_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/shards", get(shards_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Wraps a proxy error for the HTTP boundary
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ProxyError::ShardNotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::AcquireTimeout { .. } | ProxyError::SocketTimeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ProxyError::Config(_) | ProxyError::InvalidPoolConfig { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Transport { .. }
            | ProxyError::PoolClosed
            | ProxyError::Protocol(_)
            | ProxyError::Server(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
            error_type: self.0.error_type_label(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// GET /kv/{key} - value bytes, or 404 when the key is unset
async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let shard = state.registered_shard(&key);

    match state.proxy.get(&key).await {
        Ok(Some(value)) => {
            state.record(shard.as_deref(), "get", Outcome::Read, started);
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/octet-stream")],
                value,
            )
                .into_response())
        }
        Ok(None) => {
            state.record(shard.as_deref(), "get", Outcome::Miss, started);
            Ok(StatusCode::NOT_FOUND.into_response())
        }
        Err(e) => {
            warn!(key = %key, shard = ?shard, error = %e, "GET failed");
            state.record_failure(shard.as_deref(), "get", &e, started);
            Err(ApiError(e))
        }
    }
}

/// PUT /kv/{key} - store the request body
async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();
    let shard = state.registered_shard(&key);

    match state.proxy.set(&key, body).await {
        Ok(()) => {
            state.record(shard.as_deref(), "set", Outcome::Write, started);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            warn!(key = %key, shard = ?shard, error = %e, "SET failed");
            state.record_failure(shard.as_deref(), "set", &e, started);
            Err(ApiError(e))
        }
    }
}

/// Health endpoint - always returns 200 if process is running
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness endpoint - returns 200 once at least one shard is registered
async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let shards_total = state.proxy.shard_count();
    let response = ReadyResponse {
        ready: shards_total > 0,
        shards_total,
        requests_total: state.stats.total_requests(),
        failures_total: state.stats.total_failures(),
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Shard listing with request counters and pool occupancy
async fn shards_handler(State(state): State<AppState>) -> Json<Vec<ShardReport>> {
    let reports = state
        .proxy
        .shard_names()
        .into_iter()
        .filter_map(|name| {
            let group = state.proxy.shard(name)?;
            Some(ShardReport {
                name: name.to_string(),
                requests: state.stats.snapshot(name).unwrap_or_default(),
                read_pool: group.read_client().stats().into(),
                write_pool: group.write_client().stats().into(),
            })
        })
        .collect();
    Json(reports)
}

/// Metrics endpoint - returns Prometheus format metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.set_shards_registered(state.proxy.shard_count());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.2.0",
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
    }

    #[test]
    fn test_ready_response_serialization() {
        let response = ReadyResponse {
            ready: true,
            shards_total: 2,
            requests_total: 10,
            failures_total: 1,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"ready\":true"));
        assert!(json.contains("\"shards_total\":2"));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                ProxyError::ShardNotFound {
                    shard: "key3".to_string(),
                    key: "key3".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ProxyError::AcquireTimeout {
                    timeout: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ProxyError::SocketTimeout {
                    addr: "localhost:8379".to_string(),
                    timeout: Duration::from_secs(3),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (ProxyError::PoolClosed, StatusCode::BAD_GATEWAY),
            (ProxyError::Server("ERR".to_string()), StatusCode::BAD_GATEWAY),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
