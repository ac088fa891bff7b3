//! Prometheus metrics module
//!
//! Request counters and latency histograms for the HTTP front end. The
//! sharding core records nothing itself.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::sync::Arc;
use std::time::Duration;

/// Proxy metrics collector
#[derive(Clone)]
pub struct ProxyMetrics {
    handle: Arc<PrometheusHandle>,
    /// Set when this collector owns a recorder that is not the global one
    local: Option<Arc<PrometheusRecorder>>,
}

impl ProxyMetrics {
    /// Install the global Prometheus recorder
    ///
    /// Fails if a recorder is already installed in this process.
    pub fn install() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Self::register_metrics();
        Ok(Self {
            handle: Arc::new(handle),
            local: None,
        })
    }

    /// A collector with its own recorder, leaving the global one untouched
    ///
    /// Several can coexist in one process, e.g. one per test server.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let collector = Self {
            handle: Arc::new(recorder.handle()),
            local: Some(Arc::new(recorder)),
        };
        collector.scoped(Self::register_metrics);
        collector
    }

    /// Run `f` with this collector's recorder active
    fn scoped<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.local {
            Some(recorder) => metrics::with_local_recorder(&**recorder, f),
            None => f(),
        }
    }

    fn register_metrics() {
        describe_counter!(
            "shard_proxy_requests_total",
            Unit::Count,
            "Routed requests by shard, operation and outcome"
        );
        describe_counter!(
            "shard_proxy_errors_total",
            Unit::Count,
            "Failed requests by shard and error type"
        );
        describe_histogram!(
            "shard_proxy_request_duration_seconds",
            Unit::Seconds,
            "Time from routing to backend reply"
        );
        describe_gauge!(
            "shard_proxy_shards_registered",
            Unit::Count,
            "Number of registered shard groups"
        );
    }

    /// Record a completed request
    ///
    /// `shard` is `None` when the key routed to a name with no registered
    /// group; those samples carry `registered="false"` and an empty shard.
    pub fn record_request(
        &self,
        shard: Option<&str>,
        op: &'static str,
        outcome: &'static str,
        duration: Duration,
    ) {
        let (shard, registered) = shard_labels(shard);
        self.scoped(|| {
            counter!(
                "shard_proxy_requests_total",
                "shard" => shard.clone(),
                "registered" => registered,
                "op" => op,
                "outcome" => outcome
            )
            .increment(1);

            histogram!(
                "shard_proxy_request_duration_seconds",
                "shard" => shard.clone(),
                "registered" => registered,
                "op" => op
            )
            .record(duration.as_secs_f64());
        });
    }

    /// Record a failed request
    pub fn record_error(&self, shard: Option<&str>, op: &'static str, error_type: &'static str) {
        let (shard, registered) = shard_labels(shard);
        self.scoped(|| {
            counter!(
                "shard_proxy_errors_total",
                "shard" => shard.clone(),
                "registered" => registered,
                "op" => op,
                "error_type" => error_type
            )
            .increment(1);
        });
    }

    pub fn set_shards_registered(&self, count: usize) {
        self.scoped(|| gauge!("shard_proxy_shards_registered").set(count as f64));
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

fn shard_labels(shard: Option<&str>) -> (String, &'static str) {
    match shard {
        Some(name) => (name.to_string(), "true"),
        None => (String::new(), "false"),
    }
}
