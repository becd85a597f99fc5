//! Prometheus Metrics Definitions
//!
//! Defines the SiteGate metrics and the `/metrics` scrape endpoint. Cache
//! metrics are refreshed from [`SubscriptionCache::stats`] at scrape time
//! rather than on every lookup: entry counts are gauges, while lookup and
//! eviction totals are counters advanced by the growth since the last scrape.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_counter,
    register_int_counter_vec, CounterVec, Encoder, GaugeVec, HistogramVec, IntCounter,
    IntCounterVec, TextEncoder,
};
use sitegate_storage::{CacheStats, SubscriptionCache};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<SiteGateMetrics>> = Lazy::new(SiteGateMetrics::new);

/// The registered metrics, if registration succeeded.
pub fn metrics() -> Option<&'static SiteGateMetrics> {
    METRICS.as_ref().ok()
}

#[derive(Clone)]
pub struct SiteGateMetrics {
    /// labels: method, route, status
    pub http_requests_total: CounterVec,

    /// labels: method, route
    pub http_request_duration_seconds: HistogramVec,

    /// labels: outcome (allow/deny)
    pub gate_decisions_total: CounterVec,

    /// labels: resource, outcome (allow/deny)
    pub access_decisions_total: CounterVec,

    /// labels: state (live/expired)
    pub subscription_cache_entries: GaugeVec,

    /// labels: result (hit/miss/store_failure)
    pub subscription_cache_lookups_total: IntCounterVec,

    pub subscription_cache_evictions_total: IntCounter,
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

impl SiteGateMetrics {
    /// Create and register all metrics with the default registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "sitegate_http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "sitegate_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "route"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            gate_decisions_total: register_counter_vec!(
                "sitegate_gate_decisions_total",
                "Subscription gate decisions",
                &["outcome"]
            )
            .map_err(|e| registration_error("gate_decisions_total", e))?,

            access_decisions_total: register_counter_vec!(
                "sitegate_access_decisions_total",
                "Role-based access decisions on admin routes",
                &["resource", "outcome"]
            )
            .map_err(|e| registration_error("access_decisions_total", e))?,

            subscription_cache_entries: register_gauge_vec!(
                "sitegate_subscription_cache_entries",
                "Entries held by the subscription cache",
                &["state"]
            )
            .map_err(|e| registration_error("subscription_cache_entries", e))?,

            subscription_cache_lookups_total: register_int_counter_vec!(
                "sitegate_subscription_cache_lookups_total",
                "Subscription cache lookups by result",
                &["result"]
            )
            .map_err(|e| registration_error("subscription_cache_lookups_total", e))?,

            subscription_cache_evictions_total: register_int_counter!(
                "sitegate_subscription_cache_evictions_total",
                "Entries evicted to respect the size bound"
            )
            .map_err(|e| registration_error("subscription_cache_evictions_total", e))?,
        })
    }

    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, route, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    pub fn record_gate_decision(&self, allow: bool) {
        self.gate_decisions_total
            .with_label_values(&[outcome(allow)])
            .inc();
    }

    pub fn record_access_decision(&self, resource: &str, allow: bool) {
        self.access_decisions_total
            .with_label_values(&[resource, outcome(allow)])
            .inc();
    }

    pub fn observe_cache(&self, stats: &CacheStats) {
        self.subscription_cache_entries
            .with_label_values(&["live"])
            .set(stats.live as f64);
        self.subscription_cache_entries
            .with_label_values(&["expired"])
            .set(stats.expired as f64);
        for (result, total) in [
            ("hit", stats.hits),
            ("miss", stats.misses),
            ("store_failure", stats.store_failures),
        ] {
            advance_to(&self.subscription_cache_lookups_total.with_label_values(&[result]), total);
        }
        advance_to(&self.subscription_cache_evictions_total, stats.evictions);
    }
}

/// Raise a counter to `total`. Counters never move backwards, so a total
/// below the current value adds nothing.
fn advance_to(counter: &IntCounter, total: u64) {
    let delta = total.saturating_sub(counter.get());
    if delta > 0 {
        counter.inc_by(delta);
    }
}

fn outcome(allow: bool) -> &'static str {
    if allow {
        "allow"
    } else {
        "deny"
    }
}

/// Handler for GET /metrics.
pub async fn metrics_handler(State(cache): State<Arc<SubscriptionCache>>) -> impl IntoResponse {
    if let Some(metrics) = metrics() {
        metrics.observe_cache(&cache.stats());
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.gate_decisions_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_decisions() -> Result<(), String> {
        let metrics = metrics().ok_or("Metrics init failed")?;
        let before = metrics
            .gate_decisions_total
            .with_label_values(&["deny"])
            .get();
        metrics.record_gate_decision(false);
        let after = metrics
            .gate_decisions_total
            .with_label_values(&["deny"])
            .get();
        assert!(after >= before + 1.0);

        metrics.record_access_decision("rbac", true);
        metrics.record_http_request("GET", "/sites/:tenant", 307, 0.002);
        Ok(())
    }

    #[test]
    fn test_observe_cache() -> Result<(), String> {
        let metrics = metrics().ok_or("Metrics init failed")?;
        metrics.observe_cache(&CacheStats {
            live: 4,
            expired: 1,
            evictions: 2,
            ..CacheStats::default()
        });
        assert_eq!(
            metrics
                .subscription_cache_entries
                .with_label_values(&["live"])
                .get(),
            4.0
        );
        assert!(metrics.subscription_cache_evictions_total.get() >= 2);
        Ok(())
    }

    #[test]
    fn test_cache_totals_only_move_forward() {
        let counter = IntCounter::new("advance_to_test", "scratch counter").unwrap();

        advance_to(&counter, 5);
        assert_eq!(counter.get(), 5);

        advance_to(&counter, 9);
        assert_eq!(counter.get(), 9);

        advance_to(&counter, 3);
        assert_eq!(counter.get(), 9);
    }
}
