//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms sized for remote
//! catalog traffic and whole-build durations.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all LitGraph metrics
pub const METRICS_PREFIX: &str = "litgraph";

/// Histogram buckets for a single catalog request (in seconds)
pub const CATALOG_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
];

/// Histogram buckets for a full graph build (in seconds)
pub const BUILD_BUCKETS: &[f64] = &[
    1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Catalog traffic
    describe_counter!(
        format!("{}_catalog_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total catalog API requests"
    );

    describe_histogram!(
        format!("{}_catalog_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Catalog request latency in seconds"
    );

    describe_counter!(
        format!("{}_catalog_degraded_chunks_total", METRICS_PREFIX),
        Unit::Count,
        "Bulk-fetch chunks that failed and were dropped"
    );

    // Graph builds
    describe_counter!(
        format!("{}_builds_total", METRICS_PREFIX),
        Unit::Count,
        "Total graph builds"
    );

    describe_histogram!(
        format!("{}_build_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end graph build latency in seconds"
    );

    describe_gauge!(
        format!("{}_build_nodes_count", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the most recently built graph"
    );

    describe_gauge!(
        format!("{}_build_edges_count", METRICS_PREFIX),
        Unit::Count,
        "Edges in the most recently built graph"
    );

    // Cache
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total snapshot cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total snapshot cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record catalog request metrics
pub fn record_catalog_request(duration_secs: f64, endpoint: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_catalog_requests_total", METRICS_PREFIX),
        "endpoint" => endpoint,
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_catalog_request_duration_seconds", METRICS_PREFIX),
        "endpoint" => endpoint
    )
    .record(duration_secs);
}

/// Helper to record a dropped bulk-fetch chunk
pub fn record_degraded_chunk(endpoint: &'static str) {
    counter!(
        format!("{}_catalog_degraded_chunks_total", METRICS_PREFIX),
        "endpoint" => endpoint
    )
    .increment(1);
}

/// Helper to record whole-build metrics
pub fn record_build(kind: &'static str, success: bool, duration_secs: f64, nodes: usize, edges: usize) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_builds_total", METRICS_PREFIX),
        "kind" => kind,
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_build_duration_seconds", METRICS_PREFIX),
            "kind" => kind
        )
        .record(duration_secs);

        gauge!(format!("{}_build_nodes_count", METRICS_PREFIX), "kind" => kind).set(nodes as f64);
        gauge!(format!("{}_build_edges_count", METRICS_PREFIX), "kind" => kind).set(edges as f64);
    }
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &'static str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name
        )
        .increment(1);
    }
}

/// Helper to time a catalog request
pub struct CatalogTimer {
    start: Instant,
    endpoint: &'static str,
}

impl CatalogTimer {
    /// Start timing a request
    pub fn start(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Record request completion
    pub fn finish(self, success: bool) {
        record_catalog_request(self.start.elapsed().as_secs_f64(), self.endpoint, success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in CATALOG_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_build_buckets_cover_long_builds() {
        // A full build at 10 req/s with several hundred calls can take minutes.
        assert!(BUILD_BUCKETS.contains(&60.0));
        assert!(*BUILD_BUCKETS.last().unwrap() >= 300.0);
    }

    #[test]
    fn test_catalog_timer() {
        let timer = CatalogTimer::start("works_batch");
        std::thread::sleep(std::time::Duration::from_millis(5));
        timer.finish(true);
        // Just verify it runs without panic
    }
}
