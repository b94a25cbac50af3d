//! Metrics and observability utilities
//!
//! Prometheus metrics for reasoning calls, snapshot builds and caching,
//! with standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all HopGraph metrics
pub const METRICS_PREFIX: &str = "hopgraph";

/// Histogram buckets for in-memory reasoning latency (in seconds)
pub const REASONING_BUCKETS: &[f64] = &[
    0.000_05, // 50us
    0.000_1,  // 100us
    0.000_25, // 250us
    0.000_5,  // 500us
    0.001,    // 1ms
    0.002_5,  // 2.5ms
    0.005,    // 5ms
    0.010,    // 10ms
    0.050,    // 50ms
];

/// Buckets for snapshot builds (bulk reads, typically slow)
pub const SNAPSHOT_BUCKETS: &[f64] = &[
    0.1,   // 100ms
    0.5,   // 500ms
    1.0,   // 1s
    2.5,   // 2.5s
    5.0,   // 5s
    10.0,  // 10s
    30.0,  // 30s
    60.0,  // 1m
    120.0, // 2m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Reasoning metrics
    describe_counter!(
        format!("{}_reasoning_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of reasoning calls by intent and outcome"
    );

    describe_histogram!(
        format!("{}_reasoning_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Reasoning latency in seconds"
    );

    describe_histogram!(
        format!("{}_reasoning_confidence", METRICS_PREFIX),
        Unit::Count,
        "Confidence of produced answers"
    );

    // Snapshot metrics
    describe_counter!(
        format!("{}_snapshot_builds_total", METRICS_PREFIX),
        Unit::Count,
        "Total snapshot builds by status"
    );

    describe_histogram!(
        format!("{}_snapshot_build_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Snapshot build latency in seconds"
    );

    describe_gauge!(
        format!("{}_snapshot_entities", METRICS_PREFIX),
        Unit::Count,
        "Entities in the active snapshot"
    );

    describe_gauge!(
        format!("{}_snapshot_edges", METRICS_PREFIX),
        Unit::Count,
        "Directed edges in the active snapshot"
    );

    describe_gauge!(
        format!("{}_snapshot_ambiguous_aliases", METRICS_PREFIX),
        Unit::Count,
        "Alias keys naming more than one entity"
    );

    describe_counter!(
        format!("{}_snapshot_dangling_edges_total", METRICS_PREFIX),
        Unit::Count,
        "Edges skipped because an endpoint is missing from the catalog"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record reasoning call metrics
pub struct ReasoningMetrics {
    start: Instant,
}

impl ReasoningMetrics {
    /// Start tracking a reasoning call
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    /// Record call completion
    pub fn finish(self, intent: &str, outcome: &str, confidence: f32) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_reasoning_requests_total", METRICS_PREFIX),
            "intent" => intent.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_reasoning_duration_seconds", METRICS_PREFIX),
            "intent" => intent.to_string()
        )
        .record(duration);

        histogram!(
            format!("{}_reasoning_confidence", METRICS_PREFIX),
            "outcome" => outcome.to_string()
        )
        .record(confidence as f64);
    }
}

/// Helper to record a finished snapshot build
pub fn record_snapshot_build(
    duration_secs: f64,
    success: bool,
    entities: usize,
    edges: usize,
    ambiguous_aliases: usize,
) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_snapshot_builds_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(format!("{}_snapshot_build_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    if success {
        gauge!(format!("{}_snapshot_entities", METRICS_PREFIX)).set(entities as f64);
        gauge!(format!("{}_snapshot_edges", METRICS_PREFIX)).set(edges as f64);
        gauge!(format!("{}_snapshot_ambiguous_aliases", METRICS_PREFIX))
            .set(ambiguous_aliases as f64);
    }
}

/// Helper to record skipped dangling edges
pub fn record_dangling_edges(count: usize) {
    counter!(format!("{}_snapshot_dangling_edges_total", METRICS_PREFIX))
        .increment(count as u64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}
