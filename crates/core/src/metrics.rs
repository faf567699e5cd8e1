//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Disc pipelines (tracks, runs, album-gain barriers)
//! - Workers (threads started, teardown timeouts, encode duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Tracks that reached a terminal state, by state.
pub static TRACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("discoder_tracks_total", "Tracks that reached a terminal state"),
        &["result"], // "ok", "canceled", "error", "aborted"
    )
    .unwrap()
});

/// Disc pipelines finished, by outcome.
pub static PIPELINES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("discoder_pipelines_total", "Disc pipelines finished"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Album-gain barriers released (all tracks of a disc measured).
pub static ALBUM_GAIN_BARRIERS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "discoder_album_gain_barriers_total",
        "Album gain computations after all tracks were encoded",
    )
    .unwrap()
});

// =============================================================================
// Worker Metrics
// =============================================================================

/// Worker threads started, by kind.
pub static WORKERS_STARTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("discoder_workers_started_total", "Worker threads started"),
        &["kind"], // "split", "encode"
    )
    .unwrap()
});

/// Worker threads that did not exit after forced termination.
pub static WORKER_TEARDOWN_TIMEOUTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "discoder_worker_teardown_timeouts_total",
        "Worker threads detached after termination did not complete",
    )
    .unwrap()
});

/// Encode duration in seconds.
pub static ENCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "discoder_encode_duration_seconds",
            "Duration of single-track encodes",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["format"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pipeline
        Box::new(TRACKS_TOTAL.clone()),
        Box::new(PIPELINES_TOTAL.clone()),
        Box::new(ALBUM_GAIN_BARRIERS.clone()),
        // Workers
        Box::new(WORKERS_STARTED.clone()),
        Box::new(WORKER_TEARDOWN_TIMEOUTS.clone()),
        Box::new(ENCODE_DURATION.clone()),
    ]
}
