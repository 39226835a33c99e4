//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Follow cycles and their outcomes
//! - Chunk fetch/apply performance
//! - Leader and processed checkpoints (and the lag between them)
//! - Checkpoint persistence
//! - Failures by kind
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `shard_follow_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! # Usage
//!
//! ```rust,no_run
//! use shard_follow::metrics;
//! use std::time::Duration;
//!
//! metrics::record_chunk_applied("[follower][0]", 1024, Duration::from_millis(40));
//! metrics::set_processed_checkpoint("[follower][0]", 2048);
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record the outcome of one follow cycle ("advanced", "caught_up", "cancelled").
pub fn record_cycle(follower_shard: &str, outcome: &str) {
    counter!(
        "shard_follow_cycles_total",
        "follower_shard" => follower_shard.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an idle poll (leader and follower at the same checkpoint).
pub fn record_idle_poll(follower_shard: &str) {
    counter!("shard_follow_idle_polls_total", "follower_shard" => follower_shard.to_string()).increment(1);
}

/// Record the leader checkpoint query latency.
pub fn record_checkpoint_query_latency(follower_shard: &str, duration: Duration) {
    histogram!("shard_follow_checkpoint_query_duration_seconds", "follower_shard" => follower_shard.to_string())
        .record(duration.as_secs_f64());
}

/// Record operation fetch latency for one chunk.
pub fn record_fetch_latency(follower_shard: &str, duration: Duration) {
    histogram!("shard_follow_fetch_duration_seconds", "follower_shard" => follower_shard.to_string())
        .record(duration.as_secs_f64());
}

/// Record bulk apply latency for one chunk.
pub fn record_apply_latency(follower_shard: &str, duration: Duration) {
    histogram!("shard_follow_apply_duration_seconds", "follower_shard" => follower_shard.to_string())
        .record(duration.as_secs_f64());
}

/// Record a fully processed chunk.
pub fn record_chunk_applied(follower_shard: &str, operations: usize, duration: Duration) {
    counter!("shard_follow_chunks_total", "follower_shard" => follower_shard.to_string()).increment(1);
    counter!("shard_follow_operations_applied_total", "follower_shard" => follower_shard.to_string())
        .increment(operations as u64);
    histogram!("shard_follow_chunk_duration_seconds", "follower_shard" => follower_shard.to_string())
        .record(duration.as_secs_f64());
}

/// Gauge for the last observed leader global checkpoint.
pub fn set_leader_checkpoint(follower_shard: &str, checkpoint: i64) {
    gauge!("shard_follow_leader_checkpoint", "follower_shard" => follower_shard.to_string()).set(checkpoint as f64);
}

/// Gauge for the persisted processed checkpoint.
pub fn set_processed_checkpoint(follower_shard: &str, checkpoint: i64) {
    gauge!("shard_follow_processed_checkpoint", "follower_shard" => follower_shard.to_string()).set(checkpoint as f64);
}

/// Gauge for how many sequence numbers the follower is behind.
pub fn set_lag_operations(follower_shard: &str, lag: i64) {
    gauge!("shard_follow_lag_operations", "follower_shard" => follower_shard.to_string()).set(lag.max(0) as f64);
}

/// Record checkpoint persistence.
pub fn record_checkpoint_persist(follower_shard: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "shard_follow_checkpoint_persists_total",
        "follower_shard" => follower_shard.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record checkpoint store SQLite retry (for SQLITE_BUSY/SQLITE_LOCKED).
pub fn record_store_retry(operation: &str) {
    counter!("shard_follow_store_retries_total", "operation" => operation.to_string()).increment(1);
}

/// Record a terminal failure by kind.
pub fn record_failure(follower_shard: &str, kind: &str) {
    counter!(
        "shard_follow_failures_total",
        "follower_shard" => follower_shard.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Gauge for task state.
pub fn set_task_state(follower_shard: &str, state: &str) {
    // Encode state as numeric for alerting
    let value = match state {
        "Started" => 0.0,
        "Cancelled" => 1.0,
        "Failed" => 2.0,
        _ => -1.0,
    };
    gauge!("shard_follow_task_state", "follower_shard" => follower_shard.to_string()).set(value);
}

/// Gauge for available apply slots on the replication executor.
pub fn set_apply_slots_available(available: usize) {
    gauge!("shard_follow_apply_slots_available").set(available as f64);
}
