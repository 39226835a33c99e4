// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for shard following.
//!
//! Every failure that ends a replication unit is a [`FollowError`]. Errors are
//! grouped by where they came from so the task manager can decide whether a
//! restart of the whole unit makes sense.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Leader` | Yes | Checkpoint query or operation fetch failed |
//! | `LeaderStatsUnavailable` | Yes | No stats for the primary leader shard |
//! | `Follower` | Yes | Bulk apply on the follower failed |
//! | `Executor` | Yes | Apply task could not run to completion |
//! | `FollowerAhead` | No | Follower checkpoint above leader checkpoint |
//! | `InvalidRange` | No | Range with `from > to` |
//! | `Persistence` | No | Advanced checkpoint could not be recorded |
//! | `CheckpointStore` | No | Local SQLite errors (needs operator attention) |
//! | `Validation` | No | Shards not started or bad parameters |
//! | `Config` | No | Configuration invalid |
//! | `InvalidState` | No | Task lifecycle misuse |
//!
//! # Retry Behavior
//!
//! Nothing inside this crate retries a failed remote call. A retryable error
//! only says that restarting the unit from its last persisted checkpoint is
//! reasonable. Consistency violations (see
//! [`FollowError::is_consistency_violation()`]) must never be papered over by
//! a restart.

use crate::shard::{SeqNo, ShardId};
use thiserror::Error;

/// Result type alias for shard follow operations.
pub type Result<T> = std::result::Result<T, FollowError>;

/// Errors that can terminate a replication unit.
#[derive(Error, Debug)]
pub enum FollowError {
    /// Startup validation failed.
    ///
    /// Raised synchronously by the launcher, before any replication happens.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The leader answered the stats request but had no entry for the primary.
    #[error("Cannot find shard stats for primary leader shard {shard}")]
    LeaderStatsUnavailable { shard: ShardId },

    /// A remote call against the leader failed.
    #[error("Leader error on {shard} ({operation}): {message}")]
    Leader {
        shard: ShardId,
        operation: &'static str,
        message: String,
    },

    /// The bulk apply against the follower failed.
    #[error("Follower error on {shard}: {message}")]
    Follower { shard: ShardId, message: String },

    /// The follower claims to have processed more than the leader has.
    ///
    /// Indicates corruption or a defect upstream. Never retried.
    #[error(
        "Follower checkpoint [{follower_checkpoint}] is ahead of leader checkpoint [{leader_checkpoint}]"
    )]
    FollowerAhead {
        follower_checkpoint: SeqNo,
        leader_checkpoint: SeqNo,
    },

    /// A checkpoint range whose lower bound is above its upper bound.
    #[error("Invalid checkpoint range [{from}, {to}]")]
    InvalidRange { from: SeqNo, to: SeqNo },

    /// The advanced checkpoint could not be durably recorded.
    #[error("Failed to persist checkpoint {checkpoint}: {message}")]
    Persistence { checkpoint: SeqNo, message: String },

    /// SQLite error in the checkpoint store.
    #[error("Checkpoint store error: {0}")]
    CheckpointStore(#[from] sqlx::Error),

    /// The replication executor could not run the apply step.
    #[error("Replication executor error: {0}")]
    Executor(String),

    /// Task lifecycle violation.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl FollowError {
    /// Create a leader error from any displayable cause.
    pub fn leader(shard: &ShardId, operation: &'static str, message: impl ToString) -> Self {
        Self::Leader {
            shard: shard.clone(),
            operation,
            message: message.to_string(),
        }
    }

    /// Create a follower error from any displayable cause.
    pub fn follower(shard: &ShardId, message: impl ToString) -> Self {
        Self::Follower {
            shard: shard.clone(),
            message: message.to_string(),
        }
    }

    /// Check whether restarting the unit could get past this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Leader { .. } => true,
            Self::LeaderStatsUnavailable { .. } => true, // Primary may be relocating
            Self::Follower { .. } => true,
            Self::Executor(_) => true,
            Self::FollowerAhead { .. } => false,
            Self::InvalidRange { .. } => false,
            Self::Persistence { .. } => false,
            Self::CheckpointStore(_) => false,
            Self::Validation(_) => false,
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
        }
    }

    /// Check whether this error signals diverged checkpoints rather than an outage.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, Self::FollowerAhead { .. } | Self::InvalidRange { .. })
    }

    /// Stable, low-cardinality name for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::LeaderStatsUnavailable { .. } => "leader_stats_unavailable",
            Self::Leader { .. } => "leader",
            Self::Follower { .. } => "follower",
            Self::FollowerAhead { .. } => "follower_ahead",
            Self::InvalidRange { .. } => "invalid_range",
            Self::Persistence { .. } => "persistence",
            Self::CheckpointStore(_) => "checkpoint_store",
            Self::Executor(_) => "executor",
            Self::InvalidState { .. } => "invalid_state",
        }
    }
}
