// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Follow controller: the outer replication loop for one shard pair.
//!
//! Ties together:
//! - Leader checkpoint discovery via [`LeaderClient`]
//! - Chunked replication via [`ChunksCoordinator`] / [`ChunkProcessor`]
//! - Checkpoint persistence and cancellation via [`TaskHandle`]
//!
//! # Architecture
//!
//! Each cycle:
//! 1. Stops silently if the task is no longer runnable
//! 2. Reads the leader's global checkpoint
//! 3. Equal to ours: sleep `retry_delay`, poll again
//! 4. Below ours: fatal consistency error
//! 5. Above ours: replicate `[ours, leader]` chunk by chunk, persist `leader`,
//!    start the next cycle right away
//!
//! Cycles run one after another inside a single future, so a unit never has
//! two cycles (or two chunks) in flight, and only this loop ever advances the
//! checkpoint.

pub mod chunks;
pub mod processor;
mod types;

pub use chunks::{partition, CheckpointRange, Chunk, ChunksCoordinator};
pub use processor::ChunkProcessor;
pub use types::{CycleOutcome, ReplicationOutcome};

use crate::error::{FollowError, Result};
use crate::executor::ReplicationExecutor;
use crate::metrics;
use crate::remote::{FollowerClient, LeaderClient};
use crate::shard::{SeqNo, ShardFollowParams, ShardFollowStatus};
use crate::task::TaskHandle;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, Instrument};

/// Replicates one leader shard into one follower shard.
pub struct ShardFollower<L: LeaderClient, F: FollowerClient, T: TaskHandle> {
    params: ShardFollowParams,
    leader: Arc<L>,
    follower: Arc<F>,
    task: Arc<T>,
    executor: ReplicationExecutor,
    retry_delay: Duration,
}

impl<L: LeaderClient, F: FollowerClient, T: TaskHandle> ShardFollower<L, F, T> {
    pub fn new(
        params: ShardFollowParams,
        leader: Arc<L>,
        follower: Arc<F>,
        task: Arc<T>,
        executor: ReplicationExecutor,
        retry_delay: Duration,
    ) -> Self {
        Self {
            params,
            leader,
            follower,
            task,
            executor,
            retry_delay,
        }
    }

    pub fn params(&self) -> &ShardFollowParams {
        &self.params
    }

    /// Run cycles until the task is cancelled or a cycle fails.
    ///
    /// `follow_checkpoint` is the resumed processed checkpoint, or
    /// [`NO_OPS_PERFORMED`](crate::shard::NO_OPS_PERFORMED) for a new follower.
    /// A failure is reported to the task handle before this returns.
    pub async fn run(self, follow_checkpoint: SeqNo) -> ReplicationOutcome {
        let span = info_span!(
            "shard_follow",
            leader = %self.params.leader_shard,
            follower = %self.params.follower_shard
        );
        self.run_loop(follow_checkpoint).instrument(span).await
    }

    async fn run_loop(self, mut follow_checkpoint: SeqNo) -> ReplicationOutcome {
        let follower_label = self.params.follower_shard.to_string();
        info!(
            checkpoint = follow_checkpoint,
            batch_size = self.params.batch_size,
            "Starting shard follow"
        );

        loop {
            let outcome = match self.run_cycle(follow_checkpoint).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    self.task.mark_failed(&error);
                    return ReplicationOutcome::Failed {
                        processed_checkpoint: follow_checkpoint,
                        error,
                    };
                }
            };
            metrics::record_cycle(&follower_label, outcome.label());

            match outcome {
                CycleOutcome::Cancelled => {
                    info!(checkpoint = follow_checkpoint, "Shard follow stopped, task not runnable");
                    return ReplicationOutcome::Cancelled {
                        processed_checkpoint: follow_checkpoint,
                    };
                }
                CycleOutcome::CaughtUp { .. } => {
                    metrics::record_idle_poll(&follower_label);
                    tokio::time::sleep(self.retry_delay).await;
                }
                CycleOutcome::Advanced { to, .. } => {
                    follow_checkpoint = to;
                }
            }
        }
    }

    /// One iteration: discover the leader checkpoint and, if it moved,
    /// replicate up to it and persist it.
    ///
    /// Does not sleep; a `CaughtUp` outcome leaves scheduling to the caller.
    pub async fn run_cycle(&self, follow_checkpoint: SeqNo) -> Result<CycleOutcome> {
        if !self.task.is_runnable() {
            return Ok(CycleOutcome::Cancelled);
        }

        let follower_label = self.params.follower_shard.to_string();
        let leader_shard = &self.params.leader_shard;

        let query_started = Instant::now();
        let leader_checkpoint = self
            .leader
            .global_checkpoint(leader_shard)
            .await
            .map_err(|e| FollowError::leader(leader_shard, "global_checkpoint", e))?
            .ok_or_else(|| FollowError::LeaderStatsUnavailable {
                shard: leader_shard.clone(),
            })?;
        metrics::record_checkpoint_query_latency(&follower_label, query_started.elapsed());
        metrics::set_leader_checkpoint(&follower_label, leader_checkpoint);
        metrics::set_lag_operations(&follower_label, leader_checkpoint.saturating_sub(follow_checkpoint));

        match follow_checkpoint.cmp(&leader_checkpoint) {
            Ordering::Equal => {
                debug!(checkpoint = leader_checkpoint, "Caught up with leader, polling again later");
                Ok(CycleOutcome::CaughtUp {
                    checkpoint: leader_checkpoint,
                })
            }
            Ordering::Greater => Err(FollowError::FollowerAhead {
                follower_checkpoint: follow_checkpoint,
                leader_checkpoint,
            }),
            Ordering::Less => {
                let range = CheckpointRange::new(follow_checkpoint, leader_checkpoint)?;
                let (chunks, operations) = self.replicate(range).await?;

                self.task
                    .persist_checkpoint(ShardFollowStatus::new(leader_checkpoint))
                    .await
                    .map_err(|e| FollowError::Persistence {
                        checkpoint: leader_checkpoint,
                        message: e.to_string(),
                    })?;

                info!(
                    from = follow_checkpoint,
                    to = leader_checkpoint,
                    chunks,
                    operations,
                    "Advanced processed checkpoint"
                );
                Ok(CycleOutcome::Advanced {
                    from: follow_checkpoint,
                    to: leader_checkpoint,
                    chunks,
                    operations,
                })
            }
        }
    }

    /// Replicate `range` with a fresh coordinator.
    async fn replicate(&self, range: CheckpointRange) -> Result<(usize, usize)> {
        let processor = ChunkProcessor::new(
            Arc::clone(&self.leader),
            Arc::clone(&self.follower),
            self.executor.clone(),
            self.params.leader_shard.clone(),
            self.params.follower_shard.clone(),
        );
        let mut coordinator = ChunksCoordinator::new(processor, self.params.batch_size);
        coordinator.create_chunks(range)?;
        coordinator.run().await
    }
}
