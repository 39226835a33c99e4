//! Chunk processor: fetch one chunk from the leader, apply it to the follower.
//!
//! ```text
//! leader.fetch_operations(from, to) ──▶ executor ──▶ follower.apply_operations(ops)
//! ```
//!
//! Exactly one outcome per chunk. Nothing is retried here; the first error
//! from either step is the chunk's error. Only the one fetched response is
//! held in memory, and it is moved into the apply.

use super::chunks::Chunk;
use crate::error::{FollowError, Result};
use crate::executor::ReplicationExecutor;
use crate::metrics;
use crate::remote::{FollowerClient, LeaderClient};
use crate::shard::ShardId;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, Instrument};

/// Processes single chunks for one leader/follower shard pair.
pub struct ChunkProcessor<L: LeaderClient, F: FollowerClient> {
    leader: Arc<L>,
    follower: Arc<F>,
    executor: ReplicationExecutor,
    leader_shard: ShardId,
    follower_shard: ShardId,
}

impl<L: LeaderClient, F: FollowerClient> ChunkProcessor<L, F> {
    pub fn new(
        leader: Arc<L>,
        follower: Arc<F>,
        executor: ReplicationExecutor,
        leader_shard: ShardId,
        follower_shard: ShardId,
    ) -> Self {
        Self {
            leader,
            follower,
            executor,
            leader_shard,
            follower_shard,
        }
    }

    /// Fetch and apply one chunk. Returns the number of operations applied.
    ///
    /// An empty fetch result is a successful apply of zero operations.
    pub async fn process(&self, chunk: Chunk) -> Result<usize> {
        let span = debug_span!("chunk", from = chunk.from, to = chunk.to);
        self.process_inner(chunk).instrument(span).await
    }

    async fn process_inner(&self, chunk: Chunk) -> Result<usize> {
        let follower_label = self.follower_shard.to_string();
        let started = Instant::now();

        let operations = self
            .leader
            .fetch_operations(&self.leader_shard, chunk.from, chunk.to)
            .await
            .map_err(|e| FollowError::leader(&self.leader_shard, "fetch_operations", e))?;
        metrics::record_fetch_latency(&follower_label, started.elapsed());

        let count = operations.len();
        debug!(count, "Fetched operations from leader");

        let apply_started = Instant::now();
        let follower = Arc::clone(&self.follower);
        let follower_shard = self.follower_shard.clone();
        self.executor
            .execute(async move {
                follower
                    .apply_operations(&follower_shard, operations)
                    .await
                    .map_err(|e| FollowError::follower(&follower_shard, e))
            })
            .await?;
        metrics::record_apply_latency(&follower_label, apply_started.elapsed());
        metrics::record_chunk_applied(&follower_label, count, started.elapsed());

        debug!(count, "Applied operations to follower");
        Ok(count)
    }
}
