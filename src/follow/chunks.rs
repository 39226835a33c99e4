//! Chunk coordination: split a checkpoint range, drive chunks in order.
//!
//! # Partitioning
//!
//! ```text
//! range [0, 2500], batch 1024
//!
//!   i = 0     → [0,    1024]   first chunk keeps `from` itself
//!   i = 1024  → [1025, 2048]   later chunks start after the previous upper bound
//!   i = 2048  → [2049, 2500]   last chunk is clamped to `to`
//! ```
//!
//! The first lower bound is the last processed checkpoint; the leader read
//! treats it as a starting marker. Chunks are contiguous, never overlap, and
//! each spans at most `batch_size` sequence numbers past its lower bound.
//!
//! # Ordering
//!
//! Operations of a shard must reach the follower in sequence-number order, so
//! the coordinator owns its queue outright and runs one chunk at a time. The
//! first failure drops the rest of the queue.

use super::processor::ChunkProcessor;
use crate::error::{FollowError, Result};
use crate::remote::{FollowerClient, LeaderClient};
use crate::shard::SeqNo;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A closed interval of sequence numbers to replicate in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointRange {
    pub from: SeqNo,
    pub to: SeqNo,
}

impl CheckpointRange {
    /// Create a range, rejecting `from > to`.
    pub fn new(from: SeqNo, to: SeqNo) -> Result<Self> {
        if from > to {
            return Err(FollowError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }
}

/// A bounded sub-interval of a [`CheckpointRange`], processed as one fetch + apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub from: SeqNo,
    pub to: SeqNo,
}

impl Chunk {
    pub fn new(from: SeqNo, to: SeqNo) -> Self {
        Self { from, to }
    }

    /// Distance between the bounds; never more than the batch size.
    pub fn len(&self) -> u64 {
        self.to.abs_diff(self.from)
    }
}

/// Split `range` into ordered chunks of at most `batch_size`.
///
/// An empty range (`from == to`) yields no chunks. `batch_size` must be positive.
pub fn partition(range: CheckpointRange, batch_size: u64) -> Result<Vec<Chunk>> {
    if batch_size == 0 {
        return Err(FollowError::Validation("batch size must be positive".to_string()));
    }
    // Widened so `i + batch_size` cannot overflow for any batch size.
    let from = i128::from(range.from);
    let to = i128::from(range.to);
    let step = i128::from(batch_size);

    let mut chunks = Vec::new();
    let mut i = from;
    while i < to {
        let upper = (i + step).min(to);
        let lower = if i == from { i } else { i + 1 };
        // from <= lower <= upper <= to, so both fit back into a SeqNo.
        chunks.push(Chunk::new(lower as SeqNo, upper as SeqNo));
        i += step;
    }
    Ok(chunks)
}

/// Drives the chunks of one cycle through a [`ChunkProcessor`], strictly in order.
pub struct ChunksCoordinator<L: LeaderClient, F: FollowerClient> {
    processor: ChunkProcessor<L, F>,
    batch_size: u64,
    chunks: VecDeque<Chunk>,
}

impl<L: LeaderClient, F: FollowerClient> ChunksCoordinator<L, F> {
    pub fn new(processor: ChunkProcessor<L, F>, batch_size: u64) -> Self {
        Self {
            processor,
            batch_size,
            chunks: VecDeque::new(),
        }
    }

    /// Queue the chunks for `range`.
    pub fn create_chunks(&mut self, range: CheckpointRange) -> Result<()> {
        let chunks = partition(range, self.batch_size)?;
        debug!(
            from = range.from,
            to = range.to,
            chunks = chunks.len(),
            batch_size = self.batch_size,
            "Partitioned checkpoint range"
        );
        self.chunks.extend(chunks);
        Ok(())
    }

    /// Process queued chunks front to back.
    ///
    /// Returns `(chunks, operations)` applied. Stops at the first failure and
    /// discards whatever is still queued.
    pub async fn run(mut self) -> Result<(usize, usize)> {
        let mut processed = 0;
        let mut operations = 0;

        while let Some(chunk) = self.chunks.pop_front() {
            match self.processor.process(chunk).await {
                Ok(count) => {
                    processed += 1;
                    operations += count;
                }
                Err(e) => {
                    warn!(
                        from = chunk.from,
                        to = chunk.to,
                        discarded = self.chunks.len(),
                        error = %e,
                        "Chunk failed, aborting remaining chunks"
                    );
                    return Err(e);
                }
            }
        }

        Ok((processed, operations))
    }
}
