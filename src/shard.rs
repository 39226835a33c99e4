// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shard identities, sequence numbers and the persisted task shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in a shard's operation log.
pub type SeqNo = i64;

/// Processed checkpoint of a follower that has not applied anything yet.
pub const NO_OPS_PERFORMED: SeqNo = -1;

/// Batch size used when the task parameters don't specify one.
pub const DEFAULT_BATCH_SIZE: u64 = 1024;

/// Identifies one shard of one index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardId {
    pub index: String,
    pub id: u32,
}

impl ShardId {
    pub fn new(index: impl Into<String>, id: u32) -> Self {
        Self {
            index: index.into(),
            id,
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.index, self.id)
    }
}

/// One record of a shard's operation log.
///
/// The payload is opaque here; leader and follower agree on its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub seq_no: SeqNo,
    pub primary_term: u64,
    pub payload: Vec<u8>,
}

impl Operation {
    pub fn new(seq_no: SeqNo, primary_term: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            seq_no,
            primary_term,
            payload: payload.into(),
        }
    }
}

/// Parameters of one follow task: which shard pair, and how big each chunk may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFollowParams {
    pub leader_shard: ShardId,
    pub follower_shard: ShardId,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

impl ShardFollowParams {
    pub fn new(leader_shard: ShardId, follower_shard: ShardId) -> Self {
        Self {
            leader_shard,
            follower_shard,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Progress of a follow task, written after every successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardFollowStatus {
    pub processed_global_checkpoint: SeqNo,
}

impl ShardFollowStatus {
    pub fn new(processed_global_checkpoint: SeqNo) -> Self {
        Self {
            processed_global_checkpoint,
        }
    }

    /// Checkpoint to resume from, given the status stored for a task (if any).
    pub fn resume_checkpoint(status: Option<&ShardFollowStatus>) -> SeqNo {
        status
            .map(|s| s.processed_global_checkpoint)
            .unwrap_or(NO_OPS_PERFORMED)
    }
}
