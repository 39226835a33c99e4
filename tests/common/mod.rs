//! Shared test utilities for follow, launcher and chaos tests.
//!
//! This module provides:
//! - Mock leader/follower shards that record calls
//! - A mock task handle with a cycle budget
//! - Helpers to wire a `ShardFollower` together

#![allow(dead_code)]

pub mod mock_shards;

pub use mock_shards::*;

use shard_follow::{ReplicationExecutor, ShardFollowParams, ShardFollower, ShardId};
use std::sync::Arc;
use std::time::Duration;

pub const RETRY_DELAY: Duration = Duration::from_millis(500);

pub fn leader_shard() -> ShardId {
    ShardId::new("leader-index", 0)
}

pub fn follower_shard() -> ShardId {
    ShardId::new("follower-index", 0)
}

pub fn params(batch_size: u64) -> ShardFollowParams {
    ShardFollowParams::new(leader_shard(), follower_shard()).with_batch_size(batch_size)
}

/// Build a follower over the given mocks on the current runtime.
pub fn follower(
    batch_size: u64,
    leader: &Arc<MockLeader>,
    follower: &Arc<MockFollower>,
    task: &Arc<MockTask>,
) -> ShardFollower<MockLeader, MockFollower, MockTask> {
    ShardFollower::new(
        params(batch_size),
        Arc::clone(leader),
        Arc::clone(follower),
        Arc::clone(task),
        ReplicationExecutor::current(4).expect("tokio runtime"),
        RETRY_DELAY,
    )
}
