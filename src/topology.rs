// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Startup validation against the cluster routing table.
//!
//! A follow task is only allowed to start when the primaries of both the
//! leader and the follower shard are started. This is checked once, at
//! launch; shards going away later surface as remote failures instead.

use crate::error::{FollowError, Result};
use crate::shard::{ShardFollowParams, ShardId};
use std::collections::HashSet;
use std::sync::RwLock;

/// View of shard routing needed for validation.
pub trait RoutingTable: Send + Sync + 'static {
    /// Whether the primary copy of `shard` is started.
    fn is_primary_started(&self, shard: &ShardId) -> bool;
}

/// Check that both primaries of a follow task are online.
pub fn validate<R: RoutingTable + ?Sized>(params: &ShardFollowParams, routing: &R) -> Result<()> {
    if !routing.is_primary_started(&params.leader_shard) {
        return Err(FollowError::Validation(format!(
            "Not all copies of leader shard {} are started",
            params.leader_shard
        )));
    }
    if !routing.is_primary_started(&params.follower_shard) {
        return Err(FollowError::Validation(format!(
            "Not all copies of follow shard {} are started",
            params.follower_shard
        )));
    }
    if params.batch_size == 0 {
        return Err(FollowError::Validation("batch size must be positive".to_string()));
    }
    Ok(())
}

/// Routing table with an explicit set of started primaries.
///
/// Useful for single-node setups and tests.
#[derive(Debug, Default)]
pub struct StaticRoutingTable {
    started: RwLock<HashSet<ShardId>>,
}

impl StaticRoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table where all given primaries are started.
    pub fn with_started(shards: impl IntoIterator<Item = ShardId>) -> Self {
        Self {
            started: RwLock::new(shards.into_iter().collect()),
        }
    }

    pub fn mark_started(&self, shard: ShardId) {
        if let Ok(mut started) = self.started.write() {
            started.insert(shard);
        }
    }

    pub fn mark_stopped(&self, shard: &ShardId) {
        if let Ok(mut started) = self.started.write() {
            started.remove(shard);
        }
    }
}

impl RoutingTable for StaticRoutingTable {
    fn is_primary_started(&self, shard: &ShardId) -> bool {
        self.started
            .read()
            .map(|started| started.contains(shard))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ShardFollowParams {
        ShardFollowParams::new(ShardId::new("leader", 0), ShardId::new("follower", 0))
    }

    #[test]
    fn test_validate_both_started() {
        let routing =
            StaticRoutingTable::with_started([ShardId::new("leader", 0), ShardId::new("follower", 0)]);
        assert!(validate(&params(), &routing).is_ok());
    }

    #[test]
    fn test_validate_leader_not_started() {
        let routing = StaticRoutingTable::with_started([ShardId::new("follower", 0)]);
        let err = validate(&params(), &routing).unwrap_err();
        assert!(matches!(err, FollowError::Validation(_)));
        assert!(err.to_string().contains("leader shard [leader][0]"));
    }

    #[test]
    fn test_validate_follower_not_started() {
        let routing = StaticRoutingTable::with_started([ShardId::new("leader", 0)]);
        let err = validate(&params(), &routing).unwrap_err();
        assert!(err.to_string().contains("follow shard [follower][0]"));
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let routing =
            StaticRoutingTable::with_started([ShardId::new("leader", 0), ShardId::new("follower", 0)]);
        let err = validate(&params().with_batch_size(0), &routing).unwrap_err();
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn test_mark_stopped() {
        let routing = StaticRoutingTable::new();
        let shard = ShardId::new("leader", 0);
        routing.mark_started(shard.clone());
        assert!(routing.is_primary_started(&shard));
        routing.mark_stopped(&shard);
        assert!(!routing.is_primary_started(&shard));
    }
}
