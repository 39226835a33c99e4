// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote shard interfaces.
//!
//! The follow loop never talks to a transport directly. The node provides
//! implementations of [`LeaderClient`] and [`FollowerClient`] that wrap
//! whatever RPC client it uses, which also lets tests drive the loop with
//! recording doubles.
//!
//! # Example
//!
//! ```rust,no_run
//! use shard_follow::remote::{BoxFuture, LeaderClient};
//! use shard_follow::shard::{Operation, SeqNo, ShardId};
//!
//! struct MyLeader { /* ... */ }
//!
//! impl LeaderClient for MyLeader {
//!     fn global_checkpoint(&self, _shard: &ShardId) -> BoxFuture<'_, Option<SeqNo>> {
//!         Box::pin(async move { Ok(Some(42)) })
//!     }
//!
//!     fn fetch_operations(
//!         &self,
//!         _shard: &ShardId,
//!         _from: SeqNo,
//!         _to: SeqNo,
//!     ) -> BoxFuture<'_, Vec<Operation>> {
//!         Box::pin(async move { Ok(vec![]) })
//!     }
//! }
//! ```

use crate::shard::{Operation, SeqNo, ShardId};
use std::future::Future;
use std::pin::Pin;

/// Result type for remote shard calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Simplified error for remote shard calls.
#[derive(Debug, Clone)]
pub struct RemoteError(pub String);

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RemoteError {}

/// Read side: the shard whose log is being replicated.
pub trait LeaderClient: Send + Sync + 'static {
    /// Global checkpoint of the primary copy of `shard`.
    ///
    /// `Ok(None)` means the leader answered but had no stats for the primary,
    /// for example while it is relocating.
    fn global_checkpoint(&self, shard: &ShardId) -> BoxFuture<'_, Option<SeqNo>>;

    /// All operations with `from <= seq_no <= to`, ordered by sequence number.
    ///
    /// `from` may be the last processed checkpoint (or the no-ops sentinel);
    /// the leader treats it as a starting marker.
    fn fetch_operations(&self, shard: &ShardId, from: SeqNo, to: SeqNo)
        -> BoxFuture<'_, Vec<Operation>>;
}

/// Write side: the shard converging to the leader.
pub trait FollowerClient: Send + Sync + 'static {
    /// Apply `operations` as one bulk write. All or nothing.
    fn apply_operations(&self, shard: &ShardId, operations: Vec<Operation>) -> BoxFuture<'_, ()>;
}

/// A follower that only logs what it would apply (dry runs).
#[derive(Clone, Default)]
pub struct NoOpFollower;

impl FollowerClient for NoOpFollower {
    fn apply_operations(&self, shard: &ShardId, operations: Vec<Operation>) -> BoxFuture<'_, ()> {
        let shard = shard.clone();
        Box::pin(async move {
            tracing::debug!(
                shard = %shard,
                count = operations.len(),
                first = operations.first().map(|op| op.seq_no),
                last = operations.last().map(|op| op.seq_no),
                "NoOp: would apply operations"
            );
            Ok(())
        })
    }
}
