//! Mock leader, follower and task handle for driving the follow loop.
//!
//! Everything records its calls for assertions. Failures are switched on with
//! plain atomics so a test can flip them between cycles.

use shard_follow::remote::{BoxFuture, FollowerClient, LeaderClient, RemoteError};
use shard_follow::shard::{Operation, SeqNo, ShardFollowStatus, ShardId};
use shard_follow::task::{TaskFuture, TaskHandle};
use shard_follow::FollowError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A recorded fetch_operations() call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCall {
    pub from: SeqNo,
    pub to: SeqNo,
}

/// Leader shard with an in-memory operation log.
pub struct MockLeader {
    operations: Mutex<BTreeMap<SeqNo, Operation>>,
    /// `None` simulates missing primary stats
    checkpoint: Mutex<Option<SeqNo>>,
    checkpoint_queries: AtomicUsize,
    fetches: Mutex<Vec<FetchCall>>,
    fail_checkpoint: AtomicBool,
    /// Fetches beyond this count fail
    fail_fetch_after: AtomicUsize,
}

impl MockLeader {
    /// A leader that has never performed an operation.
    pub fn new() -> Self {
        Self {
            operations: Mutex::new(BTreeMap::new()),
            checkpoint: Mutex::new(Some(shard_follow::NO_OPS_PERFORMED)),
            checkpoint_queries: AtomicUsize::new(0),
            fetches: Mutex::new(Vec::new()),
            fail_checkpoint: AtomicBool::new(false),
            fail_fetch_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// A leader holding operations `0..=checkpoint`.
    pub fn with_operations(checkpoint: SeqNo) -> Self {
        let leader = Self::new();
        leader.advance_to(checkpoint);
        leader
    }

    /// Append operations up to `checkpoint` and publish it as the global checkpoint.
    pub fn advance_to(&self, checkpoint: SeqNo) {
        let mut ops = self.operations.lock().unwrap();
        let next = ops.keys().next_back().map_or(0, |last| last + 1);
        for seq_no in next..=checkpoint {
            ops.insert(seq_no, Operation::new(seq_no, 1, format!("doc-{}", seq_no).into_bytes()));
        }
        *self.checkpoint.lock().unwrap() = Some(checkpoint);
    }

    /// Publish a global checkpoint without touching the log.
    pub fn set_checkpoint(&self, checkpoint: Option<SeqNo>) {
        *self.checkpoint.lock().unwrap() = checkpoint;
    }

    pub fn fail_checkpoint_queries(&self, fail: bool) {
        self.fail_checkpoint.store(fail, Ordering::SeqCst);
    }

    /// Let `n` fetches succeed, fail every one after.
    pub fn fail_fetch_after(&self, n: usize) {
        self.fail_fetch_after.store(n, Ordering::SeqCst);
    }

    pub fn checkpoint_queries(&self) -> usize {
        self.checkpoint_queries.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<FetchCall> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_ranges(&self) -> Vec<(SeqNo, SeqNo)> {
        self.fetches().into_iter().map(|c| (c.from, c.to)).collect()
    }
}

impl Default for MockLeader {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderClient for MockLeader {
    fn global_checkpoint(&self, _shard: &ShardId) -> BoxFuture<'_, Option<SeqNo>> {
        Box::pin(async move {
            self.checkpoint_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_checkpoint.load(Ordering::SeqCst) {
                return Err(RemoteError("shard stats request timed out".to_string()));
            }
            Ok(*self.checkpoint.lock().unwrap())
        })
    }

    fn fetch_operations(
        &self,
        _shard: &ShardId,
        from: SeqNo,
        to: SeqNo,
    ) -> BoxFuture<'_, Vec<Operation>> {
        Box::pin(async move {
            let count = {
                let mut fetches = self.fetches.lock().unwrap();
                fetches.push(FetchCall { from, to });
                fetches.len()
            };
            if count > self.fail_fetch_after.load(Ordering::SeqCst) {
                return Err(RemoteError(format!("fetch [{}, {}] failed", from, to)));
            }
            let ops = self.operations.lock().unwrap();
            Ok(ops.range(from.max(0)..=to).map(|(_, op)| op.clone()).collect())
        })
    }
}

/// Follower shard that records every bulk apply.
pub struct MockFollower {
    applied: Mutex<Vec<Vec<Operation>>>,
    fail: AtomicBool,
    panic: AtomicBool,
}

impl MockFollower {
    pub fn new() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            panic: AtomicBool::new(false),
        }
    }

    pub fn fail_applies(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_apply(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    /// Batches in the order they were applied.
    pub fn batches(&self) -> Vec<Vec<Operation>> {
        self.applied.lock().unwrap().clone()
    }

    /// Sequence numbers of every applied operation, in apply order.
    pub fn applied_seq_nos(&self) -> Vec<SeqNo> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|op| op.seq_no)
            .collect()
    }
}

impl Default for MockFollower {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowerClient for MockFollower {
    fn apply_operations(&self, _shard: &ShardId, operations: Vec<Operation>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.panic.load(Ordering::SeqCst) {
                panic!("simulated follower crash");
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteError("bulk shard request rejected".to_string()));
            }
            self.applied.lock().unwrap().push(operations);
            Ok(())
        })
    }
}

/// Task handle that stays runnable for a fixed number of cycles.
pub struct MockTask {
    cycles_left: AtomicUsize,
    cancelled: AtomicBool,
    persisted: Mutex<Vec<SeqNo>>,
    failures: Mutex<Vec<&'static str>>,
    fail_persist: AtomicBool,
}

impl MockTask {
    /// Runnable for exactly `cycles` cycles.
    pub fn with_cycles(cycles: usize) -> Self {
        Self {
            cycles_left: AtomicUsize::new(cycles),
            cancelled: AtomicBool::new(false),
            persisted: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            fail_persist: AtomicBool::new(false),
        }
    }

    /// Runnable until cancelled.
    pub fn unlimited() -> Self {
        Self::with_cycles(usize::MAX)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn fail_persists(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub fn persisted(&self) -> Vec<SeqNo> {
        self.persisted.lock().unwrap().clone()
    }

    /// Error kinds reported through mark_failed().
    pub fn failures(&self) -> Vec<&'static str> {
        self.failures.lock().unwrap().clone()
    }
}

impl TaskHandle for MockTask {
    fn is_runnable(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        self.cycles_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn mark_failed(&self, error: &FollowError) {
        self.failures.lock().unwrap().push(error.kind());
    }

    fn persist_checkpoint(&self, status: ShardFollowStatus) -> TaskFuture<'_, ()> {
        Box::pin(async move {
            if self.fail_persist.load(Ordering::SeqCst) {
                return Err(FollowError::InvalidState {
                    expected: "writable task store".to_string(),
                    actual: "read-only".to_string(),
                });
            }
            self.persisted
                .lock()
                .unwrap()
                .push(status.processed_global_checkpoint);
            Ok(())
        })
    }
}
