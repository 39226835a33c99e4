// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Launching follow units.
//!
//! The launcher is what a task manager calls to start following one shard
//! pair:
//! 1. Validates that both primaries are started (synchronous failure otherwise)
//! 2. Resumes the processed checkpoint from the [`CheckpointStore`], or starts
//!    from [`NO_OPS_PERFORMED`] for a brand-new follower
//! 3. Spawns a [`ShardFollower`] and hands back a [`ShardFollowHandle`]
//!
//! Each launch is independent; units share only the replication executor's
//! apply slots. Restart policy after a failure is up to the caller.

use crate::checkpoint_store::CheckpointStore;
use crate::config::ShardFollowConfig;
use crate::error::{FollowError, Result};
use crate::executor::ReplicationExecutor;
use crate::follow::{ReplicationOutcome, ShardFollower};
use crate::remote::{FollowerClient, LeaderClient};
use crate::shard::{ShardFollowParams, ShardFollowStatus, NO_OPS_PERFORMED};
use crate::task::{FollowTask, TaskState};
use crate::topology::{self, RoutingTable};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Starts follow units for shard pairs.
pub struct ShardFollowLauncher<L: LeaderClient, F: FollowerClient, R: RoutingTable> {
    config: ShardFollowConfig,
    leader: Arc<L>,
    follower: Arc<F>,
    routing: Arc<R>,
    store: Arc<CheckpointStore>,
    executor: ReplicationExecutor,
}

impl<L: LeaderClient, F: FollowerClient, R: RoutingTable> ShardFollowLauncher<L, F, R> {
    /// Create a launcher, opening the checkpoint store and sizing the apply
    /// executor from `config`.
    ///
    /// Must be called from within a tokio runtime; applies run on that runtime.
    pub async fn new(
        config: ShardFollowConfig,
        leader: Arc<L>,
        follower: Arc<F>,
        routing: Arc<R>,
    ) -> Result<Self> {
        config.validate()?;
        let executor = ReplicationExecutor::current(config.executor.max_concurrent_applies)?;
        let store = Arc::new(CheckpointStore::from_config(&config.checkpoint_store).await?);
        info!(
            store = %store.path(),
            apply_slots = executor.max_concurrent(),
            "Shard follow launcher ready"
        );
        Ok(Self {
            config,
            leader,
            follower,
            routing,
            store,
            executor,
        })
    }

    pub fn config(&self) -> &ShardFollowConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CheckpointStore> {
        &self.store
    }

    pub fn executor(&self) -> &ReplicationExecutor {
        &self.executor
    }

    /// Check that a task for `params` may start right now.
    pub fn validate(&self, params: &ShardFollowParams) -> Result<()> {
        topology::validate(params, self.routing.as_ref())
    }

    /// Validate, resume and spawn a follow unit.
    pub async fn launch(&self, task_id: &str, params: ShardFollowParams) -> Result<ShardFollowHandle> {
        self.validate(&params)?;

        let stored = self.store.load(task_id).await;
        if let Some(record) = &stored {
            if record.params.leader_shard != params.leader_shard
                || record.params.follower_shard != params.follower_shard
            {
                return Err(FollowError::InvalidState {
                    expected: format!(
                        "{} -> {}",
                        record.params.leader_shard, record.params.follower_shard
                    ),
                    actual: format!("{} -> {}", params.leader_shard, params.follower_shard),
                });
            }
        }
        let resumed = ShardFollowStatus::resume_checkpoint(stored.as_ref().map(|r| &r.status));

        info!(
            task_id = %task_id,
            leader = %params.leader_shard,
            follower = %params.follower_shard,
            resumed,
            fresh = resumed == NO_OPS_PERFORMED,
            "Launching shard follow task"
        );

        let task = Arc::new(FollowTask::new(
            task_id,
            params.clone(),
            Arc::clone(&self.store),
            resumed,
        ));
        let follower = ShardFollower::new(
            params,
            Arc::clone(&self.leader),
            Arc::clone(&self.follower),
            Arc::clone(&task),
            self.executor.clone(),
            self.config.retry_delay_duration(),
        );
        let join = tokio::spawn(follower.run(resumed));

        Ok(ShardFollowHandle { task, join })
    }
}

/// Handle to a running follow unit.
pub struct ShardFollowHandle {
    task: Arc<FollowTask>,
    join: JoinHandle<ReplicationOutcome>,
}

impl std::fmt::Debug for ShardFollowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardFollowHandle")
            .field("task_id", &self.task.task_id())
            .field("state", &self.task.state())
            .field("finished", &self.join.is_finished())
            .finish()
    }
}

impl ShardFollowHandle {
    pub fn task(&self) -> &Arc<FollowTask> {
        &self.task
    }

    pub fn state(&self) -> TaskState {
        self.task.state()
    }

    /// Request cancellation; the unit stops at its next cycle boundary.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Wait for the unit to stop.
    pub async fn join(self) -> Result<ReplicationOutcome> {
        self.join
            .await
            .map_err(|e| FollowError::Executor(format!("follow task did not complete: {}", e)))
    }
}
