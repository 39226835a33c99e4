// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Task lifecycle seam.
//!
//! The follow loop only needs three things from whoever owns the task:
//! whether it may keep running, a way to report a terminal failure, and a way
//! to durably record a new processed checkpoint. [`TaskHandle`] captures
//! that; [`FollowTask`] is the implementation used by the launcher, backed by
//! the SQLite [`CheckpointStore`].
//!
//! # State Transitions
//!
//! ```text
//!            cancel()
//! Started ───────────────→ Cancelled
//!    │
//!    │ mark_failed()
//!    ↓
//!  Failed { reason }
//! ```
//!
//! Both terminal states are final; later transitions are ignored.

use crate::checkpoint_store::CheckpointStore;
use crate::error::{FollowError, Result};
use crate::metrics;
use crate::shard::{SeqNo, ShardFollowParams, ShardFollowStatus};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Boxed future returned by task callbacks.
pub type TaskFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What the follow loop needs from the task manager.
pub trait TaskHandle: Send + Sync + 'static {
    /// Whether the task may start another cycle.
    fn is_runnable(&self) -> bool;

    /// Record a terminal failure. The task will not run again.
    fn mark_failed(&self, error: &FollowError);

    /// Durably record a new processed checkpoint.
    fn persist_checkpoint(&self, status: ShardFollowStatus) -> TaskFuture<'_, ()>;
}

/// State of a follow task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Replicating (or polling for new operations).
    Started,
    /// Stopped on request. No outcome is reported.
    Cancelled,
    /// Stopped by a terminal error.
    Failed { reason: String },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Started)
    }

    fn name(&self) -> &'static str {
        match self {
            TaskState::Started => "Started",
            TaskState::Cancelled => "Cancelled",
            TaskState::Failed { .. } => "Failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Failed { reason } => write!(f, "Failed: {}", reason),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A follow task whose status lives in a [`CheckpointStore`].
pub struct FollowTask {
    task_id: String,
    params: ShardFollowParams,
    store: Arc<CheckpointStore>,
    state_tx: watch::Sender<TaskState>,
    /// Last checkpoint successfully persisted (or resumed from)
    persisted: AtomicI64,
}

impl FollowTask {
    /// Create a started task resuming from `resumed_checkpoint`.
    pub fn new(
        task_id: impl Into<String>,
        params: ShardFollowParams,
        store: Arc<CheckpointStore>,
        resumed_checkpoint: SeqNo,
    ) -> Self {
        let (state_tx, _) = watch::channel(TaskState::Started);
        let task = Self {
            task_id: task_id.into(),
            params,
            store,
            state_tx,
            persisted: AtomicI64::new(resumed_checkpoint),
        };
        metrics::set_task_state(&task.follower_label(), "Started");
        task
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn params(&self) -> &ShardFollowParams {
        &self.params
    }

    pub fn state(&self) -> TaskState {
        self.state_tx.borrow().clone()
    }

    /// Last processed checkpoint this task knows to be durable.
    pub fn processed_checkpoint(&self) -> SeqNo {
        self.persisted.load(Ordering::SeqCst)
    }

    /// Request cancellation. Takes effect at the start of the next cycle.
    pub fn cancel(&self) {
        if self.transition(TaskState::Cancelled) {
            info!(task_id = %self.task_id, "Follow task cancelled");
        }
    }

    /// Wait until the task is cancelled or failed.
    pub async fn wait_terminated(&self) -> TaskState {
        let mut rx = self.state_tx.subscribe();
        let state = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => state.clone(),
            // Sender lives in self, so this is unreachable while we're borrowed
            Err(_) => self.state(),
        };
        state
    }

    fn follower_label(&self) -> String {
        self.params.follower_shard.to_string()
    }

    /// Move to a terminal state unless already terminal.
    fn transition(&self, next: TaskState) -> bool {
        let name = next.name();
        let changed = self.state_tx.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            metrics::set_task_state(&self.follower_label(), name);
        }
        changed
    }
}

impl TaskHandle for FollowTask {
    fn is_runnable(&self) -> bool {
        matches!(*self.state_tx.borrow(), TaskState::Started)
    }

    fn mark_failed(&self, error: &FollowError) {
        if self.transition(TaskState::Failed {
            reason: error.to_string(),
        }) {
            error!(
                task_id = %self.task_id,
                kind = error.kind(),
                consistency_violation = error.is_consistency_violation(),
                error = %error,
                "Follow task failed"
            );
            metrics::record_failure(&self.follower_label(), error.kind());
        }
    }

    fn persist_checkpoint(&self, status: ShardFollowStatus) -> TaskFuture<'_, ()> {
        Box::pin(async move {
            let checkpoint = status.processed_global_checkpoint;
            let current = self.processed_checkpoint();
            if checkpoint < current {
                return Err(FollowError::InvalidState {
                    expected: format!("checkpoint >= {}", current),
                    actual: checkpoint.to_string(),
                });
            }

            let result = self.store.save(&self.task_id, &self.params, checkpoint).await;
            metrics::record_checkpoint_persist(&self.follower_label(), result.is_ok());
            result?;

            self.persisted.store(checkpoint, Ordering::SeqCst);
            metrics::set_processed_checkpoint(&self.follower_label(), checkpoint);
            Ok(())
        })
    }
}
