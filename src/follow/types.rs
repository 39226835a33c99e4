//! Outcome types for the follow loop.
//!
//! # Cycle Flow
//!
//! ```text
//!                  is_runnable()?
//!  run_cycle ──────── no ──────────────→ Cancelled
//!      │ yes
//!      ↓
//!  leader checkpoint == follow checkpoint ──→ CaughtUp  (poll again after delay)
//!      │
//!      ↓ leader checkpoint > follow checkpoint
//!  chunks applied + checkpoint persisted ──→ Advanced  (next cycle immediately)
//!      │
//!      ↓ any error
//!    Err(FollowError)                      → Failed    (unit stops)
//! ```

use crate::error::FollowError;
use crate::shard::SeqNo;

/// Result of one successful (non-failing) follow cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The task is no longer runnable; nothing was done.
    Cancelled,

    /// Leader and follower are at the same checkpoint.
    CaughtUp { checkpoint: SeqNo },

    /// The range `(from, to]` was applied and `to` persisted.
    Advanced {
        from: SeqNo,
        to: SeqNo,
        chunks: usize,
        operations: usize,
    },
}

impl CycleOutcome {
    /// Label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Cancelled => "cancelled",
            CycleOutcome::CaughtUp { .. } => "caught_up",
            CycleOutcome::Advanced { .. } => "advanced",
        }
    }
}

/// How a replication unit ended.
///
/// Owned by the follow controller; the failure has already been reported to
/// the task handle by the time this is returned.
#[derive(Debug)]
pub enum ReplicationOutcome {
    /// Stopped because the task was no longer runnable.
    Cancelled { processed_checkpoint: SeqNo },

    /// Stopped by a terminal error.
    Failed {
        processed_checkpoint: SeqNo,
        error: FollowError,
    },
}

impl ReplicationOutcome {
    /// Last checkpoint persisted before the unit stopped.
    pub fn processed_checkpoint(&self) -> SeqNo {
        match self {
            ReplicationOutcome::Cancelled { processed_checkpoint }
            | ReplicationOutcome::Failed { processed_checkpoint, .. } => *processed_checkpoint,
        }
    }

    pub fn error(&self) -> Option<&FollowError> {
        match self {
            ReplicationOutcome::Failed { error, .. } => Some(error),
            ReplicationOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReplicationOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_outcome_labels() {
        assert_eq!(CycleOutcome::Cancelled.label(), "cancelled");
        assert_eq!(CycleOutcome::CaughtUp { checkpoint: 3 }.label(), "caught_up");
        assert_eq!(
            CycleOutcome::Advanced {
                from: -1,
                to: 10,
                chunks: 1,
                operations: 11
            }
            .label(),
            "advanced"
        );
    }

    #[test]
    fn test_replication_outcome_accessors() {
        let cancelled = ReplicationOutcome::Cancelled {
            processed_checkpoint: 5,
        };
        assert!(!cancelled.is_failed());
        assert!(cancelled.error().is_none());
        assert_eq!(cancelled.processed_checkpoint(), 5);

        let failed = ReplicationOutcome::Failed {
            processed_checkpoint: 8,
            error: FollowError::Executor("closed".into()),
        };
        assert!(failed.is_failed());
        assert_eq!(failed.error().unwrap().kind(), "executor");
        assert_eq!(failed.processed_checkpoint(), 8);
    }
}
