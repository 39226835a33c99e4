//! The replication executor: where follower applies run.
//!
//! Applying a chunk can be expensive local work, so it is never run inline on
//! the task that completed the leader fetch. Instead it is redispatched with
//! [`tokio::runtime::Handle::spawn`] onto the runtime provisioned for
//! replication, and gated by a semaphore so all follow units together never
//! have more than `max_concurrent` applies in flight.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> shard_follow::Result<()> {
//! use shard_follow::executor::ReplicationExecutor;
//!
//! let executor = ReplicationExecutor::current(4)?;
//! let applied = executor.execute(async { Ok(10usize) }).await?;
//! assert_eq!(applied, 10);
//! # Ok(())
//! # }
//! ```

use crate::error::{FollowError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

/// Runtime handle plus a fixed number of apply slots.
#[derive(Debug, Clone)]
pub struct ReplicationExecutor {
    handle: Handle,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ReplicationExecutor {
    /// Create an executor that spawns onto `handle`.
    pub fn new(handle: Handle, max_concurrent: usize) -> Self {
        Self {
            handle,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Create an executor on the runtime the caller is running in.
    pub fn current(max_concurrent: usize) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| FollowError::Executor(format!("no tokio runtime: {}", e)))?;
        Ok(Self::new(handle, max_concurrent))
    }

    /// Run `work` on the replication runtime and wait for its result.
    ///
    /// Waits for a free slot first. Fails if the executor was closed or the
    /// spawned task panicked or was cancelled.
    pub async fn execute<Fut, T>(&self, work: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| FollowError::Executor("replication executor is closed".to_string()))?;
        crate::metrics::set_apply_slots_available(self.slots.available_permits());

        let join = self.handle.spawn(async move {
            let result = work.await;
            drop(permit);
            result
        });

        match join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(FollowError::Executor("apply task panicked".to_string())),
            Err(e) => Err(FollowError::Executor(format!("apply task did not complete: {}", e))),
        }
    }

    /// Stop handing out slots. Pending and future `execute` calls fail.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Get the number of free apply slots.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_returns_result() {
        let executor = ReplicationExecutor::current(2).unwrap();
        let value = executor.execute(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(executor.available(), 2);
    }

    #[tokio::test]
    async fn test_execute_propagates_error() {
        let executor = ReplicationExecutor::current(1).unwrap();
        let result: Result<()> = executor
            .execute(async { Err(FollowError::Executor("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(executor.available(), 1);
    }

    #[tokio::test]
    async fn test_execute_panic_is_error() {
        let executor = ReplicationExecutor::current(1).unwrap();
        let result: Result<()> = executor
            .execute(async {
                panic!("apply blew up");
            })
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("panicked"));
        // Slot is released even though the task panicked
        assert_eq!(executor.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_executor_rejects_work() {
        let executor = ReplicationExecutor::current(1).unwrap();
        executor.close();
        assert!(executor.is_closed());
        let result = executor.execute(async { Ok(()) }).await;
        assert!(matches!(result, Err(FollowError::Executor(_))));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = ReplicationExecutor::current(2).unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let executor = executor.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                executor
                    .execute(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(executor.max_concurrent(), 2);
    }

    #[test]
    fn test_current_outside_runtime_fails() {
        assert!(ReplicationExecutor::current(1).is_err());
    }
}
