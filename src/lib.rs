//! # Shard Follow
//!
//! Continuous, checkpoint-bounded replication of one leader shard's operation
//! log into one follower shard.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                              shard-follow                                │
//! │                                                                          │
//! │  ┌───────────────┐   range   ┌──────────────────┐  chunk  ┌───────────┐  │
//! │  │ ShardFollower │──────────►│ ChunksCoordinator│────────►│  Chunk    │  │
//! │  │ (controller)  │◄──────────│ (ordered queue)  │◄────────│ Processor │  │
//! │  └───────────────┘  outcome  └──────────────────┘ outcome └───────────┘  │
//! │     │        │                                         fetch │  │ apply  │
//! │     │        ▼                                               ▼  ▼        │
//! │     │  ┌─────────────┐                              leader    follower   │
//! │     │  │ TaskHandle  │ persist checkpoint / failed                       │
//! │     │  └─────────────┘                                                   │
//! │     ▼                                                                    │
//! │  leader global checkpoint (poll every retry_delay when caught up)        │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shard_follow::{
//!     NoOpFollower, ShardFollowConfig, ShardFollowLauncher, ShardId, StaticRoutingTable,
//! };
//! # use shard_follow::remote::{BoxFuture, LeaderClient};
//! # use shard_follow::shard::{Operation, SeqNo};
//! # struct MyLeader;
//! # impl LeaderClient for MyLeader {
//! #     fn global_checkpoint(&self, _: &ShardId) -> BoxFuture<'_, Option<SeqNo>> { Box::pin(async { Ok(Some(0)) }) }
//! #     fn fetch_operations(&self, _: &ShardId, _: SeqNo, _: SeqNo) -> BoxFuture<'_, Vec<Operation>> { Box::pin(async { Ok(vec![]) }) }
//! # }
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> shard_follow::Result<()> {
//!     let config = ShardFollowConfig::default();
//!     let leader_shard = ShardId::new("leader-index", 0);
//!     let follower_shard = ShardId::new("follower-index", 0);
//!
//!     let launcher = ShardFollowLauncher::new(
//!         config.clone(),
//!         Arc::new(MyLeader),
//!         Arc::new(NoOpFollower),
//!         Arc::new(StaticRoutingTable::with_started([leader_shard.clone(), follower_shard.clone()])),
//!     )
//!     .await?;
//!
//!     let handle = launcher
//!         .launch("follow-0", config.params(leader_shard, follower_shard))
//!         .await?;
//!     handle.cancel();
//!     let outcome = handle.join().await?;
//!     println!("stopped at {}", outcome.processed_checkpoint());
//!     Ok(())
//! }
//! ```

pub mod checkpoint_store;
pub mod config;
pub mod error;
pub mod executor;
pub mod follow;
pub mod launcher;
pub mod metrics;
pub mod remote;
pub mod shard;
pub mod task;
pub mod topology;

// Re-exports for convenience
pub use checkpoint_store::{CheckpointStore, ShardFollowRecord};
pub use config::{CheckpointStoreConfig, ExecutorConfig, ShardFollowConfig};
pub use error::{FollowError, Result};
pub use executor::ReplicationExecutor;
pub use follow::{CycleOutcome, ReplicationOutcome, ShardFollower};
pub use launcher::{ShardFollowHandle, ShardFollowLauncher};
pub use remote::{FollowerClient, LeaderClient, NoOpFollower, RemoteError};
pub use shard::{Operation, SeqNo, ShardFollowParams, ShardFollowStatus, ShardId, NO_OPS_PERFORMED};
pub use task::{FollowTask, TaskHandle, TaskState};
pub use topology::{RoutingTable, StaticRoutingTable};
