//! Configuration for shard following.
//!
//! Configuration is passed to [`ShardFollowLauncher::new()`](crate::ShardFollowLauncher::new)
//! and can be constructed programmatically or deserialized from YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use shard_follow::config::ShardFollowConfig;
//!
//! let config = ShardFollowConfig {
//!     retry_delay: "250ms".into(),
//!     ..Default::default()
//! };
//! assert_eq!(config.retry_delay_duration().as_millis(), 250);
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ShardFollowConfig
//! ├── default_batch_size: u64        # Max sequence numbers per chunk
//! ├── retry_delay: String            # Poll delay when caught up
//! ├── executor: ExecutorConfig       # Apply slots shared by all units
//! └── checkpoint_store: CheckpointStoreConfig  # SQLite task status
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! default_batch_size: 1024
//! retry_delay: "500ms"
//! executor:
//!   max_concurrent_applies: 4
//! checkpoint_store:
//!   sqlite_path: "/var/lib/app/shard_follow.db"
//! ```

use crate::error::{FollowError, Result};
use crate::shard::{ShardFollowParams, ShardId, DEFAULT_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `ShardFollowLauncher::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardFollowConfig {
    /// Batch size for tasks created through [`params()`](Self::params).
    #[serde(default = "default_batch_size")]
    pub default_batch_size: u64,

    /// How long to wait before polling the leader again when caught up.
    /// Duration string (e.g. "500ms"), parsed with humantime.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,

    /// Replication executor settings.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Checkpoint persistence settings.
    #[serde(default)]
    pub checkpoint_store: CheckpointStoreConfig,
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

fn default_retry_delay() -> String {
    "500ms".to_string()
}

impl Default for ShardFollowConfig {
    fn default() -> Self {
        Self {
            default_batch_size: DEFAULT_BATCH_SIZE,
            retry_delay: default_retry_delay(),
            executor: ExecutorConfig::default(),
            checkpoint_store: CheckpointStoreConfig::default(),
        }
    }
}

impl ShardFollowConfig {
    /// Create a config for testing: in-memory store, short poll delay.
    pub fn for_testing() -> Self {
        Self {
            retry_delay: "10ms".to_string(),
            checkpoint_store: CheckpointStoreConfig::in_memory(),
            ..Default::default()
        }
    }

    /// Parse the retry delay, falling back to 500ms when invalid.
    pub fn retry_delay_duration(&self) -> Duration {
        humantime::parse_duration(&self.retry_delay).unwrap_or(DEFAULT_RETRY_DELAY)
    }

    /// Task parameters for a shard pair using the configured batch size.
    pub fn params(&self, leader_shard: ShardId, follower_shard: ShardId) -> ShardFollowParams {
        ShardFollowParams::new(leader_shard, follower_shard).with_batch_size(self.default_batch_size)
    }

    /// Reject values the follow loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_batch_size == 0 {
            return Err(FollowError::Config("default_batch_size must be positive".to_string()));
        }
        if self.executor.max_concurrent_applies == 0 {
            return Err(FollowError::Config(
                "executor.max_concurrent_applies must be positive".to_string(),
            ));
        }
        if self.checkpoint_store.sqlite_path.is_empty() {
            return Err(FollowError::Config("checkpoint_store.sqlite_path is empty".to_string()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ExecutorConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// Replication executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum bulk applies in flight across all follow units.
    #[serde(default = "default_max_concurrent_applies")]
    pub max_concurrent_applies: usize,
}

fn default_max_concurrent_applies() -> usize {
    4
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_applies: 4,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CheckpointStoreConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// Checkpoint persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointStoreConfig {
    /// Path to SQLite database for task status.
    pub sqlite_path: String,

    /// Whether to use WAL mode for SQLite (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CheckpointStoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "shard_follow_checkpoints.db".to_string(),
            wal_mode: true,
        }
    }
}

impl CheckpointStoreConfig {
    /// Create an in-memory config for testing.
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: ":memory:".to_string(),
            wal_mode: false,
        }
    }
}
