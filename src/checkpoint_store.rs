// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable task status for follow tasks.
//!
//! Stores `{ leader shard, follower shard, batch size, processed global
//! checkpoint }` per task id in SQLite, so a restarted task resumes exactly
//! where the last successful cycle left off.
//!
//! # Write-Through
//!
//! A processed checkpoint is on disk before the next cycle starts.
//! [`CheckpointStore::save()`] writes synchronously and only updates the
//! cache after the row is committed.
//!
//! # Monotonic Upsert
//!
//! The upsert only replaces a row when the new checkpoint is not lower than
//! the stored one. An attempt to move a task's checkpoint backwards is
//! rejected with [`FollowError::InvalidState`].
//!
//! # SQLite Busy Handling
//!
//! SQLITE_BUSY/SQLITE_LOCKED are retried with exponential backoff
//! (up to 5 attempts); any other error is returned immediately.

use crate::config::CheckpointStoreConfig;
use crate::error::{FollowError, Result};
use crate::shard::{SeqNo, ShardFollowParams, ShardFollowStatus, ShardId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const SQLITE_RETRY_MAX_ATTEMPTS: u32 = 5;
const SQLITE_RETRY_BASE_DELAY_MS: u64 = 10;
const SQLITE_RETRY_MAX_DELAY_MS: u64 = 500;

const IN_MEMORY_PATH: &str = ":memory:";

/// Check if an error is a retryable SQLite busy/locked error
fn is_sqlite_busy_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: SQLITE_BUSY = 5, SQLITE_LOCKED = 6
            if let Some(code) = db_err.code() {
                return code == "5" || code == "6";
            }
            let msg = db_err.message().to_lowercase();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
        _ => false,
    }
}

/// Execute a database operation with retry on SQLITE_BUSY/SQLITE_LOCKED
async fn execute_with_retry<F, Fut, T>(operation_name: &str, mut f: F) -> std::result::Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    let mut delay_ms = SQLITE_RETRY_BASE_DELAY_MS;

    loop {
        attempts += 1;
        match f().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(
                        operation = operation_name,
                        attempts,
                        "SQLite operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) if is_sqlite_busy_error(&e) && attempts < SQLITE_RETRY_MAX_ATTEMPTS => {
                warn!(
                    operation = operation_name,
                    attempts,
                    max_attempts = SQLITE_RETRY_MAX_ATTEMPTS,
                    delay_ms,
                    "SQLite busy, retrying"
                );
                crate::metrics::record_store_retry(operation_name);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(SQLITE_RETRY_MAX_DELAY_MS);
            }
            Err(e) => {
                if is_sqlite_busy_error(&e) {
                    warn!(
                        operation = operation_name,
                        attempts,
                        "SQLite busy, max retries exceeded"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Persisted state of one follow task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFollowRecord {
    pub task_id: String,
    pub params: ShardFollowParams,
    pub status: ShardFollowStatus,
    /// Unix millis of the last write.
    pub updated_at: i64,
}

type RecordRow = (String, String, i64, String, i64, i64, i64, i64);

fn record_from_row(row: RecordRow) -> Result<ShardFollowRecord> {
    let (task_id, leader_index, leader_id, follower_index, follower_id, batch_size, checkpoint, updated_at) = row;
    let shard_id = |index: String, id: i64| -> Result<ShardId> {
        u32::try_from(id)
            .map(|id| ShardId::new(index, id))
            .map_err(|_| FollowError::Config(format!("stored shard id {} out of range", id)))
    };
    Ok(ShardFollowRecord {
        params: ShardFollowParams {
            leader_shard: shard_id(leader_index, leader_id)?,
            follower_shard: shard_id(follower_index, follower_id)?,
            batch_size: u64::try_from(batch_size)
                .map_err(|_| FollowError::Config(format!("stored batch size {} is negative", batch_size)))?,
        },
        status: ShardFollowStatus::new(checkpoint),
        updated_at,
        task_id,
    })
}

/// SQLite-backed store of follow task status.
pub struct CheckpointStore {
    pool: SqlitePool,
    /// Committed records, keyed by task id
    cache: RwLock<HashMap<String, ShardFollowRecord>>,
    path: String,
}

impl CheckpointStore {
    /// Open (or create) a store at the given path with WAL enabled.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let config = CheckpointStoreConfig {
            sqlite_path: path.as_ref().to_string_lossy().to_string(),
            wal_mode: true,
        };
        Self::from_config(&config).await
    }

    /// Open (or create) a store from configuration.
    ///
    /// `":memory:"` opens a private in-memory database on a single connection.
    pub async fn from_config(config: &CheckpointStoreConfig) -> Result<Self> {
        let path_str = config.sqlite_path.clone();
        info!(path = %path_str, "Initializing checkpoint store");

        let in_memory = path_str == IN_MEMORY_PATH;
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", path_str)
        };

        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| FollowError::Config(format!("Invalid SQLite path: {}", e)))?
            .synchronous(sqlx::sqlite::SqliteSynchronous::Full)
            .create_if_missing(true);
        if config.wal_mode && !in_memory {
            options = options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        }

        // An in-memory database lives as long as its one connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(2)
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shard_follow_tasks (
                task_id TEXT PRIMARY KEY,
                leader_index TEXT NOT NULL,
                leader_shard INTEGER NOT NULL,
                follower_index TEXT NOT NULL,
                follower_shard INTEGER NOT NULL,
                batch_size INTEGER NOT NULL,
                processed_global_checkpoint INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT task_id, leader_index, leader_shard, follower_index, follower_shard, \
             batch_size, processed_global_checkpoint, updated_at FROM shard_follow_tasks",
        )
        .fetch_all(&pool)
        .await?;

        let mut cache = HashMap::new();
        for row in rows {
            let record = record_from_row(row)?;
            debug!(
                task_id = %record.task_id,
                checkpoint = record.status.processed_global_checkpoint,
                "Loaded task status from disk"
            );
            cache.insert(record.task_id.clone(), record);
        }

        if !cache.is_empty() {
            info!(count = cache.len(), "Restored follow task status from previous run");
        }

        Ok(Self {
            pool,
            cache: RwLock::new(cache),
            path: path_str,
        })
    }

    /// Get the stored record for a task.
    ///
    /// Returns `None` for a task that never completed a cycle.
    pub async fn load(&self, task_id: &str) -> Option<ShardFollowRecord> {
        self.cache.read().await.get(task_id).cloned()
    }

    /// Durably record `checkpoint` as the processed checkpoint of a task.
    ///
    /// Fails with [`FollowError::InvalidState`] if the stored checkpoint is
    /// already higher.
    pub async fn save(&self, task_id: &str, params: &ShardFollowParams, checkpoint: SeqNo) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let pool = &self.pool;
        let batch_size = i64::try_from(params.batch_size)
            .map_err(|_| FollowError::Config(format!("batch size {} too large", params.batch_size)))?;

        let result = execute_with_retry("checkpoint_save", || async {
            sqlx::query(
                r#"
                INSERT INTO shard_follow_tasks (
                    task_id, leader_index, leader_shard, follower_index, follower_shard,
                    batch_size, processed_global_checkpoint, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(task_id) DO UPDATE SET
                    leader_index = excluded.leader_index,
                    leader_shard = excluded.leader_shard,
                    follower_index = excluded.follower_index,
                    follower_shard = excluded.follower_shard,
                    batch_size = excluded.batch_size,
                    processed_global_checkpoint = excluded.processed_global_checkpoint,
                    updated_at = excluded.updated_at
                WHERE excluded.processed_global_checkpoint >= shard_follow_tasks.processed_global_checkpoint
                "#,
            )
            .bind(task_id)
            .bind(&params.leader_shard.index)
            .bind(i64::from(params.leader_shard.id))
            .bind(&params.follower_shard.index)
            .bind(i64::from(params.follower_shard.id))
            .bind(batch_size)
            .bind(checkpoint)
            .bind(now)
            .execute(pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            let stored = self
                .load(task_id)
                .await
                .map(|r| r.status.processed_global_checkpoint.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(FollowError::InvalidState {
                expected: format!("checkpoint >= {}", stored),
                actual: checkpoint.to_string(),
            });
        }

        self.cache.write().await.insert(
            task_id.to_string(),
            ShardFollowRecord {
                task_id: task_id.to_string(),
                params: params.clone(),
                status: ShardFollowStatus::new(checkpoint),
                updated_at: now,
            },
        );

        debug!(task_id = %task_id, checkpoint, "Persisted processed checkpoint");
        Ok(())
    }

    /// Get database path (for diagnostics).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Force flush WAL to main database (for clean shutdown).
    pub async fn checkpoint_wal(&self) -> Result<()> {
        let pool = &self.pool;

        execute_with_retry("checkpoint_wal", || async {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)").execute(pool).await
        })
        .await?;

        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint the WAL and close the pool.
    pub async fn close(&self) {
        if let Err(e) = self.checkpoint_wal().await {
            warn!(error = %e, "Failed to checkpoint WAL on close");
        }
        self.pool.close().await;
        info!("Checkpoint store closed");
    }
}
