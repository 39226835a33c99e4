//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

use proptest::prelude::*;
use shard_follow::follow::{partition, CheckpointRange};
use shard_follow::shard::{SeqNo, ShardFollowStatus, NO_OPS_PERFORMED};

fn range_and_batch() -> impl Strategy<Value = (SeqNo, SeqNo, u64)> {
    (NO_OPS_PERFORMED..100_000i64, 0i64..20_000, 1u64..5_000)
        .prop_map(|(from, span, batch)| (from, from + span, batch))
}

// =============================================================================
// Partition Properties
// =============================================================================

proptest! {
    /// Chunks start at `from`, end at `to`, and each picks up right after the previous one.
    #[test]
    fn partition_covers_range_contiguously((from, to, batch) in range_and_batch()) {
        let chunks = partition(CheckpointRange::new(from, to).unwrap(), batch).unwrap();

        if from == to {
            prop_assert!(chunks.is_empty());
        } else {
            prop_assert_eq!(chunks.first().unwrap().from, from);
            prop_assert_eq!(chunks.last().unwrap().to, to);
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[1].from, pair[0].to + 1);
            }
        }
    }

    /// No chunk spans more than the batch size, and bounds are ordered.
    #[test]
    fn partition_chunks_are_bounded((from, to, batch) in range_and_batch()) {
        let chunks = partition(CheckpointRange::new(from, to).unwrap(), batch).unwrap();

        for chunk in &chunks {
            prop_assert!(chunk.from <= chunk.to);
            prop_assert!(chunk.len() <= batch);
        }
    }

    /// Chunk count is the ceiling of span over batch size.
    #[test]
    fn partition_chunk_count((from, to, batch) in range_and_batch()) {
        let chunks = partition(CheckpointRange::new(from, to).unwrap(), batch).unwrap();
        let span = (to - from) as u64;
        prop_assert_eq!(chunks.len() as u64, span.div_ceil(batch));
    }

    /// Only the first chunk reuses its lower bound; the rest start one past a step boundary.
    #[test]
    fn partition_boundary_rule((from, to, batch) in range_and_batch()) {
        let chunks = partition(CheckpointRange::new(from, to).unwrap(), batch).unwrap();

        for (n, chunk) in chunks.iter().enumerate() {
            let step_start = from + (n as i64) * (batch as i64);
            let expected_from = if n == 0 { step_start } else { step_start + 1 };
            prop_assert_eq!(chunk.from, expected_from);
            prop_assert_eq!(chunk.to, (step_start + batch as i64).min(to));
        }
    }

    /// Ranges with `from > to` are always rejected.
    #[test]
    fn inverted_range_rejected(from in -1i64..1_000_000, gap in 1i64..1_000) {
        prop_assert!(CheckpointRange::new(from + gap, from).is_err());
    }

    /// Resuming never moves below the no-ops sentinel.
    #[test]
    fn resume_checkpoint_round_trips(checkpoint in NO_OPS_PERFORMED..i64::MAX) {
        let status = ShardFollowStatus::new(checkpoint);
        prop_assert_eq!(ShardFollowStatus::resume_checkpoint(Some(&status)), checkpoint);
    }
}

#[test]
fn resume_without_status_starts_from_sentinel() {
    assert_eq!(ShardFollowStatus::resume_checkpoint(None), NO_OPS_PERFORMED);
}
