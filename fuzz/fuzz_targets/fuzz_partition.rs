//! Fuzz target for checkpoint range partitioning.
//!
//! `partition` must never panic or overflow, and whatever it returns must
//! tile the range exactly.

#![no_main]

use libfuzzer_sys::fuzz_target;
use shard_follow::follow::{partition, CheckpointRange};

fuzz_target!(|data: (i64, i64, u64)| {
    let (a, b, batch) = data;
    let (from, to) = if a <= b { (a, b) } else { (b, a) };
    // Keep the chunk count small enough to allocate.
    if batch != 0 && to.abs_diff(from) / batch > 1 << 16 {
        return;
    }
    let Ok(range) = CheckpointRange::new(from, to) else {
        return;
    };

    let Ok(chunks) = partition(range, batch) else {
        assert_eq!(batch, 0);
        return;
    };

    if from == to {
        assert!(chunks.is_empty());
        return;
    }
    assert_eq!(chunks.first().map(|c| c.from), Some(from));
    assert_eq!(chunks.last().map(|c| c.to), Some(to));
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].from, pair[0].to + 1);
    }
    for chunk in &chunks {
        assert!(chunk.from <= chunk.to);
        assert!(chunk.len() <= batch);
    }
});
