//! Millisecond-clock identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Hands out strictly increasing identifiers based on wall-clock millis.
///
/// Two calls within the same millisecond still get distinct values, and a
/// `floor` lets callers skip past ids already present in stored data.
/// Returns `None` once the id space is used up.
#[derive(Debug, Default)]
pub struct IdClock {
    last: AtomicU64,
}

impl IdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, floor: u64) -> Option<u64> {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev.checked_add(1)?).max(floor);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Some(candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Smallest value strictly above every numeric id in `ids`, or `None` when
/// one of them is already `u64::MAX`.
pub fn floor_above<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Option<u64> {
    match ids
        .filter_map(|id| id.strip_prefix(prefix)?.parse::<u64>().ok())
        .max()
    {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}
