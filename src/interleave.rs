//! Round-robin merging of run-grouped sequences.
//!
//! Input is a sequence whose equal keys are contiguous, e.g. `[a1, a2, a3, b1, b2, c1]`.
//! Every item gets a rank, its position inside its run, and the output lists all rank 0
//! items, then all rank 1 items and so on: `[a1, b1, c1, a2, b2, a3]`. Within a rank, runs
//! keep their original order, and once a run is exhausted it stops contributing, so the
//! tail of the output is whatever runs are still alive.
//!
//! The merge never sorts. One pass buckets the items by rank, one pass flattens the buckets.

use std::collections::HashSet;
use std::hash::Hash;

use crate::FeedError;

/// Interleaves the runs of `items`, comparing keys with `PartialEq`.
pub fn interleave_runs<T, K, F>(items: Vec<T>, key_of: F) -> Vec<T>
where
    F: Fn(&T) -> K,
    K: PartialEq,
{
    interleave_runs_by(items, key_of, |a, b| a == b)
}

/// Interleaves the runs of `items`.
///
/// Two neighbouring items belong to the same run when `same_run` returns true for their
/// keys, which lets the caller pick a looser equality than `PartialEq` (case folding,
/// tolerances). Items are expected to be grouped already; a key that shows up again after
/// its run ended simply starts a new run.
pub fn interleave_runs_by<T, K, F, E>(items: Vec<T>, key_of: F, same_run: E) -> Vec<T>
where
    F: Fn(&T) -> K,
    E: Fn(&K, &K) -> bool,
{
    let len = items.len();
    let mut buckets: Vec<Vec<T>> = Vec::new();
    let mut previous: Option<K> = None;
    let mut rank = 0;

    for item in items {
        let key = key_of(&item);
        rank = match &previous {
            Some(prev) if same_run(prev, &key) => rank + 1,
            _ => 0,
        };
        previous = Some(key);

        if rank == buckets.len() {
            buckets.push(Vec::new());
        }
        buckets[rank].push(item);
    }

    let mut merged = Vec::with_capacity(len);
    for bucket in buckets {
        merged.extend(bucket);
    }
    merged
}

/// Like [`interleave_runs`], but rejects input whose runs are not contiguous.
pub fn interleave_runs_checked<T, K, F>(items: Vec<T>, key_of: F) -> Result<Vec<T>, FeedError>
where
    F: Fn(&T) -> K,
    K: Eq + Hash,
{
    let mut closed: HashSet<K> = HashSet::new();
    let mut previous: Option<K> = None;

    for (index, item) in items.iter().enumerate() {
        let key = key_of(item);
        if previous.as_ref() == Some(&key) {
            continue;
        }
        if closed.contains(&key) {
            return Err(FeedError::invalid(format!(
                "item {index} continues a run that already ended"
            )));
        }
        if let Some(prev) = previous.replace(key) {
            closed.insert(prev);
        }
    }

    Ok(interleave_runs(items, key_of))
}
