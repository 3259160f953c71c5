use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::accumulator::Accumulator;
use crate::worker::PartialResult;

/// Combined statistics for every key observed, ordered by key
pub type FinalResult<'a> = BTreeMap<&'a str, Accumulator>;

/// Reduces per-partition results into one map.
///
/// Keys seen by a single partition are moved through untouched; keys seen by several are
/// combined. The order of `partials` only affects floating-point rounding of the mean.
pub fn merge<'a, I>(partials: I) -> FinalResult<'a>
where
    I: IntoIterator<Item = PartialResult<'a>>,
{
    partials
        .into_iter()
        .fold(FinalResult::new(), |mut merged, partial| {
            for (key, acc) in partial.stats {
                if acc.is_empty() {
                    continue;
                }
                match merged.entry(key) {
                    Entry::Occupied(mut e) => e.get_mut().combine(&acc),
                    Entry::Vacant(e) => {
                        e.insert(acc);
                    }
                }
            }
            merged
        })
}
