//! Folds a typed collection into a flat `name -> value` map for reporting
//! (spec §4.7).

use std::collections::BTreeMap;

use crate::schema::{CounterKind, CounterSchema};
use crate::typed::TypedCollection;

/// A flat, sorted `name -> value` view of a collection's counters.
///
/// A numeric counter contributes its integer value under its own name. A
/// stopwatch counter contributes only its accumulated duration, truncated
/// to whole milliseconds, under its name with an `"Ms"` suffix appended —
/// its call count is not included here (use [`TypedCollection::value`]).
pub type Statistics = BTreeMap<String, i64>;

pub(crate) fn fold<E: CounterSchema>(collection: &TypedCollection<E>, prefix: &str) -> Statistics {
    let mut stats = Statistics::new();
    for (handle, name) in collection.enumerate() {
        let key = if prefix.trim().is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match handle.kind() {
            CounterKind::Numeric => {
                stats.insert(key, handle.value());
            }
            CounterKind::Stopwatch => {
                let millis = handle.elapsed().as_millis().min(i64::MAX as u128) as i64;
                stats.insert(format!("{key}Ms"), millis);
            }
        }
    }
    stats
}
