//! The stopwatch scope: an acquisition object that commits elapsed ticks
//! and a call count to its counter on release (spec §4.6).

use std::time::{Duration, Instant};

use crate::clock;
use crate::collection::Collection;

/// A live timing scope bound to one stopwatch-typed counter.
///
/// Captures a monotonic tick at creation. On drop — covering every exit
/// path, including an unwinding panic in the enclosing scope — it adds the
/// elapsed ticks to the counter's duration matrix and unconditionally adds
/// one to its count matrix, even if the elapsed time rounds to zero ticks.
///
/// This type cannot be [`Clone`]d or re-acquired; it has no public
/// constructor outside this crate, and releases exactly once, when dropped.
///
/// # Examples
///
/// ```
/// use shard_tally::{counter_schema, TypedCollection};
///
/// counter_schema! {
///     pub enum Phase {
///         Handling => Stopwatch,
///     }
/// }
///
/// let c = TypedCollection::<Phase>::new(None).unwrap();
/// {
///     let _scope = c.start(Phase::Handling).unwrap();
///     // ... do work ...
/// } // elapsed ticks + one call committed here, on drop
/// assert_eq!(c.value(Phase::Handling), 1);
/// ```
pub struct StopwatchScope<'a> {
    collection: &'a Collection,
    column: u16,
    name: &'static str,
    start: Instant,
}

impl<'a> StopwatchScope<'a> {
    pub(crate) fn new(collection: &'a Collection, column: u16, name: &'static str) -> Self {
        Self {
            collection,
            column,
            name,
            start: Instant::now(),
        }
    }

    /// Reads the elapsed time since acquisition without releasing the scope.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    /// use std::time::Duration;
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Handling => Stopwatch,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// let scope = c.start(Phase::Handling).unwrap();
    /// std::thread::sleep(Duration::from_millis(2));
    /// assert!(scope.elapsed_so_far() >= Duration::from_millis(2));
    /// // Nothing committed yet: the scope only releases on drop.
    /// assert_eq!(c.value(Phase::Handling), 0);
    /// ```
    pub fn elapsed_so_far(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StopwatchScope<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let ticks = clock::duration_to_ticks(elapsed);
        if ticks > 0 {
            // Best-effort: Drop cannot propagate a Result. An overflowing
            // duration add is exceedingly unlikely and, per spec §5's
            // propagation policy, never rolled back even when it can be
            // reported synchronously.
            let _ = self.collection.add_duration(self.column, ticks, Some(self.name));
        }
        let _ = self.collection.add_count(self.column, 1, Some(self.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_adds_one_call_even_at_zero_elapsed() {
        let c = Collection::new(1, None);
        {
            let _scope = StopwatchScope::new(&c, 0, "x");
        }
        assert_eq!(c.read_count(0), 1);
    }

    #[test]
    fn release_records_elapsed_ticks() {
        use std::thread;

        let c = Collection::new(1, None);
        {
            let _scope = StopwatchScope::new(&c, 0, "x");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(c.read_count(0), 1);
        assert!(c.read_duration(0) > 0);
    }

    #[test]
    fn elapsed_so_far_does_not_release() {
        let c = Collection::new(1, None);
        let scope = StopwatchScope::new(&c, 0, "x");
        let _ = scope.elapsed_so_far();
        assert_eq!(c.read_count(0), 0);
        drop(scope);
        assert_eq!(c.read_count(0), 1);
    }
}
