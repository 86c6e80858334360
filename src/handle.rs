//! The counter handle: a lightweight, type-erased accessor for one column
//! of a collection (spec §4.5).

use std::time::Duration;

use crate::clock;
use crate::collection::Collection;
use crate::error::{CounterError, Result};
use crate::schema::CounterKind;
use crate::stopwatch::StopwatchScope;

/// A borrowed accessor bound to one counter of a [`crate::typed::TypedCollection`].
///
/// Cheap to construct and to copy by value; it holds nothing but a
/// reference, a column index, and the metadata resolved from the schema
/// at construction time. Obtained through
/// [`TypedCollection::handle`](crate::typed::TypedCollection::handle) or
/// [`TypedCollection::enumerate`](crate::typed::TypedCollection::enumerate).
///
/// # Examples
///
/// ```
/// use shard_tally::{counter_schema, TypedCollection};
///
/// counter_schema! {
///     pub enum Phase {
///         Requests => Numeric,
///     }
/// }
///
/// let c = TypedCollection::<Phase>::new(None).unwrap();
/// let h = c.handle(Phase::Requests);
/// h.increment().unwrap();
/// h.add(4).unwrap();
/// assert_eq!(h.value(), 5);
/// ```
#[derive(Clone, Copy)]
pub struct CounterHandle<'a> {
    collection: &'a Collection,
    column: u16,
    kind: CounterKind,
    name: &'static str,
}

impl<'a> CounterHandle<'a> {
    pub(crate) fn new(collection: &'a Collection, column: u16, kind: CounterKind, name: &'static str) -> Self {
        Self {
            collection,
            column,
            kind,
            name,
        }
    }

    /// This counter's declared display name.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// assert_eq!(c.handle(Phase::Requests).name(), "Requests");
    /// ```
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is a plain numeric counter or a stopwatch counter.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, CounterKind, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Handling => Stopwatch,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// assert_eq!(c.handle(Phase::Handling).kind(), CounterKind::Stopwatch);
    /// ```
    pub fn kind(&self) -> CounterKind {
        self.kind
    }

    /// Adds one to the counter's integer value.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// let h = c.handle(Phase::Requests);
    /// h.increment().unwrap();
    /// h.increment().unwrap();
    /// assert_eq!(h.value(), 2);
    /// ```
    pub fn increment(&self) -> Result<()> {
        self.add(1)
    }

    /// Subtracts one from the counter's integer value.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// let h = c.handle(Phase::Requests);
    /// h.add(5).unwrap();
    /// h.decrement().unwrap();
    /// assert_eq!(h.value(), 4);
    /// ```
    pub fn decrement(&self) -> Result<()> {
        self.add(-1)
    }

    /// Adds an arbitrary signed delta to the counter's integer value.
    ///
    /// A delta of zero is a true no-op: no atomic write is issued and no
    /// parent propagation occurs.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// let h = c.handle(Phase::Requests);
    /// h.add(10).unwrap();
    /// h.add(-3).unwrap();
    /// assert_eq!(h.value(), 7);
    /// ```
    pub fn add(&self, delta: i64) -> Result<()> {
        self.collection.add_count(self.column, delta, Some(self.name))
    }

    /// The counter's current integer value, folded across every shard.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// assert_eq!(c.handle(Phase::Requests).value(), 0);
    /// ```
    pub fn value(&self) -> i64 {
        self.collection.read_count(self.column)
    }

    /// The counter's accumulated duration, folded across every shard.
    ///
    /// Meaningful for any counter: a plain numeric counter simply never has
    /// anything added to its duration matrix, so this reads zero.
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
    /// let h = c.handle(Phase::Handling);
    /// h.add_duration(Duration::from_millis(5)).unwrap();
    /// assert!(h.elapsed() >= Duration::from_millis(5));
    /// ```
    pub fn elapsed(&self) -> Duration {
        clock::ticks_to_duration(self.collection.read_duration(self.column))
    }

    /// Directly adds a duration to a stopwatch counter, without going
    /// through a [`StopwatchScope`].
    ///
    /// Returns [`CounterError::WrongCounterType`] if this handle's counter
    /// is not a stopwatch counter.
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
    /// let h = c.handle(Phase::Handling);
    /// h.add_duration(Duration::from_millis(100)).unwrap();
    /// assert_eq!(h.value(), 0); // add_duration does not touch the call count
    /// ```
    pub fn add_duration(&self, duration: Duration) -> Result<()> {
        self.require_stopwatch()?;
        self.collection
            .add_duration(self.column, clock::duration_to_ticks(duration), Some(self.name))
    }

    /// Acquires a [`StopwatchScope`] on this counter: it commits elapsed
    /// ticks and increments the call count when dropped.
    ///
    /// Returns [`CounterError::WrongCounterType`] if this handle's counter
    /// is not a stopwatch counter — `start()` on a plain numeric counter is
    /// rejected rather than silently accumulating a meaningless duration.
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
    /// let h = c.handle(Phase::Handling);
    /// {
    ///     let _scope = h.start().unwrap();
    /// } // committed on drop
    /// assert_eq!(h.value(), 1);
    /// ```
    pub fn start(&self) -> Result<StopwatchScope<'a>> {
        self.require_stopwatch()?;
        Ok(StopwatchScope::new(self.collection, self.column, self.name))
    }

    /// Runs `f` under a stopwatch scope on this counter, returning its
    /// result. A convenience wrapper over [`Self::start`] for callers whose
    /// language binding has no destructor to rely on.
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
    /// let h = c.handle(Phase::Handling);
    /// let result = h.time(|| 2 + 2).unwrap();
    /// assert_eq!(result, 4);
    /// assert_eq!(h.value(), 1);
    /// ```
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let scope = self.start()?;
        let result = f();
        drop(scope);
        Ok(result)
    }

    fn require_stopwatch(&self) -> Result<()> {
        if self.kind != CounterKind::Stopwatch {
            return Err(CounterError::WrongCounterType {
                counter: Some(self.name.to_string()),
                expected: "Stopwatch",
                found: "Numeric",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_and_value() {
        let c = Collection::new(1, None);
        let h = CounterHandle::new(&c, 0, CounterKind::Numeric, "x");
        h.increment().unwrap();
        h.increment().unwrap();
        h.decrement().unwrap();
        assert_eq!(h.value(), 1);
    }

    #[test]
    fn start_on_numeric_counter_is_rejected() {
        let c = Collection::new(1, None);
        let h = CounterHandle::new(&c, 0, CounterKind::Numeric, "x");
        assert!(matches!(h.start(), Err(CounterError::WrongCounterType { .. })));
    }

    #[test]
    fn add_duration_on_numeric_counter_is_rejected() {
        let c = Collection::new(1, None);
        let h = CounterHandle::new(&c, 0, CounterKind::Numeric, "x");
        assert!(matches!(
            h.add_duration(Duration::from_secs(1)),
            Err(CounterError::WrongCounterType { .. })
        ));
    }

    #[test]
    fn stopwatch_scope_commits_on_drop() {
        let c = Collection::new(1, None);
        let h = CounterHandle::new(&c, 0, CounterKind::Stopwatch, "x");
        {
            let _scope = h.start().unwrap();
        }
        assert_eq!(h.value(), 1);
    }

    #[test]
    fn time_runs_closure_and_commits() {
        let c = Collection::new(1, None);
        let h = CounterHandle::new(&c, 0, CounterKind::Stopwatch, "x");
        let result = h.time(|| 2 + 2).unwrap();
        assert_eq!(result, 4);
        assert_eq!(h.value(), 1);
    }
}
