//! The typed collection: the public-facing counter collection API, indexed
//! by an enum bound via [`crate::schema::CounterSchema`] (spec §4, §6).

use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;
use std::sync::Arc;
use std::time::Duration;

use crate::clock;
use crate::collection::Collection;
use crate::error::Result;
use crate::handle::CounterHandle;
use crate::schema::{CounterKind, CounterSchema, SchemaTable};

/// A schema-bound, shard-striped counter collection.
///
/// `E` is an enum implementing [`CounterSchema`] — almost always one
/// declared with [`crate::counter_schema!`] — whose members index the
/// collection's columns. Cheap to share: internally reference-counted, so
/// [`Clone`] is a pointer bump plus parent-link preservation (see
/// [`Self::clone`]).
pub struct TypedCollection<E: CounterSchema> {
    inner: Arc<Collection>,
    schema: Arc<SchemaTable>,
    _marker: PhantomData<E>,
}

impl<E: CounterSchema> TypedCollection<E> {
    /// Builds a new, zeroed collection for `E`'s schema.
    ///
    /// If `parent` is given, every addition on this collection also applies
    /// to the parent, best-effort (not transactional — see spec §4.3).
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
    /// let parent = TypedCollection::<Phase>::new(None).unwrap();
    /// let child = TypedCollection::<Phase>::new(Some(&parent)).unwrap();
    /// child.increment(Phase::Requests).unwrap();
    /// assert_eq!(parent.value(Phase::Requests), 1);
    /// ```
    pub fn new(parent: Option<&TypedCollection<E>>) -> Result<Self> {
        let schema = E::schema()?;
        let parent_inner = parent.map(|p| Arc::clone(&p.inner));
        Ok(Self {
            inner: Arc::new(Collection::new(schema.columns(), parent_inner)),
            schema,
            _marker: PhantomData,
        })
    }

    fn column(&self, member: E) -> u16 {
        member.column(&self.schema)
    }

    fn kind(&self, column: u16) -> CounterKind {
        self.schema.kinds[column as usize]
    }

    fn name(&self, column: u16) -> &'static str {
        self.schema.names[column as usize]
    }

    /// A handle bound to `member`'s column, for repeated operations without
    /// re-resolving the column index each time.
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
    /// for _ in 0..3 {
    ///     h.increment().unwrap();
    /// }
    /// assert_eq!(h.value(), 3);
    /// ```
    pub fn handle(&self, member: E) -> CounterHandle<'_> {
        let column = self.column(member);
        CounterHandle::new(&self.inner, column, self.kind(column), self.name(column))
    }

    /// Adds one to `member`'s integer value.
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
    /// c.increment(Phase::Requests).unwrap();
    /// assert_eq!(c.value(Phase::Requests), 1);
    /// ```
    pub fn increment(&self, member: E) -> Result<()> {
        self.handle(member).increment()
    }

    /// Subtracts one from `member`'s integer value.
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
    /// c.add(Phase::Requests, 5).unwrap();
    /// c.decrement(Phase::Requests).unwrap();
    /// assert_eq!(c.value(Phase::Requests), 4);
    /// ```
    pub fn decrement(&self, member: E) -> Result<()> {
        self.handle(member).decrement()
    }

    /// Adds an arbitrary signed delta to `member`'s integer value.
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
    /// c.add(Phase::Requests, 10).unwrap();
    /// c.add(Phase::Requests, -3).unwrap();
    /// assert_eq!(c.value(Phase::Requests), 7);
    /// ```
    pub fn add(&self, member: E, delta: i64) -> Result<()> {
        self.handle(member).add(delta)
    }

    /// `member`'s current integer value, folded across every shard.
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
    /// assert_eq!(c.value(Phase::Requests), 0);
    /// ```
    pub fn value(&self, member: E) -> i64 {
        self.handle(member).value()
    }

    /// `member`'s accumulated duration, folded across every shard.
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
    /// c.add_duration(Phase::Handling, Duration::from_millis(5)).unwrap();
    /// assert!(c.elapsed(Phase::Handling) >= Duration::from_millis(5));
    /// ```
    pub fn elapsed(&self, member: E) -> Duration {
        self.handle(member).elapsed()
    }

    /// Directly adds a duration to a stopwatch-typed `member`.
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
    /// c.add_duration(Phase::Handling, Duration::from_millis(1)).unwrap();
    /// c.add_duration(Phase::Handling, Duration::from_millis(2)).unwrap();
    /// assert!(c.elapsed(Phase::Handling) >= Duration::from_millis(3));
    /// ```
    pub fn add_duration(&self, member: E, duration: Duration) -> Result<()> {
        self.handle(member).add_duration(duration)
    }

    /// Acquires a [`crate::stopwatch::StopwatchScope`] on `member`.
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
    /// }
    /// assert_eq!(c.value(Phase::Handling), 1);
    /// ```
    pub fn start(&self, member: E) -> Result<crate::stopwatch::StopwatchScope<'_>> {
        self.handle(member).start()
    }

    /// `self.value(member) - other.value(member)`.
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
    /// c.add(Phase::Requests, 10).unwrap();
    /// let snap = c.snapshot();
    /// c.add(Phase::Requests, 5).unwrap();
    /// assert_eq!(c.difference(&snap, Phase::Requests).unwrap(), 5);
    /// ```
    pub fn difference(&self, other: &Self, member: E) -> Result<i64> {
        let column = self.column(member);
        self.inner.difference_count(&other.inner, column)
    }

    /// `self.elapsed(member) - other.elapsed(member)`, as a duration.
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
    /// let snap = c.snapshot();
    /// c.add_duration(Phase::Handling, Duration::from_millis(20)).unwrap();
    /// assert!(c.elapsed_difference(&snap, Phase::Handling).unwrap() >= Duration::from_millis(20));
    /// ```
    pub fn elapsed_difference(&self, other: &Self, member: E) -> Result<Duration> {
        let column = self.column(member);
        let ticks = self.inner.difference_duration(&other.inner, column)?;
        Ok(clock::ticks_to_duration(ticks))
    }

    /// Adds every cell of `other` into `self`, cell by cell.
    ///
    /// Both collections share the same concrete `E`, so they always share
    /// the same schema — this cannot fail in practice, but still returns a
    /// `Result` for consistency with the untyped layer it delegates to.
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
    /// let a = TypedCollection::<Phase>::new(None).unwrap();
    /// let b = TypedCollection::<Phase>::new(None).unwrap();
    /// a.add(Phase::Requests, 3).unwrap();
    /// b.add(Phase::Requests, 4).unwrap();
    /// a.merge_from(&b).unwrap();
    /// assert_eq!(a.value(Phase::Requests), 7);
    /// ```
    pub fn merge_from(&self, other: &Self) -> Result<()> {
        self.inner.merge_from(&other.inner)
    }

    /// An independent, parent-less snapshot of the current state.
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
    /// c.add(Phase::Requests, 100).unwrap();
    /// let snap = c.snapshot();
    /// c.add(Phase::Requests, 50).unwrap();
    /// assert_eq!(snap.value(Phase::Requests), 100);
    /// assert_eq!(c.value(Phase::Requests), 150);
    /// ```
    pub fn snapshot(&self) -> Self {
        Self {
            inner: Arc::new(self.inner.snapshot()),
            schema: Arc::clone(&self.schema),
            _marker: PhantomData,
        }
    }

    /// Every counter as a `(handle, name)` pair, in enum declaration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///         Handling => Stopwatch,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// c.increment(Phase::Requests).unwrap();
    /// let names: Vec<&str> = c.enumerate().into_iter().map(|(_, name)| name).collect();
    /// assert_eq!(names, vec!["Requests", "Handling"]);
    /// ```
    pub fn enumerate(&self) -> Vec<(CounterHandle<'_>, &'static str)> {
        (0..self.schema.columns())
            .map(|column| {
                let name = self.name(column);
                (CounterHandle::new(&self.inner, column, self.kind(column), name), name)
            })
            .collect()
    }

    /// Folds every counter into a flat `name -> value` map: numeric counters
    /// export their value, stopwatch counters export their elapsed
    /// milliseconds under an `"Ms"`-suffixed key (§4.7).
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_tally::{counter_schema, TypedCollection};
    /// use std::time::Duration;
    ///
    /// counter_schema! {
    ///     pub enum Phase {
    ///         Requests => Numeric,
    ///         Handling => Stopwatch,
    ///     }
    /// }
    ///
    /// let c = TypedCollection::<Phase>::new(None).unwrap();
    /// c.add(Phase::Requests, 42).unwrap();
    /// c.add_duration(Phase::Handling, Duration::from_millis(3)).unwrap();
    /// let stats = c.statistics("svc");
    /// assert_eq!(stats.get("svc.Requests"), Some(&42));
    /// assert_eq!(stats.get("svc.HandlingMs"), Some(&3));
    /// ```
    pub fn statistics(&self, prefix: &str) -> crate::statistics::Statistics {
        crate::statistics::fold(self, prefix)
    }
}

/// Deep-copies every cell into a fresh pair of matrices, preserving the
/// parent link (propagation continues from the clone).
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
/// c.increment(Phase::Requests).unwrap();
/// let cloned = c.clone();
/// c.increment(Phase::Requests).unwrap();
/// assert_eq!(cloned.value(Phase::Requests), 1);
/// assert_eq!(c.value(Phase::Requests), 2);
/// ```
impl<E: CounterSchema> Clone for TypedCollection<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::new(self.inner.clone_with_parent()),
            schema: Arc::clone(&self.schema),
            _marker: PhantomData,
        }
    }
}

/// Element-wise sum of both matrices into a fresh, parent-less collection.
/// Infallible: both operands share the same concrete `E`, and therefore the
/// same schema, by construction.
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
/// let a = TypedCollection::<Phase>::new(None).unwrap();
/// let b = TypedCollection::<Phase>::new(None).unwrap();
/// a.add(Phase::Requests, 3).unwrap();
/// b.add(Phase::Requests, 4).unwrap();
/// let summed = &a + &b;
/// assert_eq!(summed.value(Phase::Requests), 7);
/// ```
impl<'a, E: CounterSchema> Add<&'a TypedCollection<E>> for &'a TypedCollection<E> {
    type Output = TypedCollection<E>;

    fn add(self, rhs: &'a TypedCollection<E>) -> Self::Output {
        let inner = Collection::sum(&self.inner, &rhs.inner).expect("same E implies same schema");
        TypedCollection {
            inner: Arc::new(inner),
            schema: Arc::clone(&self.schema),
            _marker: PhantomData,
        }
    }
}

/// Renders as `name: value[ HH:MM:SS.fff]`, one line per counter, names
/// left-padded to a fixed column per spec §6.1.
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
/// c.increment(Phase::Requests).unwrap();
/// let rendered = c.to_string();
/// assert!(rendered.contains("Requests"));
/// ```
impl<E: CounterSchema> fmt::Display for TypedCollection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for column in 0..self.schema.columns() {
            let name = self.name(column);
            let value = self.inner.read_count(column);
            write!(f, "{name:<50}: {value:>8}")?;
            if self.kind(column) == CounterKind::Stopwatch {
                let d = clock::ticks_to_duration(self.inner.read_duration(column));
                let secs = d.as_secs();
                write!(
                    f,
                    " {:02}:{:02}:{:02}.{:03}",
                    secs / 3600,
                    (secs / 60) % 60,
                    secs % 60,
                    d.subsec_millis()
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter_schema;

    counter_schema! {
        pub enum Phase {
            Requests => Numeric,
            Errors => Numeric,
            Handling => Stopwatch,
        }
    }

    #[test]
    fn increment_and_value_round_trip() {
        let c = TypedCollection::<Phase>::new(None).unwrap();
        c.increment(Phase::Requests).unwrap();
        c.increment(Phase::Requests).unwrap();
        c.add(Phase::Errors, 1).unwrap();
        assert_eq!(c.value(Phase::Requests), 2);
        assert_eq!(c.value(Phase::Errors), 1);
    }

    #[test]
    fn parent_propagation() {
        let parent = TypedCollection::<Phase>::new(None).unwrap();
        let child = TypedCollection::<Phase>::new(Some(&parent)).unwrap();
        child.increment(Phase::Requests).unwrap();
        assert_eq!(parent.value(Phase::Requests), 1);
    }

    #[test]
    fn stopwatch_roundtrip() {
        let c = TypedCollection::<Phase>::new(None).unwrap();
        {
            let _s = c.start(Phase::Handling).unwrap();
        }
        assert_eq!(c.value(Phase::Handling), 1);
    }

    #[test]
    fn clone_preserves_parent_link() {
        let parent = TypedCollection::<Phase>::new(None).unwrap();
        let child = TypedCollection::<Phase>::new(Some(&parent)).unwrap();
        child.increment(Phase::Requests).unwrap();
        let cloned = child.clone();
        cloned.increment(Phase::Requests).unwrap();
        assert_eq!(parent.value(Phase::Requests), 2);
    }

    #[test]
    fn snapshot_has_no_parent_and_is_independent() {
        let parent = TypedCollection::<Phase>::new(None).unwrap();
        let child = TypedCollection::<Phase>::new(Some(&parent)).unwrap();
        child.increment(Phase::Requests).unwrap();
        let snap = child.snapshot();
        child.increment(Phase::Requests).unwrap();
        assert_eq!(snap.value(Phase::Requests), 1);
        assert_eq!(child.value(Phase::Requests), 2);
        // The snapshot has no parent: it must not propagate further adds.
        snap.increment(Phase::Requests).unwrap();
        assert_eq!(parent.value(Phase::Requests), 2);
    }

    #[test]
    fn difference_reflects_delta() {
        let c = TypedCollection::<Phase>::new(None).unwrap();
        c.add(Phase::Requests, 10).unwrap();
        let snap = c.snapshot();
        c.add(Phase::Requests, 5).unwrap();
        assert_eq!(c.difference(&snap, Phase::Requests).unwrap(), 5);
    }

    #[test]
    fn add_operator_sums_elementwise() {
        let a = TypedCollection::<Phase>::new(None).unwrap();
        let b = TypedCollection::<Phase>::new(None).unwrap();
        a.add(Phase::Requests, 3).unwrap();
        b.add(Phase::Requests, 4).unwrap();
        let summed = &a + &b;
        assert_eq!(summed.value(Phase::Requests), 7);
    }

    #[test]
    fn display_renders_one_line_per_counter() {
        let c = TypedCollection::<Phase>::new(None).unwrap();
        c.increment(Phase::Requests).unwrap();
        let rendered = c.to_string();
        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.lines().next().unwrap().contains("Requests"));
    }
}
