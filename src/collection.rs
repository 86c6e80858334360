//! The untyped counter collection: two shard matrices, an optional parent,
//! and the add/read/merge/diff/snapshot algebra from spec §4.3.

use std::sync::Arc;

use crate::error::{CounterError, Result};
use crate::matrix::ShardMatrix;
use crate::slot::current_slot;

/// Owns a counts matrix and a durations matrix of identical shape, plus an
/// optional non-owning link to a parent collection that increments
/// propagate to.
///
/// This is the untyped core beneath [`crate::typed::TypedCollection`]; most
/// callers should use the typed facade instead of this directly.
pub struct Collection {
    columns: u16,
    counts: ShardMatrix,
    durations: ShardMatrix,
    parent: Option<Arc<Collection>>,
}

fn detect_overflow(delta: i64, prev: i64, new: i64) -> bool {
    (delta > 0 && new < prev) || (delta < 0 && new > prev)
}

impl Collection {
    /// Creates a new, zeroed collection with `columns` counters and an
    /// optional parent to propagate additions to.
    ///
    /// The parent's shape must match; this is enforced by
    /// [`crate::typed::TypedCollection::new`], which is the only public
    /// constructor, rather than here.
    pub(crate) fn new(columns: u16, parent: Option<Arc<Collection>>) -> Self {
        Self {
            columns,
            counts: ShardMatrix::new(columns),
            durations: ShardMatrix::new(columns),
            parent,
        }
    }

    #[inline]
    pub(crate) fn columns(&self) -> u16 {
        self.columns
    }

    fn same_shape(&self, other: &Collection) -> bool {
        self.columns == other.columns
    }

    /// Adds `delta` to the count matrix at `id`, propagating to the parent
    /// (best-effort, not transactional) if one is linked.
    ///
    /// A `delta` of zero is a no-op: no atomic write, no parent propagation,
    /// never an overflow even near `i64::MAX`.
    pub(crate) fn add_count(&self, id: u16, delta: i64, name: Option<&str>) -> Result<()> {
        Self::add_matrix(&self.counts, id, delta, name)?;
        if let Some(parent) = &self.parent {
            parent.add_count(id, delta, name)?;
        }
        Ok(())
    }

    /// Adds `delta` ticks to the duration matrix at `id`, with the same
    /// propagation and zero-delta semantics as [`Self::add_count`].
    pub(crate) fn add_duration(&self, id: u16, delta: i64, name: Option<&str>) -> Result<()> {
        Self::add_matrix(&self.durations, id, delta, name)?;
        if let Some(parent) = &self.parent {
            parent.add_duration(id, delta, name)?;
        }
        Ok(())
    }

    fn add_matrix(matrix: &ShardMatrix, id: u16, delta: i64, name: Option<&str>) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        let (prev, new) = matrix.fetch_add(current_slot(), id, delta);
        if detect_overflow(delta, prev, new) {
            return Err(CounterError::Overflow {
                counter: name.map(str::to_owned),
                delta,
            });
        }
        Ok(())
    }

    /// Folds the count matrix's column `id` across every row.
    pub(crate) fn read_count(&self, id: u16) -> i64 {
        self.counts.read_column(id)
    }

    /// Folds the duration matrix's column `id` across every row.
    pub(crate) fn read_duration(&self, id: u16) -> i64 {
        self.durations.read_column(id)
    }

    /// Adds every cell of `other` into `self`, both matrices. The parent
    /// link is not traversed — the merge target owns propagation policy.
    pub(crate) fn merge_from(&self, other: &Collection) -> Result<()> {
        if !self.same_shape(other) {
            return Err(CounterError::SchemaMismatch {
                reason: format!(
                    "merge_from: {} columns vs {} columns",
                    self.columns, other.columns
                ),
            });
        }
        self.counts.merge_from(&other.counts);
        self.durations.merge_from(&other.durations);
        Ok(())
    }

    /// Allocates fresh matrices and bulk-copies every cell. The parent link
    /// is copied by reference; the clone never propagates to the original's
    /// parent.
    pub(crate) fn clone_with_parent(&self) -> Self {
        Self {
            columns: self.columns,
            counts: self.counts.clone_cells(),
            durations: self.durations.clone_cells(),
            parent: self.parent.clone(),
        }
    }

    /// An independent, parent-less, frozen-usage view: a new collection of
    /// identical shape, merged from `self`.
    pub(crate) fn snapshot(&self) -> Self {
        let fresh = Self::new(self.columns, None);
        // merge_from cannot fail here: shapes are identical by construction.
        fresh.merge_from(self).expect("snapshot shape always matches");
        fresh
    }

    /// `self.read_count(id) - other.read_count(id)`.
    pub(crate) fn difference_count(&self, other: &Collection, id: u16) -> Result<i64> {
        if !self.same_shape(other) {
            return Err(CounterError::SchemaMismatch {
                reason: format!(
                    "difference: {} columns vs {} columns",
                    self.columns, other.columns
                ),
            });
        }
        Ok(self.read_count(id) - other.read_count(id))
    }

    /// `self.read_duration(id) - other.read_duration(id)`.
    pub(crate) fn difference_duration(&self, other: &Collection, id: u16) -> Result<i64> {
        if !self.same_shape(other) {
            return Err(CounterError::SchemaMismatch {
                reason: format!(
                    "difference: {} columns vs {} columns",
                    self.columns, other.columns
                ),
            });
        }
        Ok(self.read_duration(id) - other.read_duration(id))
    }

    /// A fresh, parent-less collection with `new.counts = a.counts +
    /// b.counts` and `new.durations = a.durations + b.durations`.
    pub(crate) fn sum(a: &Collection, b: &Collection) -> Result<Self> {
        if !a.same_shape(b) {
            return Err(CounterError::SchemaMismatch {
                reason: format!("sum: {} columns vs {} columns", a.columns, b.columns),
            });
        }
        let fresh = Self::new(a.columns, None);
        fresh.merge_from(a)?;
        fresh.merge_from(b)?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_read_round_trip() {
        let c = Collection::new(2, None);
        c.add_count(0, 5, None).unwrap();
        c.add_count(0, 3, None).unwrap();
        assert_eq!(c.read_count(0), 8);
        assert_eq!(c.read_count(1), 0);
    }

    #[test]
    fn zero_delta_is_a_true_no_op() {
        let c = Collection::new(1, None);
        c.add_count(0, i64::MAX, None).unwrap();
        // A zero add must not even attempt the overflow-prone fetch_add.
        c.add_count(0, 0, None).unwrap();
        assert_eq!(c.read_count(0), i64::MAX);
    }

    #[test]
    fn overflow_is_detected() {
        let c = Collection::new(1, None);
        c.add_count(0, i64::MAX - 5, None).unwrap();
        let err = c.add_count(0, 10, None).unwrap_err();
        assert!(matches!(err, CounterError::Overflow { .. }));
    }

    #[test]
    fn underflow_is_detected() {
        let c = Collection::new(1, None);
        c.add_count(0, i64::MIN + 5, None).unwrap();
        let err = c.add_count(0, -10, None).unwrap_err();
        assert!(matches!(err, CounterError::Overflow { .. }));
    }

    #[test]
    fn parent_propagation() {
        let parent = Arc::new(Collection::new(1, None));
        let child = Collection::new(1, Some(Arc::clone(&parent)));
        child.add_count(0, 5, None).unwrap();
        child.add_count(0, 7, None).unwrap();
        assert_eq!(child.read_count(0), 12);
        assert_eq!(parent.read_count(0), 12);
    }

    #[test]
    fn merge_from_is_additive() {
        let a = Collection::new(1, None);
        let b = Collection::new(1, None);
        a.add_count(0, 10, None).unwrap();
        b.add_count(0, 5, None).unwrap();
        a.merge_from(&b).unwrap();
        assert_eq!(a.read_count(0), 15);
    }

    #[test]
    fn merge_from_rejects_shape_mismatch() {
        let a = Collection::new(1, None);
        let b = Collection::new(2, None);
        assert!(matches!(
            a.merge_from(&b),
            Err(CounterError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn snapshot_isolation() {
        let c = Collection::new(1, None);
        for _ in 0..100 {
            c.add_count(0, 1, None).unwrap();
        }
        let snap = c.snapshot();
        for _ in 0..50 {
            c.add_count(0, 1, None).unwrap();
        }
        assert_eq!(snap.read_count(0), 100);
        assert_eq!(c.read_count(0), 150);
        assert_eq!(c.difference_count(&snap, 0).unwrap(), 50);
    }

    #[test]
    fn sum_is_elementwise() {
        let a = Collection::new(1, None);
        let b = Collection::new(1, None);
        a.add_count(0, 3, None).unwrap();
        b.add_count(0, 4, None).unwrap();
        let s = Collection::sum(&a, &b).unwrap();
        assert_eq!(s.read_count(0), 7);
    }

    #[test]
    fn clone_is_independent_with_no_parent() {
        let c = Collection::new(1, None);
        c.add_count(0, 10, None).unwrap();
        let cloned = c.clone_with_parent();
        c.add_count(0, 5, None).unwrap();
        assert_eq!(cloned.read_count(0), 10);
        assert_eq!(c.read_count(0), 15);
    }

    #[test]
    fn difference_under_quiescence_is_zero() {
        let c = Collection::new(1, None);
        c.add_count(0, 42, None).unwrap();
        let snap = c.snapshot();
        assert_eq!(c.difference_count(&snap, 0).unwrap(), 0);
    }
}
