//! The shard matrix: a dense, row-major, cache-line-aligned table of
//! 64-bit atomic cells.
//!
//! Rows are indexed by shard (one per logical CPU slot, see [`crate::slot`]);
//! columns are indexed by counter id. Unlike `contatori`'s per-counter
//! replication (one `CachePadded<AtomicUsize>` array *per counter*), this
//! matrix packs every counter of a collection into the *same* set of rows,
//! so one CPU slot's row holds all of that collection's counters and shares
//! no cache line with any other slot's row.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::slot::ROWS;

/// Cells per cache line: 64 bytes / 8 bytes per `i64`.
const CELLS_PER_LINE: usize = 8;

/// One 64-byte-aligned block of 8 atomic cells.
///
/// `CachePadded` guarantees the block never shares a cache line with its
/// neighbors, so consecutive blocks in the backing `Vec` land on consecutive,
/// non-overlapping cache lines.
type CacheLine = CachePadded<[AtomicI64; CELLS_PER_LINE]>;

fn zero_line() -> CacheLine {
    CachePadded::new([
        AtomicI64::new(0),
        AtomicI64::new(0),
        AtomicI64::new(0),
        AtomicI64::new(0),
        AtomicI64::new(0),
        AtomicI64::new(0),
        AtomicI64::new(0),
        AtomicI64::new(0),
    ])
}

/// A `ROWS`-by-`columns` table of signed 64-bit atomic cells, laid out so
/// that row `r` occupies `lines_per_row` consecutive, cache-line-aligned
/// blocks and never shares a cache line with row `r' != r`.
pub(crate) struct ShardMatrix {
    columns: u16,
    lines_per_row: usize,
    lines: Box<[CacheLine]>,
}

impl ShardMatrix {
    /// Allocates a new, zeroed matrix with `columns` columns and `ROWS` rows.
    pub(crate) fn new(columns: u16) -> Self {
        let lines_per_row = Self::lines_per_row(columns);
        let total = lines_per_row * ROWS;
        let lines = (0..total).map(|_| zero_line()).collect::<Vec<_>>().into_boxed_slice();
        Self {
            columns,
            lines_per_row,
            lines,
        }
    }

    fn lines_per_row(columns: u16) -> usize {
        (columns as usize).div_ceil(CELLS_PER_LINE).max(1)
    }

    #[inline]
    pub(crate) fn columns(&self) -> u16 {
        self.columns
    }

    #[inline]
    fn cell(&self, row: usize, column: u16) -> &AtomicI64 {
        debug_assert!(row < ROWS);
        debug_assert!(column < self.columns);
        let column = column as usize;
        let line_index = row * self.lines_per_row + column / CELLS_PER_LINE;
        &self.lines[line_index][column % CELLS_PER_LINE]
    }

    /// Atomically adds `delta` to `matrix[row][column]` and returns the new
    /// value (wrapping on overflow rather than panicking), for the caller to
    /// perform overflow detection against.
    #[inline]
    pub(crate) fn add(&self, row: usize, column: u16, delta: i64) -> i64 {
        self.fetch_add(row, column, delta).1
    }

    /// Atomically adds `delta` and returns `(previous, new)`, both computed
    /// with wrapping arithmetic so a would-be overflow never panics; the
    /// caller is responsible for detecting the wrap (see
    /// [`crate::collection::Collection::add_count`]).
    #[inline]
    pub(crate) fn fetch_add(&self, row: usize, column: u16, delta: i64) -> (i64, i64) {
        let prev = self.cell(row, column).fetch_add(delta, Ordering::Relaxed);
        (prev, prev.wrapping_add(delta))
    }

    /// Acquire-loads a single cell.
    #[inline]
    pub(crate) fn load(&self, row: usize, column: u16) -> i64 {
        self.cell(row, column).load(Ordering::Acquire)
    }

    /// Sums a column across every row. Not linearizable across rows: rows are
    /// read independently and concurrent writes may land before or after a
    /// given row is folded in.
    pub(crate) fn read_column(&self, column: u16) -> i64 {
        let mut sum: i64 = 0;
        for row in 0..ROWS {
            sum = sum.wrapping_add(self.load(row, column));
        }
        sum
    }

    /// Adds every cell of `other` into the matching cell of `self`.
    ///
    /// Both matrices must have identical shape; callers enforce this before
    /// calling (see [`crate::collection::Collection::merge_from`]).
    pub(crate) fn merge_from(&self, other: &ShardMatrix) {
        debug_assert_eq!(self.columns, other.columns);
        for row in 0..ROWS {
            for column in 0..self.columns {
                let v = other.load(row, column);
                if v != 0 {
                    self.add(row, column, v);
                }
            }
        }
    }

    /// Bulk, non-atomic copy of every cell into a fresh matrix of the same
    /// shape. Callers accept a fuzzy snapshot under concurrent writers.
    pub(crate) fn clone_cells(&self) -> ShardMatrix {
        let fresh = ShardMatrix::new(self.columns);
        for row in 0..ROWS {
            for column in 0..self.columns {
                let v = self.load(row, column);
                if v != 0 {
                    fresh.cell(row, column).store(v, Ordering::Relaxed);
                }
            }
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let m = ShardMatrix::new(5);
        for c in 0..5 {
            assert_eq!(m.read_column(c), 0);
        }
    }

    #[test]
    fn add_and_read_single_row() {
        let m = ShardMatrix::new(3);
        assert_eq!(m.add(0, 1, 10), 10);
        assert_eq!(m.add(0, 1, 5), 15);
        assert_eq!(m.read_column(1), 15);
        assert_eq!(m.read_column(0), 0);
    }

    #[test]
    fn rows_are_independent() {
        let m = ShardMatrix::new(2);
        m.add(0, 0, 1);
        m.add(1, 0, 2);
        m.add(2, 0, 3);
        assert_eq!(m.read_column(0), 6);
    }

    #[test]
    fn packs_many_columns_per_row() {
        // 20 columns need 3 cache lines per row (ceil(20/8) = 3).
        let m = ShardMatrix::new(20);
        assert_eq!(m.lines_per_row, 3);
        for c in 0..20 {
            m.add(0, c, c as i64 + 1);
        }
        for c in 0..20 {
            assert_eq!(m.read_column(c), c as i64 + 1);
        }
    }

    #[test]
    fn merge_from_adds_cellwise() {
        let a = ShardMatrix::new(4);
        let b = ShardMatrix::new(4);
        a.add(0, 2, 10);
        b.add(0, 2, 5);
        b.add(3, 2, 7);
        a.merge_from(&b);
        assert_eq!(a.read_column(2), 22);
    }

    #[test]
    fn clone_cells_is_independent() {
        let a = ShardMatrix::new(2);
        a.add(0, 0, 100);
        let b = a.clone_cells();
        assert_eq!(b.read_column(0), 100);
        a.add(0, 0, 1);
        assert_eq!(b.read_column(0), 100);
        assert_eq!(a.read_column(0), 101);
    }

    #[test]
    fn concurrent_adds_sum_exactly() {
        use std::sync::Arc;
        use std::thread;

        let m = Arc::new(ShardMatrix::new(1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        m.add(crate::slot::current_slot(), 0, 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.read_column(0), 80_000);
    }
}
