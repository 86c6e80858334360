//! CPU-slot resolution: mapping the current thread to a shard row.
//!
//! This mirrors `contatori`'s own slot-assignment strategy (a global
//! `AtomicUsize` handed out via `fetch_add` and cached in a `thread_local!`),
//! but prefers a real "which CPU am I running on right now" primitive when
//! the platform offers one cheaply, since here a single row is shared by
//! every counter in a collection rather than by one counter alone.
//!
//! # Why modulo `R` is safe
//!
//! The returned slot is advisory. A thread can migrate to a different core
//! between sampling the slot and performing the atomic fetch-add on it; the
//! add itself is still atomic and correct, just potentially contended with
//! whichever thread currently owns that row. Correctness never depends on
//! slot stability, only performance does.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of shard rows per matrix.
///
/// Matches a common OS processor-group size. Machines with fewer cores
/// leave some rows permanently at zero (wasted memory, never wasted
/// correctness); machines with more cores map many-to-one per group,
/// bounding contention to group-level rather than whole-machine.
pub const ROWS: usize = 64;

/// Global counter for assigning fallback slot IDs to threads.
static NEXT_SLOT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Thread-local fallback slot, assigned lazily the first time a thread
    /// resolves a slot on a platform without a cheap current-CPU primitive.
    static FALLBACK_SLOT: usize = NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed) % ROWS;
}

/// Returns a shard row index in `[0, ROWS)` for the calling thread.
#[inline]
pub fn current_slot() -> usize {
    #[cfg(target_os = "linux")]
    {
        if let Some(cpu) = linux_current_cpu() {
            return cpu % ROWS;
        }
    }
    FALLBACK_SLOT.with(|slot| *slot)
}

/// Reads the kernel's notion of the currently running CPU via `sched_getcpu`.
///
/// Returns `None` if the syscall reports an error, in which case the caller
/// falls back to thread-local round robin.
#[cfg(target_os = "linux")]
#[inline]
fn linux_current_cpu() -> Option<usize> {
    // SAFETY: sched_getcpu takes no arguments and has no preconditions; a
    // negative return value is the documented error signal.
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 {
        None
    } else {
        Some(cpu as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_in_range() {
        let slot = current_slot();
        assert!(slot < ROWS);
    }

    #[test]
    fn slot_is_stable_for_thread() {
        let a = current_slot();
        let b = current_slot();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_threads_get_slots_in_range() {
        use std::thread;

        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(current_slot))
            .collect();

        for h in handles {
            let slot = h.join().unwrap();
            assert!(slot < ROWS);
        }
    }
}
