//! Tick-to-duration conversion: the only process-wide state in this crate.
//!
//! The hot path (stopwatch scopes, duration accumulation) stores raw
//! monotonic-clock ticks as `i64`. Conversion to/from a wall-clock
//! [`Duration`] happens only at the reporting edge — inside
//! [`crate::statistics`] and [`TypedCollection::elapsed`](crate::typed::TypedCollection::elapsed).
//!
//! A tick here is one nanosecond of [`std::time::Instant`] elapsed time.
//! `Instant` already reports at nanosecond resolution on every platform Rust
//! targets, so the conversion constant is exactly `1`; it is still modeled
//! as an explicit, lazily-computed process-wide constant (rather than an
//! inlined no-op) so that a future platform reporting ticks at a coarser
//! resolution only needs to change how the constant is computed, not every
//! call site that uses it.

use std::sync::OnceLock;
use std::time::Duration;

/// Nanoseconds represented by one tick. Always `1` for `Instant`-backed
/// ticks, computed once and cached.
fn ticks_per_nanosecond_inverse() -> u64 {
    static CONST: OnceLock<u64> = OnceLock::new();
    *CONST.get_or_init(|| 1)
}

/// Converts a raw tick count to a [`Duration`], rounding to the nearest
/// nanosecond.
///
/// Negative tick counts (which should never occur for a well-formed
/// stopwatch accumulation) saturate to [`Duration::ZERO`] rather than
/// panicking.
pub fn ticks_to_duration(ticks: i64) -> Duration {
    let ticks = ticks.max(0) as u64;
    Duration::from_nanos(ticks * ticks_per_nanosecond_inverse())
}

/// Converts a [`Duration`] to a raw tick count, the inverse of
/// [`ticks_to_duration`].
///
/// Durations that would overflow `i64` ticks saturate to `i64::MAX`.
pub fn duration_to_ticks(duration: Duration) -> i64 {
    let nanos = duration.as_nanos() / ticks_per_nanosecond_inverse() as u128;
    nanos.min(i64::MAX as u128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let d = Duration::from_millis(12345);
        assert_eq!(ticks_to_duration(duration_to_ticks(d)), d);
    }

    #[test]
    fn zero_round_trips() {
        assert_eq!(ticks_to_duration(0), Duration::ZERO);
        assert_eq!(duration_to_ticks(Duration::ZERO), 0);
    }

    #[test]
    fn negative_ticks_saturate_to_zero() {
        assert_eq!(ticks_to_duration(-5), Duration::ZERO);
    }
}
