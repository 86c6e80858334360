//! Unified error type for schema binding and counter operations.
//!
//! Mirrors `contatori`'s `observers::error::ObserverError`: one
//! `thiserror`-derived enum covering every failure kind, so callers can
//! propagate a single error type regardless of which operation failed.

use thiserror::Error;

/// Errors raised by schema binding, counter operations, and collection
/// algebra.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// A 64-bit add would have wrapped past the sign boundary.
    ///
    /// The originating cell's value is left in its post-wrap state; the
    /// collection remains usable for every other column.
    #[error("counter {counter:?} overflowed adding {delta}")]
    Overflow {
        /// Display name of the counter that overflowed, if known.
        counter: Option<String>,
        /// The delta that would have caused the overflow.
        delta: i64,
    },

    /// An enum bound as a counter schema is non-dense, exceeds 16-bit
    /// cardinality, or carries malformed attribute metadata.
    #[error("invalid counter schema: {reason}")]
    InvalidCounterSchema {
        /// Human-readable description of what failed validation.
        reason: String,
    },

    /// An operation that requires a specific counter type (stopwatch vs.
    /// numeric) was called on a counter of the wrong type.
    #[error("counter {counter:?} is {found:?}, expected {expected:?}")]
    WrongCounterType {
        /// Display name of the counter, if known.
        counter: Option<String>,
        /// The type the operation required.
        expected: &'static str,
        /// The type the counter actually is.
        found: &'static str,
    },

    /// `merge_from` / `difference` / `+` was attempted on collections whose
    /// shapes (column count or type table) differ.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// Human-readable description of the mismatch.
        reason: String,
    },
}

/// Result type for operations in this crate.
pub type Result<T> = std::result::Result<T, CounterError>;
