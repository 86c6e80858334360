//! # shard-tally — cache-aware sharded multi-counter aggregator
//!
//! A thread-safe counter collection for highly concurrent workloads, built
//! around the same sharded-counter pattern as `contatori`, generalized from
//! one shard array per counter to one shard matrix per *collection* of
//! counters.
//!
//! ## The Problem
//!
//! A naive shared atomic counter causes cache-line bouncing between cores:
//! every increment forces exclusive ownership of the cache line holding it,
//! and that contention only gets worse as threads and update rates grow.
//! Sharding solves this by giving each thread its own row to write into, at
//! the cost of a more expensive read (which must fold every row).
//!
//! Most real workloads don't track one counter, they track dozens — request
//! counts, error counts, per-phase timers. Replicating `contatori`'s
//! per-counter shard array for each of them wastes a full 4KB of padded
//! memory per counter. This crate instead gives a whole *collection* of
//! counters one shared matrix: each row still belongs to exactly one CPU
//! slot and never shares a cache line with another row, but a row now holds
//! every counter in the collection, packed into consecutive 64-bit cells.
//!
//! ## Design Principles
//!
//! 1. **Per-CPU-slot sharding**: `sched_getcpu()` on Linux, a `thread_local!`
//!    round-robin fallback everywhere else (see [`slot`]).
//! 2. **Cache-line padding**: rows are built from [`crossbeam_utils::CachePadded`]
//!    blocks so no two rows ever share a cache line (see [`matrix`]).
//! 3. **Relaxed writes, Acquire reads**: counters don't need to establish
//!    happens-before with unrelated memory; reads still observe a coherent,
//!    if not linearizable-across-rows, total.
//! 4. **Enum-indexed schemas**: [`counter_schema!`] binds a plain enum to
//!    dense column indices at compile time, validated once per process.
//!
//! ## Quick Start
//!
//! ```
//! use shard_tally::{counter_schema, TypedCollection};
//!
//! counter_schema! {
//!     pub enum Phase {
//!         Requests => Numeric,
//!         Errors => Numeric,
//!         Handling => Stopwatch,
//!     }
//! }
//!
//! let counters = TypedCollection::<Phase>::new(None).unwrap();
//! counters.increment(Phase::Requests).unwrap();
//! {
//!     let _scope = counters.start(Phase::Handling).unwrap();
//!     // ... do work ...
//! }
//! assert_eq!(counters.value(Phase::Requests), 1);
//! assert_eq!(counters.value(Phase::Handling), 1);
//! ```
//!
//! ## Parent Propagation
//!
//! A collection can be given a parent at construction; every addition on
//! the child also applies to the parent, best-effort and not transactional
//! (see [`TypedCollection::new`] and spec discussion in `collection`).
//!
//! ## Thread Safety
//!
//! Every [`TypedCollection`] is `Send + Sync` and cheap to share via
//! [`std::sync::Arc`] or by cloning (cloning deep-copies the matrices but
//! keeps the parent link).

pub mod clock;
pub mod collection;
pub mod error;
pub mod handle;
pub mod matrix;
pub mod schema;
pub mod slot;
pub mod statistics;
pub mod stopwatch;
pub mod typed;

pub use error::{CounterError, Result};
pub use handle::CounterHandle;
pub use schema::{CounterKind, CounterSchema, SchemaTable};
pub use statistics::Statistics;
pub use stopwatch::StopwatchScope;
pub use typed::TypedCollection;
