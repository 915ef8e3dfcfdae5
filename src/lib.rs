//! # Feynman Diagram Counter
//!
//! Counts F(n): the number of ways to complete a blue reference graph (one
//! open path plus disjoint cycles, `n + 1` arcs in total) with a perfect red
//! matching so that the union is connected, summed over every admissible blue
//! partition.
//!
//! This crate provides:
//! - An exhaustive, duplicate-free enumerator of blue partitions in
//!   bracket notation (`[7 0,1]`: a 7-arc path plus one 3-cycle).
//! - A backtracking **matcher** counting connected red completions of a single
//!   partition with an incremental connectivity invariant.
//! - A **polynomial recurrence** evaluating F(n) directly, with an optional
//!   fork-join variant that splits every step across a worker pool.
//! - Residue (`u64`) or exact (`BigUint`) arithmetic, chosen per run.
//!
//! ## Quick Start
//!
//! ```
//! use feynman::prelude::*;
//! use num_bigint::BigUint;
//!
//! // Enumeration and recurrence agree.
//! assert_eq!(accumulate::compute_f(8, Modulus::DEFAULT), BigUint::from(319u32));
//! assert_eq!(recurrence::compute_f(8, Modulus::DEFAULT), BigUint::from(319u32));
//! ```
//!
//! ## Single Partitions
//!
//! ```
//! use feynman::prelude::*;
//! use num_bigint::BigUint;
//!
//! let blue: BlueVector = "[6 0,1]".parse().unwrap();
//! assert_eq!(blue.n_blue_arcs(), 9);
//! assert_eq!(count_completions(&blue, Modulus::Exact), BigUint::from(35u32));
//! ```
//!
//! ## Large n
//!
//! ```no_run
//! use feynman::prelude::*;
//!
//! let engine = RecurrenceEngine::parallel(FeynmanConfig::default());
//! let f = engine.compute(20_000);
//! println!("F(20000) mod 1e9+7 = {f}");
//! ```
//!
//! ## Modules
//!
//! - [`partition`]: Blue vectors and their enumeration.
//! - [`matching`]: Node bitsets, reversible match state, completion counter.
//! - [`accumulate`]: F(n) by enumeration, plus per-partition breakdowns.
//! - [`recurrence`]: F(n) by the array recurrence, sequential or sliced.
//! - [`pool`]: Fork-join slice executor used by the sliced recurrence.
//! - [`validate`]: Known values and engine cross-checks.
//!
//! ## Performance Notes
//!
//! - The enumerator is exponential in `n`; it is meant for small `n` and for
//!   checking the recurrence.
//! - The recurrence is O(n²) additions; use residue arithmetic for large `n`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod accumulate;
pub mod arith;
pub mod config;
pub mod error;
pub mod matching;
pub mod partition;
pub mod pool;
pub mod recurrence;
pub mod validate;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::accumulate::{self, group_by_count, FeynmanAccumulator, PartitionCount};
    pub use crate::arith::{Arithmetic, ExactArith, ModArith, Modulus};
    pub use crate::config::FeynmanConfig;
    pub use crate::error::FeynmanError;
    pub use crate::matching::{count_completions, count_completions_str, MatchCounter};
    pub use crate::partition::{count_partitions, BlueVector, Partitions};
    pub use crate::recurrence::{self, RecurrenceEngine};
    pub use crate::validate::{cross_validate, validate_known_values};
}
