//! Polynomial-time evaluation of F(n) by an array recurrence.
//!
//! Instead of enumerating partitions, the engine tracks, for every number of
//! *open* (unmatched, connected) nodes, how many ways the already-decided part
//! of the diagram can be completed. Each step fixes one red edge from the
//! lowest open node and shrinks the array by two:
//!
//! - open/open: the edge joins two open nodes, `state[i + 2] * (i + 2)`;
//! - open/cycle: the edge opens a fresh cycle of length `L`, which adds
//!   `L - 2` open nodes; summing over the admissible `L` gives a prefix sum of
//!   the previous array.
//!
//! A configuration that would leave exactly one node for the cycles is
//! impossible and is pinned to zero at every step.

use crate::arith::{Arithmetic, ExactArith, ModArith, Modulus};
use crate::config::FeynmanConfig;
use crate::pool::SlicePool;
use num_bigint::BigUint;
use std::time::Instant;

// ============================================================================
// Step kernels
// ============================================================================

/// Index that would leave a single node for the cycles.
#[inline(always)]
fn dead_index(len: usize) -> Option<usize> {
    len.checked_sub(2)
}

/// Initial array for `n`: all ones except the dead index.
fn initial_state<A: Arithmetic>(arith: &A, n: usize) -> Vec<A::Value> {
    let mut state = vec![arith.one(); n];
    if let Some(dead) = dead_index(n) {
        state[dead] = arith.zero();
    }
    state
}

/// One step with a running sum; `bravo` is overwritten with the result.
fn step_sequential<A: Arithmetic>(arith: &A, alpha: &[A::Value], bravo: &mut Vec<A::Value>) {
    let next_len = alpha.len() - 2;
    let dead = dead_index(next_len);
    bravo.clear();
    let mut cum = arith.zero();
    for i in 0..next_len {
        arith.add_assign(&mut cum, &alpha[i]);
        if Some(i) == dead {
            bravo.push(arith.zero());
            continue;
        }
        let open_open = arith.mul_small(&alpha[i + 2], (i + 2) as u64);
        bravo.push(arith.add(&open_open, &cum));
    }
}

/// `prefix[j] = alpha[0] + ... + alpha[j - 1]`.
fn prefix_sums<A: Arithmetic>(arith: &A, alpha: &[A::Value]) -> Vec<A::Value> {
    let mut prefix = Vec::with_capacity(alpha.len() + 1);
    let mut cum = arith.zero();
    prefix.push(cum.clone());
    for v in alpha {
        arith.add_assign(&mut cum, v);
        prefix.push(cum.clone());
    }
    prefix
}

/// Output `i` of a step, from the previous array and its prefix sums.
///
/// A fresh cycle of length `L` moves the source index to `i + 2 - L`; every
/// `L` in `2..=i + 2` is admissible, so the open/cycle term is the whole
/// prefix `alpha[0..=i]`.
fn step_cell<A: Arithmetic>(
    arith: &A,
    alpha: &[A::Value],
    prefix: &[A::Value],
    i: usize,
) -> A::Value {
    let next_len = alpha.len() - 2;
    if Some(i) == dead_index(next_len) {
        return arith.zero();
    }
    let open_open = arith.mul_small(&alpha[i + 2], (i + 2) as u64);
    arith.add(&open_open, &prefix[i + 1])
}

// ============================================================================
// Engine
// ============================================================================

/// Evaluates F(n) by the array recurrence, optionally splitting each step
/// across a worker pool.
#[derive(Debug)]
pub struct RecurrenceEngine {
    config: FeynmanConfig,
    pool: SlicePool,
}

impl RecurrenceEngine {
    /// Single-threaded engine.
    pub fn sequential(config: FeynmanConfig) -> Self {
        Self {
            config,
            pool: SlicePool::inline(),
        }
    }

    /// Engine owning a worker pool sized by `config.workers` (default:
    /// available parallelism minus one).
    pub fn parallel(config: FeynmanConfig) -> Self {
        let workers = config.resolved_workers();
        Self {
            config,
            pool: SlicePool::new(workers),
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &FeynmanConfig {
        &self.config
    }

    /// Worker threads currently owned.
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Releases the worker pool. Idempotent; the engine keeps working
    /// single-threaded afterwards.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    /// F(n) under the configured modulus; 0 for odd `n` or `n < 2`.
    pub fn compute(&self, n: usize) -> BigUint {
        match self.config.modulus {
            Modulus::Exact => self.run(&ExactArith, n),
            Modulus::Residue(m) => BigUint::from(self.run(&ModArith::new(m), n)),
        }
    }

    /// Runs the recurrence under an explicit arithmetic.
    pub fn run<A: Arithmetic>(&self, arith: &A, n: usize) -> A::Value {
        if n < 2 || n % 2 == 1 {
            return arith.zero();
        }

        let start = Instant::now();
        if self.config.dump_progress {
            println!("--------------------------------------------------");
            println!(
                "Recurrence: n={n} ({}) | workers={}",
                self.config.modulus,
                self.workers()
            );
            println!("--------------------------------------------------");
        }

        let mut alpha = initial_state(arith, n);
        let mut bravo = Vec::with_capacity(n);
        let mut last_report = start;
        let mut last_len = n;
        for (step, len) in (3..=n).rev().step_by(2).enumerate() {
            // `len` walks n, n-2, ..., 4.
            debug_assert_eq!(alpha.len(), len);
            self.step(arith, &alpha, &mut bravo);
            std::mem::swap(&mut alpha, &mut bravo);

            if self.config.dump_progress && (step + 1) % self.config.report_every.max(1) == 0 {
                let now = Instant::now();
                let secs = now.duration_since(last_report).as_secs_f64();
                let done = last_len - alpha.len();
                let rate = if secs > 0.0 { done as f64 / secs } else { 0.0 };
                println!(
                    "[{:>8.3}s] n={} -> {}, {} done in {:.3}s ({:.1}/s)",
                    start.elapsed().as_secs_f64(),
                    len,
                    alpha.len(),
                    done,
                    secs,
                    rate
                );
                last_report = now;
                last_len = alpha.len();
            }
        }

        let f = alpha[1].clone();
        if self.config.dump_progress {
            println!(
                "Finished n={n} in {:.3}s: F={:?}",
                start.elapsed().as_secs_f64(),
                f
            );
        }
        f
    }

    /// One step `len -> len - 2`, sliced across the pool when worthwhile.
    fn step<A: Arithmetic>(&self, arith: &A, alpha: &[A::Value], bravo: &mut Vec<A::Value>) {
        let next_len = alpha.len() - 2;
        let wanted = next_len.div_ceil(self.config.min_per_slice.max(1));
        let n_slices = wanted.min(self.pool.workers() + 1);
        if n_slices < 2 {
            step_sequential(arith, alpha, bravo);
            return;
        }

        let prefix = prefix_sums(arith, alpha);
        let slices = self.pool.run_slices(n_slices, |slice| {
            (slice..next_len)
                .step_by(n_slices)
                .map(|i| step_cell(arith, alpha, &prefix, i))
                .collect::<Vec<_>>()
        });

        bravo.clear();
        bravo.resize(next_len, arith.zero());
        for (slice, values) in slices.into_iter().enumerate() {
            for (j, v) in values.into_iter().enumerate() {
                bravo[slice + j * n_slices] = v;
            }
        }
    }
}

impl Drop for RecurrenceEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// F(n) by the sequential recurrence.
pub fn compute_f(n: usize, modulus: Modulus) -> BigUint {
    RecurrenceEngine::sequential(FeynmanConfig::with_modulus(modulus)).compute(n)
}

/// F(n) modulo `m` as a machine integer.
///
/// Returns `None` for `m <= 1`, which selects exact arithmetic; use
/// [`compute_f`] with [`Modulus::Exact`] for those.
pub fn compute_f_mod(n: usize, m: u64) -> Option<u64> {
    let Modulus::Residue(m) = Modulus::from_raw(m) else {
        return None;
    };
    let engine = RecurrenceEngine::sequential(FeynmanConfig::with_modulus(Modulus::Residue(m)));
    Some(engine.run(&ModArith::new(m), n))
}

/// F(n) by the recurrence with every step split across a worker pool.
pub fn compute_f_parallel(n: usize, modulus: Modulus) -> BigUint {
    RecurrenceEngine::parallel(FeynmanConfig::with_modulus(modulus)).compute(n)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sliced(modulus: Modulus, workers: usize) -> RecurrenceEngine {
        RecurrenceEngine::parallel(FeynmanConfig {
            modulus,
            workers: Some(workers),
            min_per_slice: 1,
            ..FeynmanConfig::default()
        })
    }

    #[test]
    fn known_small_values() {
        let expected = [(2, 1u64), (4, 5), (6, 35), (8, 319), (10, 3559), (12, 46841)];
        for (n, f) in expected {
            assert_eq!(compute_f(n, Modulus::DEFAULT), BigUint::from(f), "n={n}");
            assert_eq!(compute_f(n, Modulus::Exact), BigUint::from(f), "n={n}");
        }
    }

    #[test]
    fn machine_integer_entry_point() {
        assert_eq!(compute_f_mod(12, 1_000_000_007), Some(46841));
        assert_eq!(compute_f_mod(12, 1000), Some(841));
        assert_eq!(compute_f_mod(12, 2), Some(1));
        assert_eq!(compute_f_mod(9, 97), Some(0));
        // The exact sentinel has no machine-integer answer.
        assert_eq!(compute_f_mod(12, 0), None);
        assert_eq!(compute_f_mod(12, 1), None);
    }

    #[test]
    fn odd_and_tiny_sizes_are_zero() {
        for n in [0, 1, 3, 5, 11] {
            assert_eq!(compute_f(n, Modulus::DEFAULT), BigUint::from(0u32), "n={n}");
        }
    }

    #[test]
    fn intermediate_arrays_match_reference() {
        let arith = ExactArith;
        let mut alpha = initial_state(&arith, 8);
        let mut bravo = Vec::new();
        step_sequential(&arith, &alpha, &mut bravo);
        let as_u32 = |v: &[BigUint]| v.iter().map(|x| u32::try_from(x).unwrap()).collect::<Vec<_>>();
        assert_eq!(as_u32(&bravo[..]), vec![3, 5, 7, 9, 0, 13]);
        std::mem::swap(&mut alpha, &mut bravo);
        step_sequential(&arith, &alpha, &mut bravo);
        assert_eq!(as_u32(&bravo[..]), vec![17, 35, 0, 89]);
    }

    #[test]
    fn cell_kernel_matches_running_sum_kernel() {
        let arith = ModArith::new(1_000_003);
        let alpha: Vec<u64> = (0..40u64).map(|i| (i * 7919 + 13) % 1_000_003).collect();
        let mut bravo = Vec::new();
        step_sequential(&arith, &alpha, &mut bravo);
        let prefix = prefix_sums(&arith, &alpha);
        let cells: Vec<u64> = (0..alpha.len() - 2)
            .map(|i| step_cell(&arith, &alpha, &prefix, i))
            .collect();
        assert_eq!(cells, bravo);
    }

    #[test]
    fn sliced_engine_matches_sequential() {
        let engine = sliced(Modulus::DEFAULT, 3);
        for n in (2..=120).step_by(2) {
            assert_eq!(engine.compute(n), compute_f(n, Modulus::DEFAULT), "n={n}");
        }
    }

    #[test]
    fn sliced_engine_matches_sequential_exact() {
        let engine = sliced(Modulus::Exact, 2);
        for n in (2..=60).step_by(2) {
            assert_eq!(engine.compute(n), compute_f(n, Modulus::Exact), "n={n}");
        }
    }

    #[test]
    fn residue_equals_reduced_exact() {
        for m in [2u64, 97, 1_000_000_007, u64::MAX - 58] {
            for n in (2..=80).step_by(6) {
                let exact = compute_f(n, Modulus::Exact);
                let residue = compute_f(n, Modulus::Residue(m));
                assert_eq!(residue, &exact % m, "n={n} m={m}");
                assert!(residue < BigUint::from(m));
            }
        }
    }

    #[test]
    fn shutdown_is_idempotent_and_engine_keeps_working() {
        let mut engine = sliced(Modulus::DEFAULT, 2);
        assert_eq!(engine.workers(), 2);
        let before = engine.compute(300);
        engine.shutdown();
        engine.shutdown();
        assert_eq!(engine.workers(), 0);
        assert_eq!(engine.compute(300), before);
    }

    #[test]
    fn large_n_sequential_and_parallel_agree() {
        let seq = compute_f(2_000, Modulus::DEFAULT);
        let par = RecurrenceEngine::parallel(FeynmanConfig {
            workers: Some(3),
            min_per_slice: 64,
            ..FeynmanConfig::default()
        })
        .compute(2_000);
        assert_eq!(seq, par);
    }
}
