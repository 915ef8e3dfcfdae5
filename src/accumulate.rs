//! F(n) by exhaustive enumeration: every blue partition of `n + 1` arcs, each
//! handed to a fresh [`MatchCounter`], summed under the run's modulus.

use crate::arith::{Arithmetic, ExactArith, ModArith, Modulus};
use crate::config::FeynmanConfig;
use crate::error::FeynmanError;
use crate::matching::MatchCounter;
use crate::partition::{BlueVector, Partitions};
use num_bigint::BigUint;
use std::collections::BTreeMap;
use std::time::Instant;

/// Largest `n` [`FeynmanAccumulator::try_compute`] accepts; the partition
/// count and the matcher's search tree both grow exponentially.
pub const MAX_ENUMERATION_N: usize = 40;

/// Completion count of a single partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionCount {
    /// The blue partition.
    pub vector: BlueVector,
    /// Its connected completions, under the run's modulus.
    pub count: BigUint,
}

/// Sums completion counts over every blue partition.
#[derive(Clone, Debug, Default)]
pub struct FeynmanAccumulator {
    config: FeynmanConfig,
}

impl FeynmanAccumulator {
    /// Creates an accumulator.
    pub fn new(config: FeynmanConfig) -> Self {
        Self { config }
    }

    /// The run configuration.
    pub fn config(&self) -> &FeynmanConfig {
        &self.config
    }

    /// F(n); 0 for odd `n` or `n < 2`.
    pub fn compute(&self, n: usize) -> BigUint {
        if n < 2 || n % 2 == 1 {
            return BigUint::default();
        }
        match self.config.modulus {
            Modulus::Exact => self.accumulate(&ExactArith, n, |_, _| {}),
            Modulus::Residue(m) => {
                let arith = ModArith::new(m);
                BigUint::from(self.accumulate(&arith, n, |_, _| {}))
            }
        }
    }

    /// [`Self::compute`], refusing sizes beyond [`MAX_ENUMERATION_N`].
    ///
    /// # Errors
    /// Returns [`FeynmanError::InvalidSize`] if `n > MAX_ENUMERATION_N`.
    pub fn try_compute(&self, n: usize) -> Result<BigUint, FeynmanError> {
        if n > MAX_ENUMERATION_N {
            return Err(FeynmanError::InvalidSize {
                n,
                reason: "enumeration is exponential; use the recurrence engine",
            });
        }
        Ok(self.compute(n))
    }

    /// Every partition of `n + 1` arcs with its completion count, in
    /// enumeration order.
    pub fn breakdown(&self, n: usize) -> Vec<PartitionCount> {
        let mut out = Vec::new();
        match self.config.modulus {
            Modulus::Exact => {
                self.accumulate(&ExactArith, n, |vector, count| {
                    out.push(PartitionCount {
                        vector: vector.clone(),
                        count: count.clone(),
                    });
                });
            }
            Modulus::Residue(m) => {
                let arith = ModArith::new(m);
                self.accumulate(&arith, n, |vector, count| {
                    out.push(PartitionCount {
                        vector: vector.clone(),
                        count: BigUint::from(*count),
                    });
                });
            }
        }
        out
    }

    /// Core loop; `visit` sees each partition and its count.
    fn accumulate<A, V>(&self, arith: &A, n: usize, mut visit: V) -> A::Value
    where
        A: Arithmetic,
        V: FnMut(&BlueVector, &A::Value),
    {
        let start = Instant::now();
        let n_blue_arcs = n + 1;
        if self.config.dump_progress {
            println!("--------------------------------------------------");
            println!(
                "Enumerator: n={n} | blue arcs={n_blue_arcs} ({})",
                self.config.modulus
            );
            println!("--------------------------------------------------");
        }

        let mut total = arith.zero();
        let mut seen = 0usize;
        for blue in Partitions::new(n_blue_arcs) {
            let count = MatchCounter::new(arith, &blue).count();
            arith.add_assign(&mut total, &count);
            seen += 1;
            if self.config.dump_progress {
                println!(
                    "{blue}, ThisCount[{}], RunningTotal[{}]",
                    arith.to_biguint(&count),
                    arith.to_biguint(&total)
                );
            }
            visit(&blue, &count);
        }

        if self.config.dump_progress {
            println!(
                "Finished n={n}: {seen} partitions in {:.3}s, F={}",
                start.elapsed().as_secs_f64(),
                arith.to_biguint(&total)
            );
        }
        total
    }
}

/// Groups partitions by completion count, ascending.
pub fn group_by_count(counts: &[PartitionCount]) -> BTreeMap<BigUint, Vec<BlueVector>> {
    let mut groups: BTreeMap<BigUint, Vec<BlueVector>> = BTreeMap::new();
    for pc in counts {
        groups.entry(pc.count.clone()).or_default().push(pc.vector.clone());
    }
    groups
}

/// F(n) by enumeration.
pub fn compute_f(n: usize, modulus: Modulus) -> BigUint {
    FeynmanAccumulator::new(FeynmanConfig::with_modulus(modulus)).compute(n)
}

// ============================================================================
// Tests
// ============================================================================
