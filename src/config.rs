//! Run configuration shared by both engines.

use crate::arith::Modulus;

/// Minimum number of output indices a recurrence slice should cover before it
/// is worth handing to a worker.
pub const DEFAULT_MIN_PER_SLICE: usize = 100;

/// Configuration for a counting run.
#[derive(Clone, Debug)]
pub struct FeynmanConfig {
    /// Modulus applied to every accumulation.
    pub modulus: Modulus,
    /// Print per-partition / per-step diagnostics to stdout.
    pub dump_progress: bool,
    /// Smallest slice the parallel recurrence will submit to a worker.
    pub min_per_slice: usize,
    /// Worker threads for the parallel recurrence. `None` means
    /// available parallelism minus one (the caller is the extra thread).
    pub workers: Option<usize>,
    /// With `dump_progress`, report every this many recurrence steps.
    pub report_every: usize,
}

impl Default for FeynmanConfig {
    fn default() -> Self {
        Self {
            modulus: Modulus::DEFAULT,
            dump_progress: false,
            min_per_slice: DEFAULT_MIN_PER_SLICE,
            workers: None,
            report_every: 1,
        }
    }
}

impl FeynmanConfig {
    /// Default configuration with the given modulus.
    pub fn with_modulus(modulus: Modulus) -> Self {
        Self {
            modulus,
            ..Self::default()
        }
    }

    /// Number of pool workers this configuration asks for.
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .map_or(0, |n| n.saturating_sub(1))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_prime_modulus_and_is_quiet() {
        let cfg = FeynmanConfig::default();
        assert_eq!(cfg.modulus, Modulus::Residue(1_000_000_007));
        assert!(!cfg.dump_progress);
        assert_eq!(cfg.min_per_slice, DEFAULT_MIN_PER_SLICE);
    }

    #[test]
    fn explicit_workers_override_detection() {
        let cfg = FeynmanConfig {
            workers: Some(3),
            ..FeynmanConfig::default()
        };
        assert_eq!(cfg.resolved_workers(), 3);
    }
}
