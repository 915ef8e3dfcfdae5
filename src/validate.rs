//! Fast deterministic checks: known values and engine agreement.

use crate::accumulate::FeynmanAccumulator;
use crate::arith::Modulus;
use crate::config::FeynmanConfig;
use crate::matching::count_completions_str;
use crate::recurrence::RecurrenceEngine;
use num_bigint::BigUint;

/// Known F(n) values.
pub const KNOWN_F: [(usize, u64); 4] = [(2, 1), (4, 5), (6, 35), (8, 319)];

/// Known single-partition completion counts.
pub const KNOWN_COMPLETIONS: [(&str, u64); 4] =
    [("[5]", 3), ("[3 1]", 1), ("[7]", 15), ("[6 0,1]", 35)];

// ============================================================================
// Public API
// ============================================================================

/// Checks both engines against [`KNOWN_F`] and the matcher against
/// [`KNOWN_COMPLETIONS`].
///
/// # Errors
/// Returns a message naming the first value that does not match.
pub fn validate_known_values() -> Result<(), String> {
    for (text, expected) in KNOWN_COMPLETIONS {
        let got = count_completions_str(text, Modulus::Exact).map_err(|e| e.to_string())?;
        if got != BigUint::from(expected) {
            return Err(format!("{text}: expected {expected} completions, got {got}"));
        }
    }

    let config = FeynmanConfig::with_modulus(Modulus::Exact);
    let enumerator = FeynmanAccumulator::new(config.clone());
    let recurrence = RecurrenceEngine::sequential(config);
    for (n, expected) in KNOWN_F {
        let expected = BigUint::from(expected);
        let by_enum = enumerator.compute(n);
        if by_enum != expected {
            return Err(format!("enumerator: F({n}) expected {expected}, got {by_enum}"));
        }
        let by_rec = recurrence.compute(n);
        if by_rec != expected {
            return Err(format!("recurrence: F({n}) expected {expected}, got {by_rec}"));
        }
    }
    Ok(())
}

/// Compares the enumerator, the sequential recurrence and the sliced
/// recurrence for every even `n` in `[lo, hi]`.
///
/// # Errors
/// Returns a message describing the first disagreement.
pub fn cross_validate(lo: usize, hi: usize, modulus: Modulus) -> Result<(), String> {
    cross_validate_with(&FeynmanConfig::with_modulus(modulus), lo, hi)
}

/// [`cross_validate`] with an explicit configuration (worker count, slice
/// size, diagnostics).
///
/// # Errors
/// Returns a message describing the first disagreement.
pub fn cross_validate_with(config: &FeynmanConfig, lo: usize, hi: usize) -> Result<(), String> {
    let enumerator = FeynmanAccumulator::new(config.clone());
    let sequential = RecurrenceEngine::sequential(config.clone());
    let sliced = RecurrenceEngine::parallel(config.clone());

    for n in (lo..=hi).filter(|n| n % 2 == 0) {
        let by_enum = enumerator.compute(n);
        let by_seq = sequential.compute(n);
        if by_enum != by_seq {
            return Err(format!(
                "F({n}) ({}): enumerator gave {by_enum}, recurrence gave {by_seq}",
                config.modulus
            ));
        }
        let by_sliced = sliced.compute(n);
        if by_sliced != by_seq {
            return Err(format!(
                "F({n}) ({}): sliced recurrence gave {by_sliced}, sequential gave {by_seq}",
                config.modulus
            ));
        }
        if config.dump_progress {
            println!("F({n}) = {by_seq} [agree]");
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_hold() {
        validate_known_values().unwrap();
    }

    #[test]
    fn engines_agree_on_small_n() {
        cross_validate(0, 12, Modulus::DEFAULT).unwrap();
    }

    #[test]
    fn engines_agree_exactly_with_tiny_slices() {
        let config = FeynmanConfig {
            modulus: Modulus::Exact,
            workers: Some(2),
            min_per_slice: 1,
            ..FeynmanConfig::default()
        };
        cross_validate_with(&config, 2, 12).unwrap();
    }

    #[test]
    fn engines_agree_under_small_modulus() {
        cross_validate(2, 10, Modulus::Residue(13)).unwrap();
    }

    #[test]
    fn empty_range_is_ok() {
        cross_validate(9, 3, Modulus::DEFAULT).unwrap();
    }
}
