//! Counting arithmetic: either residues modulo a fixed 64-bit modulus, or exact
//! unbounded integers.
//!
//! Every engine in this crate is generic over [`Arithmetic`], so a single run
//! never mixes widths: a residue run keeps every intermediate in `[0, m)` and
//! widens only inside a single multiply (`u128`), an exact run uses [`BigUint`]
//! throughout.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt;

// ============================================================================
// Modulus
// ============================================================================

/// The modulus applied to every accumulation of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modulus {
    /// Unbounded exact arithmetic.
    Exact,
    /// Residues modulo the given value (always `>= 2`).
    Residue(u64),
}

impl Modulus {
    /// The customary prime `1_000_000_007`.
    pub const DEFAULT: Modulus = Modulus::Residue(1_000_000_007);

    /// Builds a modulus from a raw value; anything `<= 1` selects exact arithmetic.
    pub const fn from_raw(m: u64) -> Self {
        if m <= 1 {
            Modulus::Exact
        } else {
            Modulus::Residue(m)
        }
    }

    /// Reduces an exact value into this modulus.
    pub fn reduce(self, value: &BigUint) -> BigUint {
        match self {
            Modulus::Exact => value.clone(),
            Modulus::Residue(m) => value % m,
        }
    }
}

impl Default for Modulus {
    fn default() -> Self {
        Modulus::DEFAULT
    }
}

impl fmt::Display for Modulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modulus::Exact => write!(f, "exact"),
            Modulus::Residue(m) => write!(f, "mod {m}"),
        }
    }
}

// ============================================================================
// Arithmetic trait
// ============================================================================

/// A commutative counting semiring.
pub trait Arithmetic: Sync + Send {
    /// Stored value type.
    type Value: Clone + Send + Sync + fmt::Debug + PartialEq;

    /// Additive identity.
    fn zero(&self) -> Self::Value;
    /// Multiplicative identity.
    fn one(&self) -> Self::Value;
    /// `a + b`.
    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;
    /// `a * k` for a small machine-integer factor.
    fn mul_small(&self, a: &Self::Value, k: u64) -> Self::Value;
    /// Exports a value.
    fn to_biguint(&self, a: &Self::Value) -> BigUint;

    /// `acc += v` in place.
    #[inline]
    fn add_assign(&self, acc: &mut Self::Value, v: &Self::Value) {
        *acc = self.add(acc, v);
    }
}

// ============================================================================
// Residue arithmetic
// ============================================================================

/// Arithmetic modulo a 64-bit modulus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModArith {
    m: u64,
}

impl ModArith {
    /// Creates a residue context.
    ///
    /// # Panics
    /// Panics if `m < 2`; use [`Modulus::from_raw`] to route those to exact arithmetic.
    pub fn new(m: u64) -> Self {
        assert!(m >= 2, "modulus must be at least 2, got {m}");
        Self { m }
    }
}

impl Arithmetic for ModArith {
    type Value = u64;

    #[inline(always)]
    fn zero(&self) -> u64 {
        0
    }

    #[inline(always)]
    fn one(&self) -> u64 {
        1 % self.m
    }

    #[inline(always)]
    fn add(&self, a: &u64, b: &u64) -> u64 {
        ((u128::from(*a) + u128::from(*b)) % u128::from(self.m)) as u64
    }

    #[inline(always)]
    fn mul_small(&self, a: &u64, k: u64) -> u64 {
        ((u128::from(*a) * u128::from(k)) % u128::from(self.m)) as u64
    }

    fn to_biguint(&self, a: &u64) -> BigUint {
        BigUint::from(*a)
    }
}

// ============================================================================
// Exact arithmetic
// ============================================================================

/// Unbounded exact arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExactArith;

impl Arithmetic for ExactArith {
    type Value = BigUint;

    fn zero(&self) -> BigUint {
        BigUint::zero()
    }

    fn one(&self) -> BigUint {
        BigUint::one()
    }

    fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        a + b
    }

    fn mul_small(&self, a: &BigUint, k: u64) -> BigUint {
        a * k
    }

    fn to_biguint(&self, a: &BigUint) -> BigUint {
        a.clone()
    }

    fn add_assign(&self, acc: &mut BigUint, v: &BigUint) {
        *acc += v;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_sentinel_selects_exact() {
        assert_eq!(Modulus::from_raw(0), Modulus::Exact);
        assert_eq!(Modulus::from_raw(1), Modulus::Exact);
        assert_eq!(Modulus::from_raw(7), Modulus::Residue(7));
        assert_eq!(Modulus::default(), Modulus::Residue(1_000_000_007));
    }

    #[test]
    fn residue_ops_stay_reduced() {
        let a = ModArith::new(1_000_000_007);
        let x = 1_000_000_006;
        assert_eq!(a.add(&x, &x), 1_000_000_005);
        assert_eq!(a.mul_small(&x, 2), 1_000_000_005);
        assert_eq!(a.add(&a.one(), &x), 0);
    }

    #[test]
    fn residue_mul_does_not_overflow_with_large_modulus() {
        let m = u64::MAX - 58; // largest prime below 2^64
        let a = ModArith::new(m);
        let x = m - 1;
        // (m-1)^2 ≡ 1 (mod m); with k = m-1 < 2^64 the product needs u128.
        assert_eq!(a.mul_small(&x, m - 1), 1);
        assert_eq!(a.add(&x, &x), m - 2);
    }

    #[test]
    fn one_modulo_two() {
        let a = ModArith::new(2);
        assert_eq!(a.one(), 1);
        assert_eq!(a.add(&a.one(), &a.one()), 0);
    }

    #[test]
    fn exact_ops_are_unbounded() {
        let a = ExactArith;
        let big = a.mul_small(&BigUint::from(u64::MAX), u64::MAX);
        let expected = BigUint::from(u64::MAX) * BigUint::from(u64::MAX);
        assert_eq!(big, expected);
        let mut acc = a.zero();
        a.add_assign(&mut acc, &big);
        a.add_assign(&mut acc, &big);
        assert_eq!(acc, &big * 2u32);
        assert_eq!(a.to_biguint(&acc), acc);
    }

    #[test]
    fn reduce_matches_residue_arith() {
        let v = BigUint::from(10u32).pow(30);
        assert_eq!(Modulus::Exact.reduce(&v), v);
        assert_eq!(
            Modulus::Residue(97).reduce(&v),
            BigUint::from(10u32).pow(30) % 97u32
        );
    }

    #[test]
    #[should_panic]
    fn mod_arith_rejects_sentinel() {
        let _ = ModArith::new(1);
    }
}
