use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rounding::{Rounded, Rounding};

/// A fixed-width integer scalar with checked arithmetic. Overflow never
/// panics; it is reported through [`Rounded`] so interval code can widen the
/// affected bound to an infinity.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CheckedI64(pub i64);

impl CheckedI64 {
    pub fn checked(v: Option<i64>, dir: Rounding) -> (Self, Rounded) {
        match v {
            Some(x) => (CheckedI64(x), Rounded::Exact),
            None => overflow(dir),
        }
    }

    pub fn add(self, other: Self, dir: Rounding) -> (Self, Rounded) {
        Self::checked(self.0.checked_add(other.0), dir)
    }

    pub fn sub(self, other: Self, dir: Rounding) -> (Self, Rounded) {
        Self::checked(self.0.checked_sub(other.0), dir)
    }

    pub fn mul(self, other: Self, dir: Rounding) -> (Self, Rounded) {
        Self::checked(self.0.checked_mul(other.0), dir)
    }

    /// Directed integer division; `other` must be nonzero.
    pub fn div(self, other: Self, dir: Rounding) -> (Self, Rounded) {
        debug_assert!(other.0 != 0);
        let q = self.0.div_euclid(other.0);
        let r = self.0.rem_euclid(other.0);
        if r == 0 {
            return (CheckedI64(q), Rounded::Exact);
        }
        // Euclidean division floors for a positive divisor and ceils for a
        // negative one; normalize to a plain floor before directing.
        let floor = if other.0 > 0 { q } else { q - 1 };
        match dir {
            Rounding::Down => (CheckedI64(floor), Rounded::StrictlyBelow),
            Rounding::Up => match floor.checked_add(1) {
                Some(c) => (CheckedI64(c), Rounded::StrictlyAbove),
                None => overflow(Rounding::Up),
            },
            Rounding::NotNeeded => unreachable!("inexact division under Rounding::NotNeeded"),
        }
    }

    pub fn neg(self, dir: Rounding) -> (Self, Rounded) {
        Self::checked(self.0.checked_neg(), dir)
    }
}

fn overflow(dir: Rounding) -> (CheckedI64, Rounded) {
    match dir {
        Rounding::Down => (CheckedI64(i64::MIN), Rounded::MinusOverflow),
        Rounding::Up => (CheckedI64(i64::MAX), Rounded::PlusOverflow),
        Rounding::NotNeeded => unreachable!("overflow under Rounding::NotNeeded"),
    }
}

impl fmt::Display for CheckedI64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directed_div() {
        let (q, r) = CheckedI64(7).div(CheckedI64(2), Rounding::Down);
        assert_eq!((q.0, r), (3, Rounded::StrictlyBelow));
        let (q, r) = CheckedI64(7).div(CheckedI64(2), Rounding::Up);
        assert_eq!((q.0, r), (4, Rounded::StrictlyAbove));
        let (q, r) = CheckedI64(-7).div(CheckedI64(2), Rounding::Down);
        assert_eq!((q.0, r), (-4, Rounded::StrictlyBelow));
        let (q, r) = CheckedI64(-7).div(CheckedI64(2), Rounding::Up);
        assert_eq!((q.0, r), (-3, Rounded::StrictlyAbove));
        let (q, r) = CheckedI64(7).div(CheckedI64(-2), Rounding::Down);
        assert_eq!((q.0, r), (-4, Rounded::StrictlyBelow));
        let (q, r) = CheckedI64(6).div(CheckedI64(-2), Rounding::NotNeeded);
        assert_eq!((q.0, r), (-3, Rounded::Exact));
    }

    #[test]
    fn test_overflow() {
        let (v, r) = CheckedI64(i64::MAX).add(CheckedI64(1), Rounding::Up);
        assert_eq!((v.0, r), (i64::MAX, Rounded::PlusOverflow));
        let (v, r) = CheckedI64(i64::MIN).sub(CheckedI64(1), Rounding::Down);
        assert_eq!((v.0, r), (i64::MIN, Rounded::MinusOverflow));
    }

    #[test]
    fn test_directed_div_brackets_exact_value() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(41);
        for _ in 0..200 {
            let a = rng.gen_range(-1000i64..1000);
            let b = loop {
                let b = rng.gen_range(-20i64..20);
                if b != 0 {
                    break b;
                }
            };
            let (down, _) = CheckedI64(a).div(CheckedI64(b), Rounding::Down);
            let (up, _) = CheckedI64(a).div(CheckedI64(b), Rounding::Up);
            assert!(down.0 <= up.0);
            assert!(up.0 - down.0 <= 1);
            // The bracket contains the exact quotient.
            assert!(down.0 as f64 <= a as f64 / b as f64 + 1e-9);
            assert!(up.0 as f64 >= a as f64 / b as f64 - 1e-9);
        }
    }
}
