use num::bigint::BigInt;
use num::rational::BigRational;
use num::{One, Signed, Zero};

use crate::coefficient::Coefficient;

/// Exact rational scalar. `BigRational` keeps the denominator positive and
/// the pair reduced, the canonical form every scalar consumer expects.
pub type Rational = BigRational;

/// Builds `n/d` from machine integers; `d` must be nonzero.
pub fn ratio(n: i64, d: i64) -> Rational {
    Rational::new(BigInt::from(n), BigInt::from(d))
}

pub fn from_coefficients(num: Coefficient, den: Coefficient) -> Rational {
    debug_assert!(!den.is_zero());
    Rational::new(num, den)
}

/// Largest integer not above `q`.
pub fn floor_int(q: &Rational) -> Coefficient {
    q.floor().to_integer()
}

/// Smallest integer not below `q`.
pub fn ceil_int(q: &Rational) -> Coefficient {
    q.ceil().to_integer()
}

/// Sign of a rational as -1, 0, or 1.
pub fn sign(q: &Rational) -> i32 {
    if q.is_zero() {
        0
    } else if q.is_positive() {
        1
    } else {
        -1
    }
}

/// Whether `q` is an integer.
pub fn is_integer(q: &Rational) -> bool {
    q.denom().is_one()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_ceil() {
        assert_eq!(floor_int(&ratio(7, 2)), BigInt::from(3));
        assert_eq!(ceil_int(&ratio(7, 2)), BigInt::from(4));
        assert_eq!(floor_int(&ratio(-7, 2)), BigInt::from(-4));
        assert_eq!(ceil_int(&ratio(-7, 2)), BigInt::from(-3));
        assert_eq!(floor_int(&ratio(4, 2)), BigInt::from(2));
        assert_eq!(ceil_int(&ratio(4, 2)), BigInt::from(2));
    }

    #[test]
    fn test_canonical() {
        let q = ratio(2, -4);
        assert_eq!(q, ratio(-1, 2));
        assert!(q.denom().is_positive());
    }
}
