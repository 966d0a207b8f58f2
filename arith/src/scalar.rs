use std::fmt::{Debug, Display};

use num::{BigInt, Signed, Zero};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::checked::CheckedI64;
use crate::rational::Rational;
use crate::rounding::{Rounded, Rounding};

/// The scalar contract every interval kind must satisfy: exact or directed
/// conversion from rationals, directed arithmetic, and a capability bit
/// saying whether intervals over this scalar may carry open bounds.
///
/// Every operation returns the computed value together with a [`Rounded`]
/// telling how it relates to the exact result; interval code uses that to
/// keep bounds sound and to propagate openness.
pub trait IntervalScalar:
    Clone + Debug + Display + Eq + Ord + Serialize + DeserializeOwned + 'static
{
    /// Whether an interval over this scalar can represent a strict bound.
    const CAN_BE_OPEN: bool;

    fn zero() -> Self;

    fn from_rational(q: &Rational, dir: Rounding) -> (Self, Rounded);

    fn to_rational(&self) -> Rational;

    fn add(&self, other: &Self, dir: Rounding) -> (Self, Rounded);
    fn sub(&self, other: &Self, dir: Rounding) -> (Self, Rounded);
    fn mul(&self, other: &Self, dir: Rounding) -> (Self, Rounded);
    /// `other` must be nonzero.
    fn div(&self, other: &Self, dir: Rounding) -> (Self, Rounded);
    fn neg(&self, dir: Rounding) -> (Self, Rounded);

    fn sign(&self) -> i32 {
        match self.cmp(&Self::zero()) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }
    }

    /// For a kind without open bounds: the least representable value
    /// strictly above `q`, used to close a strict lower bound exactly.
    /// `None` means the strict bound is not expressible at all.
    fn strict_lower_to_closed(q: &Rational) -> Option<Self> {
        let _ = q;
        None
    }

    /// Dual of [`IntervalScalar::strict_lower_to_closed`] for upper bounds.
    fn strict_upper_to_closed(q: &Rational) -> Option<Self> {
        let _ = q;
        None
    }
}

impl IntervalScalar for Rational {
    const CAN_BE_OPEN: bool = true;

    fn zero() -> Self {
        <Rational as Zero>::zero()
    }

    fn from_rational(q: &Rational, _dir: Rounding) -> (Self, Rounded) {
        (q.clone(), Rounded::Exact)
    }

    fn to_rational(&self) -> Rational {
        self.clone()
    }

    fn add(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        (self + other, Rounded::Exact)
    }

    fn sub(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        (self - other, Rounded::Exact)
    }

    fn mul(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        (self * other, Rounded::Exact)
    }

    fn div(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        debug_assert!(!other.is_zero());
        (self / other, Rounded::Exact)
    }

    fn neg(&self, _dir: Rounding) -> (Self, Rounded) {
        (-self, Rounded::Exact)
    }
}

/// Exact rational scalar whose intervals only admit closed bounds. This is
/// the "closed interval kind": building a box from a strict inequality over
/// it is an invalid argument rather than a representable set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ClosedRational(pub Rational);

impl Display for ClosedRational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl IntervalScalar for ClosedRational {
    const CAN_BE_OPEN: bool = false;

    fn zero() -> Self {
        ClosedRational(<Rational as Zero>::zero())
    }

    fn from_rational(q: &Rational, _dir: Rounding) -> (Self, Rounded) {
        (ClosedRational(q.clone()), Rounded::Exact)
    }

    fn to_rational(&self) -> Rational {
        self.0.clone()
    }

    fn add(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        (ClosedRational(&self.0 + &other.0), Rounded::Exact)
    }

    fn sub(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        (ClosedRational(&self.0 - &other.0), Rounded::Exact)
    }

    fn mul(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        (ClosedRational(&self.0 * &other.0), Rounded::Exact)
    }

    fn div(&self, other: &Self, _dir: Rounding) -> (Self, Rounded) {
        debug_assert!(!other.0.is_zero());
        (ClosedRational(&self.0 / &other.0), Rounded::Exact)
    }

    fn neg(&self, _dir: Rounding) -> (Self, Rounded) {
        (ClosedRational(-&self.0), Rounded::Exact)
    }
}

impl IntervalScalar for CheckedI64 {
    const CAN_BE_OPEN: bool = false;

    fn zero() -> Self {
        CheckedI64(0)
    }

    fn from_rational(q: &Rational, dir: Rounding) -> (Self, Rounded) {
        let (i, exact) = match dir {
            Rounding::Down => (q.floor().to_integer(), q.is_integer()),
            Rounding::Up => (q.ceil().to_integer(), q.is_integer()),
            Rounding::NotNeeded => {
                debug_assert!(q.is_integer());
                (q.to_integer(), true)
            }
        };
        match big_to_i64(&i) {
            Some(v) if exact => (CheckedI64(v), Rounded::Exact),
            Some(v) => (CheckedI64(v), Rounded::inexact(dir)),
            None => {
                if i.is_negative() {
                    (CheckedI64(i64::MIN), Rounded::MinusOverflow)
                } else {
                    (CheckedI64(i64::MAX), Rounded::PlusOverflow)
                }
            }
        }
    }

    fn to_rational(&self) -> Rational {
        Rational::from(BigInt::from(self.0))
    }

    fn add(&self, other: &Self, dir: Rounding) -> (Self, Rounded) {
        CheckedI64::add(*self, *other, dir)
    }

    fn sub(&self, other: &Self, dir: Rounding) -> (Self, Rounded) {
        CheckedI64::sub(*self, *other, dir)
    }

    fn mul(&self, other: &Self, dir: Rounding) -> (Self, Rounded) {
        CheckedI64::mul(*self, *other, dir)
    }

    fn div(&self, other: &Self, dir: Rounding) -> (Self, Rounded) {
        CheckedI64::div(*self, *other, dir)
    }

    fn neg(&self, dir: Rounding) -> (Self, Rounded) {
        CheckedI64::neg(*self, dir)
    }

    fn strict_lower_to_closed(q: &Rational) -> Option<Self> {
        // The integers strictly above q start at floor(q) + 1.
        let next = q.floor().to_integer() + BigInt::from(1);
        Some(CheckedI64(big_to_i64(&next).unwrap_or(i64::MAX)))
    }

    fn strict_upper_to_closed(q: &Rational) -> Option<Self> {
        let prev = q.ceil().to_integer() - BigInt::from(1);
        Some(CheckedI64(big_to_i64(&prev).unwrap_or(i64::MIN)))
    }
}

fn big_to_i64(i: &BigInt) -> Option<i64> {
    use num::ToPrimitive;
    i.to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::ratio;

    #[test]
    fn test_integer_rounding() {
        let (v, r) = CheckedI64::from_rational(&ratio(7, 2), Rounding::Down);
        assert_eq!((v.0, r), (3, Rounded::StrictlyBelow));
        let (v, r) = CheckedI64::from_rational(&ratio(7, 2), Rounding::Up);
        assert_eq!((v.0, r), (4, Rounded::StrictlyAbove));
        let (v, r) = CheckedI64::from_rational(&ratio(4, 1), Rounding::Down);
        assert_eq!((v.0, r), (4, Rounded::Exact));
    }

    #[test]
    fn test_open_capability() {
        assert!(<Rational as IntervalScalar>::CAN_BE_OPEN);
        assert!(!ClosedRational::CAN_BE_OPEN);
        assert!(!CheckedI64::CAN_BE_OPEN);
    }
}
