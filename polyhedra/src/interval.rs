use std::cmp::Ordering;

use num::{Signed, Zero};
use polyhedra_arith::bound::{Bound, Boundary};
use polyhedra_arith::{IntervalScalar, Rational, Rounded, Rounding, Ternary};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::relation::RelSym;

/// A (possibly empty, possibly unbounded) interval over an
/// [`IntervalScalar`]. Emptiness is implied by the endpoints: a lower bound
/// above the upper one, or meeting it with an open end.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Interval<S: IntervalScalar> {
    lower: Boundary<S>,
    upper: Boundary<S>,
}

/// The exact scratch kind used to evaluate linear forms before rounding
/// into a narrower target.
pub type RationalInterval = Interval<Rational>;

impl<S: IntervalScalar> Default for Interval<S> {
    fn default() -> Self {
        Self::universe()
    }
}

impl<S: IntervalScalar> Interval<S> {
    pub fn universe() -> Self {
        Interval {
            lower: Boundary::minus_infinity(),
            upper: Boundary::plus_infinity(),
        }
    }

    pub fn empty() -> Self {
        Interval {
            lower: Boundary::finite(S::zero(), true),
            upper: Boundary::finite(S::zero(), true),
        }
    }

    pub fn singleton(v: S) -> Self {
        Interval {
            lower: Boundary::finite(v.clone(), false),
            upper: Boundary::finite(v, false),
        }
    }

    /// The singleton `q`, exactly when representable; over a discrete kind
    /// an unrepresentable rational yields the empty interval.
    pub fn singleton_rational(q: &Rational) -> Self {
        let (lo, _) = S::from_rational(q, Rounding::Up);
        let (hi, _) = S::from_rational(q, Rounding::Down);
        Interval {
            lower: Boundary::finite(lo, false),
            upper: Boundary::finite(hi, false),
        }
    }

    pub fn lower(&self) -> &Boundary<S> {
        &self.lower
    }

    pub fn upper(&self) -> &Boundary<S> {
        &self.upper
    }

    pub fn is_empty(&self) -> bool {
        Boundary::makes_empty(&self.lower, &self.upper)
    }

    pub fn is_universe(&self) -> bool {
        self.lower.is_unbounded()
            && self.upper.is_unbounded()
            && matches!(self.lower.value, Bound::MinusInfinity)
            && matches!(self.upper.value, Bound::PlusInfinity)
    }

    pub fn is_singleton(&self) -> bool {
        !self.lower.open
            && !self.upper.open
            && self.lower.value.is_finite()
            && self.lower.value == self.upper.value
    }

    pub fn is_bounded(&self) -> bool {
        self.is_empty() || (self.lower.value.is_finite() && self.upper.value.is_finite())
    }

    /// Closed or empty; unbounded sides count as closed.
    pub fn is_topologically_closed(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        (self.lower.is_unbounded() || !self.lower.open)
            && (self.upper.is_unbounded() || !self.upper.open)
    }

    pub fn assign_universe(&mut self) {
        *self = Self::universe();
    }

    pub fn assign_empty(&mut self) {
        *self = Self::empty();
    }

    /// Replaces the lower endpoint outright.
    pub fn set_lower(&mut self, value: Bound<S>, open: bool) -> Result<()> {
        if open && value.is_finite() && !S::CAN_BE_OPEN {
            return Err(open_bound_error("Interval::set_lower"));
        }
        self.lower = match value {
            Bound::Finite(v) => Boundary::finite(v, open),
            Bound::MinusInfinity => Boundary::minus_infinity(),
            Bound::PlusInfinity => Boundary::plus_infinity(),
        };
        Ok(())
    }

    pub fn set_upper(&mut self, value: Bound<S>, open: bool) -> Result<()> {
        if open && value.is_finite() && !S::CAN_BE_OPEN {
            return Err(open_bound_error("Interval::set_upper"));
        }
        self.upper = match value {
            Bound::Finite(v) => Boundary::finite(v, open),
            Bound::MinusInfinity => Boundary::minus_infinity(),
            Bound::PlusInfinity => Boundary::plus_infinity(),
        };
        Ok(())
    }

    pub fn intersect_assign(&mut self, other: &Self) {
        if Boundary::lower_cmp(&other.lower, &self.lower) == Ordering::Greater {
            self.lower = other.lower.clone();
        }
        if Boundary::upper_cmp(&other.upper, &self.upper) == Ordering::Less {
            self.upper = other.upper.clone();
        }
    }

    pub fn join_assign(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        if Boundary::lower_cmp(&other.lower, &self.lower) == Ordering::Less {
            self.lower = other.lower.clone();
        }
        if Boundary::upper_cmp(&other.upper, &self.upper) == Ordering::Greater {
            self.upper = other.upper.clone();
        }
    }

    pub fn contains(&self, other: &Self) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        Boundary::lower_cmp(&self.lower, &other.lower) != Ordering::Greater
            && Boundary::upper_cmp(&other.upper, &self.upper) != Ordering::Greater
    }

    pub fn is_disjoint_from(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        Boundary::makes_empty(&self.lower, &other.upper)
            || Boundary::makes_empty(&other.lower, &self.upper)
    }

    /// Whether the set union of the two intervals is itself an interval.
    pub fn can_be_exactly_joined_to(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        let no_gap = |hi: &Boundary<S>, lo: &Boundary<S>| match hi.value.total_cmp(&lo.value) {
            Ordering::Greater => true,
            Ordering::Equal => !(hi.open && lo.open),
            Ordering::Less => false,
        };
        no_gap(&self.upper, &other.lower) && no_gap(&other.upper, &self.lower)
    }

    /// Removes `other` when the result is still an interval; when `other`
    /// splits this interval in two the receiver is left unchanged (the
    /// tightest interval over-approximation).
    pub fn difference_assign(&mut self, other: &Self) {
        if self.is_empty() || other.is_empty() || self.is_disjoint_from(other) {
            return;
        }
        let covers_lower = Boundary::lower_cmp(&other.lower, &self.lower) != Ordering::Greater;
        let covers_upper = Boundary::upper_cmp(&self.upper, &other.upper) != Ordering::Greater;
        match (covers_lower, covers_upper) {
            (true, true) => self.assign_empty(),
            (true, false) => {
                // The kept part starts where `other` ends, with flipped
                // openness.
                if let Bound::Finite(v) = &other.upper.value {
                    if S::CAN_BE_OPEN || other.upper.open {
                        self.lower = Boundary::finite(v.clone(), !other.upper.open);
                    }
                } else {
                    self.assign_empty();
                }
            }
            (false, true) => {
                if let Bound::Finite(v) = &other.lower.value {
                    if S::CAN_BE_OPEN || other.lower.open {
                        self.upper = Boundary::finite(v.clone(), !other.lower.open);
                    }
                } else {
                    self.assign_empty();
                }
            }
            (false, false) => {}
        }
    }

    /// Narrows the lower bound to `v`: the bound only ever moves up.
    pub fn lower_narrow(&mut self, v: S, open: bool) -> Result<()> {
        if open && !S::CAN_BE_OPEN {
            return Err(open_bound_error("Interval::lower_narrow"));
        }
        let candidate = Boundary::finite(v, open);
        if Boundary::lower_cmp(&candidate, &self.lower) == Ordering::Greater {
            self.lower = candidate;
        }
        Ok(())
    }

    /// Narrows the upper bound to `v`: the bound only ever moves down.
    pub fn upper_narrow(&mut self, v: S, open: bool) -> Result<()> {
        if open && !S::CAN_BE_OPEN {
            return Err(open_bound_error("Interval::upper_narrow"));
        }
        let candidate = Boundary::finite(v, open);
        if Boundary::upper_cmp(&candidate, &self.upper) == Ordering::Less {
            self.upper = candidate;
        }
        Ok(())
    }

    /// Intersects with the exact set `{x : x >= q}` (or `> q` when open).
    pub fn refine_lower(&mut self, q: &Rational, open: bool) -> Result<()> {
        let b = convert_lower_exact::<S>(q, open)?;
        if Boundary::lower_cmp(&b, &self.lower) == Ordering::Greater {
            self.lower = b;
        }
        Ok(())
    }

    /// Intersects with the exact set `{x : x <= q}` (or `< q` when open).
    pub fn refine_upper(&mut self, q: &Rational, open: bool) -> Result<()> {
        let b = convert_upper_exact::<S>(q, open)?;
        if Boundary::upper_cmp(&b, &self.upper) == Ordering::Less {
            self.upper = b;
        }
        Ok(())
    }

    /// Intersects with `{x : x relsym q}`.
    pub fn refine_existential(&mut self, relsym: RelSym, q: &Rational) -> Result<()> {
        match relsym {
            RelSym::GreaterOrEqual => self.refine_lower(q, false),
            RelSym::GreaterThan => self.refine_lower(q, true),
            RelSym::LessOrEqual => self.refine_upper(q, false),
            RelSym::LessThan => self.refine_upper(q, true),
            RelSym::Equal => {
                self.refine_lower(q, false)?;
                self.refine_upper(q, false)
            }
            RelSym::NotEqual => {
                // Only a singleton endpoint can be peeled off exactly.
                let mut single = Self::singleton_rational(q);
                if single.is_empty() {
                    return Ok(());
                }
                if self.is_singleton() && self.lower.value == single.lower.value {
                    self.assign_empty();
                    return Ok(());
                }
                if S::CAN_BE_OPEN {
                    if self.lower == single.lower {
                        self.lower.open = true;
                    }
                    if self.upper == single.upper {
                        self.upper.open = true;
                    }
                } else {
                    single.lower.open = true;
                    single.upper.open = true;
                }
                Ok(())
            }
        }
    }

    /// Exact view of this interval over the rational scratch kind.
    pub fn to_rational_interval(&self) -> RationalInterval {
        let map = |b: &Boundary<S>| match &b.value {
            Bound::Finite(v) => Boundary::finite(v.to_rational(), b.open),
            Bound::MinusInfinity => Boundary::minus_infinity(),
            Bound::PlusInfinity => Boundary::plus_infinity(),
        };
        Interval {
            lower: map(&self.lower),
            upper: map(&self.upper),
        }
    }

    /// Sound outward-rounded assignment from an exactly computed scratch
    /// interval; openness survives only exact, open-capable conversions.
    pub fn assign_sound(&mut self, exact: &RationalInterval) {
        if exact.is_empty() {
            self.assign_empty();
            return;
        }
        self.lower = match &exact.lower.value {
            Bound::MinusInfinity => Boundary::minus_infinity(),
            Bound::PlusInfinity => Boundary::plus_infinity(),
            Bound::Finite(q) => {
                let (v, rounded) = S::from_rational(q, Rounding::Down);
                if rounded == Rounded::MinusOverflow {
                    Boundary::minus_infinity()
                } else {
                    let open = exact.lower.open && S::CAN_BE_OPEN && rounded.is_exact();
                    Boundary::finite(v, open)
                }
            }
        };
        self.upper = match &exact.upper.value {
            Bound::MinusInfinity => Boundary::minus_infinity(),
            Bound::PlusInfinity => Boundary::plus_infinity(),
            Bound::Finite(q) => {
                let (v, rounded) = S::from_rational(q, Rounding::Up);
                if rounded == Rounded::PlusOverflow {
                    Boundary::plus_infinity()
                } else {
                    let open = exact.upper.open && S::CAN_BE_OPEN && rounded.is_exact();
                    Boundary::finite(v, open)
                }
            }
        };
    }

    /// The CC76 interval widening against the previous, smaller iterate:
    /// a bound that moved escapes to the nearest stop point beyond it, or
    /// to infinity past the last one. `stop_points` is sorted ascending.
    pub fn cc76_widening_assign(&mut self, old: &Self, stop_points: &[Rational]) {
        if old.is_empty() || self.is_empty() {
            return;
        }
        if Boundary::lower_cmp(&self.lower, &old.lower) == Ordering::Less {
            let mut replaced = Boundary::minus_infinity();
            for q in stop_points.iter().rev() {
                let (v, rounded) = S::from_rational(q, Rounding::Down);
                if rounded.is_overflow() {
                    continue;
                }
                let stop = Boundary::finite(v, false);
                if Boundary::lower_cmp(&stop, &self.lower) != Ordering::Greater {
                    replaced = stop;
                    break;
                }
            }
            self.lower = replaced;
        }
        if Boundary::upper_cmp(&self.upper, &old.upper) == Ordering::Greater {
            let mut replaced = Boundary::plus_infinity();
            for q in stop_points.iter() {
                let (v, rounded) = S::from_rational(q, Rounding::Up);
                if rounded.is_overflow() {
                    continue;
                }
                let stop = Boundary::finite(v, false);
                if Boundary::upper_cmp(&stop, &self.upper) != Ordering::Less {
                    replaced = stop;
                    break;
                }
            }
            self.upper = replaced;
        }
    }
}

fn open_bound_error(method: &'static str) -> Error {
    Error::invalid_argument(method, "open bound over a closed interval kind")
}

fn convert_lower_exact<S: IntervalScalar>(q: &Rational, open: bool) -> Result<Boundary<S>> {
    if open && !S::CAN_BE_OPEN {
        return match S::strict_lower_to_closed(q) {
            Some(v) => Ok(Boundary::finite(v, false)),
            None => Err(open_bound_error("Interval::refine_lower")),
        };
    }
    let (v, rounded) = S::from_rational(q, Rounding::Up);
    if rounded == Rounded::PlusOverflow {
        // The representable values stop below the requested bound; saturate
        // closed, which over-approximates the refinement soundly.
        return Ok(Boundary::finite(v, false));
    }
    let open = open && rounded.is_exact();
    Ok(Boundary::finite(v, open))
}

fn convert_upper_exact<S: IntervalScalar>(q: &Rational, open: bool) -> Result<Boundary<S>> {
    if open && !S::CAN_BE_OPEN {
        return match S::strict_upper_to_closed(q) {
            Some(v) => Ok(Boundary::finite(v, false)),
            None => Err(open_bound_error("Interval::refine_upper")),
        };
    }
    let (v, rounded) = S::from_rational(q, Rounding::Down);
    if rounded == Rounded::MinusOverflow {
        return Ok(Boundary::finite(v, false));
    }
    let open = open && rounded.is_exact();
    Ok(Boundary::finite(v, open))
}

// Exact extended-rational arithmetic on the scratch kind. Only what linear
// form evaluation needs: negation, translation, scaling, and sums.
impl RationalInterval {
    pub fn neg_assign(&mut self) {
        let flip = |b: &Boundary<Rational>| match &b.value {
            Bound::Finite(q) => Boundary::finite(-q, b.open),
            Bound::MinusInfinity => Boundary::plus_infinity(),
            Bound::PlusInfinity => Boundary::minus_infinity(),
        };
        let new_lower = flip(&self.upper);
        let new_upper = flip(&self.lower);
        self.lower = new_lower;
        self.upper = new_upper;
    }

    pub fn add_assign(&mut self, other: &RationalInterval) {
        if self.is_empty() {
            return;
        }
        if other.is_empty() {
            self.assign_empty();
            return;
        }
        self.lower = add_lower(&self.lower, &other.lower);
        self.upper = add_upper(&self.upper, &other.upper);
    }

    /// Multiplies by an exact rational constant.
    pub fn scale_assign(&mut self, q: &Rational) {
        if self.is_empty() {
            return;
        }
        if q.is_zero() {
            *self = RationalInterval::singleton(<Rational as num::Zero>::zero());
            return;
        }
        let scale = |b: &Boundary<Rational>| match &b.value {
            Bound::Finite(v) => {
                // Openness of a scaled finite bound follows the operand:
                // with a nonzero factor the supremum is attained exactly
                // when it was before. The ternary tracks the undecided
                // state until the factor's sign is known.
                let open = Ternary::from_bool(b.open);
                (Boundary::finite(v * q, open.decide(false)), open)
            }
            Bound::MinusInfinity => (Boundary::minus_infinity(), Ternary::Yes),
            Bound::PlusInfinity => (Boundary::plus_infinity(), Ternary::Yes),
        };
        let (lo, _) = scale(&self.lower);
        let (hi, _) = scale(&self.upper);
        if q.is_positive() {
            self.lower = lo;
            self.upper = hi;
        } else {
            self.lower = hi;
            self.upper = lo;
            // A negated infinity changes side.
            if matches!(self.lower.value, Bound::PlusInfinity) {
                self.lower = Boundary::minus_infinity();
            }
            if matches!(self.upper.value, Bound::MinusInfinity) {
                self.upper = Boundary::plus_infinity();
            }
        }
    }

    /// Adds `q * other`, the workhorse of linear form evaluation.
    pub fn add_mul_assign(&mut self, q: &Rational, other: &RationalInterval) {
        if q.is_zero() {
            return;
        }
        let mut scaled = other.clone();
        scaled.scale_assign(q);
        self.add_assign(&scaled);
    }

    pub fn translate_assign(&mut self, q: &Rational) {
        self.add_assign(&RationalInterval::singleton(q.clone()));
    }

    pub fn div_assign_coeff(&mut self, q: &Rational) {
        debug_assert!(!q.is_zero());
        let inv = Rational::from(num::BigInt::from(1)) / q;
        self.scale_assign(&inv);
    }
}

fn add_lower(a: &Boundary<Rational>, b: &Boundary<Rational>) -> Boundary<Rational> {
    match (&a.value, &b.value) {
        (Bound::MinusInfinity, _) | (_, Bound::MinusInfinity) => Boundary::minus_infinity(),
        (Bound::Finite(x), Bound::Finite(y)) => Boundary::finite(x + y, a.open || b.open),
        // A +oo lower endpoint never appears in a nonempty interval.
        _ => Boundary::plus_infinity(),
    }
}

fn add_upper(a: &Boundary<Rational>, b: &Boundary<Rational>) -> Boundary<Rational> {
    match (&a.value, &b.value) {
        (Bound::PlusInfinity, _) | (_, Bound::PlusInfinity) => Boundary::plus_infinity(),
        (Bound::Finite(x), Bound::Finite(y)) => Boundary::finite(x + y, a.open || b.open),
        _ => Boundary::minus_infinity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhedra_arith::rational::ratio;
    use polyhedra_arith::{CheckedI64, ClosedRational};

    fn rint(lo: i64, hi: i64) -> RationalInterval {
        let mut i = RationalInterval::universe();
        i.refine_lower(&ratio(lo, 1), false).unwrap();
        i.refine_upper(&ratio(hi, 1), false).unwrap();
        i
    }

    #[test]
    fn test_emptiness_and_universe() {
        assert!(RationalInterval::empty().is_empty());
        assert!(RationalInterval::universe().is_universe());
        assert!(!rint(0, 1).is_empty());
        let mut i = rint(0, 1);
        i.refine_lower(&ratio(2, 1), false).unwrap();
        assert!(i.is_empty());
    }

    #[test]
    fn test_open_refinement() {
        let mut i = RationalInterval::universe();
        i.refine_lower(&ratio(3, 1), true).unwrap();
        assert!(i.lower().open);
        assert!(!i.is_topologically_closed());
        // x > 3 and x <= 3 is empty.
        i.refine_upper(&ratio(3, 1), false).unwrap();
        assert!(i.is_empty());
    }

    #[test]
    fn test_integer_kind_closes_strict_bounds() {
        let mut i: Interval<CheckedI64> = Interval::universe();
        i.refine_lower(&ratio(3, 1), true).unwrap();
        assert_eq!(i.lower(), &Boundary::finite(CheckedI64(4), false));
        i.refine_upper(&ratio(13, 2), false).unwrap();
        assert_eq!(i.upper(), &Boundary::finite(CheckedI64(6), false));
    }

    #[test]
    fn test_closed_kind_rejects_strict_bounds() {
        let mut i: Interval<ClosedRational> = Interval::universe();
        assert!(i.refine_lower(&ratio(3, 1), true).is_err());
        assert!(i.refine_lower(&ratio(3, 1), false).is_ok());
    }

    #[test]
    fn test_lattice() {
        let mut a = rint(0, 10);
        a.intersect_assign(&rint(5, 20));
        assert_eq!(a, rint(5, 10));
        let mut b = rint(0, 1);
        b.join_assign(&rint(5, 6));
        assert_eq!(b, rint(0, 6));
        assert!(rint(0, 10).contains(&rint(3, 4)));
        assert!(rint(0, 1).is_disjoint_from(&rint(2, 3)));
        assert!(rint(0, 1).can_be_exactly_joined_to(&rint(1, 2)));
        assert!(!rint(0, 1).can_be_exactly_joined_to(&rint(3, 4)));
    }

    #[test]
    fn test_difference() {
        let mut a = rint(0, 10);
        a.difference_assign(&rint(5, 20));
        // Upper side removed; kept part ends just below 5.
        assert_eq!(a.upper(), &Boundary::finite(ratio(5, 1), true));
        let mut b = rint(0, 10);
        b.difference_assign(&rint(3, 4));
        assert_eq!(b, rint(0, 10));
        let mut c = rint(0, 10);
        c.difference_assign(&rint(-1, 11));
        assert!(c.is_empty());
    }

    #[test]
    fn test_narrowing_never_loosens() {
        let mut i = rint(2, 8);
        i.lower_narrow(ratio(1, 1), false).unwrap();
        assert_eq!(i, rint(2, 8));
        i.lower_narrow(ratio(3, 1), false).unwrap();
        assert_eq!(i, rint(3, 8));
    }

    #[test]
    fn test_arithmetic() {
        let mut i = rint(1, 2);
        i.add_mul_assign(&ratio(3, 1), &rint(10, 20));
        assert_eq!(i, rint(31, 62));
        i.scale_assign(&ratio(-1, 1));
        assert_eq!(i, rint(-62, -31));
        let mut u = RationalInterval::universe();
        u.add_assign(&rint(1, 1));
        assert!(u.is_universe());
    }

    #[test]
    fn test_cc76_widening() {
        let stops: Vec<Rational> = [-2i64, -1, 0, 1, 2].iter().map(|&s| ratio(s, 1)).collect();
        let mut newer = rint(-5, 1);
        newer.cc76_widening_assign(&rint(0, 1), &stops);
        // Lower escaped past the smallest stop point to -oo; upper did not
        // move.
        assert!(newer.lower().is_unbounded());
        assert_eq!(newer.upper(), &Boundary::finite(ratio(1, 1), false));

        let mut newer = rint(0, 3);
        newer.cc76_widening_assign(&rint(0, 1), &stops);
        // Upper moved: it lands on +oo since 3 is past the last stop.
        assert!(newer.upper().is_unbounded());

        let mut newer = rint(0, 2);
        newer.cc76_widening_assign(&rint(0, 1), &stops);
        assert_eq!(newer.upper(), &Boundary::finite(ratio(2, 1), false));
    }

    #[test]
    fn test_singleton_rational_on_discrete_kind() {
        let i: Interval<CheckedI64> = Interval::singleton_rational(&ratio(1, 2));
        assert!(i.is_empty());
        let j: Interval<CheckedI64> = Interval::singleton_rational(&ratio(4, 2));
        assert!(j.is_singleton());
    }
}
