use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// An extended scalar: a member of `{-oo} ∪ S ∪ {+oo}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Bound<S> {
    MinusInfinity,
    Finite(S),
    PlusInfinity,
}

impl<S> Bound<S> {
    pub fn is_finite(&self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    pub fn as_finite(&self) -> Option<&S> {
        match self {
            Bound::Finite(s) => Some(s),
            _ => None,
        }
    }
}

impl<S: Ord> Bound<S> {
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        use Bound::*;
        match (self, other) {
            (MinusInfinity, MinusInfinity) | (PlusInfinity, PlusInfinity) => Ordering::Equal,
            (MinusInfinity, _) | (_, PlusInfinity) => Ordering::Less,
            (_, MinusInfinity) | (PlusInfinity, _) => Ordering::Greater,
            (Finite(a), Finite(b)) => a.cmp(b),
        }
    }
}

/// An interval endpoint: an extended scalar plus an openness bit.
///
/// Infinite endpoints are normalized to open; constructors enforce this so
/// comparisons never have to special-case it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Boundary<S> {
    pub value: Bound<S>,
    pub open: bool,
}

impl<S> Boundary<S> {
    pub fn finite(value: S, open: bool) -> Self {
        Boundary {
            value: Bound::Finite(value),
            open,
        }
    }

    pub fn minus_infinity() -> Self {
        Boundary {
            value: Bound::MinusInfinity,
            open: true,
        }
    }

    pub fn plus_infinity() -> Self {
        Boundary {
            value: Bound::PlusInfinity,
            open: true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        !self.value.is_finite()
    }
}

impl<S: Ord> Boundary<S> {
    /// Orders two endpoints both used as lower bounds; the smaller one is
    /// the looser. At equal finite values a closed bound precedes an open
    /// one.
    pub fn lower_cmp(a: &Self, b: &Self) -> Ordering {
        a.value
            .total_cmp(&b.value)
            .then_with(|| a.open.cmp(&b.open))
    }

    /// Orders two endpoints both used as upper bounds; the smaller one is
    /// the tighter. At equal finite values an open bound precedes a closed
    /// one.
    pub fn upper_cmp(a: &Self, b: &Self) -> Ordering {
        a.value
            .total_cmp(&b.value)
            .then_with(|| b.open.cmp(&a.open))
    }

    /// Whether a lower endpoint and an upper endpoint bound an empty set.
    pub fn makes_empty(lower: &Self, upper: &Self) -> bool {
        match lower.value.total_cmp(&upper.value) {
            Ordering::Greater => true,
            Ordering::Equal => {
                // A common finite value is a singleton only when both ends
                // are closed; equal infinities never occur in valid
                // intervals and are treated as empty.
                lower.open || upper.open || !lower.value.is_finite()
            }
            Ordering::Less => false,
        }
    }
}
