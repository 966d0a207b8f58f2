use std::cmp::Ordering;

use num::{One, Signed, Zero};
use polyhedra_arith::coefficient::{self, Coefficient};
use serde::{Deserialize, Serialize};

/// Whether a row lives in a necessarily closed system or carries a trailing
/// epsilon slot encoding strictness.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topology {
    Closed,
    NotClosed,
}

/// The two row families: rows that must be saturated (lines, equalities)
/// and rows constrained to the nonnegative side (rays, points,
/// inequalities).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum RowKind {
    LineOrEquality,
    RayPointOrInequality,
}

/// A dense row of integer coefficients. Slot 0 is the inhomogeneous term
/// (or the divisor, on the generator side); the owning system decides how
/// trailing slots (epsilon, modulus, parameter divisor) are interpreted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinearRow {
    coeffs: Vec<Coefficient>,
    kind: RowKind,
    topology: Topology,
}

impl LinearRow {
    pub fn new(size: usize, kind: RowKind, topology: Topology) -> Self {
        LinearRow {
            coeffs: vec![Coefficient::zero(); size],
            kind,
            topology,
        }
    }

    pub fn from_coeffs(coeffs: Vec<Coefficient>, kind: RowKind, topology: Topology) -> Self {
        debug_assert!(!coeffs.is_empty());
        LinearRow {
            coeffs,
            kind,
            topology,
        }
    }

    pub fn size(&self) -> usize {
        self.coeffs.len()
    }

    pub fn kind(&self) -> RowKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: RowKind) {
        self.kind = kind;
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn set_topology(&mut self, topology: Topology) {
        self.topology = topology;
    }

    pub fn is_line_or_equality(&self) -> bool {
        self.kind == RowKind::LineOrEquality
    }

    pub fn coeff(&self, i: usize) -> &Coefficient {
        &self.coeffs[i]
    }

    pub fn coeff_mut(&mut self, i: usize) -> &mut Coefficient {
        &mut self.coeffs[i]
    }

    pub fn coeffs(&self) -> &[Coefficient] {
        &self.coeffs
    }

    pub fn coeffs_mut(&mut self) -> &mut [Coefficient] {
        &mut self.coeffs
    }

    pub fn into_coeffs(self) -> Vec<Coefficient> {
        self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_zero())
    }

    /// Negates every coefficient in `range`.
    pub fn negate_range(&mut self, range: std::ops::Range<usize>) {
        for c in &mut self.coeffs[range] {
            *c = -std::mem::take(c);
        }
    }

    pub fn negate(&mut self) {
        self.negate_range(0..self.coeffs.len());
    }

    /// Divides the row by the gcd of its nonzero entries.
    pub fn normalize(&mut self) {
        coefficient::normalize_slice(&mut self.coeffs);
    }

    /// For lines and equalities, fixes the sign convention: the first
    /// nonzero homogeneous coefficient is made positive.
    pub fn sign_normalize(&mut self) {
        if self.kind != RowKind::LineOrEquality {
            return;
        }
        let first_nonzero = self.coeffs[1..].iter().position(|c| !c.is_zero());
        if let Some(i) = first_nonzero {
            if self.coeffs[i + 1].is_negative() {
                self.negate();
            }
        }
    }

    /// Gcd normalization plus the sign convention: the canonical row form.
    pub fn strong_normalize(&mut self) {
        self.normalize();
        self.sign_normalize();
    }

    /// Combines `self` with `pivot` so that `self[col]` becomes zero,
    /// scaling `self` only by a positive factor so its kind keeps meaning.
    pub fn linear_combine(&mut self, pivot: &LinearRow, col: usize) {
        debug_assert!(!pivot.coeffs[col].is_zero());
        let b = self.coeffs[col].clone();
        if b.is_zero() {
            return;
        }
        let a = pivot.coeffs[col].clone();
        let g = coefficient::gcd(&a, &b);
        let mut na = &a / &g;
        let mut nb = &b / &g;
        if na.is_negative() {
            na = -na;
            nb = -nb;
        }
        let len = self.coeffs.len().min(pivot.coeffs.len());
        for i in 0..len {
            let s = std::mem::take(&mut self.coeffs[i]);
            self.coeffs[i] = s * &na - pivot.coeffs[i].clone() * &nb;
        }
        for c in &mut self.coeffs[len..] {
            *c *= &na;
        }
        debug_assert!(self.coeffs[col].is_zero());
        self.strong_normalize();
    }

    /// Ordering used by system sorting: row family first, then the
    /// homogeneous coefficients lexicographically, the inhomogeneous term
    /// last.
    pub fn compare(&self, other: &LinearRow) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| {
                let lhs = &self.coeffs[1..];
                let rhs = &other.coeffs[1..];
                lhs.cmp(rhs)
            })
            .then_with(|| self.coeffs[0].cmp(&other.coeffs[0]))
    }

    /// Grows or shrinks the row to `size`, keeping the last `trailing`
    /// slots (epsilon, modulus, parameter divisor) in place at the end.
    pub fn resize_with_trailing(&mut self, size: usize, trailing: usize) {
        debug_assert!(size >= 1 + trailing);
        let old = self.coeffs.len();
        if size == old {
            return;
        }
        if size > old {
            let tail: Vec<_> = self.coeffs.drain(old - trailing..).collect();
            self.coeffs.resize(size - trailing, Coefficient::zero());
            self.coeffs.extend(tail);
        } else {
            let tail: Vec<_> = self.coeffs.drain(old - trailing..).collect();
            self.coeffs.truncate(size - trailing);
            self.coeffs.extend(tail);
        }
    }
}

/// Full scalar product over every shared slot; shorter rows are read as
/// zero-extended.
pub fn scalar_product(x: &LinearRow, y: &LinearRow) -> Coefficient {
    let len = x.size().min(y.size());
    let mut acc = Coefficient::zero();
    for i in 0..len {
        if !x.coeffs[i].is_zero() && !y.coeffs[i].is_zero() {
            acc += &x.coeffs[i] * &y.coeffs[i];
        }
    }
    acc
}

/// Scalar product ignoring the trailing epsilon slot of two rows from the
/// same not-necessarily-closed system.
pub fn reduced_scalar_product(x: &LinearRow, y: &LinearRow) -> Coefficient {
    let len = x.size().min(y.size());
    debug_assert!(len > 0);
    let mut acc = Coefficient::zero();
    for i in 0..len - 1 {
        if !x.coeffs[i].is_zero() && !y.coeffs[i].is_zero() {
            acc += &x.coeffs[i] * &y.coeffs[i];
        }
    }
    acc
}

/// Scalar product ignoring slot 0 on both sides.
pub fn homogeneous_scalar_product(x: &LinearRow, y: &LinearRow) -> Coefficient {
    let len = x.size().min(y.size());
    let mut acc = Coefficient::zero();
    for i in 1..len {
        if !x.coeffs[i].is_zero() && !y.coeffs[i].is_zero() {
            acc += &x.coeffs[i] * &y.coeffs[i];
        }
    }
    acc
}

/// Checks that a strongly normalized row is indeed primitive.
pub fn is_strongly_normalized(row: &LinearRow) -> bool {
    let g = coefficient::gcd_of_slice(row.coeffs());
    if !g.is_zero() && !g.is_one() {
        return false;
    }
    if row.is_line_or_equality() {
        if let Some(i) = row.coeffs()[1..].iter().position(|c| !c.is_zero()) {
            return !row.coeffs()[i + 1].is_negative();
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cs: &[i64], kind: RowKind) -> LinearRow {
        LinearRow::from_coeffs(
            cs.iter().map(|&c| Coefficient::from(c)).collect(),
            kind,
            Topology::Closed,
        )
    }

    #[test]
    fn test_strong_normalize() {
        let mut r = row(&[4, -6, 2], RowKind::LineOrEquality);
        r.strong_normalize();
        assert_eq!(r, row(&[-2, 3, -1], RowKind::LineOrEquality));

        // Inequalities keep their orientation.
        let mut r = row(&[4, -6, 2], RowKind::RayPointOrInequality);
        r.strong_normalize();
        assert_eq!(r, row(&[2, -3, 1], RowKind::RayPointOrInequality));
    }

    #[test]
    fn test_linear_combine() {
        let pivot = row(&[0, 2, 1], RowKind::LineOrEquality);
        let mut r = row(&[1, 3, 0], RowKind::RayPointOrInequality);
        r.linear_combine(&pivot, 1);
        assert!(r.coeff(1).is_zero());
        // 2*(1,3,0) - 3*(0,2,1) = (2,0,-3).
        assert_eq!(r, row(&[2, 0, -3], RowKind::RayPointOrInequality));
    }

    #[test]
    fn test_scalar_products() {
        let x = row(&[1, 2, 3], RowKind::RayPointOrInequality);
        let y = row(&[4, 5, 6], RowKind::RayPointOrInequality);
        assert_eq!(scalar_product(&x, &y), Coefficient::from(32));
        assert_eq!(homogeneous_scalar_product(&x, &y), Coefficient::from(28));
        assert_eq!(reduced_scalar_product(&x, &y), Coefficient::from(14));
    }

    #[test]
    fn test_resize_with_trailing() {
        let mut r = row(&[1, 2, 9], RowKind::RayPointOrInequality);
        r.resize_with_trailing(5, 1);
        assert_eq!(r, row(&[1, 2, 0, 0, 9], RowKind::RayPointOrInequality));
        r.resize_with_trailing(3, 1);
        assert_eq!(r, row(&[1, 2, 9], RowKind::RayPointOrInequality));
    }

    #[test]
    fn test_compare_orders_equalities_first() {
        let eq = row(&[0, 1, 1], RowKind::LineOrEquality);
        let ineq = row(&[0, 1, 0], RowKind::RayPointOrInequality);
        assert_eq!(eq.compare(&ineq), Ordering::Less);
    }
}
