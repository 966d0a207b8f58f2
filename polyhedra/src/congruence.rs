use std::fmt;

use num::{Signed, Zero};
use polyhedra_arith::coefficient::{self, Coefficient};
use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::linear::{LinearRow, LinearSystem, RowKind, Topology};

/// A congruence `e + b ≡ 0 (mod m)` over a row whose last slot holds the
/// modulus; `m = 0` makes it an equality. Canonical form keeps the first
/// nonzero homogeneous coefficient positive and the inhomogeneous term in
/// `[0, m)`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Congruence {
    row: LinearRow,
}

impl Congruence {
    pub(crate) fn from_row(row: LinearRow) -> Self {
        Congruence { row }
    }

    pub(crate) fn row(&self) -> &LinearRow {
        &self.row
    }

    pub(crate) fn into_row(self) -> LinearRow {
        self.row
    }

    fn build(expr: LinearExpr, modulus: Coefficient) -> Self {
        let dim = expr.space_dimension();
        let mut coeffs = Vec::with_capacity(dim + 2);
        coeffs.extend(expr.all_coefficients().iter().cloned());
        coeffs.push(modulus);
        let kind = if coeffs[dim + 1].is_zero() {
            RowKind::LineOrEquality
        } else {
            RowKind::RayPointOrInequality
        };
        let mut cg = Congruence {
            row: LinearRow::from_coeffs(coeffs, kind, Topology::Closed),
        };
        cg.strong_normalize();
        cg
    }

    /// The 0-dimensional false congruence `1 = 0`.
    pub fn zero_dim_false() -> Self {
        Congruence::build(LinearExpr::constant(1), Coefficient::zero())
    }

    /// The 0-dimensional integrality congruence `0 ≡ 0 (mod 1)`.
    pub fn zero_dim_integrality() -> Self {
        Congruence::build(LinearExpr::zero(), Coefficient::from(1))
    }

    /// An equality congruence from a constraint; inequalities are not
    /// expressible.
    pub fn from_constraint(c: &Constraint) -> Result<Self> {
        if !c.is_equality() {
            return Err(Error::invalid_argument(
                "Congruence::from_constraint",
                "only equalities are expressible as congruences",
            ));
        }
        Ok(Congruence::build(c.linear_expr(), Coefficient::zero()))
    }

    /// Replaces the modulus; a negative value is normalized to its absolute
    /// value and zero turns the congruence into an equality.
    pub fn modulo(mut self, m: impl Into<Coefficient>) -> Self {
        let m = m.into();
        let last = self.row.size() - 1;
        *self.row.coeff_mut(last) = m.abs();
        let kind = if self.row.coeff(last).is_zero() {
            RowKind::LineOrEquality
        } else {
            RowKind::RayPointOrInequality
        };
        self.row.set_kind(kind);
        self.strong_normalize();
        self
    }

    pub fn space_dimension(&self) -> usize {
        self.row.size() - 2
    }

    pub fn modulus(&self) -> &Coefficient {
        self.row.coeff(self.row.size() - 1)
    }

    pub fn is_equality(&self) -> bool {
        self.modulus().is_zero()
    }

    pub fn is_proper_congruence(&self) -> bool {
        !self.is_equality()
    }

    pub fn coefficient(&self, v: Variable) -> Coefficient {
        if v.space_dimension() > self.space_dimension() {
            return Coefficient::zero();
        }
        self.row.coeff(v.id() + 1).clone()
    }

    pub fn inhomogeneous_term(&self) -> &Coefficient {
        self.row.coeff(0)
    }

    pub fn linear_expr(&self) -> LinearExpr {
        let dim = self.space_dimension();
        LinearExpr::from_parts(
            self.row.coeff(0).clone(),
            (1..=dim).map(|i| self.row.coeff(i).clone()).collect(),
        )
    }

    fn is_trivial(&self) -> bool {
        let dim = self.space_dimension();
        (1..=dim).all(|i| self.row.coeff(i).is_zero())
    }

    pub fn is_tautological(&self) -> bool {
        if !self.is_trivial() {
            return false;
        }
        let b = self.row.coeff(0);
        if self.is_equality() {
            b.is_zero()
        } else {
            (b % self.modulus()).is_zero()
        }
    }

    pub fn is_inconsistent(&self) -> bool {
        if !self.is_trivial() {
            return false;
        }
        !self.is_tautological()
    }

    /// Sign convention plus centering of the inhomogeneous term into
    /// `[0, m)`.
    pub(crate) fn normalize(&mut self) {
        let size = self.row.size();
        let first_nonzero = (1..size - 1).find(|&i| !self.row.coeff(i).is_zero());
        if let Some(i) = first_nonzero {
            if self.row.coeff(i).is_negative() {
                self.row.negate_range(0..size - 1);
            }
        }
        let m = self.modulus().clone();
        if !m.is_zero() {
            let b = self.row.coeff_mut(0);
            *b = &*b % &m;
            if b.is_negative() {
                *b += &m;
            }
        }
    }

    pub(crate) fn strong_normalize(&mut self) {
        self.normalize();
        // Primitive form, modulus included: 2x ≡ 0 (mod 4) is x ≡ 0 (mod 2).
        coefficient::normalize_slice(self.row.coeffs_mut());
        self.normalize();
    }
}

impl fmt::Display for Congruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_equality() {
            write!(f, "{} = 0", self.linear_expr())
        } else {
            write!(f, "{} ≡ 0 (mod {})", self.linear_expr(), self.modulus())
        }
    }
}

impl LinearExpr {
    /// Builds `self ≡ rhs (mod 1)`; chain [`Congruence::modulo`] for another
    /// modulus.
    pub fn congruent_to(self, rhs: impl Into<LinearExpr>) -> Congruence {
        Congruence::build(self - rhs, Coefficient::from(1))
    }
}

impl Variable {
    pub fn congruent_to(self, rhs: impl Into<LinearExpr>) -> Congruence {
        LinearExpr::from_variable(self).congruent_to(rhs)
    }
}

/// A system of congruences sharing a space dimension.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CongruenceSystem {
    sys: LinearSystem,
    space_dim: usize,
}

impl CongruenceSystem {
    pub fn new(space_dim: usize) -> Self {
        CongruenceSystem {
            sys: LinearSystem::new(space_dim + 2, Topology::Closed),
            space_dim,
        }
    }

    /// The 0-dimensional system containing the false congruence.
    pub fn zero_dim_empty() -> Self {
        let mut cgs = CongruenceSystem::new(0);
        cgs.sys.add_row(Congruence::zero_dim_false().into_row());
        cgs
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    pub fn num_rows(&self) -> usize {
        self.sys.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.sys.num_rows() == 0
    }

    pub fn num_equalities(&self) -> usize {
        self.iter().filter(|cg| cg.is_equality()).count()
    }

    pub fn num_proper_congruences(&self) -> usize {
        self.num_rows() - self.num_equalities()
    }

    /// Inserts a congruence, growing the space dimension as needed.
    pub fn insert(&mut self, cg: Congruence) -> Result<()> {
        if cg.space_dimension() > self.space_dim {
            let n = cg.space_dimension() - self.space_dim;
            self.sys.add_zero_columns(n, 1)?;
            self.space_dim += n;
        }
        let mut row = cg.into_row();
        row.resize_with_trailing(self.space_dim + 2, 1);
        self.sys.insert_pending_coerced(row, 1);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Congruence> + '_ {
        self.sys.rows().iter().map(congruence_ref)
    }

    pub(crate) fn system(&self) -> &LinearSystem {
        &self.sys
    }

    pub(crate) fn system_mut(&mut self) -> &mut LinearSystem {
        &mut self.sys
    }

    pub(crate) fn from_system(sys: LinearSystem, space_dim: usize) -> Self {
        CongruenceSystem { sys, space_dim }
    }

    pub fn ascii_dump(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "space_dim {}", self.space_dim);
        self.sys.ascii_dump_with(out, |row| {
            let cg = congruence_ref(row);
            format!("m {}", cg.modulus())
        });
    }

    pub fn ascii_load(input: &str) -> Option<Self> {
        let mut lines = input.lines();
        let space_dim: usize = lines.next()?.strip_prefix("space_dim ")?.parse().ok()?;
        let sys = LinearSystem::ascii_load_with(&mut lines, |tokens, _topology| {
            let n = tokens.len();
            if n < 3 || tokens[n - 2] != "m" {
                return None;
            }
            let modulus: Coefficient = tokens[n - 1].parse().ok()?;
            if modulus.is_negative() {
                return None;
            }
            let coeffs: Vec<Coefficient> = tokens[..n - 2]
                .iter()
                .map(|t| t.parse().ok())
                .collect::<Option<_>>()?;
            // The dumped row already carries the modulus slot; the trailer
            // must agree with it.
            if coeffs.last() != Some(&modulus) {
                return None;
            }
            let kind = if modulus.is_zero() {
                RowKind::LineOrEquality
            } else {
                RowKind::RayPointOrInequality
            };
            Some(LinearRow::from_coeffs(coeffs, kind, Topology::Closed))
        })?;
        if sys.row_size() != space_dim + 2 {
            return None;
        }
        Some(CongruenceSystem { sys, space_dim })
    }
}

pub(crate) fn congruence_ref(row: &LinearRow) -> &Congruence {
    // SAFETY: `Congruence` is a transparent wrapper around `LinearRow`.
    unsafe { &*(row as *const LinearRow as *const Congruence) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_modulo() {
        let x = Variable(0);
        let cg = (x * 2i32).congruent_to(0).modulo(4);
        // 2x ≡ 0 (mod 4) reduces to x ≡ 0 (mod 2).
        assert_eq!(cg.coefficient(x), Coefficient::from(1));
        assert_eq!(*cg.modulus(), Coefficient::from(2));
    }

    #[test]
    fn test_inhomogeneous_centering() {
        let x = Variable(0);
        let cg = x.congruent_to(-1).modulo(3);
        // x + 1 ≡ 0 → inhomogeneous term lands in [0, 3).
        assert_eq!(*cg.inhomogeneous_term(), Coefficient::from(1));
        assert_eq!(*cg.modulus(), Coefficient::from(3));
    }

    #[test]
    fn test_equality_congruence() {
        let x = Variable(0);
        let cg = x.congruent_to(5).modulo(0);
        assert!(cg.is_equality());
        assert!(!cg.is_tautological());
    }

    #[test]
    fn test_trivial_forms() {
        assert!(Congruence::zero_dim_integrality().is_tautological());
        assert!(Congruence::zero_dim_false().is_inconsistent());
        let cg = LinearExpr::constant(6).congruent_to(0).modulo(3);
        assert!(cg.is_tautological());
    }

    #[test]
    fn test_ascii_round_trip() {
        let mut cgs = CongruenceSystem::new(2);
        cgs.insert(Variable(0).congruent_to(1).modulo(5)).unwrap();
        cgs.insert(Variable(1).congruent_to(0).modulo(0)).unwrap();
        let mut dump = String::new();
        cgs.ascii_dump(&mut dump);
        let reloaded = CongruenceSystem::ascii_load(&dump).unwrap();
        assert_eq!(reloaded, cgs);
    }
}
