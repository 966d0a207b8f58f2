use std::fmt;

use num::{Signed, Zero};
use polyhedra_arith::Coefficient;
use serde::{Deserialize, Serialize};

use crate::error::{check_same_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::linear::{LinearRow, LinearSystem, RowKind, Topology};

/// The three constraint forms.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConstraintType {
    Equality,
    NonstrictInequality,
    StrictInequality,
}

/// A linear constraint over a row: `e = 0`, `e >= 0`, or `e > 0`.
///
/// Strict inequalities are encoded in a not-necessarily-closed row by a
/// negative epsilon coefficient; equalities in such a row keep epsilon zero.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Constraint {
    row: LinearRow,
}

impl Constraint {
    pub(crate) fn from_row(row: LinearRow) -> Self {
        Constraint { row }
    }

    pub(crate) fn row(&self) -> &LinearRow {
        &self.row
    }

    pub(crate) fn into_row(self) -> LinearRow {
        self.row
    }

    fn build(expr: LinearExpr, kind: RowKind, strict: bool) -> Self {
        let dim = expr.space_dimension();
        let topology = if strict {
            Topology::NotClosed
        } else {
            Topology::Closed
        };
        let mut coeffs = expr.all_coefficients().to_vec();
        if strict {
            // e > 0 becomes e - eps >= 0.
            coeffs.push(Coefficient::from(-1));
        }
        let mut row = LinearRow::from_coeffs(coeffs, kind, topology);
        row.strong_normalize();
        debug_assert_eq!(row.size(), dim + 1 + usize::from(strict));
        Constraint { row }
    }

    /// The 0-dimensional unsatisfiable constraint `-1 >= 0`.
    pub fn zero_dim_false() -> Self {
        Constraint::build(LinearExpr::constant(-1), RowKind::RayPointOrInequality, false)
    }

    /// The 0-dimensional tautology `1 >= 0`.
    pub fn zero_dim_positivity() -> Self {
        Constraint::build(LinearExpr::constant(1), RowKind::RayPointOrInequality, false)
    }

    /// The epsilon lower bound `eps >= 0` of a not-necessarily-closed
    /// system, at the given space dimension.
    pub(crate) fn epsilon_geq_zero(space_dim: usize) -> Self {
        let mut row = LinearRow::new(
            space_dim + 2,
            RowKind::RayPointOrInequality,
            Topology::NotClosed,
        );
        *row.coeff_mut(space_dim + 1) = Coefficient::from(1);
        Constraint { row }
    }

    /// The epsilon upper bound `eps <= 1`.
    pub(crate) fn epsilon_leq_one(space_dim: usize) -> Self {
        let mut row = LinearRow::new(
            space_dim + 2,
            RowKind::RayPointOrInequality,
            Topology::NotClosed,
        );
        *row.coeff_mut(0) = Coefficient::from(1);
        *row.coeff_mut(space_dim + 1) = Coefficient::from(-1);
        Constraint { row }
    }

    pub fn space_dimension(&self) -> usize {
        match self.row.topology() {
            Topology::Closed => self.row.size() - 1,
            Topology::NotClosed => self.row.size() - 2,
        }
    }

    pub fn topology(&self) -> Topology {
        self.row.topology()
    }

    pub fn constraint_type(&self) -> ConstraintType {
        if self.row.is_line_or_equality() {
            return ConstraintType::Equality;
        }
        if self.row.topology() == Topology::NotClosed
            && self.row.coeff(self.row.size() - 1).is_negative()
        {
            return ConstraintType::StrictInequality;
        }
        ConstraintType::NonstrictInequality
    }

    pub fn is_equality(&self) -> bool {
        self.constraint_type() == ConstraintType::Equality
    }

    pub fn is_strict_inequality(&self) -> bool {
        self.constraint_type() == ConstraintType::StrictInequality
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

    /// The homogeneous part as an expression, for reuse in images and
    /// coercions.
    pub fn linear_expr(&self) -> LinearExpr {
        let dim = self.space_dimension();
        LinearExpr::from_parts(
            self.row.coeff(0).clone(),
            (1..=dim).map(|i| self.row.coeff(i).clone()).collect(),
        )
    }

    /// Whether every homogeneous coefficient is zero.
    pub fn is_trivial(&self) -> bool {
        let dim = self.space_dimension();
        (1..=dim).all(|i| self.row.coeff(i).is_zero())
    }

    /// True for constraints satisfied by every point, such as `0 = 0` or
    /// `1 > 0`.
    pub fn is_tautological(&self) -> bool {
        if !self.is_trivial() {
            return false;
        }
        let b = self.row.coeff(0);
        match self.constraint_type() {
            ConstraintType::Equality => b.is_zero(),
            ConstraintType::NonstrictInequality => !b.is_negative(),
            ConstraintType::StrictInequality => b.is_positive(),
        }
    }

    /// True for constraints satisfied by no point, such as `1 = 0` or
    /// `0 > 0`.
    pub fn is_inconsistent(&self) -> bool {
        if !self.is_trivial() {
            return false;
        }
        let b = self.row.coeff(0);
        match self.constraint_type() {
            ConstraintType::Equality => !b.is_zero(),
            ConstraintType::NonstrictInequality => b.is_negative(),
            ConstraintType::StrictInequality => !b.is_positive(),
        }
    }

    /// The closed version of this constraint: strictness dropped.
    pub fn to_nonstrict(&self) -> Constraint {
        match self.constraint_type() {
            ConstraintType::StrictInequality => {
                let dim = self.space_dimension();
                let coeffs: Vec<Coefficient> =
                    (0..=dim).map(|i| self.row.coeff(i).clone()).collect();
                let mut row =
                    LinearRow::from_coeffs(coeffs, RowKind::RayPointOrInequality, Topology::Closed);
                row.strong_normalize();
                Constraint { row }
            }
            _ => {
                let mut c = self.clone();
                if c.topology() == Topology::NotClosed {
                    let dim = c.space_dimension();
                    let coeffs: Vec<Coefficient> =
                        (0..=dim).map(|i| c.row.coeff(i).clone()).collect();
                    let mut row = LinearRow::from_coeffs(coeffs, c.row.kind(), Topology::Closed);
                    row.strong_normalize();
                    c = Constraint { row };
                }
                c
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rel = match self.constraint_type() {
            ConstraintType::Equality => "=",
            ConstraintType::NonstrictInequality => ">=",
            ConstraintType::StrictInequality => ">",
        };
        write!(f, "{} {} 0", self.linear_expr(), rel)
    }
}

#[allow(clippy::should_implement_trait)]
impl LinearExpr {
    pub fn eq(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::build(self - rhs, RowKind::LineOrEquality, false)
    }

    pub fn ge(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::build(self - rhs, RowKind::RayPointOrInequality, false)
    }

    pub fn le(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::build(rhs.into() - self, RowKind::RayPointOrInequality, false)
    }

    pub fn gt(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::build(self - rhs, RowKind::RayPointOrInequality, true)
    }

    pub fn lt(self, rhs: impl Into<LinearExpr>) -> Constraint {
        Constraint::build(rhs.into() - self, RowKind::RayPointOrInequality, true)
    }
}

#[allow(clippy::should_implement_trait)]
impl Variable {
    pub fn eq(self, rhs: impl Into<LinearExpr>) -> Constraint {
        LinearExpr::from_variable(self).eq(rhs)
    }

    pub fn ge(self, rhs: impl Into<LinearExpr>) -> Constraint {
        LinearExpr::from_variable(self).ge(rhs)
    }

    pub fn le(self, rhs: impl Into<LinearExpr>) -> Constraint {
        LinearExpr::from_variable(self).le(rhs)
    }

    pub fn gt(self, rhs: impl Into<LinearExpr>) -> Constraint {
        LinearExpr::from_variable(self).gt(rhs)
    }

    pub fn lt(self, rhs: impl Into<LinearExpr>) -> Constraint {
        LinearExpr::from_variable(self).lt(rhs)
    }
}

/// A system of constraints sharing a space dimension and topology.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    sys: LinearSystem,
    space_dim: usize,
}

impl ConstraintSystem {
    pub fn new(space_dim: usize, topology: Topology) -> Self {
        let trailing = usize::from(topology == Topology::NotClosed);
        ConstraintSystem {
            sys: LinearSystem::new(space_dim + 1 + trailing, topology),
            space_dim,
        }
    }

    /// The 0-dimensional system containing only the false constraint.
    pub fn zero_dim_empty() -> Self {
        let mut cs = ConstraintSystem::new(0, Topology::Closed);
        cs.sys.add_row(Constraint::zero_dim_false().into_row());
        cs
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    pub fn topology(&self) -> Topology {
        self.sys.topology()
    }

    pub fn num_rows(&self) -> usize {
        self.sys.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.sys.num_rows() == 0
    }

    pub fn num_equalities(&self) -> usize {
        self.sys.num_lines_or_equalities()
    }

    pub fn has_strict_inequalities(&self) -> bool {
        self.iter().any(|c| c.is_strict_inequality())
    }

    fn trailing(&self) -> usize {
        usize::from(self.topology() == Topology::NotClosed)
    }

    /// Inserts a constraint, growing the space dimension as needed. A
    /// strict inequality cannot enter a necessarily closed system.
    pub fn insert(&mut self, c: Constraint) -> Result<()> {
        if c.is_strict_inequality() && self.topology() == Topology::Closed {
            return Err(Error::invalid_argument(
                "ConstraintSystem::insert",
                "strict inequality in a necessarily closed system",
            ));
        }
        if c.space_dimension() > self.space_dim {
            let n = c.space_dimension() - self.space_dim;
            self.sys.add_zero_columns(n, self.trailing())?;
            self.space_dim += n;
        }
        let kind = c.row().kind();
        let mut row = c.into_row();
        let row_trailing = usize::from(row.topology() == Topology::NotClosed);
        // Pad the homogeneous part to this system's dimension, then adjust
        // the epsilon slot to this system's topology.
        row.resize_with_trailing(self.space_dim + 1 + row_trailing, row_trailing);
        if row_trailing == 0 && self.topology() == Topology::NotClosed {
            let mut coeffs = row.into_coeffs();
            coeffs.push(Coefficient::zero());
            row = LinearRow::from_coeffs(coeffs, kind, Topology::NotClosed);
        } else if row_trailing == 1 && self.topology() == Topology::Closed {
            // Only nonstrict rows reach here; their epsilon slot is
            // meaningless and gets dropped.
            let mut coeffs = row.into_coeffs();
            coeffs.pop();
            row = LinearRow::from_coeffs(coeffs, kind, Topology::Closed);
        }
        self.sys.insert_pending_coerced(row, self.trailing());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.sys.rows().iter().map(constraint_ref)
    }

    /// Iterates skipping tautologies, the usual intake filter.
    pub fn iter_nontrivial(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.iter().filter(|c| !c.is_tautological())
    }

    /// Widens the system by `n` fresh zero columns.
    pub(crate) fn add_space_dimensions(&mut self, n: usize) -> Result<()> {
        self.sys.add_zero_columns(n, self.trailing())?;
        self.space_dim += n;
        Ok(())
    }

    pub(crate) fn system(&self) -> &LinearSystem {
        &self.sys
    }

    pub(crate) fn system_mut(&mut self) -> &mut LinearSystem {
        &mut self.sys
    }

    pub(crate) fn from_system(sys: LinearSystem, space_dim: usize) -> Self {
        ConstraintSystem { sys, space_dim }
    }

    pub fn ascii_dump(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "space_dim {}", self.space_dim);
        self.sys.ascii_dump_with(out, |row| {
            let c = constraint_ref(row);
            match c.constraint_type() {
                ConstraintType::Equality => "=",
                ConstraintType::NonstrictInequality => ">=",
                ConstraintType::StrictInequality => ">",
            }
            .to_string()
        });
    }

    /// Parses a dump; `false`-style failures surface as `None` and leave no
    /// partial state behind.
    pub fn ascii_load(input: &str) -> Option<Self> {
        let mut lines = input.lines();
        let space_dim: usize = lines.next()?.strip_prefix("space_dim ")?.parse().ok()?;
        let sys = LinearSystem::ascii_load_with(&mut lines, |tokens, topology| {
            let (coeffs, marker) = tokens.split_at(tokens.len().checked_sub(1)?);
            let kind = match marker[0] {
                "=" => RowKind::LineOrEquality,
                ">=" | ">" => RowKind::RayPointOrInequality,
                _ => return None,
            };
            let coeffs: Option<Vec<Coefficient>> = coeffs.iter().map(|t| t.parse().ok()).collect();
            Some(LinearRow::from_coeffs(coeffs?, kind, topology))
        })?;
        let trailing = usize::from(sys.topology() == Topology::NotClosed);
        if sys.row_size() != space_dim + 1 + trailing {
            return None;
        }
        Some(ConstraintSystem { sys, space_dim })
    }

    /// Checks that both systems constrain the same space.
    pub fn check_dimension(&self, other: &ConstraintSystem, method: &'static str) -> Result<()> {
        check_same_dimension(method, self.space_dim, other.space_dim)
    }
}

pub(crate) fn constraint_ref(row: &LinearRow) -> &Constraint {
    // SAFETY: `Constraint` is a transparent wrapper around `LinearRow`.
    unsafe { &*(row as *const LinearRow as *const Constraint) }
}
