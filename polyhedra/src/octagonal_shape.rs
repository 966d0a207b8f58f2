//! The octagonal shape: bounds on `±x_i ± x_j` in a coherent matrix over
//! doubled variables, kept under strong closure.
//!
//! Variable `x_k` owns two matrix indices: `2k` for its positive form and
//! `2k + 1` for its negation, so every octagonal constraint is a plain
//! difference `v_i - v_j <= c` between forms, and coherence
//! `m[i][j] = m[j^1][i^1]` keeps the two encodings of each bound equal.

use num::{Signed, Zero};
use polyhedra_arith::rational::{from_coefficients, ratio};
use polyhedra_arith::{Coefficient, IntervalScalar, Rational};
use serde::{Deserialize, Serialize};

use crate::bd_shape::{weight_add, weight_le, weight_max, weight_min, Weight};
use crate::boxes::{Complexity, IntervalBox};
use crate::constraint::{Constraint, ConstraintSystem, ConstraintType};
use crate::error::{check_same_dimension, check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::linear::Topology;
use crate::mip::{MipProblem, MipStatus, OptimizationMode};
use crate::polyhedron::Polyhedron;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OctagonalShape {
    matrix: Vec<Vec<Weight>>,
    space_dim: usize,
    empty: Option<bool>,
    closed: bool,
}

impl OctagonalShape {
    pub fn universe(space_dim: usize) -> Result<Self> {
        check_space_dimension("OctagonalShape::universe", space_dim)?;
        let n = 2 * space_dim;
        let mut matrix = vec![vec![None; n]; n];
        for i in 0..n {
            matrix[i][i] = Some(<Rational as num::Zero>::zero());
        }
        Ok(OctagonalShape {
            matrix,
            space_dim,
            empty: Some(false),
            closed: true,
        })
    }

    pub fn empty(space_dim: usize) -> Result<Self> {
        let mut shape = OctagonalShape::universe(space_dim)?;
        shape.set_empty();
        Ok(shape)
    }

    fn set_empty(&mut self) {
        if !self.matrix.is_empty() {
            self.matrix[0][0] = Some(ratio(-1, 1));
        }
        self.empty = Some(true);
        self.closed = false;
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    pub fn from_constraints(cs: &ConstraintSystem) -> Result<Self> {
        let mut shape = OctagonalShape::universe(cs.space_dimension())?;
        for c in cs.iter() {
            shape.add_constraint(c)?;
        }
        Ok(shape)
    }

    /// Encloses a box; open bounds relax to their closure.
    pub fn from_box<S: IntervalScalar>(b: &IntervalBox<S>) -> Result<Self> {
        if b.is_empty() {
            return OctagonalShape::empty(b.space_dimension());
        }
        let mut shape = OctagonalShape::universe(b.space_dimension())?;
        for c in b.constraints()?.iter() {
            shape.refine_with_constraint(c)?;
        }
        Ok(shape)
    }

    pub fn from_polyhedron(ph: &Polyhedron, complexity: Complexity) -> Result<Self> {
        let n = ph.space_dimension();
        if ph.is_empty()? {
            return OctagonalShape::empty(n);
        }
        let mut shape = OctagonalShape::universe(n)?;
        match complexity {
            Complexity::Polynomial => {
                for c in ph.constraints()?.iter() {
                    shape.refine_with_constraint(c)?;
                }
            }
            Complexity::Simplex | Complexity::Any => {
                let mut cs = ConstraintSystem::new(n, Topology::Closed);
                for c in ph.constraints()?.iter() {
                    cs.insert(c.to_nonstrict())?;
                }
                // Bound every octagonal form +-x_i +-x_j and +-x_i.
                let mut objectives: Vec<(usize, usize, LinearExpr)> = Vec::new();
                for i in 0..n {
                    objectives.push((2 * i, 2 * i + 1, LinearExpr::from_variable(Variable(i)) * 2));
                    objectives.push((2 * i + 1, 2 * i, -(Variable(i) * 2i32)));
                    for j in i + 1..n {
                        objectives.push((2 * i, 2 * j, Variable(i) - Variable(j)));
                        objectives.push((2 * j, 2 * i, Variable(j) - Variable(i)));
                        objectives.push((2 * i, 2 * j + 1, Variable(i) + Variable(j)));
                        objectives.push((2 * i + 1, 2 * j, -(Variable(i) + Variable(j))));
                    }
                }
                for (r, c, e) in objectives {
                    let mut lp =
                        MipProblem::from_constraints(&cs, e, OptimizationMode::Maximization)?;
                    match lp.solve()? {
                        MipStatus::Optimized => {
                            let bound = lp.optimal_value()?;
                            shape.store(r, c, bound);
                        }
                        MipStatus::Unbounded => {}
                        MipStatus::Unfeasible => {
                            shape.set_empty();
                            return Ok(shape);
                        }
                    }
                }
            }
        }
        Ok(shape)
    }

    /// Writes a bound and its coherent mirror, keeping the tighter value.
    fn store(&mut self, i: usize, j: usize, bound: Rational) {
        let tightened = weight_min(&self.matrix[i][j], &Some(bound));
        self.matrix[i][j] = tightened.clone();
        self.matrix[j ^ 1][i ^ 1] = tightened;
        self.closed = false;
        self.empty = None;
    }

    /// Classifies a constraint into `v_i - v_j <= c` over form indices.
    fn octagonal_form(c: &Constraint) -> Option<(usize, usize, Rational)> {
        let dim = c.space_dimension();
        let mut nonzero: Vec<(usize, Coefficient)> = Vec::new();
        for i in 0..dim {
            let a = c.coefficient(Variable(i));
            if !a.is_zero() {
                nonzero.push((i, a));
            }
        }
        let b = c.inhomogeneous_term().clone();
        match nonzero.len() {
            1 => {
                let (i, a) = nonzero.pop().expect("one entry");
                // a x + b >= 0.
                let two = Coefficient::from(2);
                if a.is_positive() {
                    // -2x <= 2b/a.
                    Some((2 * i + 1, 2 * i, from_coefficients(b * two, a)))
                } else {
                    Some((2 * i, 2 * i + 1, from_coefficients(b * two, -a)))
                }
            }
            2 => {
                let (j, aj) = nonzero.pop().expect("two entries");
                let (i, ai) = nonzero.pop().expect("two entries");
                if ai.abs() != aj.abs() {
                    return None;
                }
                let scale = ai.abs();
                // ai x_i + aj x_j + b >= 0 normalizes to
                // -(ai/|a|) x_i - (aj/|a|) x_j <= b/|a|.
                let bound = from_coefficients(b, scale);
                let (r, c_) = match (ai.is_positive(), aj.is_positive()) {
                    // x_i + x_j >= -b: -x_i - x_j <= b.
                    (true, true) => (2 * i + 1, 2 * j),
                    // x_i - x_j >= -b: x_j - x_i <= b.
                    (true, false) => (2 * j, 2 * i),
                    (false, true) => (2 * i, 2 * j),
                    // -x_i - x_j >= -b: x_i + x_j <= b.
                    (false, false) => (2 * i, 2 * j + 1),
                };
                Some((r, c_, bound))
            }
            _ => None,
        }
    }

    pub fn add_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.is_strict_inequality() {
            return Err(Error::invalid_argument(
                "OctagonalShape::add_constraint",
                "strict inequality in a topologically closed domain",
            ));
        }
        if c.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "OctagonalShape::add_constraint",
                self.space_dimension(),
                c.space_dimension(),
            ));
        }
        if c.is_tautological() {
            return Ok(());
        }
        if c.is_inconsistent() {
            self.set_empty();
            return Ok(());
        }
        let Some((i, j, bound)) = Self::octagonal_form(c) else {
            return Err(Error::invalid_argument(
                "OctagonalShape::add_constraint",
                "constraint is not octagonal",
            ));
        };
        self.store(i, j, bound);
        if c.constraint_type() == ConstraintType::Equality {
            let (i2, j2, bound2) = Self::octagonal_form(&(-c.linear_expr()).ge(0))
                .expect("the negation of an octagonal form is octagonal");
            self.store(i2, j2, bound2);
        }
        Ok(())
    }

    pub fn refine_with_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.is_strict_inequality() {
            return self.refine_with_constraint(&c.to_nonstrict());
        }
        match self.add_constraint(c) {
            Ok(()) => Ok(()),
            Err(Error::InvalidArgument { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Strong closure: shortest paths over the doubled variables followed
    /// by the coherence tightening `m[i][j] <- min(m[i][j],
    /// (m[i][i^1] + m[j^1][j]) / 2)`.
    pub fn strong_closure_assign(&mut self) -> Result<bool> {
        if self.empty == Some(true) {
            return Ok(false);
        }
        if self.closed {
            return Ok(true);
        }
        let n = self.matrix.len();
        for k in 0..n {
            crate::abandon::maybe_abandon("OctagonalShape::strong_closure_assign")?;
            for i in 0..n {
                if self.matrix[i][k].is_none() {
                    continue;
                }
                for j in 0..n {
                    let through = weight_add(&self.matrix[i][k], &self.matrix[k][j]);
                    self.matrix[i][j] = weight_min(&self.matrix[i][j], &through);
                }
            }
        }
        let half = ratio(1, 2);
        for i in 0..n {
            for j in 0..n {
                if let (Some(a), Some(b)) = (&self.matrix[i][i ^ 1], &self.matrix[j ^ 1][j]) {
                    let strengthened = (a + b) * &half;
                    self.matrix[i][j] = weight_min(&self.matrix[i][j], &Some(strengthened));
                }
            }
        }
        for i in 0..n {
            if let Some(d) = &self.matrix[i][i] {
                if d.is_negative() {
                    self.set_empty();
                    return Ok(false);
                }
            }
        }
        self.closed = true;
        self.empty = Some(false);
        Ok(true)
    }

    pub fn is_empty(&self) -> Result<bool> {
        match self.empty {
            Some(e) => Ok(e),
            None => {
                let mut copy = self.clone();
                Ok(!copy.strong_closure_assign()?)
            }
        }
    }

    fn closed_copy(&self) -> Result<Option<OctagonalShape>> {
        let mut copy = self.clone();
        if copy.strong_closure_assign()? {
            Ok(Some(copy))
        } else {
            Ok(None)
        }
    }

    pub fn contains(&self, other: &OctagonalShape) -> Result<bool> {
        check_same_dimension(
            "OctagonalShape::contains",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        let Some(other_closed) = other.closed_copy()? else {
            return Ok(true);
        };
        if self.is_empty()? {
            return Ok(false);
        }
        let n = self.matrix.len();
        Ok((0..n).all(|i| {
            (0..n).all(|j| weight_le(&other_closed.matrix[i][j], &self.matrix[i][j]))
        }))
    }

    pub fn intersection_assign(&mut self, other: &OctagonalShape) -> Result<()> {
        check_same_dimension(
            "OctagonalShape::intersection_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        let n = self.matrix.len();
        for i in 0..n {
            for j in 0..n {
                self.matrix[i][j] = weight_min(&self.matrix[i][j], &other.matrix[i][j]);
            }
        }
        self.closed = false;
        self.empty = None;
        Ok(())
    }

    pub fn upper_bound_assign(&mut self, other: &OctagonalShape) -> Result<()> {
        check_same_dimension(
            "OctagonalShape::upper_bound_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        let Some(other_closed) = other.closed_copy()? else {
            return Ok(());
        };
        let Some(self_closed) = self.closed_copy()? else {
            *self = other_closed;
            return Ok(());
        };
        *self = self_closed;
        let n = self.matrix.len();
        for i in 0..n {
            for j in 0..n {
                self.matrix[i][j] = weight_max(&self.matrix[i][j], &other_closed.matrix[i][j]);
            }
        }
        self.closed = true;
        self.empty = Some(false);
        Ok(())
    }

    /// The BHMZ05 widening lifted to octagons: unstable bounds escape.
    pub fn bhmz05_widening_assign(
        &mut self,
        older: &OctagonalShape,
        tp: Option<&mut u32>,
    ) -> Result<()> {
        check_same_dimension(
            "OctagonalShape::bhmz05_widening_assign",
            self.space_dimension(),
            older.space_dimension(),
        )?;
        let Some(older_closed) = older.closed_copy()? else {
            return Ok(());
        };
        if self.is_empty()? {
            return Ok(());
        }
        let mut widened = self.clone();
        let n = widened.matrix.len();
        for i in 0..n {
            for j in 0..n {
                if i != j && !weight_le(&widened.matrix[i][j], &older_closed.matrix[i][j]) {
                    widened.matrix[i][j] = None;
                }
            }
        }
        widened.closed = false;
        if widened == *self {
            return Ok(());
        }
        if let Some(tokens) = tp {
            if *tokens > 0 {
                *tokens -= 1;
                return Ok(());
            }
        }
        *self = widened;
        Ok(())
    }

    /// CC76-style extrapolation with sorted stop points.
    pub fn cc76_extrapolation_assign(
        &mut self,
        older: &OctagonalShape,
        stop_points: &[Rational],
    ) -> Result<()> {
        check_same_dimension(
            "OctagonalShape::cc76_extrapolation_assign",
            self.space_dimension(),
            older.space_dimension(),
        )?;
        let Some(older_closed) = older.closed_copy()? else {
            return Ok(());
        };
        if self.is_empty()? {
            return Ok(());
        }
        let n = self.matrix.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if !weight_le(&self.matrix[i][j], &older_closed.matrix[i][j]) {
                    let grown = self.matrix[i][j].clone();
                    self.matrix[i][j] = match grown {
                        None => None,
                        Some(v) => stop_points.iter().find(|&s| s >= &v).cloned(),
                    };
                }
            }
        }
        self.closed = false;
        Ok(())
    }

    /// `var <- e/d`: exact for unit translations, interval-based
    /// otherwise.
    pub fn affine_image(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        if denominator.is_zero() {
            return Err(Error::invalid_argument(
                "OctagonalShape::affine_image",
                "denominator is zero",
            ));
        }
        if var.space_dimension() > self.space_dimension()
            || e.space_dimension() > self.space_dimension()
        {
            return Err(Error::dimension_incompatible(
                "OctagonalShape::affine_image",
                self.space_dimension(),
                var.space_dimension().max(e.space_dimension()),
            ));
        }
        if self.is_empty()? {
            return Ok(());
        }
        let pos = 2 * var.id();
        let neg = pos + 1;
        // var <- var + c slides every bound involving var.
        let a = e.coefficient(var);
        if &a == denominator {
            let mut shift = e.clone();
            shift.set_coefficient(var, Coefficient::zero());
            if shift.all_homogeneous_terms_are_zero() {
                let c = from_coefficients(shift.inhomogeneous_term().clone(), denominator.clone());
                let n = self.matrix.len();
                for k in 0..n {
                    if k != pos && k != neg {
                        if let Some(w) = &self.matrix[pos][k] {
                            self.matrix[pos][k] = Some(w + &c);
                        }
                        if let Some(w) = &self.matrix[k][pos] {
                            self.matrix[k][pos] = Some(w - &c);
                        }
                        if let Some(w) = &self.matrix[neg][k] {
                            self.matrix[neg][k] = Some(w - &c);
                        }
                        if let Some(w) = &self.matrix[k][neg] {
                            self.matrix[k][neg] = Some(w + &c);
                        }
                    }
                }
                let two_c = &c + &c;
                if let Some(w) = &self.matrix[pos][neg] {
                    self.matrix[pos][neg] = Some(w + &two_c);
                }
                if let Some(w) = &self.matrix[neg][pos] {
                    self.matrix[neg][pos] = Some(w - &two_c);
                }
                self.closed = false;
                return Ok(());
            }
        }
        // General case: bound the value over the box and forget var.
        let boxed = IntervalBox::<Rational>::from_octagonal_shape(self)?;
        let mut value = boxed.eval_expr(e);
        value.div_assign_coeff(&Rational::from(denominator.clone()));
        let Some(closed) = self.closed_copy()? else {
            self.set_empty();
            return Ok(());
        };
        *self = closed;
        let n = self.matrix.len();
        for k in 0..n {
            if k != pos && k != neg {
                self.matrix[pos][k] = None;
                self.matrix[k][pos] = None;
                self.matrix[neg][k] = None;
                self.matrix[k][neg] = None;
            }
        }
        self.matrix[pos][neg] = None;
        self.matrix[neg][pos] = None;
        if let polyhedra_arith::bound::Bound::Finite(q) = &value.upper().value {
            self.matrix[pos][neg] = Some(q + q);
        }
        if let polyhedra_arith::bound::Bound::Finite(q) = &value.lower().value {
            self.matrix[neg][pos] = Some(-(q + q));
        }
        self.closed = false;
        Ok(())
    }

    /// Every stored bound as a constraint system.
    pub fn constraints(&self) -> Result<ConstraintSystem> {
        let n = self.space_dimension();
        let mut cs = ConstraintSystem::new(n, Topology::Closed);
        if self.is_empty()? {
            cs.insert(Constraint::zero_dim_false())?;
            return Ok(cs);
        }
        for i in 0..self.matrix.len() {
            for j in 0..self.matrix.len() {
                if i == j {
                    continue;
                }
                let Some(bound) = &self.matrix[i][j] else {
                    continue;
                };
                // v_i - v_j <= bound.
                let den = bound.denom().clone();
                let mut e = LinearExpr::constant(bound.numer().clone());
                let vi = Variable(i / 2);
                let vj = Variable(j / 2);
                let si = if i % 2 == 0 {
                    -den.clone()
                } else {
                    den.clone()
                };
                let sj = if j % 2 == 0 { den.clone() } else { -den.clone() };
                if i / 2 == j / 2 {
                    e.set_coefficient(vi, si + sj);
                } else {
                    e.set_coefficient(vi, si);
                    e.set_coefficient(vj, sj);
                }
                let c = e.ge(0);
                if !c.is_tautological() {
                    cs.insert(c)?;
                }
            }
        }
        Ok(cs)
    }
}

impl<S: IntervalScalar> IntervalBox<S> {
    /// The per-variable bounds of an octagon.
    pub fn from_octagonal_shape(shape: &OctagonalShape) -> Result<Self> {
        let n = shape.space_dimension();
        if shape.is_empty()? {
            return IntervalBox::empty(n);
        }
        let closed = shape.closed_copy()?.expect("nonempty");
        let mut result = IntervalBox::universe(n)?;
        let half = ratio(1, 2);
        for i in 0..n {
            let v = Variable(i);
            if let Some(hi) = &closed.matrix[2 * i][2 * i + 1] {
                result.interval_mut(v).refine_upper(&(hi * &half), false)?;
            }
            if let Some(lo) = &closed.matrix[2 * i + 1][2 * i] {
                result
                    .interval_mut(v)
                    .refine_lower(&-(lo * &half), false)?;
            }
        }
        Ok(result)
    }
}

impl Polyhedron {
    pub fn from_octagonal_shape(shape: &OctagonalShape) -> Result<Polyhedron> {
        Polyhedron::from_constraints(shape.constraints()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Variable {
        Variable(0)
    }

    fn y() -> Variable {
        Variable(1)
    }

    #[test]
    fn test_intake_and_strong_closure() {
        let mut s = OctagonalShape::universe(2).unwrap();
        s.add_constraint(&(x() + y()).le(2)).unwrap();
        s.add_constraint(&(x() - y()).le(0)).unwrap();
        assert!(s.strong_closure_assign().unwrap());
        // Adding the two bounds gives 2x <= 2, i.e. x <= 1.
        assert_eq!(s.matrix[0][1], Some(ratio(2, 1)));
        let b = IntervalBox::<Rational>::from_octagonal_shape(&s).unwrap();
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(1, 1))
        );
    }

    #[test]
    fn test_sum_constraints_accepted_relational_rejected() {
        let mut s = OctagonalShape::universe(2).unwrap();
        assert!(s.add_constraint(&(x() + y()).le(1)).is_ok());
        assert!(s.add_constraint(&(x() * 2i32 + y()).le(1)).is_err());
        assert!(s.add_constraint(&x().lt(1)).is_err());
    }

    #[test]
    fn test_emptiness() {
        let mut s = OctagonalShape::universe(2).unwrap();
        s.add_constraint(&(x() + y()).le(0)).unwrap();
        s.add_constraint(&(x() + y()).ge(1)).unwrap();
        assert!(s.is_empty().unwrap());
    }

    #[test]
    fn test_contains_and_lattice() {
        let mut inner = OctagonalShape::universe(1).unwrap();
        inner.add_constraint(&x().ge(0)).unwrap();
        inner.add_constraint(&x().le(1)).unwrap();
        let mut outer = OctagonalShape::universe(1).unwrap();
        outer.add_constraint(&x().ge(-5)).unwrap();
        outer.add_constraint(&x().le(5)).unwrap();
        assert!(outer.contains(&inner).unwrap());
        assert!(!inner.contains(&outer).unwrap());

        let mut join = inner.clone();
        join.upper_bound_assign(&outer).unwrap();
        assert!(join.contains(&outer).unwrap());

        let mut meet = outer;
        meet.intersection_assign(&inner).unwrap();
        assert!(inner.contains(&meet).unwrap());
    }

    #[test]
    fn test_widening() {
        let mut old = OctagonalShape::universe(2).unwrap();
        old.add_constraint(&(x() + y()).le(1)).unwrap();
        old.add_constraint(&x().ge(0)).unwrap();
        let mut new = OctagonalShape::universe(2).unwrap();
        new.add_constraint(&(x() + y()).le(3)).unwrap();
        new.add_constraint(&x().ge(0)).unwrap();
        new.bhmz05_widening_assign(&old, None).unwrap();
        // The sum bound grew and escaped; the lower bound is stable.
        assert_eq!(new.matrix[0][3], None);
        let b = IntervalBox::<Rational>::from_octagonal_shape(&new).unwrap();
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.lower().value,
            polyhedra_arith::bound::Bound::Finite(ratio(0, 1))
        );
    }

    #[test]
    fn test_affine_image_shift() {
        let mut s = OctagonalShape::universe(2).unwrap();
        s.add_constraint(&(x() + y()).le(2)).unwrap();
        s.affine_image(x(), &(x() - 1), &Coefficient::from(1)).unwrap();
        // x' + y = x + y - 1 <= 1.
        let mut expected = OctagonalShape::universe(2).unwrap();
        expected.add_constraint(&(x() + y()).le(1)).unwrap();
        assert!(expected.contains(&s).unwrap());
        assert!(s.contains(&expected).unwrap());
    }

    #[test]
    fn test_polyhedron_round_trip() {
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&(x() * 2i32 + y()).le(2)).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&y().ge(0)).unwrap();
        let s = OctagonalShape::from_polyhedron(&ph, Complexity::Simplex).unwrap();
        let back = Polyhedron::from_octagonal_shape(&s).unwrap();
        assert!(back.contains(&ph).unwrap());
        // The sum bound x + y <= 2 is found by the LP path.
        let mut tight = OctagonalShape::universe(2).unwrap();
        tight.add_constraint(&(x() + y()).le(2)).unwrap();
        assert!(tight.contains(&s).unwrap());
    }

    #[test]
    fn test_box_round_trip() {
        let mut s = OctagonalShape::universe(1).unwrap();
        s.add_constraint(&x().ge(-3)).unwrap();
        s.add_constraint(&x().le(4)).unwrap();
        let b = IntervalBox::<Rational>::from_octagonal_shape(&s).unwrap();
        let back = OctagonalShape::from_box(&b).unwrap();
        assert!(back.contains(&s).unwrap());
        assert!(s.contains(&back).unwrap());
    }
}
