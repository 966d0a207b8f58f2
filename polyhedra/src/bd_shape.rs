//! The bounded-difference shape: a weakly-relational domain storing one
//! upper bound per difference `x_i - x_j` (and per single variable) in a
//! difference-bound matrix closed under shortest paths.

use num::{Signed, Zero};
use polyhedra_arith::rational::from_coefficients;
use polyhedra_arith::{Coefficient, IntervalScalar, Rational};
use serde::{Deserialize, Serialize};

use crate::boxes::{Complexity, IntervalBox};
use crate::constraint::{Constraint, ConstraintSystem, ConstraintType};
use crate::error::{check_same_dimension, check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::linear::Topology;
use crate::mip::{MipProblem, MipStatus, OptimizationMode};
use crate::polyhedron::Polyhedron;

/// An entry of the matrix: a finite upper bound or none.
pub(crate) type Weight = Option<Rational>;

pub(crate) fn weight_min(a: &Weight, b: &Weight) -> Weight {
    match (a, b) {
        (None, w) | (w, None) => w.clone(),
        (Some(x), Some(y)) => Some(x.min(y).clone()),
    }
}

pub(crate) fn weight_max(a: &Weight, b: &Weight) -> Weight {
    match (a, b) {
        (None, _) | (_, None) => None,
        (Some(x), Some(y)) => Some(x.max(y).clone()),
    }
}

pub(crate) fn weight_add(a: &Weight, b: &Weight) -> Weight {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        _ => None,
    }
}

/// `a <= b` in the bound ordering (`None` is the top element).
pub(crate) fn weight_le(a: &Weight, b: &Weight) -> bool {
    match (a, b) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(x), Some(y)) => x <= y,
    }
}

/// A topologically closed shape over `x_i - x_j <= c` constraints. Index 0
/// of the matrix is the special zero variable, so row/column `i + 1`
/// covers `Variable(i)`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BdShape {
    dbm: Vec<Vec<Weight>>,
    empty: Option<bool>,
    closed: bool,
}

impl BdShape {
    pub fn universe(space_dim: usize) -> Result<Self> {
        check_space_dimension("BdShape::universe", space_dim)?;
        let n = space_dim + 1;
        let mut dbm = vec![vec![None; n]; n];
        for i in 0..n {
            dbm[i][i] = Some(<Rational as num::Zero>::zero());
        }
        Ok(BdShape {
            dbm,
            empty: Some(false),
            closed: true,
        })
    }

    pub fn empty(space_dim: usize) -> Result<Self> {
        let mut shape = BdShape::universe(space_dim)?;
        shape.set_empty();
        Ok(shape)
    }

    fn set_empty(&mut self) {
        // A negative self-loop is the canonical unsatisfiable witness.
        self.dbm[0][0] = Some(-Rational::from(Coefficient::from(1)));
        self.empty = Some(true);
        self.closed = false;
    }

    pub fn space_dimension(&self) -> usize {
        self.dbm.len() - 1
    }

    pub fn from_constraints(cs: &ConstraintSystem) -> Result<Self> {
        let mut shape = BdShape::universe(cs.space_dimension())?;
        for c in cs.iter() {
            shape.add_constraint(c)?;
        }
        Ok(shape)
    }

    /// Encloses a box; open bounds relax to their closure.
    pub fn from_box<S: IntervalScalar>(b: &IntervalBox<S>) -> Result<Self> {
        if b.is_empty() {
            return BdShape::empty(b.space_dimension());
        }
        let mut shape = BdShape::universe(b.space_dimension())?;
        for c in b.constraints()?.iter() {
            shape.refine_with_constraint(c)?;
        }
        Ok(shape)
    }

    /// Encloses a polyhedron: the polynomial path refines with the
    /// expressible constraints, the simplex path bounds every tracked
    /// difference with the LP solver.
    pub fn from_polyhedron(ph: &Polyhedron, complexity: Complexity) -> Result<Self> {
        let n = ph.space_dimension();
        if ph.is_empty()? {
            return BdShape::empty(n);
        }
        let mut shape = BdShape::universe(n)?;
        match complexity {
            Complexity::Polynomial => {
                for c in ph.constraints()?.iter() {
                    shape.refine_with_constraint(c)?;
                }
            }
            Complexity::Simplex | Complexity::Any => {
                let cs = relaxed_constraints(ph)?;
                for i in 0..=n {
                    for j in 0..=n {
                        if i == j {
                            continue;
                        }
                        let Some(e) = difference_expr(i, j, n) else {
                            continue;
                        };
                        let mut lp =
                            MipProblem::from_constraints(&cs, e, OptimizationMode::Maximization)?;
                        match lp.solve()? {
                            MipStatus::Optimized => {
                                let bound = lp.optimal_value()?;
                                shape.dbm[i][j] = weight_min(&shape.dbm[i][j], &Some(bound));
                            }
                            MipStatus::Unbounded => {}
                            MipStatus::Unfeasible => {
                                shape.set_empty();
                                return Ok(shape);
                            }
                        }
                    }
                }
                shape.closed = false;
            }
        }
        Ok(shape)
    }

    /// Classifies a constraint into the difference form `x_i - x_j <= c`
    /// over matrix indices; `None` when not expressible.
    fn difference_form(c: &Constraint) -> Option<(usize, usize, Rational)> {
        let dim = c.space_dimension();
        let mut nonzero: Vec<(usize, Coefficient)> = Vec::new();
        for i in 0..dim {
            let a = c.coefficient(Variable(i));
            if !a.is_zero() {
                nonzero.push((i + 1, a));
            }
        }
        let b = c.inhomogeneous_term().clone();
        match nonzero.len() {
            0 => None,
            1 => {
                let (i, a) = nonzero.pop().expect("one entry");
                // a x + b >= 0: upper bound on -x or x depending on sign.
                if a.is_positive() {
                    // x >= -b/a: 0 - x <= b/a.
                    Some((0, i, from_coefficients(b, a)))
                } else {
                    // x <= b/(-a): x - 0 <= b/(-a).
                    Some((i, 0, from_coefficients(b, -a)))
                }
            }
            2 => {
                let (j, aj) = nonzero.pop().expect("two entries");
                let (i, ai) = nonzero.pop().expect("two entries");
                if (&ai + &aj).is_zero() {
                    if ai.is_positive() {
                        // ai (x_i - x_j) + b >= 0: x_j - x_i <= b/ai.
                        Some((j, i, from_coefficients(b, ai)))
                    } else {
                        Some((i, j, from_coefficients(b, aj)))
                    }
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Tightens with one constraint; inexpressible ones raise an error.
    pub fn add_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.is_strict_inequality() {
            return Err(Error::invalid_argument(
                "BdShape::add_constraint",
                "strict inequality in a topologically closed domain",
            ));
        }
        if c.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "BdShape::add_constraint",
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
        let Some((i, j, bound)) = Self::difference_form(c) else {
            return Err(Error::invalid_argument(
                "BdShape::add_constraint",
                "constraint is not a bounded difference",
            ));
        };
        self.tighten(i, j, bound);
        if c.constraint_type() == ConstraintType::Equality {
            let (i2, j2, bound2) = Self::difference_form(&(-c.linear_expr()).ge(0))
                .expect("the negation of a difference is a difference");
            self.tighten(i2, j2, bound2);
        }
        Ok(())
    }

    /// Like `add_constraint` but silently skipping inexpressible
    /// constraints.
    pub fn refine_with_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.is_strict_inequality() {
            // Refine with the closure.
            return self.refine_with_constraint(&c.to_nonstrict());
        }
        match self.add_constraint(c) {
            Ok(()) => Ok(()),
            Err(Error::InvalidArgument { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn tighten(&mut self, i: usize, j: usize, bound: Rational) {
        let entry = &mut self.dbm[i][j];
        if weight_le(&Some(bound.clone()), entry) {
            *entry = Some(bound);
            self.closed = false;
            self.empty = None;
        }
    }

    /// Floyd-Warshall closure; detects emptiness through a negative
    /// self-loop.
    pub fn shortest_path_closure(&mut self) -> Result<bool> {
        if self.empty == Some(true) {
            return Ok(false);
        }
        if self.closed {
            return Ok(true);
        }
        let n = self.dbm.len();
        for k in 0..n {
            crate::abandon::maybe_abandon("BdShape::shortest_path_closure")?;
            for i in 0..n {
                if self.dbm[i][k].is_none() {
                    continue;
                }
                for j in 0..n {
                    let through = weight_add(&self.dbm[i][k], &self.dbm[k][j]);
                    self.dbm[i][j] = weight_min(&self.dbm[i][j], &through);
                }
            }
        }
        for i in 0..n {
            if let Some(d) = &self.dbm[i][i] {
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
                Ok(!copy.shortest_path_closure()?)
            }
        }
    }

    fn closed_copy(&self) -> Result<Option<BdShape>> {
        let mut copy = self.clone();
        if copy.shortest_path_closure()? {
            Ok(Some(copy))
        } else {
            Ok(None)
        }
    }

    pub fn contains(&self, other: &BdShape) -> Result<bool> {
        check_same_dimension(
            "BdShape::contains",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        let Some(other_closed) = other.closed_copy()? else {
            return Ok(true);
        };
        if self.is_empty()? {
            return Ok(false);
        }
        // The closed other satisfies this shape exactly when it meets
        // every stored bound.
        let n = self.dbm.len();
        Ok((0..n)
            .all(|i| (0..n).all(|j| weight_le(&other_closed.dbm[i][j], &self.dbm[i][j]))))
    }

    pub fn intersection_assign(&mut self, other: &BdShape) -> Result<()> {
        check_same_dimension(
            "BdShape::intersection_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        let n = self.dbm.len();
        for i in 0..n {
            for j in 0..n {
                self.dbm[i][j] = weight_min(&self.dbm[i][j], &other.dbm[i][j]);
            }
        }
        self.closed = false;
        self.empty = None;
        Ok(())
    }

    /// The join: entrywise maxima of the closed forms.
    pub fn upper_bound_assign(&mut self, other: &BdShape) -> Result<()> {
        check_same_dimension(
            "BdShape::upper_bound_assign",
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
        let n = self.dbm.len();
        for i in 0..n {
            for j in 0..n {
                self.dbm[i][j] = weight_max(&self.dbm[i][j], &other_closed.dbm[i][j]);
            }
        }
        // The join of closed matrices stays closed.
        self.closed = true;
        self.empty = Some(false);
        Ok(())
    }

    /// The standard difference-matrix widening: a bound the previous
    /// iterate did not already enforce escapes to infinity.
    pub fn bhmz05_widening_assign(&mut self, older: &BdShape, tp: Option<&mut u32>) -> Result<()> {
        check_same_dimension(
            "BdShape::bhmz05_widening_assign",
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
        let n = widened.dbm.len();
        for i in 0..n {
            for j in 0..n {
                // A bound the previous iterate did not enforce at least as
                // tightly is unstable: drop it.
                if i != j && !weight_le(&widened.dbm[i][j], &older_closed.dbm[i][j]) {
                    widened.dbm[i][j] = None;
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

    /// CC76-style extrapolation with sorted stop points: a grown bound
    /// jumps to the next stop at or above it.
    pub fn cc76_extrapolation_assign(
        &mut self,
        older: &BdShape,
        stop_points: &[Rational],
    ) -> Result<()> {
        check_same_dimension(
            "BdShape::cc76_extrapolation_assign",
            self.space_dimension(),
            older.space_dimension(),
        )?;
        let Some(older_closed) = older.closed_copy()? else {
            return Ok(());
        };
        if self.is_empty()? {
            return Ok(());
        }
        let n = self.dbm.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if !weight_le(&self.dbm[i][j], &older_closed.dbm[i][j]) {
                    let grown = self.dbm[i][j].clone();
                    self.dbm[i][j] = match grown {
                        None => None,
                        Some(v) => stop_points.iter().find(|&s| s >= &v).cloned(),
                    };
                }
            }
        }
        self.closed = false;
        Ok(())
    }

    /// `var <- e/d`, exact for unit translations, interval-based
    /// otherwise.
    pub fn affine_image(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        if denominator.is_zero() {
            return Err(Error::invalid_argument(
                "BdShape::affine_image",
                "denominator is zero",
            ));
        }
        if var.space_dimension() > self.space_dimension()
            || e.space_dimension() > self.space_dimension()
        {
            return Err(Error::dimension_incompatible(
                "BdShape::affine_image",
                self.space_dimension(),
                var.space_dimension().max(e.space_dimension()),
            ));
        }
        if self.is_empty()? {
            return Ok(());
        }
        let v = var.id() + 1;
        // The exact case: var <- x_j + c with a unit coefficient.
        if let Some((j, c)) = unit_translation(e, denominator) {
            let j_idx = j.map_or(0, |jv| jv.id() + 1);
            if j_idx == v {
                // A pure shift slides every bound through var.
                let n = self.dbm.len();
                for k in 0..n {
                    if k != v {
                        if let Some(w) = &self.dbm[v][k] {
                            self.dbm[v][k] = Some(w + &c);
                        }
                        if let Some(w) = &self.dbm[k][v] {
                            self.dbm[k][v] = Some(w - &c);
                        }
                    }
                }
                self.closed = false;
                return Ok(());
            }
            let mut copy = self.clone();
            if !copy.shortest_path_closure()? {
                self.set_empty();
                return Ok(());
            }
            *self = copy;
            self.forget(v);
            self.dbm[v][j_idx] = Some(c.clone());
            self.dbm[j_idx][v] = Some(-c);
            self.closed = false;
            return Ok(());
        }
        // General case: evaluate through the bounding box, then forget.
        let boxed = IntervalBox::<Rational>::from_bd_shape(self)?;
        let mut value = boxed.eval_expr(e);
        value.div_assign_coeff(&Rational::from(denominator.clone()));
        let mut copy = self.clone();
        if !copy.shortest_path_closure()? {
            self.set_empty();
            return Ok(());
        }
        *self = copy;
        self.forget(v);
        if let polyhedra_arith::bound::Bound::Finite(q) = &value.upper().value {
            self.dbm[v][0] = Some(q.clone());
        }
        if let polyhedra_arith::bound::Bound::Finite(q) = &value.lower().value {
            self.dbm[0][v] = Some(-q.clone());
        }
        self.closed = false;
        Ok(())
    }

    fn forget(&mut self, v: usize) {
        let n = self.dbm.len();
        for k in 0..n {
            if k != v {
                self.dbm[v][k] = None;
                self.dbm[k][v] = None;
            }
        }
        self.dbm[v][v] = Some(<Rational as num::Zero>::zero());
    }

    /// Every tracked bound as a constraint system.
    pub fn constraints(&self) -> Result<ConstraintSystem> {
        let n = self.space_dimension();
        let mut cs = ConstraintSystem::new(n, Topology::Closed);
        if self.is_empty()? {
            cs.insert(Constraint::zero_dim_false())?;
            return Ok(cs);
        }
        for i in 0..=n {
            for j in 0..=n {
                if i == j {
                    continue;
                }
                let Some(bound) = &self.dbm[i][j] else {
                    continue;
                };
                // x_i - x_j <= bound, with index 0 reading as zero.
                let mut e = LinearExpr::constant(bound.numer().clone());
                if i > 0 {
                    e.set_coefficient(Variable(i - 1), -bound.denom().clone());
                }
                if j > 0 {
                    e.set_coefficient(Variable(j - 1), bound.denom().clone());
                }
                cs.insert(e.ge(0))?;
            }
        }
        Ok(cs)
    }
}

impl<S: IntervalScalar> IntervalBox<S> {
    /// The per-variable bounds of a shape.
    pub fn from_bd_shape(shape: &BdShape) -> Result<Self> {
        let n = shape.space_dimension();
        if shape.is_empty()? {
            return IntervalBox::empty(n);
        }
        let closed = shape.closed_copy()?.expect("nonempty");
        let mut result = IntervalBox::universe(n)?;
        for i in 0..n {
            let v = Variable(i);
            if let Some(hi) = &closed.dbm[i + 1][0] {
                result.interval_mut(v).refine_upper(hi, false)?;
            }
            if let Some(lo) = &closed.dbm[0][i + 1] {
                result.interval_mut(v).refine_lower(&-lo.clone(), false)?;
            }
        }
        Ok(result)
    }
}

impl Polyhedron {
    pub fn from_bd_shape(shape: &BdShape) -> Result<Polyhedron> {
        Polyhedron::from_constraints(shape.constraints()?)
    }
}

/// Recognizes `e/d` as `x_j + c` (or plain `c` with `j` absent).
fn unit_translation(e: &LinearExpr, d: &Coefficient) -> Option<(Option<Variable>, Rational)> {
    let mut var = None;
    for i in 0..e.space_dimension() {
        let a = e.coefficient(Variable(i));
        if a.is_zero() {
            continue;
        }
        if var.is_some() || a != *d {
            return None;
        }
        var = Some(Variable(i));
    }
    Some((
        var,
        from_coefficients(e.inhomogeneous_term().clone(), d.clone()),
    ))
}

/// The nonstrict relaxation of a polyhedron's constraints, as LP input.
fn relaxed_constraints(ph: &Polyhedron) -> Result<ConstraintSystem> {
    let mut cs = ConstraintSystem::new(ph.space_dimension(), Topology::Closed);
    for c in ph.constraints()?.iter() {
        cs.insert(c.to_nonstrict())?;
    }
    Ok(cs)
}

/// The objective `v_i - v_j` with index 0 reading as the zero variable.
fn difference_expr(i: usize, j: usize, n: usize) -> Option<LinearExpr> {
    let mut e = LinearExpr::zero();
    if i > 0 {
        if i - 1 >= n {
            return None;
        }
        e.set_coefficient(Variable(i - 1), Coefficient::from(1));
    }
    if j > 0 {
        if j - 1 >= n {
            return None;
        }
        e.set_coefficient(Variable(j - 1), Coefficient::from(-1));
    }
    Some(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhedra_arith::rational::ratio;

    fn x() -> Variable {
        Variable(0)
    }

    fn y() -> Variable {
        Variable(1)
    }

    #[test]
    fn test_intake_and_closure() {
        let mut s = BdShape::universe(2).unwrap();
        s.add_constraint(&x().le(5)).unwrap();
        s.add_constraint(&(y() - x()).le(2)).unwrap();
        assert!(s.shortest_path_closure().unwrap());
        // Closure derives y <= 7.
        assert_eq!(s.dbm[2][0], Some(ratio(7, 1)));
    }

    #[test]
    fn test_relational_rejected_strict_rejected() {
        let mut s = BdShape::universe(2).unwrap();
        assert!(s.add_constraint(&(x() + y()).le(1)).is_err());
        assert!(s.add_constraint(&x().lt(1)).is_err());
        // Refinement skips what it cannot express.
        s.refine_with_constraint(&(x() + y()).le(1)).unwrap();
        assert!(!s.is_empty().unwrap());
    }

    #[test]
    fn test_emptiness() {
        let mut s = BdShape::universe(1).unwrap();
        s.add_constraint(&x().ge(1)).unwrap();
        s.add_constraint(&x().le(0)).unwrap();
        assert!(s.is_empty().unwrap());
    }

    #[test]
    fn test_contains_and_lattice() {
        let mut inner = BdShape::universe(1).unwrap();
        inner.add_constraint(&x().ge(0)).unwrap();
        inner.add_constraint(&x().le(1)).unwrap();
        let mut outer = BdShape::universe(1).unwrap();
        outer.add_constraint(&x().ge(-1)).unwrap();
        outer.add_constraint(&x().le(2)).unwrap();
        assert!(outer.contains(&inner).unwrap());
        assert!(!inner.contains(&outer).unwrap());

        let mut meet = outer.clone();
        meet.intersection_assign(&inner).unwrap();
        assert!(inner.contains(&meet).unwrap());

        let mut join = inner.clone();
        let mut shifted = BdShape::universe(1).unwrap();
        shifted.add_constraint(&x().ge(3)).unwrap();
        shifted.add_constraint(&x().le(4)).unwrap();
        join.upper_bound_assign(&shifted).unwrap();
        assert!(join.contains(&inner).unwrap());
        assert!(join.contains(&shifted).unwrap());
    }

    #[test]
    fn test_widening_escapes_grown_bounds() {
        let mut old = BdShape::universe(1).unwrap();
        old.add_constraint(&x().ge(0)).unwrap();
        old.add_constraint(&x().le(1)).unwrap();
        let mut new = BdShape::universe(1).unwrap();
        new.add_constraint(&x().ge(0)).unwrap();
        new.add_constraint(&x().le(5)).unwrap();
        new.bhmz05_widening_assign(&old, None).unwrap();
        // The upper bound escaped, the stable lower bound survived.
        assert_eq!(new.dbm[1][0], None);
        assert_eq!(new.dbm[0][1], Some(ratio(0, 1)));
    }

    #[test]
    fn test_cc76_extrapolation_stops() {
        let stops = vec![ratio(10, 1)];
        let mut old = BdShape::universe(1).unwrap();
        old.add_constraint(&x().le(1)).unwrap();
        let mut new = BdShape::universe(1).unwrap();
        new.add_constraint(&x().le(5)).unwrap();
        new.cc76_extrapolation_assign(&old, &stops).unwrap();
        assert_eq!(new.dbm[1][0], Some(ratio(10, 1)));
    }

    #[test]
    fn test_affine_image_shift() {
        let mut s = BdShape::universe(2).unwrap();
        s.add_constraint(&x().le(5)).unwrap();
        s.add_constraint(&(x() - y()).le(0)).unwrap();
        s.affine_image(x(), &(x() + 3), &Coefficient::from(1)).unwrap();
        let b = IntervalBox::<Rational>::from_bd_shape(&s).unwrap();
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(8, 1))
        );
    }

    #[test]
    fn test_polyhedron_round_trip() {
        // Property 4: the shape of a polyhedron contains it.
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&(x() + y()).le(1)).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&y().ge(0)).unwrap();
        let s = BdShape::from_polyhedron(&ph, Complexity::Simplex).unwrap();
        let back = Polyhedron::from_bd_shape(&s).unwrap();
        assert!(back.contains(&ph).unwrap());
        // The difference bound x - y is captured exactly by the LP path.
        let mut tight = BdShape::universe(2).unwrap();
        tight.add_constraint(&(x() - y()).le(1)).unwrap();
        assert!(tight.contains(&s).unwrap());
    }

    #[test]
    fn test_box_round_trip() {
        let mut s = BdShape::universe(1).unwrap();
        s.add_constraint(&x().ge(2)).unwrap();
        s.add_constraint(&x().le(9)).unwrap();
        let b = IntervalBox::<Rational>::from_bd_shape(&s).unwrap();
        let back = BdShape::from_box(&b).unwrap();
        assert!(back.contains(&s).unwrap());
        assert!(s.contains(&back).unwrap());
    }
}
