use std::fmt::Write as _;

use num::{Signed, Zero};
use polyhedra_arith::bound::{Bound, Boundary};
use polyhedra_arith::rational::from_coefficients;
use polyhedra_arith::{Coefficient, IntervalScalar, Rational, Rounding};
use serde::{Deserialize, Serialize};

use crate::abandon::maybe_abandon;
use crate::constraint::{Constraint, ConstraintSystem, ConstraintType};
use crate::congruence::Congruence;
use crate::error::{check_same_dimension, check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::generator::{Generator, GeneratorSystem, GeneratorType};
use crate::interval::{Interval, RationalInterval};
use crate::linear::Topology;
use crate::relation::{PolyConRelation, PolyGenRelation, RelSym};

/// Effort cap accepted by the coercions that may consult the LP solver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Complexity {
    Polynomial,
    Simplex,
    Any,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
enum EmptyStatus {
    Empty,
    KnownNonempty,
    Unknown,
}

/// The rectangular abstract domain: one interval per dimension.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct IntervalBox<S: IntervalScalar> {
    intervals: Vec<Interval<S>>,
    status: EmptyStatus,
}

impl<S: IntervalScalar> IntervalBox<S> {
    /// The full space of the given dimension.
    pub fn universe(space_dim: usize) -> Result<Self> {
        check_space_dimension("IntervalBox::universe", space_dim)?;
        Ok(IntervalBox {
            intervals: vec![Interval::universe(); space_dim],
            status: EmptyStatus::KnownNonempty,
        })
    }

    /// The empty set of the given dimension.
    pub fn empty(space_dim: usize) -> Result<Self> {
        check_space_dimension("IntervalBox::empty", space_dim)?;
        let mut intervals = vec![Interval::universe(); space_dim];
        if let Some(first) = intervals.first_mut() {
            first.assign_empty();
        }
        Ok(IntervalBox {
            intervals,
            status: EmptyStatus::Empty,
        })
    }

    /// Builds the box refined by the interval constraints of `cs`; proper
    /// relational constraints are ignored.
    pub fn from_constraints(cs: &ConstraintSystem) -> Result<Self> {
        let mut result = Self::universe(cs.space_dimension())?;
        result.refine_with_constraints(cs)?;
        Ok(result)
    }

    /// Builds the tightest box around a generator system, which must
    /// contain at least one point.
    pub fn from_generators(gs: &GeneratorSystem) -> Result<Self> {
        let space_dim = gs.space_dimension();
        let mut result = Self::empty(space_dim)?;
        if gs.num_rows() == 0 {
            return Ok(result);
        }
        if !gs.has_points() {
            return Err(Error::invalid_argument(
                "IntervalBox::from_generators",
                "generator system without a point",
            ));
        }
        result.status = EmptyStatus::KnownNonempty;
        // Points and closure points give both bounds. Track, per axis, the
        // extremal coordinate and whether an actual point attains it; a
        // bound attained only by closure points stays open.
        struct AxisHull {
            min: Option<(Rational, bool)>,
            max: Option<(Rational, bool)>,
        }
        let mut hulls: Vec<AxisHull> = (0..space_dim)
            .map(|_| AxisHull {
                min: None,
                max: None,
            })
            .collect();
        for g in gs.iter() {
            match g.generator_type() {
                GeneratorType::Point | GeneratorType::ClosurePoint => {
                    let d = g.divisor().expect("pointlike").clone();
                    let attained = g.is_point();
                    for i in 0..space_dim {
                        let q = from_coefficients(g.coefficient(Variable(i)), d.clone());
                        let hull = &mut hulls[i];
                        hull.min = Some(match hull.min.take() {
                            None => (q.clone(), attained),
                            Some((m, a)) => match q.cmp(&m) {
                                std::cmp::Ordering::Less => (q.clone(), attained),
                                std::cmp::Ordering::Equal => (m, a || attained),
                                std::cmp::Ordering::Greater => (m, a),
                            },
                        });
                        hull.max = Some(match hull.max.take() {
                            None => (q.clone(), attained),
                            Some((m, a)) => match q.cmp(&m) {
                                std::cmp::Ordering::Greater => (q, attained),
                                std::cmp::Ordering::Equal => (m, a || attained),
                                std::cmp::Ordering::Less => (m, a),
                            },
                        });
                    }
                }
                _ => {}
            }
        }
        let mut point_hull: Vec<RationalInterval> = Vec::with_capacity(space_dim);
        for hull in &hulls {
            let mut axis = RationalInterval::universe();
            if let Some((q, attained)) = &hull.min {
                axis.refine_lower(q, !attained)?;
            }
            if let Some((q, attained)) = &hull.max {
                axis.refine_upper(q, !attained)?;
            }
            point_hull.push(axis);
        }
        // Rays open the matching side; lines reset the axis.
        let mut unbound_lower = vec![false; space_dim];
        let mut unbound_upper = vec![false; space_dim];
        for g in gs.iter() {
            match g.generator_type() {
                GeneratorType::Line => {
                    for i in 0..space_dim {
                        if !g.coefficient(Variable(i)).is_zero() {
                            unbound_lower[i] = true;
                            unbound_upper[i] = true;
                        }
                    }
                }
                GeneratorType::Ray => {
                    for i in 0..space_dim {
                        let c = g.coefficient(Variable(i));
                        if c.is_positive() {
                            unbound_upper[i] = true;
                        } else if c.is_negative() {
                            unbound_lower[i] = true;
                        }
                    }
                }
                _ => {}
            }
        }
        for i in 0..space_dim {
            let exact = &point_hull[i];
            result.intervals[i].assign_sound(exact);
            if unbound_lower[i] {
                result.intervals[i]
                    .set_lower(Bound::MinusInfinity, true)
                    .expect("infinite bounds are always representable");
            }
            if unbound_upper[i] {
                result.intervals[i]
                    .set_upper(Bound::PlusInfinity, true)
                    .expect("infinite bounds are always representable");
            }
        }
        Ok(result)
    }

    pub fn space_dimension(&self) -> usize {
        self.intervals.len()
    }

    pub fn interval(&self, v: Variable) -> &Interval<S> {
        &self.intervals[v.id()]
    }

    pub fn interval_mut(&mut self, v: Variable) -> &mut Interval<S> {
        self.status = EmptyStatus::Unknown;
        &mut self.intervals[v.id()]
    }

    /// Scans the intervals when emptiness is not yet known.
    pub fn is_empty(&self) -> bool {
        match self.status {
            EmptyStatus::Empty => true,
            EmptyStatus::KnownNonempty => false,
            EmptyStatus::Unknown => self.intervals.iter().any(|i| i.is_empty()),
        }
    }

    /// Like [`IntervalBox::is_empty`] but latches the answer.
    pub fn check_empty(&mut self) -> bool {
        if self.status == EmptyStatus::Unknown {
            self.status = if self.intervals.iter().any(|i| i.is_empty()) {
                EmptyStatus::Empty
            } else {
                EmptyStatus::KnownNonempty
            };
        }
        self.status == EmptyStatus::Empty
    }

    pub fn is_universe(&self) -> bool {
        self.intervals.iter().all(|i| i.is_universe())
    }

    pub fn is_bounded(&self) -> bool {
        self.is_empty() || self.intervals.iter().all(|i| i.is_bounded())
    }

    pub fn is_topologically_closed(&self) -> bool {
        self.is_empty() || self.intervals.iter().all(|i| i.is_topologically_closed())
    }

    pub fn contains(&self, other: &Self) -> Result<bool> {
        check_same_dimension(
            "IntervalBox::contains",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if other.is_empty() {
            return Ok(true);
        }
        if self.is_empty() {
            return Ok(false);
        }
        Ok(self
            .intervals
            .iter()
            .zip(&other.intervals)
            .all(|(a, b)| a.contains(b)))
    }

    pub fn strictly_contains(&self, other: &Self) -> Result<bool> {
        Ok(self.contains(other)? && self != other && !(other.contains(self)?))
    }

    pub fn is_disjoint_from(&self, other: &Self) -> Result<bool> {
        check_same_dimension(
            "IntervalBox::is_disjoint_from",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if self.is_empty() || other.is_empty() {
            return Ok(true);
        }
        Ok(self
            .intervals
            .iter()
            .zip(&other.intervals)
            .any(|(a, b)| a.is_disjoint_from(b)))
    }

    pub fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        check_same_dimension(
            "IntervalBox::intersection_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        for (a, b) in self.intervals.iter_mut().zip(&other.intervals) {
            a.intersect_assign(b);
        }
        self.status = EmptyStatus::Unknown;
        Ok(())
    }

    pub fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        check_same_dimension(
            "IntervalBox::upper_bound_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        for (a, b) in self.intervals.iter_mut().zip(&other.intervals) {
            a.join_assign(b);
        }
        self.status = EmptyStatus::KnownNonempty;
        Ok(())
    }

    /// Joins only when the join is the set union: the boxes are comparable,
    /// or they differ along a single axis whose intervals join exactly.
    pub fn upper_bound_assign_if_exact(&mut self, other: &Self) -> Result<bool> {
        check_same_dimension(
            "IntervalBox::upper_bound_assign_if_exact",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if other.is_empty() || self.contains(other)? {
            return Ok(true);
        }
        if self.is_empty() || other.contains(self)? {
            *self = other.clone();
            return Ok(true);
        }
        let differing: Vec<usize> = (0..self.space_dimension())
            .filter(|&i| self.intervals[i] != other.intervals[i])
            .collect();
        if differing.len() != 1 {
            return Ok(false);
        }
        let k = differing[0];
        if !self.intervals[k].can_be_exactly_joined_to(&other.intervals[k]) {
            return Ok(false);
        }
        self.intervals[k].join_assign(&other.intervals[k]);
        self.status = EmptyStatus::KnownNonempty;
        Ok(true)
    }

    /// Subtracts `other` exactly when the two boxes differ along a single
    /// axis; any other shape leaves the receiver unchanged.
    pub fn difference_assign(&mut self, other: &Self) -> Result<()> {
        check_same_dimension(
            "IntervalBox::difference_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if self.is_empty() || other.is_empty() || self.is_disjoint_from(other)? {
            return Ok(());
        }
        let n = self.space_dimension();
        if n == 0 {
            // Zero-dimensional nonempty boxes are the universe point.
            *self = Self::empty(0)?;
            return Ok(());
        }
        let mut uncovered = None;
        for i in 0..n {
            if !other.intervals[i].contains(&self.intervals[i]) {
                if uncovered.is_some() {
                    return Ok(());
                }
                uncovered = Some(i);
            }
        }
        match uncovered {
            None => {
                *self = Self::empty(n)?;
            }
            Some(k) => {
                self.intervals[k].difference_assign(&other.intervals[k]);
                self.status = EmptyStatus::Unknown;
            }
        }
        Ok(())
    }

    pub fn concatenate_assign(&mut self, other: &Self) -> Result<()> {
        check_space_dimension(
            "IntervalBox::concatenate_assign",
            self.space_dimension() + other.space_dimension(),
        )?;
        let was_empty = self.is_empty() || other.is_empty();
        self.intervals.extend(other.intervals.iter().cloned());
        self.status = if was_empty {
            EmptyStatus::Unknown
        } else {
            EmptyStatus::KnownNonempty
        };
        Ok(())
    }

    /// The exact rational interval of `b + sum a_i x_i` over this box.
    pub(crate) fn eval_expr(&self, e: &LinearExpr) -> RationalInterval {
        let mut acc = RationalInterval::singleton(Rational::from(e.inhomogeneous_term().clone()));
        for i in 0..e.space_dimension().min(self.space_dimension()) {
            let a = e.coefficient(Variable(i));
            if a.is_zero() {
                continue;
            }
            let axis = self.intervals[i].to_rational_interval();
            acc.add_mul_assign(&Rational::from(a), &axis);
        }
        acc
    }

    fn interval_constraint_var(c: &Constraint) -> Option<Variable> {
        let mut var = None;
        for i in 0..c.space_dimension() {
            if !c.coefficient(Variable(i)).is_zero() {
                if var.is_some() {
                    return None;
                }
                var = Some(Variable(i));
            }
        }
        var
    }

    /// Refines with one constraint; proper relational constraints are
    /// ignored, strict bounds over a closed kind are an error.
    pub fn refine_with_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::refine_with_constraint",
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
        let var = match Self::interval_constraint_var(c) {
            Some(v) => v,
            None => return Ok(()),
        };
        self.refine_interval_constraint(c, var)
    }

    fn refine_interval_constraint(&mut self, c: &Constraint, var: Variable) -> Result<()> {
        // a*x + b relop 0, a nonzero.
        let a = c.coefficient(var);
        let b = c.inhomogeneous_term().clone();
        let q = from_coefficients(-b, a.clone());
        let strict = c.is_strict_inequality();
        let axis = &mut self.intervals[var.id()];
        match c.constraint_type() {
            ConstraintType::Equality => {
                axis.refine_lower(&q, false)?;
                axis.refine_upper(&q, false)?;
            }
            _ => {
                if a.is_positive() {
                    axis.refine_lower(&q, strict)?;
                } else {
                    axis.refine_upper(&q, strict)?;
                }
            }
        }
        self.status = EmptyStatus::Unknown;
        Ok(())
    }

    /// Refines with every constraint of `cs`, ignoring the relational ones.
    pub fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        if cs.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::refine_with_constraints",
                self.space_dimension(),
                cs.space_dimension(),
            ));
        }
        for c in cs.iter() {
            self.refine_with_constraint(c)?;
        }
        Ok(())
    }

    /// Adds one constraint, rejecting proper relational ones.
    pub fn add_constraint(&mut self, c: &Constraint) -> Result<()> {
        if !c.is_tautological()
            && !c.is_inconsistent()
            && Self::interval_constraint_var(c).is_none()
        {
            return Err(Error::invalid_argument(
                "IntervalBox::add_constraint",
                "constraint relates more than one dimension",
            ));
        }
        self.refine_with_constraint(c)
    }

    pub fn add_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        for c in cs.iter() {
            self.add_constraint(c)?;
        }
        Ok(())
    }

    /// Refines with a congruence: only equalities refine a box; proper
    /// congruences are ignored (they never bound an interval).
    pub fn refine_with_congruence(&mut self, cg: &Congruence) -> Result<()> {
        if cg.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::refine_with_congruence",
                self.space_dimension(),
                cg.space_dimension(),
            ));
        }
        if cg.is_inconsistent() {
            self.set_empty();
            return Ok(());
        }
        if cg.is_equality() && !cg.is_tautological() {
            let c = cg.linear_expr().eq(0);
            self.refine_with_constraint(&c)?;
        }
        Ok(())
    }

    fn set_empty(&mut self) {
        let n = self.space_dimension();
        *self = Self::empty(n).expect("dimension already accepted");
    }

    /// `var <- (e)/denominator` evaluated by interval arithmetic over the
    /// current box, through the exact rational scratch kind.
    pub fn affine_image(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("IntervalBox::affine_image", var, e, denominator)?;
        if self.is_empty() {
            return Ok(());
        }
        let mut value = self.eval_expr(e);
        value.div_assign_coeff(&Rational::from(denominator.clone()));
        self.intervals[var.id()].assign_sound(&value);
        self.status = EmptyStatus::Unknown;
        Ok(())
    }

    /// The preimage of `var <- e/denominator`: inverted when `e` depends on
    /// `var`, otherwise `var` is unconstrained after a satisfiability
    /// check.
    pub fn affine_preimage(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("IntervalBox::affine_preimage", var, e, denominator)?;
        if self.is_empty() {
            return Ok(());
        }
        let a = e.coefficient(var);
        if !a.is_zero() {
            // x' = (a x + rest)/d inverts to x = (d x' - rest)/a.
            let mut inverse = LinearExpr::zero() - e.clone();
            inverse.set_coefficient(var, denominator.clone());
            return self.affine_image(var, &inverse, &a);
        }
        // Non-invertible: the image value e/d had to land in var's old
        // interval.
        let mut value = self.eval_expr(e);
        value.div_assign_coeff(&Rational::from(denominator.clone()));
        let old = self.intervals[var.id()].to_rational_interval();
        value.intersect_assign(&old);
        if value.is_empty() {
            self.set_empty();
            return Ok(());
        }
        self.intervals[var.id()].assign_universe();
        self.status = EmptyStatus::Unknown;
        Ok(())
    }

    /// `lb/d <= var' <= ub/d`, with the implied constraint `lb <= ub`
    /// imposed on the other dimensions first.
    pub fn bounded_affine_image(
        &mut self,
        var: Variable,
        lb: &LinearExpr,
        ub: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("IntervalBox::bounded_affine_image", var, lb, denominator)?;
        self.check_affine_args("IntervalBox::bounded_affine_image", var, ub, denominator)?;
        if self.is_empty() {
            return Ok(());
        }
        // lb <= ub must hold for the image to be nonempty at a given x.
        let implied = ub.clone() - lb.clone();
        self.propagate_constraint(&implied.ge(0))?;
        if self.check_empty() {
            return Ok(());
        }
        let d = Rational::from(denominator.clone());
        let mut lower = self.eval_expr(lb);
        lower.div_assign_coeff(&d);
        let mut upper = self.eval_expr(ub);
        upper.div_assign_coeff(&d);
        let mut exact = RationalInterval::universe();
        if let Bound::Finite(q) = &lower.lower().value {
            exact.refine_lower(q, lower.lower().open)?;
        }
        if let Bound::Finite(q) = &upper.upper().value {
            exact.refine_upper(q, upper.upper().open)?;
        }
        self.intervals[var.id()].assign_sound(&exact);
        self.status = EmptyStatus::Unknown;
        Ok(())
    }

    /// `var' relsym e/d`; `=` falls through to the plain image.
    pub fn generalized_affine_image(
        &mut self,
        var: Variable,
        relsym: RelSym,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        if relsym == RelSym::NotEqual {
            return Err(Error::invalid_argument(
                "IntervalBox::generalized_affine_image",
                "NOT_EQUAL relation symbol",
            ));
        }
        if relsym == RelSym::Equal {
            return self.affine_image(var, e, denominator);
        }
        self.check_affine_args(
            "IntervalBox::generalized_affine_image",
            var,
            e,
            denominator,
        )?;
        if self.is_empty() {
            return Ok(());
        }
        let mut value = self.eval_expr(e);
        value.div_assign_coeff(&Rational::from(denominator.clone()));
        let mut exact = RationalInterval::universe();
        match relsym {
            RelSym::GreaterOrEqual | RelSym::GreaterThan => {
                if let Bound::Finite(q) = &value.lower().value {
                    exact.refine_lower(q, value.lower().open || relsym == RelSym::GreaterThan)?;
                }
            }
            RelSym::LessOrEqual | RelSym::LessThan => {
                if let Bound::Finite(q) = &value.upper().value {
                    exact.refine_upper(q, value.upper().open || relsym == RelSym::LessThan)?;
                }
            }
            _ => unreachable!("handled above"),
        }
        self.intervals[var.id()].assign_sound(&exact);
        self.status = EmptyStatus::Unknown;
        Ok(())
    }

    fn check_affine_args(
        &self,
        method: &'static str,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        if denominator.is_zero() {
            return Err(Error::invalid_argument(method, "denominator is zero"));
        }
        if var.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                method,
                self.space_dimension(),
                var.space_dimension(),
            ));
        }
        if e.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                method,
                self.space_dimension(),
                e.space_dimension(),
            ));
        }
        Ok(())
    }

    /// Iterated per-dimension tightening from `c` until a full pass changes
    /// nothing. Sound and convergent; no best-bound promise.
    pub fn propagate_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::propagate_constraint",
                self.space_dimension(),
                c.space_dimension(),
            ));
        }
        if c.is_inconsistent() {
            self.set_empty();
            return Ok(());
        }
        let vars: Vec<Variable> = (0..c.space_dimension())
            .map(Variable)
            .filter(|&v| !c.coefficient(v).is_zero())
            .collect();
        if vars.is_empty() {
            return Ok(());
        }
        let strict = c.is_strict_inequality();
        let is_eq = c.is_equality();
        loop {
            maybe_abandon("IntervalBox::propagate_constraint")?;
            let mut changed = false;
            for &v in &vars {
                if self.is_empty() {
                    self.set_empty();
                    return Ok(());
                }
                let a = c.coefficient(v);
                // rest = b + sum_{i != v} a_i x_i as an exact interval.
                let mut rest_expr = c.linear_expr();
                rest_expr.set_coefficient(v, Coefficient::zero());
                let rest = self.eval_expr(&rest_expr);
                // a x + rest >= 0  =>  x >= -rest.sup/a (a > 0) or
                // x <= -rest.inf/a (a < 0); equalities tighten both sides.
                let a_q = Rational::from(a.clone());
                let mut bound = rest;
                bound.neg_assign();
                bound.div_assign_coeff(&a_q);
                let axis = &mut self.intervals[v.id()];
                let before = axis.clone();
                if a.is_positive() {
                    if let Bound::Finite(q) = &bound.lower().value {
                        axis.refine_lower(q, bound.lower().open || strict)?;
                    }
                    if is_eq {
                        if let Bound::Finite(q) = &bound.upper().value {
                            axis.refine_upper(q, bound.upper().open)?;
                        }
                    }
                } else {
                    if let Bound::Finite(q) = &bound.upper().value {
                        axis.refine_upper(q, bound.upper().open || strict)?;
                    }
                    if is_eq {
                        if let Bound::Finite(q) = &bound.lower().value {
                            axis.refine_lower(q, bound.lower().open)?;
                        }
                    }
                }
                if axis != &before {
                    changed = true;
                }
            }
            self.status = EmptyStatus::Unknown;
            if !changed {
                break;
            }
        }
        Ok(())
    }

    /// Relation against a constraint, by comparing the exact interval of
    /// its expression with zero.
    pub fn relation_with_constraint(&self, c: &Constraint) -> Result<PolyConRelation> {
        if c.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::relation_with_constraint",
                self.space_dimension(),
                c.space_dimension(),
            ));
        }
        if self.is_empty() {
            return Ok(PolyConRelation::saturates()
                | PolyConRelation::is_included()
                | PolyConRelation::is_disjoint());
        }
        let i = self.eval_expr(&c.linear_expr());
        let zero = <Rational as num::Zero>::zero();
        let lower_sign = bound_sign(i.lower(), &zero, 1);
        let upper_sign = bound_sign(i.upper(), &zero, -1);
        let saturates = i.is_singleton() && lower_sign == 0;
        let zero_inside = !zero_outside(&i);
        Ok(match c.constraint_type() {
            ConstraintType::Equality => {
                if saturates {
                    PolyConRelation::is_included() | PolyConRelation::saturates()
                } else if zero_inside {
                    PolyConRelation::strictly_intersects()
                } else {
                    PolyConRelation::is_disjoint()
                }
            }
            ConstraintType::NonstrictInequality => {
                let rel = if lower_sign >= 0 {
                    PolyConRelation::is_included()
                } else if upper_sign < 0 || (upper_sign == 0 && i.upper().open) {
                    PolyConRelation::is_disjoint()
                } else {
                    PolyConRelation::strictly_intersects()
                };
                if saturates {
                    rel | PolyConRelation::saturates()
                } else {
                    rel
                }
            }
            ConstraintType::StrictInequality => {
                if lower_sign > 0 || (lower_sign == 0 && i.lower().open) {
                    PolyConRelation::is_included()
                } else if upper_sign < 0 {
                    PolyConRelation::is_disjoint()
                } else if upper_sign == 0 {
                    // Everything sits on or below the boundary.
                    if saturates {
                        PolyConRelation::is_disjoint() | PolyConRelation::saturates()
                    } else {
                        PolyConRelation::is_disjoint()
                    }
                } else {
                    PolyConRelation::strictly_intersects()
                }
            }
        })
    }

    /// Relation against a congruence.
    pub fn relation_with_congruence(&self, cg: &Congruence) -> Result<PolyConRelation> {
        if cg.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::relation_with_congruence",
                self.space_dimension(),
                cg.space_dimension(),
            ));
        }
        if self.is_empty() {
            return Ok(PolyConRelation::saturates()
                | PolyConRelation::is_included()
                | PolyConRelation::is_disjoint());
        }
        if cg.is_equality() {
            return self.relation_with_constraint(&cg.linear_expr().eq(0));
        }
        let i = self.eval_expr(&cg.linear_expr());
        let m = Rational::from(cg.modulus().clone());
        if i.is_singleton() {
            if let Bound::Finite(v) = &i.lower().value {
                let multiple = (v / &m).is_integer();
                return Ok(if multiple {
                    if v.is_zero() {
                        PolyConRelation::is_included() | PolyConRelation::saturates()
                    } else {
                        PolyConRelation::is_included()
                    }
                } else {
                    PolyConRelation::is_disjoint()
                });
            }
        }
        // A non-degenerate interval meets a residue class unless every
        // multiple of the modulus falls outside its (possibly open) ends.
        match (&i.lower().value, &i.upper().value) {
            (Bound::Finite(lo), Bound::Finite(hi)) => {
                let mut k_lo = (lo / &m).ceil();
                if i.lower().open && &k_lo * &m == *lo {
                    k_lo += Rational::from(Coefficient::from(1));
                }
                let mut k_hi = (hi / &m).floor();
                if i.upper().open && &k_hi * &m == *hi {
                    k_hi -= Rational::from(Coefficient::from(1));
                }
                Ok(if k_lo <= k_hi {
                    PolyConRelation::strictly_intersects()
                } else {
                    PolyConRelation::is_disjoint()
                })
            }
            _ => Ok(PolyConRelation::strictly_intersects()),
        }
    }

    /// Relation against a generator: subsumed when adding it changes
    /// nothing.
    pub fn relation_with_generator(&self, g: &Generator) -> Result<PolyGenRelation> {
        if g.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::relation_with_generator",
                self.space_dimension(),
                g.space_dimension(),
            ));
        }
        if self.is_empty() {
            return Ok(PolyGenRelation::Nothing);
        }
        let subsumed = match g.generator_type() {
            GeneratorType::Point | GeneratorType::ClosurePoint => {
                let d = g.divisor().expect("pointlike").clone();
                (0..self.space_dimension()).all(|k| {
                    let q = from_coefficients(g.coefficient(Variable(k)), d.clone());
                    let singleton = RationalInterval::singleton(q);
                    let axis = self.intervals[k].to_rational_interval();
                    if g.is_closure_point() {
                        // A closure point only needs to sit in the
                        // topological closure.
                        closure_contains(&axis, &singleton)
                    } else {
                        axis.contains(&singleton)
                    }
                })
            }
            GeneratorType::Ray | GeneratorType::Line => {
                let is_line = g.is_line();
                (0..self.space_dimension()).all(|k| {
                    let c = g.coefficient(Variable(k));
                    let axis = &self.intervals[k];
                    if c.is_zero() {
                        true
                    } else if c.is_positive() {
                        axis.upper().is_unbounded() && (!is_line || axis.lower().is_unbounded())
                    } else {
                        axis.lower().is_unbounded() && (!is_line || axis.upper().is_unbounded())
                    }
                })
            }
        };
        Ok(if subsumed {
            PolyGenRelation::Subsumes
        } else {
            PolyGenRelation::Nothing
        })
    }

    /// The CC76 widening with the default stop points {-2, -1, 0, 1, 2}.
    pub fn cc76_widening_assign(&mut self, old: &Self, tp: Option<&mut u32>) -> Result<()> {
        let stops: Vec<Rational> = [-2i64, -1, 0, 1, 2]
            .iter()
            .map(|&s| Rational::from(Coefficient::from(s)))
            .collect();
        self.cc76_widening_assign_with_points(old, &stops, tp)
    }

    /// The CC76 widening against the previous iterate `old`, with
    /// user-supplied sorted stop points. A positive token count absorbs
    /// precision-losing steps, decrementing once per absorbed step; an
    /// unwind before commit leaves the tokens untouched.
    pub fn cc76_widening_assign_with_points(
        &mut self,
        old: &Self,
        stop_points: &[Rational],
        tp: Option<&mut u32>,
    ) -> Result<()> {
        check_same_dimension(
            "IntervalBox::cc76_widening_assign",
            self.space_dimension(),
            old.space_dimension(),
        )?;
        if old.is_empty() || self.is_empty() {
            return Ok(());
        }
        let mut widened = self.clone();
        for (a, b) in widened.intervals.iter_mut().zip(&old.intervals) {
            a.cc76_widening_assign(b, stop_points);
        }
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

    /// Limited extrapolation: widen, then win back the constraints of `cs`
    /// that the pre-widening box satisfied.
    pub fn limited_cc76_extrapolation_assign(
        &mut self,
        old: &Self,
        cs: &ConstraintSystem,
        tp: Option<&mut u32>,
    ) -> Result<()> {
        let before = self.clone();
        self.cc76_widening_assign(old, tp)?;
        for c in cs.iter() {
            let rel = before.relation_with_constraint(c)?;
            if rel.implies(PolyConRelation::is_included()) {
                self.refine_with_constraint(c)?;
            }
        }
        Ok(())
    }

    /// A constraint system describing this box exactly.
    pub fn constraints(&self) -> Result<ConstraintSystem> {
        let n = self.space_dimension();
        if self.is_empty() {
            let mut cs = ConstraintSystem::new(n, Topology::Closed);
            cs.insert(Constraint::zero_dim_false())?;
            return Ok(cs);
        }
        let topology = if self.is_topologically_closed() {
            Topology::Closed
        } else {
            Topology::NotClosed
        };
        let mut cs = ConstraintSystem::new(n, topology);
        for k in 0..n {
            let axis = self.intervals[k].to_rational_interval();
            let v = Variable(k);
            if axis.is_singleton() {
                if let Bound::Finite(q) = &axis.lower().value {
                    cs.insert((LinearExpr::from_variable(v) * q.denom().clone()).eq(q.numer().clone()))?;
                }
                continue;
            }
            if let Bound::Finite(q) = &axis.lower().value {
                let e = LinearExpr::from_variable(v) * q.denom().clone();
                let c = if axis.lower().open {
                    e.gt(q.numer().clone())
                } else {
                    e.ge(q.numer().clone())
                };
                cs.insert(c)?;
            }
            if let Bound::Finite(q) = &axis.upper().value {
                let e = LinearExpr::from_variable(v) * q.denom().clone();
                let c = if axis.upper().open {
                    e.lt(q.numer().clone())
                } else {
                    e.le(q.numer().clone())
                };
                cs.insert(c)?;
            }
        }
        Ok(cs)
    }

    pub fn add_space_dimensions_and_embed(&mut self, n: usize) -> Result<()> {
        check_space_dimension(
            "IntervalBox::add_space_dimensions_and_embed",
            self.space_dimension() + n,
        )?;
        self.intervals
            .extend(std::iter::repeat_with(Interval::universe).take(n));
        Ok(())
    }

    pub fn add_space_dimensions_and_project(&mut self, n: usize) -> Result<()> {
        check_space_dimension(
            "IntervalBox::add_space_dimensions_and_project",
            self.space_dimension() + n,
        )?;
        self.intervals
            .extend(std::iter::repeat_with(|| Interval::singleton(S::zero())).take(n));
        Ok(())
    }

    pub fn remove_space_dimensions(&mut self, vars: &[Variable]) -> Result<()> {
        for v in vars {
            if v.space_dimension() > self.space_dimension() {
                return Err(Error::dimension_incompatible(
                    "IntervalBox::remove_space_dimensions",
                    self.space_dimension(),
                    v.space_dimension(),
                ));
            }
        }
        let mut keep: Vec<bool> = vec![true; self.space_dimension()];
        for v in vars {
            keep[v.id()] = false;
        }
        let was_empty = self.is_empty();
        let mut k = 0;
        self.intervals.retain(|_| {
            let kept = keep[k];
            k += 1;
            kept
        });
        if was_empty {
            if let Some(first) = self.intervals.first_mut() {
                first.assign_empty();
            }
            self.status = EmptyStatus::Empty;
        } else {
            self.status = EmptyStatus::Unknown;
        }
        Ok(())
    }

    pub fn remove_higher_space_dimensions(&mut self, new_dim: usize) -> Result<()> {
        if new_dim > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::remove_higher_space_dimensions",
                self.space_dimension(),
                new_dim,
            ));
        }
        let was_empty = self.is_empty();
        self.intervals.truncate(new_dim);
        if was_empty {
            if let Some(first) = self.intervals.first_mut() {
                first.assign_empty();
            }
            self.status = EmptyStatus::Empty;
        } else {
            self.status = EmptyStatus::Unknown;
        }
        Ok(())
    }

    /// Remaps dimensions through a partial map: `map[i] = Some(j)` sends
    /// axis `i` to `j`, `None` drops it.
    pub fn map_space_dimensions(&mut self, map: &[Option<usize>]) -> Result<()> {
        if map.len() != self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::map_space_dimensions",
                self.space_dimension(),
                map.len(),
            ));
        }
        let new_dim = map.iter().flatten().copied().max().map_or(0, |m| m + 1);
        let mut seen = vec![false; new_dim];
        for j in map.iter().flatten() {
            if *j >= new_dim || seen[*j] {
                return Err(Error::invalid_argument(
                    "IntervalBox::map_space_dimensions",
                    "map is not injective",
                ));
            }
            seen[*j] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(Error::invalid_argument(
                "IntervalBox::map_space_dimensions",
                "map is not onto the target dimensions",
            ));
        }
        let was_empty = self.is_empty();
        let mut new_intervals = vec![Interval::universe(); new_dim];
        for (i, target) in map.iter().enumerate() {
            if let Some(j) = target {
                new_intervals[*j] = self.intervals[i].clone();
            }
        }
        self.intervals = new_intervals;
        if was_empty {
            if let Some(first) = self.intervals.first_mut() {
                first.assign_empty();
            }
            self.status = EmptyStatus::Empty;
        }
        Ok(())
    }

    /// Duplicates axis `var` onto `n` fresh trailing dimensions.
    pub fn expand_space_dimension(&mut self, var: Variable, n: usize) -> Result<()> {
        if var.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::expand_space_dimension",
                self.space_dimension(),
                var.space_dimension(),
            ));
        }
        check_space_dimension(
            "IntervalBox::expand_space_dimension",
            self.space_dimension() + n,
        )?;
        let copy = self.intervals[var.id()].clone();
        self.intervals.extend(std::iter::repeat(copy).take(n));
        Ok(())
    }

    /// Joins the axes in `vars` onto `dest` and removes them.
    pub fn fold_space_dimensions(&mut self, vars: &[Variable], dest: Variable) -> Result<()> {
        if dest.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "IntervalBox::fold_space_dimensions",
                self.space_dimension(),
                dest.space_dimension(),
            ));
        }
        if vars.contains(&dest) {
            return Err(Error::invalid_argument(
                "IntervalBox::fold_space_dimensions",
                "destination is among the folded dimensions",
            ));
        }
        for v in vars {
            if v.space_dimension() > self.space_dimension() {
                return Err(Error::dimension_incompatible(
                    "IntervalBox::fold_space_dimensions",
                    self.space_dimension(),
                    v.space_dimension(),
                ));
            }
            let folded = self.intervals[v.id()].clone();
            self.intervals[dest.id()].join_assign(&folded);
        }
        self.remove_space_dimensions(vars)
    }

    pub fn ascii_dump(&self, out: &mut String) {
        let _ = writeln!(out, "space_dim {}", self.space_dimension());
        let status = match self.status {
            EmptyStatus::Empty => "EM",
            EmptyStatus::KnownNonempty => "NE",
            EmptyStatus::Unknown => "UN",
        };
        let _ = writeln!(out, "status {}", status);
        for i in &self.intervals {
            let _ = writeln!(out, "{}", dump_interval(i));
        }
    }

    pub fn ascii_load(input: &str) -> Option<Self> {
        let mut lines = input.lines();
        let space_dim: usize = lines.next()?.strip_prefix("space_dim ")?.parse().ok()?;
        let status = match lines.next()?.strip_prefix("status ")? {
            "EM" => EmptyStatus::Empty,
            "NE" => EmptyStatus::KnownNonempty,
            "UN" => EmptyStatus::Unknown,
            _ => return None,
        };
        let mut intervals = Vec::with_capacity(space_dim);
        for _ in 0..space_dim {
            intervals.push(parse_interval(lines.next()?)?);
        }
        Some(IntervalBox { intervals, status })
    }
}

fn closure_contains(axis: &RationalInterval, single: &RationalInterval) -> bool {
    // Containment up to topological closure of the axis.
    let mut closed = axis.clone();
    if let Bound::Finite(q) = closed.lower().value.clone() {
        let _ = closed.set_lower(Bound::Finite(q), false);
    }
    if let Bound::Finite(q) = closed.upper().value.clone() {
        let _ = closed.set_upper(Bound::Finite(q), false);
    }
    closed.contains(single)
}

fn zero_outside(i: &RationalInterval) -> bool {
    let zero = RationalInterval::singleton(<Rational as num::Zero>::zero());
    i.is_disjoint_from(&zero)
}

fn bound_sign(b: &Boundary<Rational>, zero: &Rational, infinite_sign: i32) -> i32 {
    match &b.value {
        Bound::Finite(q) => match q.cmp(zero) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },
        Bound::MinusInfinity => -infinite_sign.abs(),
        Bound::PlusInfinity => infinite_sign.abs(),
    }
}

fn dump_interval<S: IntervalScalar>(i: &Interval<S>) -> String {
    if i.is_empty() {
        return "[]".to_string();
    }
    let mut s = String::new();
    s.push(if i.lower().open { '(' } else { '[' });
    match &i.lower().value {
        Bound::Finite(v) => s.push_str(&v.to_string()),
        _ => s.push_str("-inf"),
    }
    s.push_str(", ");
    match &i.upper().value {
        Bound::Finite(v) => s.push_str(&v.to_string()),
        _ => s.push_str("+inf"),
    }
    s.push(if i.upper().open { ')' } else { ']' });
    s
}

fn parse_interval<S: IntervalScalar>(line: &str) -> Option<Interval<S>> {
    let line = line.trim();
    if line == "[]" {
        return Some(Interval::empty());
    }
    let lower_open = match line.chars().next()? {
        '(' => true,
        '[' => false,
        _ => return None,
    };
    let upper_open = match line.chars().last()? {
        ')' => true,
        ']' => false,
        _ => return None,
    };
    let inner = &line[1..line.len() - 1];
    let (lo, hi) = inner.split_once(", ")?;
    let mut result: Interval<S> = Interval::universe();
    if lo != "-inf" {
        let q: Rational = lo.parse().ok()?;
        let (v, _) = S::from_rational(&q, Rounding::Down);
        result.set_lower(Bound::Finite(v), lower_open).ok()?;
    }
    if hi != "+inf" {
        let q: Rational = hi.parse().ok()?;
        let (v, _) = S::from_rational(&q, Rounding::Up);
        result.set_upper(Bound::Finite(v), upper_open).ok()?;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhedra_arith::rational::ratio;
    use polyhedra_arith::ClosedRational;

    type QBox = IntervalBox<Rational>;

    fn boxed(bounds: &[(i64, i64)]) -> QBox {
        let mut b = QBox::universe(bounds.len()).unwrap();
        for (k, &(lo, hi)) in bounds.iter().enumerate() {
            b.interval_mut(Variable(k))
                .refine_lower(&ratio(lo, 1), false)
                .unwrap();
            b.interval_mut(Variable(k))
                .refine_upper(&ratio(hi, 1), false)
                .unwrap();
        }
        b
    }

    #[test]
    fn test_constraint_intake() {
        let x = Variable(0);
        let y = Variable(1);
        let mut cs = ConstraintSystem::new(2, Topology::Closed);
        cs.insert(x.ge(0)).unwrap();
        cs.insert(x.le(2)).unwrap();
        cs.insert((x + y).le(100)).unwrap(); // relational: ignored
        let b = QBox::from_constraints(&cs).unwrap();
        assert_eq!(b.interval(x).to_rational_interval(), {
            let mut i = RationalInterval::universe();
            i.refine_lower(&ratio(0, 1), false).unwrap();
            i.refine_upper(&ratio(2, 1), false).unwrap();
            i
        });
        assert!(b.interval(y).is_universe());
    }

    #[test]
    fn test_add_constraint_rejects_relational() {
        let x = Variable(0);
        let y = Variable(1);
        let mut b = QBox::universe(2).unwrap();
        assert!(b.add_constraint(&(x + y).le(1)).is_err());
        assert!(b.add_constraint(&x.le(1)).is_ok());
    }

    #[test]
    fn test_strict_over_closed_kind_is_invalid() {
        let x = Variable(0);
        let mut cs = ConstraintSystem::new(1, Topology::NotClosed);
        cs.insert(x.gt(3)).unwrap();
        let closed = IntervalBox::<ClosedRational>::from_constraints(&cs);
        assert!(closed.is_err());
        let open = IntervalBox::<Rational>::from_constraints(&cs).unwrap();
        assert!(open.interval(x).lower().open);
    }

    #[test]
    fn test_generator_intake() {
        let x = Variable(0);
        let y = Variable(1);
        let mut gs = GeneratorSystem::new(2, Topology::Closed);
        gs.insert(crate::generator::point(LinearExpr::zero()).unwrap())
            .unwrap();
        gs.insert(crate::generator::point(x * 2 + y).unwrap()).unwrap();
        gs.insert(crate::generator::ray(y).unwrap()).unwrap();
        let b = QBox::from_generators(&gs).unwrap();
        assert!(!b.is_empty());
        assert_eq!(
            b.interval(x).to_rational_interval().upper().value,
            Bound::Finite(ratio(2, 1))
        );
        assert!(b.interval(y).upper().is_unbounded());
        assert_eq!(
            b.interval(y).to_rational_interval().lower().value,
            Bound::Finite(ratio(0, 1))
        );
    }

    #[test]
    fn test_generators_without_point_rejected() {
        let mut gs = GeneratorSystem::new(1, Topology::Closed);
        gs.insert(crate::generator::ray(Variable(0)).unwrap())
            .unwrap();
        assert!(QBox::from_generators(&gs).is_err());
    }

    #[test]
    fn test_lattice_ops() {
        let mut a = boxed(&[(0, 10), (0, 10)]);
        a.intersection_assign(&boxed(&[(5, 20), (-10, 3)])).unwrap();
        assert_eq!(a, boxed(&[(5, 10), (0, 3)]));

        let mut b = boxed(&[(0, 1), (0, 1)]);
        b.upper_bound_assign(&boxed(&[(2, 3), (0, 1)])).unwrap();
        assert_eq!(b, boxed(&[(0, 3), (0, 1)]));
    }

    #[test]
    fn test_upper_bound_if_exact() {
        // Differ along one axis, overlapping: exact.
        let mut a = boxed(&[(0, 2), (0, 1)]);
        assert!(a
            .upper_bound_assign_if_exact(&boxed(&[(1, 3), (0, 1)]))
            .unwrap());
        assert_eq!(a, boxed(&[(0, 3), (0, 1)]));

        // Two mismatched axes: not exact.
        let mut b = boxed(&[(0, 2), (0, 1)]);
        assert!(!b
            .upper_bound_assign_if_exact(&boxed(&[(1, 3), (0, 2)]))
            .unwrap());
        assert_eq!(b, boxed(&[(0, 2), (0, 1)]));

        // Gap along the single differing axis: not exact.
        let mut c = boxed(&[(0, 1), (0, 1)]);
        assert!(!c
            .upper_bound_assign_if_exact(&boxed(&[(3, 4), (0, 1)]))
            .unwrap());

        // Containment is always exact.
        let mut d = boxed(&[(0, 5), (0, 5)]);
        assert!(d
            .upper_bound_assign_if_exact(&boxed(&[(1, 2), (1, 2)]))
            .unwrap());
        assert_eq!(d, boxed(&[(0, 5), (0, 5)]));
    }

    #[test]
    fn test_difference() {
        let mut a = boxed(&[(0, 10), (0, 1)]);
        a.difference_assign(&boxed(&[(5, 20), (-1, 2)])).unwrap();
        assert_eq!(
            a.interval(Variable(0)).to_rational_interval().upper().value,
            Bound::Finite(ratio(5, 1))
        );
        assert!(a.interval(Variable(0)).to_rational_interval().upper().open);

        // Differs along two axes: unchanged.
        let mut b = boxed(&[(0, 10), (0, 10)]);
        b.difference_assign(&boxed(&[(5, 20), (5, 20)])).unwrap();
        assert_eq!(b, boxed(&[(0, 10), (0, 10)]));
    }

    #[test]
    fn test_affine_image() {
        let x = Variable(0);
        let y = Variable(1);
        let mut b = boxed(&[(1, 2), (10, 20)]);
        // x <- (x + 2y)/2 over [1,2] + 2*[10,20] = [21,42], halved.
        b.affine_image(x, &(LinearExpr::from_variable(x) + y * 2), &Coefficient::from(2))
            .unwrap();
        let i = b.interval(x).to_rational_interval();
        assert_eq!(i.lower().value, Bound::Finite(ratio(21, 2)));
        assert_eq!(i.upper().value, Bound::Finite(ratio(21, 1)));
    }

    #[test]
    fn test_affine_image_preimage_invertible() {
        let x = Variable(0);
        let e = LinearExpr::from_variable(x) * 3 + 1;
        let d = Coefficient::from(2);
        let mut b = boxed(&[(0, 4)]);
        let before = b.clone();
        b.affine_image(x, &e, &d).unwrap();
        b.affine_preimage(x, &e, &d).unwrap();
        assert_eq!(b, before);
    }

    #[test]
    fn test_bounded_affine_image() {
        let x = Variable(0);
        let y = Variable(1);
        let mut b = boxed(&[(0, 10), (0, 5)]);
        // 0 <= x' <= y.
        b.bounded_affine_image(x, &LinearExpr::zero(), &LinearExpr::from_variable(y), &Coefficient::from(1))
            .unwrap();
        let i = b.interval(x).to_rational_interval();
        assert_eq!(i.lower().value, Bound::Finite(ratio(0, 1)));
        assert_eq!(i.upper().value, Bound::Finite(ratio(5, 1)));
    }

    #[test]
    fn test_generalized_affine_image() {
        let x = Variable(0);
        let mut b = boxed(&[(1, 2)]);
        b.generalized_affine_image(x, RelSym::GreaterThan, &LinearExpr::constant(5), &Coefficient::from(1))
            .unwrap();
        let i = b.interval(x).to_rational_interval();
        assert_eq!(i.lower().value, Bound::Finite(ratio(5, 1)));
        assert!(i.lower().open);
        assert!(i.upper().is_unbounded());
        assert!(b
            .generalized_affine_image(x, RelSym::NotEqual, &LinearExpr::zero(), &Coefficient::from(1))
            .is_err());
    }

    #[test]
    fn test_propagate_constraint() {
        let x = Variable(0);
        let y = Variable(1);
        let mut b = boxed(&[(0, 10), (0, 3)]);
        // x <= 2y over y in [0,3] gives x in [0,6]; y is not tightened.
        b.propagate_constraint(&(y * 2i32 - x).ge(0)).unwrap();
        let ix = b.interval(x).to_rational_interval();
        assert_eq!(ix.upper().value, Bound::Finite(ratio(6, 1)));
        let before = b.clone();
        b.propagate_constraint(&(y * 2i32 - x).ge(0)).unwrap();
        assert_eq!(b, before);
    }

    #[test]
    fn test_relation_with_constraint() {
        let x = Variable(0);
        let b = boxed(&[(1, 2)]);
        assert!(b
            .relation_with_constraint(&x.ge(0))
            .unwrap()
            .implies(PolyConRelation::is_included()));
        assert!(b
            .relation_with_constraint(&x.ge(5))
            .unwrap()
            .implies(PolyConRelation::is_disjoint()));
        assert!(b
            .relation_with_constraint(&x.ge(1))
            .unwrap()
            .implies(PolyConRelation::is_included()));
        assert_eq!(
            b.relation_with_constraint(&x.le(1)).unwrap(),
            PolyConRelation::strictly_intersects()
        );
        let single = boxed(&[(0, 0)]);
        assert!(single
            .relation_with_constraint(&x.ge(0))
            .unwrap()
            .implies(PolyConRelation::saturates() | PolyConRelation::is_included()));
    }

    #[test]
    fn test_relation_with_congruence() {
        let x = Variable(0);
        let b = boxed(&[(1, 2)]);
        let cg = x.congruent_to(0).modulo(5);
        assert!(b
            .relation_with_congruence(&cg)
            .unwrap()
            .implies(PolyConRelation::is_disjoint()));
        let wide = boxed(&[(1, 7)]);
        assert_eq!(
            wide.relation_with_congruence(&cg).unwrap(),
            PolyConRelation::strictly_intersects()
        );
        let on = boxed(&[(5, 5)]);
        assert!(on
            .relation_with_congruence(&cg)
            .unwrap()
            .implies(PolyConRelation::is_included()));
    }

    #[test]
    fn test_relation_with_generator() {
        let x = Variable(0);
        let b = boxed(&[(0, 10)]);
        let p = crate::generator::point(x * 5).unwrap();
        assert!(b.relation_with_generator(&p).unwrap().subsumes());
        let outside = crate::generator::point(x * 50).unwrap();
        assert!(!b.relation_with_generator(&outside).unwrap().subsumes());
        let r = crate::generator::ray(x).unwrap();
        assert!(!b.relation_with_generator(&r).unwrap().subsumes());
    }

    #[test]
    fn test_cc76_widening_and_tokens() {
        let old = boxed(&[(0, 1)]);
        let mut grown = boxed(&[(0, 3)]);
        grown.cc76_widening_assign(&old, None).unwrap();
        assert!(grown.interval(Variable(0)).upper().is_unbounded());

        let mut with_token = boxed(&[(0, 3)]);
        let mut tokens = 1;
        with_token
            .cc76_widening_assign(&old, Some(&mut tokens))
            .unwrap();
        assert_eq!(tokens, 0);
        assert_eq!(with_token, boxed(&[(0, 3)]));
        with_token
            .cc76_widening_assign(&old, Some(&mut tokens))
            .unwrap();
        assert!(with_token.interval(Variable(0)).upper().is_unbounded());
    }

    #[test]
    fn test_dimension_surgery() {
        let mut b = boxed(&[(0, 1), (2, 3)]);
        b.add_space_dimensions_and_embed(1).unwrap();
        assert_eq!(b.space_dimension(), 3);
        assert!(b.interval(Variable(2)).is_universe());
        b.expand_space_dimension(Variable(0), 1).unwrap();
        assert_eq!(b.space_dimension(), 4);
        assert_eq!(b.interval(Variable(3)), b.interval(Variable(0)));
        b.remove_space_dimensions(&[Variable(2), Variable(3)]).unwrap();
        assert_eq!(b, boxed(&[(0, 1), (2, 3)]));
        b.fold_space_dimensions(&[Variable(1)], Variable(0)).unwrap();
        assert_eq!(b, boxed(&[(0, 3)]));
    }

    #[test]
    fn test_map_space_dimensions() {
        let mut b = boxed(&[(0, 1), (2, 3)]);
        b.map_space_dimensions(&[Some(1), Some(0)]).unwrap();
        assert_eq!(b, boxed(&[(2, 3), (0, 1)]));
        assert!(b.map_space_dimensions(&[Some(0), Some(0)]).is_err());
    }

    #[test]
    fn test_constraints_round_trip() {
        let b = boxed(&[(0, 1), (2, 2)]);
        let cs = b.constraints().unwrap();
        let back = QBox::from_constraints(&cs).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_ascii_round_trip() {
        let mut b = boxed(&[(0, 1), (-3, 7)]);
        b.interval_mut(Variable(0))
            .refine_lower(&ratio(1, 2), true)
            .unwrap();
        let mut dump = String::new();
        b.ascii_dump(&mut dump);
        let reloaded = QBox::ascii_load(&dump).unwrap();
        assert_eq!(reloaded, b);
    }

    #[test]
    fn test_lattice_laws_on_random_boxes() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x0b0c5);
        let mut random_box = |rng: &mut rand::rngs::StdRng| {
            let mut b = QBox::universe(2).unwrap();
            for k in 0..2 {
                let lo = rng.gen_range(-8i64..8);
                let len = rng.gen_range(0i64..6);
                b.interval_mut(Variable(k))
                    .refine_lower(&ratio(lo, 1), false)
                    .unwrap();
                b.interval_mut(Variable(k))
                    .refine_upper(&ratio(lo + len, 1), false)
                    .unwrap();
            }
            b
        };
        for _ in 0..50 {
            let a = random_box(&mut rng);
            let b = random_box(&mut rng);
            let c = random_box(&mut rng);

            // Commutativity and idempotence of meet and join.
            let mut ab = a.clone();
            ab.intersection_assign(&b).unwrap();
            let mut ba = b.clone();
            ba.intersection_assign(&a).unwrap();
            assert!(ab.contains(&ba).unwrap() && ba.contains(&ab).unwrap());
            let mut aa = a.clone();
            aa.intersection_assign(&a).unwrap();
            assert!(aa.contains(&a).unwrap() && a.contains(&aa).unwrap());

            let mut jab = a.clone();
            jab.upper_bound_assign(&b).unwrap();
            let mut jba = b.clone();
            jba.upper_bound_assign(&a).unwrap();
            assert_eq!(jab, jba);

            // Associativity of join, and monotonicity of both.
            let mut j_ab_c = jab.clone();
            j_ab_c.upper_bound_assign(&c).unwrap();
            let mut j_bc = b.clone();
            j_bc.upper_bound_assign(&c).unwrap();
            let mut j_a_bc = a.clone();
            j_a_bc.upper_bound_assign(&j_bc).unwrap();
            assert_eq!(j_ab_c, j_a_bc);

            assert!(jab.contains(&a).unwrap());
            assert!(a.contains(&ab).unwrap() || ab.is_empty());
        }
    }

    #[test]
    fn test_empty_state_machine() {
        let mut b = boxed(&[(0, 1)]);
        b.interval_mut(Variable(0))
            .refine_lower(&ratio(5, 1), false)
            .unwrap();
        assert!(b.is_empty());
        assert!(b.check_empty());
        assert!(b.is_empty());
    }
}
