//! The interface the set-level combinators (powersets and partially
//! reduced products) require of a convex domain.

use polyhedra_arith::{IntervalScalar, Rational};

use crate::bd_shape::BdShape;
use crate::boxes::IntervalBox;
use crate::constraint::ConstraintSystem;
use crate::error::Result;
use crate::grid::Grid;
use crate::octagonal_shape::OctagonalShape;
use crate::polyhedron::Polyhedron;

/// A convex abstract domain usable as a powerset or product component.
pub trait AbstractDomain: Clone + PartialEq {
    fn space_dimension(&self) -> usize;

    fn is_empty(&self) -> Result<bool>;

    fn make_empty(&mut self);

    fn contains(&self, other: &Self) -> Result<bool>;

    fn intersection_assign(&mut self, other: &Self) -> Result<()>;

    fn upper_bound_assign(&mut self, other: &Self) -> Result<()>;

    /// Joins only when the result is exactly the union. The default
    /// recognizes just the comparable cases.
    fn upper_bound_assign_if_exact(&mut self, other: &Self) -> Result<bool> {
        if self.contains(other)? {
            return Ok(true);
        }
        if other.contains(self)? {
            *self = other.clone();
            return Ok(true);
        }
        Ok(false)
    }

    fn widening_assign(&mut self, older: &Self, tp: Option<&mut u32>) -> Result<()>;

    /// A sound constraint description of the element.
    fn constraints(&self) -> Result<ConstraintSystem>;

    /// Refines with whatever part of `cs` the domain can express; the rest
    /// is ignored.
    fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()>;
}

impl AbstractDomain for Polyhedron {
    fn space_dimension(&self) -> usize {
        Polyhedron::space_dimension(self)
    }

    fn is_empty(&self) -> Result<bool> {
        Polyhedron::is_empty(self)
    }

    fn make_empty(&mut self) {
        self.set_empty();
    }

    fn contains(&self, other: &Self) -> Result<bool> {
        Polyhedron::contains(self, other)
    }

    fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        Polyhedron::intersection_assign(self, other)
    }

    fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        Polyhedron::poly_hull_assign(self, other)
    }

    fn upper_bound_assign_if_exact(&mut self, other: &Self) -> Result<bool> {
        let mut hull = self.clone();
        hull.poly_hull_assign(other)?;
        // The hull is the union exactly when removing both pieces leaves
        // nothing; the difference over-approximates, so this test errs on
        // the side of refusing.
        let mut residue = hull.clone();
        residue.poly_difference_assign(self)?;
        residue.poly_difference_assign(other)?;
        if residue.is_empty()? {
            *self = hull;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn widening_assign(&mut self, older: &Self, tp: Option<&mut u32>) -> Result<()> {
        self.h79_widening_assign(older, tp)
    }

    fn constraints(&self) -> Result<ConstraintSystem> {
        Polyhedron::constraints(self)
    }

    fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        for c in cs.iter() {
            if c.is_strict_inequality() && self.topology() == crate::linear::Topology::Closed {
                self.add_constraint(&c.to_nonstrict())?;
            } else {
                self.add_constraint(c)?;
            }
        }
        Ok(())
    }
}

impl AbstractDomain for Grid {
    fn space_dimension(&self) -> usize {
        Grid::space_dimension(self)
    }

    fn is_empty(&self) -> Result<bool> {
        Grid::is_empty(self)
    }

    fn make_empty(&mut self) {
        self.set_empty();
    }

    fn contains(&self, other: &Self) -> Result<bool> {
        Grid::contains(self, other)
    }

    fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        Grid::intersection_assign(self, other)
    }

    fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        Grid::join_assign(self, other)
    }

    fn widening_assign(&mut self, older: &Self, tp: Option<&mut u32>) -> Result<()> {
        Grid::widening_assign(self, older, tp)
    }

    fn constraints(&self) -> Result<ConstraintSystem> {
        let mut cs = ConstraintSystem::new(self.space_dimension(), crate::linear::Topology::Closed);
        for cg in self.congruences()?.iter() {
            if cg.is_equality() {
                cs.insert(cg.linear_expr().eq(0))?;
            }
        }
        if Grid::is_empty(self)? {
            cs.insert(crate::constraint::Constraint::zero_dim_false())?;
        }
        Ok(cs)
    }

    fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        for c in cs.iter() {
            if c.is_equality() {
                self.add_constraint(c)?;
            }
        }
        Ok(())
    }
}

impl<S: IntervalScalar> AbstractDomain for IntervalBox<S> {
    fn space_dimension(&self) -> usize {
        IntervalBox::space_dimension(self)
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(IntervalBox::is_empty(self))
    }

    fn make_empty(&mut self) {
        let dim = self.space_dimension();
        *self = IntervalBox::empty(dim).expect("dimension already accepted");
    }

    fn contains(&self, other: &Self) -> Result<bool> {
        IntervalBox::contains(self, other)
    }

    fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        IntervalBox::intersection_assign(self, other)
    }

    fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        IntervalBox::upper_bound_assign(self, other)
    }

    fn upper_bound_assign_if_exact(&mut self, other: &Self) -> Result<bool> {
        IntervalBox::upper_bound_assign_if_exact(self, other)
    }

    fn widening_assign(&mut self, older: &Self, tp: Option<&mut u32>) -> Result<()> {
        self.cc76_widening_assign(older, tp)
    }

    fn constraints(&self) -> Result<ConstraintSystem> {
        IntervalBox::constraints(self)
    }

    fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        IntervalBox::refine_with_constraints(self, cs)
    }
}

impl AbstractDomain for BdShape {
    fn space_dimension(&self) -> usize {
        BdShape::space_dimension(self)
    }

    fn is_empty(&self) -> Result<bool> {
        BdShape::is_empty(self)
    }

    fn make_empty(&mut self) {
        let dim = self.space_dimension();
        *self = BdShape::empty(dim).expect("dimension already accepted");
    }

    fn contains(&self, other: &Self) -> Result<bool> {
        BdShape::contains(self, other)
    }

    fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        BdShape::intersection_assign(self, other)
    }

    fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        BdShape::upper_bound_assign(self, other)
    }

    fn widening_assign(&mut self, older: &Self, tp: Option<&mut u32>) -> Result<()> {
        self.bhmz05_widening_assign(older, tp)
    }

    fn constraints(&self) -> Result<ConstraintSystem> {
        BdShape::constraints(self)
    }

    fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        for c in cs.iter() {
            self.refine_with_constraint(c)?;
        }
        Ok(())
    }
}

impl AbstractDomain for OctagonalShape {
    fn space_dimension(&self) -> usize {
        OctagonalShape::space_dimension(self)
    }

    fn is_empty(&self) -> Result<bool> {
        OctagonalShape::is_empty(self)
    }

    fn make_empty(&mut self) {
        let dim = self.space_dimension();
        *self = OctagonalShape::empty(dim).expect("dimension already accepted");
    }

    fn contains(&self, other: &Self) -> Result<bool> {
        OctagonalShape::contains(self, other)
    }

    fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        OctagonalShape::intersection_assign(self, other)
    }

    fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        OctagonalShape::upper_bound_assign(self, other)
    }

    fn widening_assign(&mut self, older: &Self, tp: Option<&mut u32>) -> Result<()> {
        self.bhmz05_widening_assign(older, tp)
    }

    fn constraints(&self) -> Result<ConstraintSystem> {
        OctagonalShape::constraints(self)
    }

    fn refine_with_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        for c in cs.iter() {
            self.refine_with_constraint(c)?;
        }
        Ok(())
    }
}

/// Convenience alias: the rational box is the default interval instance.
pub type RationalBox = IntervalBox<Rational>;
