//! Lattice operations and affine transformations.

use num::{Signed, Zero};
use polyhedra_arith::Coefficient;

use crate::constraint::{Constraint, ConstraintSystem, ConstraintType};
use crate::error::{check_same_dimension, check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::generator::{Generator, GeneratorSystem, GeneratorType};
use crate::linear::Topology;
use crate::polyhedron::Polyhedron;
use crate::relation::RelSym;

impl Polyhedron {
    fn check_topology(&self, other: &Polyhedron, method: &'static str) -> Result<()> {
        if self.topology() != other.topology() {
            return Err(Error::invalid_argument(method, "topology mismatch"));
        }
        Ok(())
    }

    /// Set intersection: the constraint systems are concatenated, the
    /// result minimized on demand.
    pub fn intersection_assign(&mut self, other: &Polyhedron) -> Result<()> {
        check_same_dimension(
            "Polyhedron::intersection_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        self.check_topology(other, "Polyhedron::intersection_assign")?;
        if self.is_empty()? {
            return Ok(());
        }
        if other.is_empty()? {
            self.set_empty();
            return Ok(());
        }
        let cs = other.constraints()?;
        self.add_constraints(&cs)
    }

    /// Convex hull of the union: the generator systems are concatenated.
    pub fn poly_hull_assign(&mut self, other: &Polyhedron) -> Result<()> {
        check_same_dimension(
            "Polyhedron::poly_hull_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        self.check_topology(other, "Polyhedron::poly_hull_assign")?;
        if other.is_empty()? {
            return Ok(());
        }
        if self.is_empty()? {
            *self = other.clone();
            return Ok(());
        }
        let gs = other.generators()?;
        self.add_generators(&gs)
    }

    /// The least upper bound in the lattice of polyhedra, i.e. the convex
    /// hull.
    pub fn upper_bound_assign(&mut self, other: &Polyhedron) -> Result<()> {
        self.poly_hull_assign(other)
    }

    /// The smallest polyhedron containing the set difference: the hull of
    /// the pieces cut by complementing each constraint of `other`.
    pub fn poly_difference_assign(&mut self, other: &Polyhedron) -> Result<()> {
        check_same_dimension(
            "Polyhedron::poly_difference_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        self.check_topology(other, "Polyhedron::poly_difference_assign")?;
        if self.is_empty()? || other.is_empty()? {
            return Ok(());
        }
        if other.contains(self)? {
            self.set_empty();
            return Ok(());
        }
        let dim = self.space_dimension();
        let topology = self.topology();
        let y_cs = {
            let mut y = other.clone();
            y.minimized_constraints()?
        };
        let mut result = Polyhedron::empty(dim, topology)?;
        for c in y_cs.iter() {
            if c.is_tautological() {
                continue;
            }
            let e = c.linear_expr();
            let mut pieces: Vec<Constraint> = Vec::new();
            match (topology, c.constraint_type()) {
                (Topology::NotClosed, ConstraintType::Equality) => {
                    pieces.push(e.clone().lt(0));
                    pieces.push(e.gt(0));
                }
                (Topology::NotClosed, ConstraintType::NonstrictInequality) => {
                    pieces.push(e.lt(0));
                }
                (Topology::NotClosed, ConstraintType::StrictInequality) => {
                    pieces.push(e.le(0));
                }
                (Topology::Closed, ConstraintType::Equality) => {
                    // The closed complement pieces meet on the hyperplane.
                    pieces.push(e.clone().le(0));
                    pieces.push(e.ge(0));
                }
                (Topology::Closed, _) => {
                    pieces.push(e.le(0));
                }
            }
            for piece in pieces {
                let mut z = self.clone();
                z.add_constraint(&piece)?;
                if !z.is_empty()? {
                    result.poly_hull_assign(&z)?;
                }
            }
        }
        *self = result;
        Ok(())
    }

    /// Cartesian product: `other`'s dimensions are appended after ours.
    pub fn concatenate_assign(&mut self, other: &Polyhedron) -> Result<()> {
        self.check_topology(other, "Polyhedron::concatenate_assign")?;
        let n = self.space_dimension();
        let m = other.space_dimension();
        check_space_dimension("Polyhedron::concatenate_assign", n + m)?;
        let self_empty = self.is_empty()?;
        let other_empty = other.is_empty()?;
        if self_empty || other_empty {
            *self = Polyhedron::empty(n + m, self.topology())?;
            return Ok(());
        }
        let other_cs = other.constraints()?;
        self.add_space_dimensions_and_embed(m)?;
        for c in other_cs.iter() {
            self.add_constraint(&shift_constraint(c, n))?;
        }
        Ok(())
    }

    /// Time elapse: every point of `other` becomes a flow direction.
    pub fn time_elapse_assign(&mut self, other: &Polyhedron) -> Result<()> {
        check_same_dimension(
            "Polyhedron::time_elapse_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        self.check_topology(other, "Polyhedron::time_elapse_assign")?;
        if self.is_empty()? {
            return Ok(());
        }
        if other.is_empty()? {
            self.set_empty();
            return Ok(());
        }
        let gens = other.generators()?;
        for g in gens.iter() {
            match g.generator_type() {
                GeneratorType::Line | GeneratorType::Ray => self.add_generator(g)?,
                GeneratorType::Point | GeneratorType::ClosurePoint => {
                    let mut direction = LinearExpr::zero();
                    for i in 0..self.space_dimension() {
                        direction.set_coefficient(Variable(i), g.coefficient(Variable(i)));
                    }
                    if !direction.all_homogeneous_terms_are_zero() {
                        self.add_generator(&Generator::ray(direction)?)?;
                    }
                }
            }
        }
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

    /// `var <- e/denominator`. Invertible maps transform either
    /// representation in place; the general case goes through the
    /// generator side.
    pub fn affine_image(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("Polyhedron::affine_image", var, e, denominator)?;
        if self.status.empty {
            return Ok(());
        }
        let (e, d) = normalize_denominator(e.clone(), denominator.clone());
        let a_v = e.coefficient(var);
        if self.status.gen_up_to_date || a_v.is_zero() {
            // Generator path, valid for every map.
            let gens = match self.updated_generators()? {
                Some(gs) => gs.into_owned(),
                None => {
                    self.set_empty();
                    return Ok(());
                }
            };
            self.gen_sys = gens;
            transform_generators(&mut self.gen_sys, var, &e, &d);
            self.status.gen_up_to_date = true;
            self.status.con_up_to_date = false;
        } else {
            // Invertible substitution on the constraint side.
            transform_constraints_image(&mut self.con_sys, var, &e, &d, &a_v);
            self.status.con_up_to_date = true;
            self.status.gen_up_to_date = false;
        }
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        self.status.sat_c_up_to_date = false;
        self.status.sat_g_up_to_date = false;
        Ok(())
    }

    /// The preimage of `var <- e/denominator`: substitution on the
    /// constraint side, which is valid for every map.
    pub fn affine_preimage(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("Polyhedron::affine_preimage", var, e, denominator)?;
        if self.status.empty {
            return Ok(());
        }
        let (e, d) = normalize_denominator(e.clone(), denominator.clone());
        if !self.status.con_up_to_date {
            let cs = self.updated_constraints()?.into_owned();
            self.con_sys = cs;
        }
        transform_constraints_preimage(&mut self.con_sys, var, &e, &d);
        self.status.con_up_to_date = true;
        self.status.gen_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        self.status.sat_c_up_to_date = false;
        self.status.sat_g_up_to_date = false;
        Ok(())
    }

    /// `lb/d <= var' <= ub/d`, built with a scratch dimension so the old
    /// value of `var` can appear in both bounds.
    pub fn bounded_affine_image(
        &mut self,
        var: Variable,
        lb: &LinearExpr,
        ub: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("Polyhedron::bounded_affine_image", var, lb, denominator)?;
        self.check_affine_args("Polyhedron::bounded_affine_image", var, ub, denominator)?;
        if self.status.empty {
            return Ok(());
        }
        let (lb, ub, d) = if denominator.is_negative() {
            (
                LinearExpr::zero() - ub.clone(),
                LinearExpr::zero() - lb.clone(),
                -denominator.clone(),
            )
        } else {
            (lb.clone(), ub.clone(), denominator.clone())
        };
        let n = self.space_dimension();
        self.add_space_dimensions_and_embed(1)?;
        let w = Variable(n);
        let dw = LinearExpr::from_variable(w) * d;
        self.add_constraint(&dw.clone().ge(lb))?;
        self.add_constraint(&dw.le(ub))?;
        // Project the old value out and let the scratch dimension take its
        // place.
        let mut map: Vec<Option<usize>> = (0..=n).map(Some).collect();
        map[var.id()] = Some(n);
        map[n] = Some(var.id());
        self.map_space_dimensions(&map)?;
        self.remove_higher_space_dimensions(n)
    }

    /// `var' relsym e/d`: the affine image relaxed on one side.
    pub fn generalized_affine_image(
        &mut self,
        var: Variable,
        relsym: RelSym,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("Polyhedron::generalized_affine_image", var, e, denominator)?;
        match relsym {
            RelSym::NotEqual => {
                return Err(Error::invalid_argument(
                    "Polyhedron::generalized_affine_image",
                    "NOT_EQUAL relation symbol",
                ));
            }
            RelSym::Equal => return self.affine_image(var, e, denominator),
            RelSym::GreaterThan | RelSym::LessThan => {
                if self.topology() == Topology::Closed {
                    return Err(Error::invalid_argument(
                        "Polyhedron::generalized_affine_image",
                        "strict relation symbol on a necessarily closed polyhedron",
                    ));
                }
            }
            _ => {}
        }
        if self.status.empty {
            return Ok(());
        }
        self.affine_image(var, e, denominator)?;
        let direction = match relsym {
            RelSym::GreaterOrEqual | RelSym::GreaterThan => LinearExpr::from_variable(var),
            _ => -var,
        };
        self.add_generator(&Generator::ray(direction)?)?;
        if matches!(relsym, RelSym::GreaterThan | RelSym::LessThan) {
            // The boundary value itself is excluded: points slide to
            // closure points, with a witness point pushed along the ray.
            let gens = self.generators()?;
            let mut strict = GeneratorSystem::new(self.space_dimension(), self.topology());
            for g in gens.iter() {
                match g.generator_type() {
                    GeneratorType::Point => {
                        let d = g.divisor()?.clone();
                        let mut e = LinearExpr::zero();
                        for i in 0..self.space_dimension() {
                            e.set_coefficient(Variable(i), g.coefficient(Variable(i)));
                        }
                        strict.insert(Generator::closure_point(e.clone(), d.clone())?)?;
                        let offset = if matches!(relsym, RelSym::GreaterThan) {
                            d.clone()
                        } else {
                            -d.clone()
                        };
                        let mut pushed = e;
                        let shifted = pushed.coefficient(var) + offset;
                        pushed.set_coefficient(var, shifted);
                        strict.insert(Generator::point(pushed, d)?)?;
                    }
                    _ => strict.insert(g.clone())?,
                }
            }
            *self = Polyhedron::from_generators(strict)?;
        }
        Ok(())
    }
}

/// A denominator is kept positive by negating both sides of the map.
fn normalize_denominator(e: LinearExpr, d: Coefficient) -> (LinearExpr, Coefficient) {
    if d.is_negative() {
        (-e, -d)
    } else {
        (e, d)
    }
}

/// Rebuilds `c` with every dimension shifted up by `offset`.
fn shift_constraint(c: &Constraint, offset: usize) -> Constraint {
    let dim = c.space_dimension();
    let mut e = LinearExpr::constant(c.inhomogeneous_term().clone());
    for i in 0..dim {
        e.set_coefficient(Variable(i + offset), c.coefficient(Variable(i)));
    }
    match c.constraint_type() {
        ConstraintType::Equality => e.eq(0),
        ConstraintType::NonstrictInequality => e.ge(0),
        ConstraintType::StrictInequality => e.gt(0),
    }
}

/// In-place affine image of a generator system: the assigned coordinate
/// becomes the expression's value, every other slot is scaled by the
/// denominator.
fn transform_generators(gs: &mut GeneratorSystem, var: Variable, e: &LinearExpr, d: &Coefficient) {
    let dim = gs.space_dimension();
    let col = var.id() + 1;
    for row in gs.system_mut().rows_mut() {
        let mut new_val = e.inhomogeneous_term() * row.coeff(0);
        for i in 0..dim {
            let a = e.coefficient(Variable(i));
            if !a.is_zero() {
                new_val += a * row.coeff(i + 1);
            }
        }
        for i in 0..row.size() {
            if i == col {
                continue;
            }
            *row.coeff_mut(i) *= d;
        }
        *row.coeff_mut(col) = new_val;
        row.strong_normalize();
    }
}

/// Substitutes the inverse of an invertible `var <- e/d` into every
/// constraint row: the result is scaled by `|a_v|` so inequalities keep
/// their orientation.
fn transform_constraints_image(
    cs: &mut ConstraintSystem,
    var: Variable,
    e: &LinearExpr,
    d: &Coefficient,
    a_v: &Coefficient,
) {
    let col = var.id() + 1;
    let dim = cs.space_dimension();
    let sign = if a_v.is_negative() {
        -Coefficient::from(1)
    } else {
        Coefficient::from(1)
    };
    for row in cs.system_mut().rows_mut() {
        let c_v = row.coeff(col).clone();
        if c_v.is_zero() {
            continue;
        }
        // x_var = (d x'_var - (e - a_v x_var)) / a_v.
        for i in 0..row.size() {
            if i == col {
                continue;
            }
            let e_i = if i == 0 {
                e.inhomogeneous_term().clone()
            } else if i <= dim {
                e.coefficient(Variable(i - 1))
            } else {
                Coefficient::zero()
            };
            let updated = (a_v * row.coeff(i) - &c_v * e_i) * &sign;
            *row.coeff_mut(i) = updated;
        }
        *row.coeff_mut(col) = &sign * &c_v * d;
        row.strong_normalize();
    }
}

/// Substitutes `var <- e/d` directly into every constraint row (the
/// preimage direction), scaling by the positive `d`.
fn transform_constraints_preimage(
    cs: &mut ConstraintSystem,
    var: Variable,
    e: &LinearExpr,
    d: &Coefficient,
) {
    let col = var.id() + 1;
    let dim = cs.space_dimension();
    for row in cs.system_mut().rows_mut() {
        let c_v = row.coeff(col).clone();
        if c_v.is_zero() {
            continue;
        }
        for i in 0..row.size() {
            if i == col {
                continue;
            }
            let e_i = if i == 0 {
                e.inhomogeneous_term().clone()
            } else if i <= dim {
                e.coefficient(Variable(i - 1))
            } else {
                Coefficient::zero()
            };
            let updated = d * row.coeff(i) + &c_v * e_i;
            *row.coeff_mut(i) = updated;
        }
        let updated_var = &c_v * e.coefficient(var);
        *row.coeff_mut(col) = updated_var;
        row.strong_normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{closure_point, point};

    fn x() -> Variable {
        Variable(0)
    }

    fn y() -> Variable {
        Variable(1)
    }

    fn square() -> Polyhedron {
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&x().le(1)).unwrap();
        ph.add_constraint(&y().ge(0)).unwrap();
        ph.add_constraint(&y().le(1)).unwrap();
        ph
    }

    #[test]
    fn test_unit_square_triangle_intersection() {
        // The unit square meets the triangle built from generators; the
        // minimized result is exactly the triangle's three vertices.
        let mut gs = GeneratorSystem::new(2, Topology::Closed);
        gs.insert(point(LinearExpr::zero()).unwrap()).unwrap();
        gs.insert(point(LinearExpr::from_variable(x())).unwrap())
            .unwrap();
        gs.insert(point(LinearExpr::from_variable(y())).unwrap())
            .unwrap();
        let triangle = Polyhedron::from_generators(gs).unwrap();
        let mut meet = square();
        meet.intersection_assign(&triangle).unwrap();
        let gens = meet.minimized_generators().unwrap();
        let mut points: Vec<(Coefficient, Coefficient)> = gens
            .iter()
            .map(|g| {
                assert!(g.is_point());
                (g.coefficient(x()), g.coefficient(y()))
            })
            .collect();
        points.sort();
        let c = Coefficient::from;
        assert_eq!(points, vec![(c(0), c(0)), (c(0), c(1)), (c(1), c(0))]);
    }

    #[test]
    fn test_hull_of_two_points_contains_segment() {
        let mut a = Polyhedron::universe(1, Topology::Closed).unwrap();
        a.add_constraint(&x().eq(0)).unwrap();
        let mut b = Polyhedron::universe(1, Topology::Closed).unwrap();
        b.add_constraint(&x().eq(1)).unwrap();
        a.poly_hull_assign(&b).unwrap();
        let mut mid = Polyhedron::universe(1, Topology::Closed).unwrap();
        mid.add_constraint(&(x() * 2i32).eq(1)).unwrap();
        assert!(a.contains(&mid).unwrap());
    }

    #[test]
    fn test_poly_difference() {
        // [0, 2] minus [1, 2] leaves [0, 1].
        let mut a = Polyhedron::universe(1, Topology::Closed).unwrap();
        a.add_constraint(&x().ge(0)).unwrap();
        a.add_constraint(&x().le(2)).unwrap();
        let mut b = Polyhedron::universe(1, Topology::Closed).unwrap();
        b.add_constraint(&x().ge(1)).unwrap();
        b.add_constraint(&x().le(2)).unwrap();
        a.poly_difference_assign(&b).unwrap();
        let mut expected = Polyhedron::universe(1, Topology::Closed).unwrap();
        expected.add_constraint(&x().ge(0)).unwrap();
        expected.add_constraint(&x().le(1)).unwrap();
        assert!(a.contains(&expected).unwrap());
        assert!(expected.contains(&a).unwrap());
    }

    #[test]
    fn test_difference_inside_is_empty() {
        let mut a = square();
        let b = square();
        a.poly_difference_assign(&b).unwrap();
        assert!(a.is_empty().unwrap());
    }

    #[test]
    fn test_concatenate() {
        let mut a = Polyhedron::universe(1, Topology::Closed).unwrap();
        a.add_constraint(&x().ge(0)).unwrap();
        let mut b = Polyhedron::universe(1, Topology::Closed).unwrap();
        b.add_constraint(&x().le(5)).unwrap();
        a.concatenate_assign(&b).unwrap();
        assert_eq!(a.space_dimension(), 2);
        assert!(a
            .relation_with_constraint(&y().le(5))
            .unwrap()
            .implies(crate::relation::PolyConRelation::is_included()));
        assert!(a
            .relation_with_constraint(&x().ge(0))
            .unwrap()
            .implies(crate::relation::PolyConRelation::is_included()));
    }

    #[test]
    fn test_time_elapse() {
        // The square flowing along the point (1, 0) gains the +x ray.
        let mut a = square();
        let mut flow = Polyhedron::universe(2, Topology::Closed).unwrap();
        flow.add_constraint(&x().eq(1)).unwrap();
        flow.add_constraint(&y().eq(0)).unwrap();
        a.time_elapse_assign(&flow).unwrap();
        assert!(!a.is_bounded().unwrap());
        let far = Generator::point(x() * 100, 1).unwrap();
        assert!(a.relation_with_generator(&far).unwrap().subsumes());
        let up = Generator::point(y() * 2, 1).unwrap();
        assert!(!a.relation_with_generator(&up).unwrap().subsumes());
    }

    #[test]
    fn test_affine_image_translation() {
        let mut a = square();
        // x <- x + 3.
        a.affine_image(x(), &(x() + 3), &Coefficient::from(1)).unwrap();
        let shifted = Generator::point(x() * 3, 1).unwrap();
        assert!(a.relation_with_generator(&shifted).unwrap().subsumes());
        let origin = Generator::point(LinearExpr::zero(), 1).unwrap();
        assert!(!a.relation_with_generator(&origin).unwrap().subsumes());
    }

    #[test]
    fn test_affine_image_preimage_inverse() {
        // Property 7: an invertible image then preimage is the identity.
        let mut a = square();
        let before = a.minimized_constraints().unwrap();
        let e = x() * 2 + y() - 1;
        a.affine_image(x(), &e, &Coefficient::from(3)).unwrap();
        a.affine_preimage(x(), &e, &Coefficient::from(3)).unwrap();
        let after = a.minimized_constraints().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_affine_image_constraint_path() {
        // Force the constraint-side substitution by keeping only the
        // constraint representation up to date.
        let mut a = square();
        a.affine_image(x(), &(x() * 2), &Coefficient::from(1)).unwrap();
        // Now 0 <= x <= 2.
        let edge = Generator::point(x() * 2 + y(), 1).unwrap();
        assert!(a.relation_with_generator(&edge).unwrap().subsumes());
        let beyond = Generator::point(x() * 3, 1).unwrap();
        assert!(!a.relation_with_generator(&beyond).unwrap().subsumes());
    }

    #[test]
    fn test_non_invertible_image_projects() {
        let mut a = square();
        // x <- y: the result is the diagonal-free set {x = y, 0 <= y <= 1}.
        a.affine_image(x(), &LinearExpr::from_variable(y()), &Coefficient::from(1))
            .unwrap();
        let diag = Generator::point(x() + y(), 2).unwrap();
        assert!(a.relation_with_generator(&diag).unwrap().subsumes());
        let off = Generator::point(x().into(), 1).unwrap();
        assert!(!a.relation_with_generator(&off).unwrap().subsumes());
    }

    #[test]
    fn test_bounded_affine_image() {
        let mut a = square();
        // 0 <= x' <= y.
        a.bounded_affine_image(x(), &LinearExpr::zero(), &LinearExpr::from_variable(y()), &Coefficient::from(1))
            .unwrap();
        let below = Generator::point(x() + y() * 2, 2).unwrap();
        assert!(a.relation_with_generator(&below).unwrap().subsumes());
        let above = Generator::point(x() * 2 + y(), 2).unwrap();
        assert!(!a.relation_with_generator(&above).unwrap().subsumes());
    }

    #[test]
    fn test_generalized_affine_image() {
        let mut a = square();
        a.generalized_affine_image(x(), RelSym::GreaterOrEqual, &LinearExpr::constant(2), &Coefficient::from(1))
            .unwrap();
        let far = Generator::point(x() * 10, 1).unwrap();
        assert!(a.relation_with_generator(&far).unwrap().subsumes());
        let low = Generator::point(x().into(), 1).unwrap();
        assert!(!a.relation_with_generator(&low).unwrap().subsumes());

        assert!(a
            .generalized_affine_image(x(), RelSym::NotEqual, &LinearExpr::zero(), &Coefficient::from(1))
            .is_err());
        assert!(a
            .generalized_affine_image(x(), RelSym::GreaterThan, &LinearExpr::zero(), &Coefficient::from(1))
            .is_err());
    }

    #[test]
    fn test_nnc_strict_intersection() {
        // Intersecting {x >= 0} with {x < 1} leaves the half-open segment:
        // a point at 0, a closure point at 1, and nothing at x = 1.
        let mut p = Polyhedron::universe(1, Topology::NotClosed).unwrap();
        p.add_constraint(&x().ge(0)).unwrap();
        let mut q = Polyhedron::universe(1, Topology::NotClosed).unwrap();
        q.add_constraint(&x().lt(1)).unwrap();
        p.intersection_assign(&q).unwrap();
        p.minimize().unwrap();
        let gens = p.generators().unwrap();
        let mut kinds: Vec<(GeneratorType, Coefficient)> = gens
            .iter()
            .map(|g| (g.generator_type(), g.coefficient(x())))
            .collect();
        kinds.sort_by_key(|(_, c)| c.clone());
        assert_eq!(
            kinds,
            vec![
                (GeneratorType::Point, Coefficient::from(0)),
                (GeneratorType::ClosurePoint, Coefficient::from(1)),
            ]
        );
        let boundary = point(x()).unwrap();
        assert!(!p.relation_with_generator(&boundary).unwrap().subsumes());
    }

    #[test]
    fn test_generalized_affine_image_strict() {
        let mut a = Polyhedron::universe(1, Topology::NotClosed).unwrap();
        a.add_constraint(&x().ge(0)).unwrap();
        a.add_constraint(&x().le(1)).unwrap();
        a.generalized_affine_image(x(), RelSym::GreaterThan, &LinearExpr::constant(1), &Coefficient::from(1))
            .unwrap();
        // x > 1: the boundary is excluded.
        let boundary = point(x()).unwrap();
        assert!(!a.relation_with_generator(&boundary).unwrap().subsumes());
        let boundary_cp = closure_point(x()).unwrap();
        assert!(a.relation_with_generator(&boundary_cp).unwrap().subsumes());
        let inside = Generator::point(x() * 3, 2).unwrap();
        assert!(a.relation_with_generator(&inside).unwrap().subsumes());
    }
}
