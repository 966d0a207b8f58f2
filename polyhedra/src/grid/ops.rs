//! Grid lattice operations, images, dimension surgery, and coercions.

use num::{Integer, Signed, Zero};
use polyhedra_arith::rational::from_coefficients;
use polyhedra_arith::{Coefficient, IntervalScalar, Rational};

use crate::boxes::IntervalBox;
use crate::congruence::{Congruence, CongruenceSystem};
use crate::constraint::ConstraintType;
use crate::error::{check_same_dimension, check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::grid::{rational_gcd, Grid};
use crate::grid_generator::{GridGenerator, GridGeneratorSystem, GridGeneratorType};
use crate::linear::Topology;
use crate::polyhedron::Polyhedron;
use crate::relation::{PolyConRelation, RelSym};

impl Grid {
    /// Set intersection: congruence systems concatenate.
    pub fn intersection_assign(&mut self, other: &Grid) -> Result<()> {
        check_same_dimension(
            "Grid::intersection_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if self.is_empty()? {
            return Ok(());
        }
        if other.is_empty()? {
            self.set_empty();
            return Ok(());
        }
        let cgs = other.congruences()?;
        self.add_congruences(&cgs)
    }

    /// Grid join (the least grid containing both): generator systems
    /// concatenate.
    pub fn join_assign(&mut self, other: &Grid) -> Result<()> {
        check_same_dimension(
            "Grid::join_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if other.is_empty()? {
            return Ok(());
        }
        if self.is_empty()? {
            *self = other.clone();
            return Ok(());
        }
        let gs = other.grid_generators()?;
        self.add_grid_generators(&gs)
    }

    pub fn upper_bound_assign(&mut self, other: &Grid) -> Result<()> {
        self.join_assign(other)
    }

    /// The smallest grid containing the set difference. A congruence of
    /// `other` that splits this grid in exactly two residue classes keeps
    /// the violating class; coarser splits collapse to the whole grid.
    pub fn grid_difference_assign(&mut self, other: &Grid) -> Result<()> {
        check_same_dimension(
            "Grid::grid_difference_assign",
            self.space_dimension(),
            other.space_dimension(),
        )?;
        if self.is_empty()? || other.is_empty()? {
            return Ok(());
        }
        if other.contains(self)? {
            self.set_empty();
            return Ok(());
        }
        let y_cgs = {
            let mut y = other.clone();
            y.minimized_congruences()?
        };
        let mut result = Grid::empty(self.space_dimension())?;
        for cg in y_cgs.iter() {
            if cg.is_tautological() {
                continue;
            }
            if self
                .relation_with_congruence(cg)?
                .implies(PolyConRelation::is_included())
            {
                continue;
            }
            result.join_assign(&self.difference_piece(cg)?)?;
        }
        *self = result;
        Ok(())
    }

    /// The grid hull of the points violating `cg`, always a subset of
    /// `self` containing all violators.
    fn difference_piece(&self, cg: &Congruence) -> Result<Grid> {
        let e = cg.linear_expr();
        let Some((base, step, dense)) = self.expr_structure(&e)? else {
            return Grid::empty(self.space_dimension());
        };
        if cg.is_equality() || dense || step.is_zero() {
            // A hyperplane slice, a dense direction, or a constant value
            // that violates: the hull of the violators is the grid itself.
            return Ok(self.clone());
        }
        let m = Rational::from(cg.modulus().clone());
        let h = rational_gcd(&step, &m);
        if !(base.clone() / &h).is_integer() {
            // No value meets the class: everything violates.
            return Ok(self.clone());
        }
        let classes = (&m / &h).to_integer();
        if classes == Coefficient::from(2) {
            // Values alternate between the two classes: the violators form
            // the coset shifted by one step, i.e. e = base + step
            // (mod 2*step), scaled to integers.
            let shifted = &base + &step;
            let double = &step * Rational::from(Coefficient::from(2));
            let scale = shifted.denom().lcm(double.denom());
            let scale_q = Rational::from(scale.clone());
            let mut scaled_e = e * scale;
            let offset = (&shifted * &scale_q).to_integer();
            let modulus = (&double * &scale_q).to_integer();
            scaled_e.set_inhomogeneous_term(scaled_e.inhomogeneous_term() - offset);
            let piece_cg = scaled_e.congruent_to(0).modulo(modulus);
            let mut piece = self.clone();
            piece.add_congruence(&piece_cg)?;
            return Ok(piece);
        }
        Ok(self.clone())
    }

    /// The Bagnara-style grid widening: keep the congruences of the
    /// previous iterate the current grid still entails; a positive token
    /// count absorbs one losing step per token.
    pub fn widening_assign(&mut self, older: &Grid, tp: Option<&mut u32>) -> Result<()> {
        check_same_dimension(
            "Grid::widening_assign",
            self.space_dimension(),
            older.space_dimension(),
        )?;
        if older.is_empty()? || self.is_empty()? {
            return Ok(());
        }
        let older_cgs = {
            let mut o = older.clone();
            o.minimized_congruences()?
        };
        let mut kept = CongruenceSystem::new(self.space_dimension());
        for cg in older_cgs.iter() {
            if self
                .relation_with_congruence(cg)?
                .implies(PolyConRelation::is_included())
            {
                kept.insert(cg.clone())?;
            }
        }
        let mut widened = Grid::universe(self.space_dimension())?;
        widened.add_congruences(&kept)?;
        debug_assert!(widened.contains(self)?);
        if let Some(tokens) = tp {
            if *tokens > 0 && !self.contains(&widened)? {
                *tokens -= 1;
                return Ok(());
            }
        }
        *self = widened;
        Ok(())
    }

    /// `var <- e/denominator` on the generator side.
    pub fn affine_image(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("Grid::affine_image", var, e, denominator)?;
        if self.is_empty()? {
            return Ok(());
        }
        let (e, d) = if denominator.is_negative() {
            (-e.clone(), -denominator.clone())
        } else {
            (e.clone(), denominator.clone())
        };
        let gens = self.updated_generators()?.expect("nonempty").into_owned();
        let mut transformed = gens;
        let dim = self.space_dimension();
        let col = var.id() + 1;
        for row in transformed.system_mut().rows_mut() {
            let is_line = row.is_line_or_equality();
            // Lines and parameters have a zero slot 0, which drops the
            // inhomogeneous contribution by itself.
            let w = row.coeff(0).clone();
            let mut new_val = e.inhomogeneous_term() * &w;
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
                *row.coeff_mut(i) *= &d;
            }
            *row.coeff_mut(col) = new_val;
            if is_line {
                row.strong_normalize();
            }
        }
        self.set_generators(transformed);
        Ok(())
    }

    /// The preimage: substitution into the congruence side, moduli scaled
    /// along.
    pub fn affine_preimage(
        &mut self,
        var: Variable,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        self.check_affine_args("Grid::affine_preimage", var, e, denominator)?;
        if self.is_empty()? {
            return Ok(());
        }
        let (e, d) = if denominator.is_negative() {
            (-e.clone(), -denominator.clone())
        } else {
            (e.clone(), denominator.clone())
        };
        let cgs = self.updated_congruences()?.into_owned();
        let dim = self.space_dimension();
        let mut transformed = CongruenceSystem::new(dim);
        for cg in cgs.iter() {
            let c_v = cg.coefficient(var);
            if c_v.is_zero() {
                transformed.insert(cg.clone())?;
                continue;
            }
            let mut out = LinearExpr::constant(
                &d * cg.inhomogeneous_term() + &c_v * e.inhomogeneous_term(),
            );
            for i in 0..dim {
                let base = if i == var.id() {
                    Coefficient::zero()
                } else {
                    cg.coefficient(Variable(i))
                };
                let coeff = &d * base + &c_v * e.coefficient(Variable(i));
                out.set_coefficient(Variable(i), coeff);
            }
            let modulus = cg.modulus() * &d;
            transformed.insert(out.congruent_to(0).modulo(modulus))?;
        }
        self.set_congruences(transformed);
        Ok(())
    }

    /// Grids only support the `=` relation symbol in the generalized form.
    pub fn generalized_affine_image(
        &mut self,
        var: Variable,
        relsym: RelSym,
        e: &LinearExpr,
        denominator: &Coefficient,
    ) -> Result<()> {
        if relsym != RelSym::Equal {
            return Err(Error::invalid_argument(
                "Grid::generalized_affine_image",
                "only the = relation symbol is meaningful on grids",
            ));
        }
        self.affine_image(var, e, denominator)
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

    fn set_generators(&mut self, gs: GridGeneratorSystem) {
        self.gen_sys = gs;
        self.con_sys = CongruenceSystem::new(self.space_dimension());
        self.status.gen_up_to_date = true;
        self.status.con_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
    }

    fn set_congruences(&mut self, cgs: CongruenceSystem) {
        self.con_sys = cgs;
        self.gen_sys = GridGeneratorSystem::new(self.space_dimension());
        self.status.con_up_to_date = true;
        self.status.gen_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
    }

    pub fn add_space_dimensions_and_embed(&mut self, n: usize) -> Result<()> {
        check_space_dimension(
            "Grid::add_space_dimensions_and_embed",
            self.space_dimension() + n,
        )?;
        if n == 0 {
            return Ok(());
        }
        if self.status.empty {
            self.space_dim += n;
            return Ok(());
        }
        // New dimensions are free: congruences say nothing about them.
        let cgs = self.updated_congruences()?.into_owned();
        self.space_dim += n;
        let mut grown = CongruenceSystem::new(self.space_dim);
        for cg in cgs.iter() {
            grown.insert(cg.clone())?;
        }
        self.set_congruences(grown);
        Ok(())
    }

    pub fn add_space_dimensions_and_project(&mut self, n: usize) -> Result<()> {
        let old_dim = self.space_dimension();
        self.add_space_dimensions_and_embed(n)?;
        if self.status.empty {
            return Ok(());
        }
        for k in 0..n {
            self.add_congruence(&Variable(old_dim + k).congruent_to(0).modulo(0))?;
        }
        Ok(())
    }

    /// Projects away the given dimensions, generator-side.
    pub fn remove_space_dimensions(&mut self, vars: &[Variable]) -> Result<()> {
        for v in vars {
            if v.space_dimension() > self.space_dimension() {
                return Err(Error::dimension_incompatible(
                    "Grid::remove_space_dimensions",
                    self.space_dimension(),
                    v.space_dimension(),
                ));
            }
        }
        if vars.is_empty() {
            return Ok(());
        }
        let mut removed: Vec<usize> = vars.iter().map(|v| v.id()).collect();
        removed.sort_unstable();
        removed.dedup();
        let new_dim = self.space_dimension() - removed.len();
        if self.status.empty {
            *self = Grid::empty(new_dim)?;
            return Ok(());
        }
        let gens = self.updated_generators()?.expect("nonempty").into_owned();
        let keep: Vec<usize> = (0..self.space_dimension())
            .filter(|i| !removed.contains(i))
            .collect();
        let mut compacted = GridGeneratorSystem::new(new_dim);
        for g in gens.iter() {
            let mut e = LinearExpr::zero();
            for (new_i, &old_i) in keep.iter().enumerate() {
                e.set_coefficient(Variable(new_i), g.coefficient(Variable(old_i)));
            }
            let moved = match g.generator_type() {
                GridGeneratorType::Line => {
                    if e.all_homogeneous_terms_are_zero() {
                        continue;
                    }
                    GridGenerator::grid_line(e)?
                }
                GridGeneratorType::Parameter => {
                    if e.all_homogeneous_terms_are_zero() {
                        continue;
                    }
                    GridGenerator::parameter(e, g.divisor()?.clone())?
                }
                GridGeneratorType::Point => GridGenerator::grid_point(e, g.divisor()?.clone())?,
            };
            compacted.insert(moved)?;
        }
        *self = Grid::from_generators(compacted)?;
        Ok(())
    }

    pub fn remove_higher_space_dimensions(&mut self, new_dim: usize) -> Result<()> {
        if new_dim > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Grid::remove_higher_space_dimensions",
                self.space_dimension(),
                new_dim,
            ));
        }
        let vars: Vec<Variable> = (new_dim..self.space_dimension()).map(Variable).collect();
        self.remove_space_dimensions(&vars)
    }

    /// Applies a partial injective dimension map, generator-side: `None`
    /// projects a dimension away, the `Some` entries must cover the target
    /// range.
    pub fn map_space_dimensions(&mut self, map: &[Option<usize>]) -> Result<()> {
        if map.len() != self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Grid::map_space_dimensions",
                self.space_dimension(),
                map.len(),
            ));
        }
        let new_dim = map.iter().flatten().copied().max().map_or(0, |m| m + 1);
        let mut seen = vec![false; new_dim];
        for &j in map.iter().flatten() {
            if j >= new_dim || seen[j] {
                return Err(Error::invalid_argument(
                    "Grid::map_space_dimensions",
                    "map is not injective",
                ));
            }
            seen[j] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(Error::invalid_argument(
                "Grid::map_space_dimensions",
                "map is not onto the target dimensions",
            ));
        }
        if self.is_empty()? {
            *self = Grid::empty(new_dim)?;
            return Ok(());
        }
        let gens = self.updated_generators()?.expect("nonempty").into_owned();
        let mut mapped = GridGeneratorSystem::new(new_dim);
        for g in gens.iter() {
            let mut e = LinearExpr::zero();
            for (old_i, target) in map.iter().enumerate() {
                if let Some(new_i) = target {
                    e.set_coefficient(Variable(*new_i), g.coefficient(Variable(old_i)));
                }
            }
            let moved = match g.generator_type() {
                GridGeneratorType::Line => {
                    if e.all_homogeneous_terms_are_zero() {
                        continue;
                    }
                    GridGenerator::grid_line(e)?
                }
                GridGeneratorType::Parameter => {
                    if e.all_homogeneous_terms_are_zero() {
                        continue;
                    }
                    GridGenerator::parameter(e, g.divisor()?.clone())?
                }
                GridGeneratorType::Point => GridGenerator::grid_point(e, g.divisor()?.clone())?,
            };
            mapped.insert(moved)?;
        }
        *self = Grid::from_generators(mapped)?;
        Ok(())
    }

    /// Appends `n` clones of dimension `var`, each congruent with the
    /// original's congruences.
    pub fn expand_space_dimension(&mut self, var: Variable, n: usize) -> Result<()> {
        if var.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Grid::expand_space_dimension",
                self.space_dimension(),
                var.space_dimension(),
            ));
        }
        check_space_dimension(
            "Grid::expand_space_dimension",
            self.space_dimension() + n,
        )?;
        if n == 0 {
            return Ok(());
        }
        let cgs = self.updated_congruences()?.into_owned();
        let old_dim = self.space_dimension();
        self.add_space_dimensions_and_embed(n)?;
        if self.status.empty {
            return Ok(());
        }
        for cg in cgs.iter() {
            let a = cg.coefficient(var);
            if a.is_zero() {
                continue;
            }
            for k in 0..n {
                let mut e = LinearExpr::constant(cg.inhomogeneous_term().clone());
                for i in 0..old_dim {
                    if i != var.id() {
                        e.set_coefficient(Variable(i), cg.coefficient(Variable(i)));
                    }
                }
                e.set_coefficient(Variable(old_dim + k), a.clone());
                self.add_congruence(&e.congruent_to(0).modulo(cg.modulus().clone()))?;
            }
        }
        Ok(())
    }

    /// Joins the folded dimensions onto `dest` and removes them.
    pub fn fold_space_dimensions(&mut self, vars: &[Variable], dest: Variable) -> Result<()> {
        if dest.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Grid::fold_space_dimensions",
                self.space_dimension(),
                dest.space_dimension(),
            ));
        }
        if vars.contains(&dest) {
            return Err(Error::invalid_argument(
                "Grid::fold_space_dimensions",
                "destination is among the folded dimensions",
            ));
        }
        if vars.is_empty() {
            return Ok(());
        }
        let original = self.clone();
        self.remove_space_dimensions(vars)?;
        for &v in vars {
            let mut swapped = original.clone();
            swapped.swap_dimensions(v, dest)?;
            swapped.remove_space_dimensions(vars)?;
            self.join_assign(&swapped)?;
        }
        Ok(())
    }

    fn swap_dimensions(&mut self, a: Variable, b: Variable) -> Result<()> {
        if a == b || self.status.empty {
            return Ok(());
        }
        let gens = self.updated_generators()?.expect("nonempty").into_owned();
        let mut swapped = GridGeneratorSystem::new(self.space_dimension());
        for g in gens.iter() {
            let mut e = LinearExpr::zero();
            for i in 0..self.space_dimension() {
                let source = if i == a.id() {
                    b
                } else if i == b.id() {
                    a
                } else {
                    Variable(i)
                };
                e.set_coefficient(Variable(i), g.coefficient(source));
            }
            let moved = match g.generator_type() {
                GridGeneratorType::Line => GridGenerator::grid_line(e)?,
                GridGeneratorType::Parameter => {
                    GridGenerator::parameter(e, g.divisor()?.clone())?
                }
                GridGeneratorType::Point => GridGenerator::grid_point(e, g.divisor()?.clone())?,
            };
            swapped.insert(moved)?;
        }
        *self = Grid::from_generators(swapped)?;
        Ok(())
    }

    /// The covering box: per bounded axis, the shortest grid step starting
    /// from the residue closest to the origin; a line collapses its axis
    /// to the degenerate `[0, 0]`.
    pub fn covering_box<S: IntervalScalar>(&self) -> Result<IntervalBox<S>> {
        let n = self.space_dimension();
        let Some(gens) = self.updated_generators()? else {
            return IntervalBox::empty(n);
        };
        let mut result = IntervalBox::universe(n)?;
        let mut line_dims = vec![false; n];
        let mut steps: Vec<Coefficient> = vec![Coefficient::zero(); n];
        let mut first_point: Option<(Vec<Coefficient>, Coefficient)> = None;
        for g in gens.iter() {
            match g.generator_type() {
                GridGeneratorType::Line => {
                    for dim in 0..n {
                        if !g.coefficient(Variable(dim)).is_zero() {
                            line_dims[dim] = true;
                        }
                    }
                }
                GridGeneratorType::Point => {
                    let d = g.divisor()?.clone();
                    let coords: Vec<Coefficient> =
                        (0..n).map(|i| g.coefficient(Variable(i))).collect();
                    match &first_point {
                        None => first_point = Some((coords, d)),
                        Some((base, _)) => {
                            // Extra points act as parameters.
                            for dim in 0..n {
                                let delta = &coords[dim] - &base[dim];
                                steps[dim] = steps[dim].gcd(&delta);
                            }
                        }
                    }
                }
                GridGeneratorType::Parameter => {
                    for dim in 0..n {
                        steps[dim] = steps[dim].gcd(&g.coefficient(Variable(dim)));
                    }
                }
            }
        }
        let (point, divisor) = first_point.expect("nonempty grid has a point");
        for dim in 0..n {
            let v = Variable(dim);
            if line_dims[dim] {
                // A continuous direction: the degenerate covering cell.
                result.interval_mut(v).refine_lower(&<Rational as num::Zero>::zero(), false)?;
                result.interval_mut(v).refine_upper(&<Rational as num::Zero>::zero(), false)?;
                continue;
            }
            let mut lower = point[dim].clone();
            if !steps[dim].is_zero() {
                // Bring the lower bound to the residue closest to the
                // origin, preferring the lowest positive on a tie.
                lower = &lower % &steps[dim];
                if lower.is_positive() {
                    if &steps[dim] - &lower < lower {
                        lower -= &steps[dim];
                    }
                } else if lower.is_negative() && &steps[dim] + &lower < -lower.clone() {
                    lower += &steps[dim];
                }
                let upper = &lower + &steps[dim];
                result
                    .interval_mut(v)
                    .refine_upper(&from_coefficients(upper, divisor.clone()), false)?;
            }
            result
                .interval_mut(v)
                .refine_lower(&from_coefficients(lower, divisor.clone()), false)?;
        }
        Ok(result)
    }

    /// The grid hull of a box: only degenerate axes translate to
    /// congruences.
    pub fn from_box<S: IntervalScalar>(b: &IntervalBox<S>) -> Result<Grid> {
        let n = b.space_dimension();
        if b.is_empty() {
            return Grid::empty(n);
        }
        let mut g = Grid::universe(n)?;
        for k in 0..n {
            let axis = b.interval(Variable(k)).to_rational_interval();
            if axis.is_singleton() {
                if let polyhedra_arith::bound::Bound::Finite(q) = &axis.lower().value {
                    let e = LinearExpr::from_variable(Variable(k)) * q.denom().clone();
                    g.add_congruence(&e.congruent_to(q.numer().clone()).modulo(0))?;
                }
            }
        }
        Ok(g)
    }

    /// The grid hull of a polyhedron: its affine hull, read off the
    /// equalities.
    pub fn from_polyhedron(ph: &Polyhedron) -> Result<Grid> {
        let n = ph.space_dimension();
        if ph.is_empty()? {
            return Grid::empty(n);
        }
        let mut g = Grid::universe(n)?;
        let cs = {
            let mut p = ph.clone();
            p.minimized_constraints()?
        };
        for c in cs.iter() {
            if c.constraint_type() == ConstraintType::Equality {
                g.add_congruence(&Congruence::from_constraint(c)?)?;
            }
        }
        Ok(g)
    }
}

impl Polyhedron {
    /// The polyhedral hull of a grid: its affine hull.
    pub fn from_grid(g: &Grid) -> Result<Polyhedron> {
        let n = g.space_dimension();
        if g.is_empty()? {
            return Polyhedron::empty(n, Topology::Closed);
        }
        let mut ph = Polyhedron::universe(n, Topology::Closed)?;
        let cgs = {
            let mut copy = g.clone();
            copy.minimized_congruences()?
        };
        for cg in cgs.iter() {
            if cg.is_equality() {
                ph.add_constraint(&cg.linear_expr().eq(0))?;
            }
        }
        Ok(ph)
    }
}

impl<S: IntervalScalar> IntervalBox<S> {
    /// The bounding box of a grid: an axis is bounded only when the grid
    /// pins it to a single value.
    pub fn from_grid(g: &Grid) -> Result<Self> {
        let n = g.space_dimension();
        if g.is_empty()? {
            return IntervalBox::empty(n);
        }
        let mut result = IntervalBox::universe(n)?;
        for k in 0..n {
            let v = LinearExpr::from_variable(Variable(k));
            if let Some((base, step, dense)) = g.expr_structure(&v)? {
                if step.is_zero() && !dense {
                    result.interval_mut(Variable(k)).refine_lower(&base, false)?;
                    result.interval_mut(Variable(k)).refine_upper(&base, false)?;
                }
            }
        }
        Ok(result)
    }
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

    fn evens() -> Grid {
        let mut g = Grid::universe(1).unwrap();
        g.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        g
    }

    #[test]
    fn test_intersection_of_lattices() {
        // 2Z intersect 3Z = 6Z.
        let mut g = evens();
        let mut threes = Grid::universe(1).unwrap();
        threes
            .add_congruence(&x().congruent_to(0).modulo(3))
            .unwrap();
        g.intersection_assign(&threes).unwrap();
        let cgs = g.minimized_congruences().unwrap();
        let cg = cgs.iter().next().unwrap();
        assert_eq!(*cg.modulus(), Coefficient::from(6));
    }

    #[test]
    fn test_join_of_lattices() {
        // 4Z joined with 4Z+2 gives 2Z.
        let mut g = Grid::universe(1).unwrap();
        g.add_congruence(&x().congruent_to(0).modulo(4)).unwrap();
        let mut shifted = Grid::universe(1).unwrap();
        shifted
            .add_congruence(&x().congruent_to(2).modulo(4))
            .unwrap();
        g.join_assign(&shifted).unwrap();
        let expected = evens();
        assert!(g.contains(&expected).unwrap());
        assert!(expected.contains(&g).unwrap());
    }

    #[test]
    fn test_grid_difference() {
        // Z minus 2Z = the odd integers.
        let mut ints = Grid::universe(1).unwrap();
        ints.add_congruence(&x().congruent_to(0).modulo(1)).unwrap();
        ints.grid_difference_assign(&evens()).unwrap();
        let mut odds = Grid::universe(1).unwrap();
        odds.add_congruence(&x().congruent_to(1).modulo(2)).unwrap();
        assert!(ints.contains(&odds).unwrap());
        assert!(odds.contains(&ints).unwrap());
    }

    #[test]
    fn test_grid_difference_contained_is_empty() {
        let mut g = evens();
        let whole = evens();
        g.grid_difference_assign(&whole).unwrap();
        assert!(g.is_empty().unwrap());
    }

    #[test]
    fn test_widening_drops_unstable_congruences() {
        // Old: multiples of 4; new: multiples of 2. The widening keeps
        // nothing the new iterate violates.
        let mut old = Grid::universe(1).unwrap();
        old.add_congruence(&x().congruent_to(0).modulo(4)).unwrap();
        let mut new = evens();
        new.widening_assign(&old, None).unwrap();
        // 2Z does not entail mod-4, so the result is the universe.
        assert!(new.is_universe().unwrap());

        // A stable congruence survives.
        let old2 = evens();
        let mut new2 = evens();
        new2.widening_assign(&old2, None).unwrap();
        let expected = evens();
        assert!(new2.contains(&expected).unwrap());
        assert!(expected.contains(&new2).unwrap());
    }

    #[test]
    fn test_affine_image_scales_lattice() {
        // x <- 3x on 2Z gives 6Z.
        let mut g = evens();
        g.affine_image(x(), &(x() * 3), &Coefficient::from(1)).unwrap();
        let mut expected = Grid::universe(1).unwrap();
        expected
            .add_congruence(&x().congruent_to(0).modulo(6))
            .unwrap();
        assert!(g.contains(&expected).unwrap());
        assert!(expected.contains(&g).unwrap());
    }

    #[test]
    fn test_affine_preimage_inverse() {
        let mut g = evens();
        let e = x() * 3 + 1;
        g.affine_image(x(), &e, &Coefficient::from(1)).unwrap();
        g.affine_preimage(x(), &e, &Coefficient::from(1)).unwrap();
        let expected = evens();
        assert!(g.contains(&expected).unwrap());
        assert!(expected.contains(&g).unwrap());
    }

    #[test]
    fn test_generalized_rejects_inequalities() {
        let mut g = evens();
        assert!(g
            .generalized_affine_image(x(), RelSym::GreaterOrEqual, &LinearExpr::zero(), &Coefficient::from(1))
            .is_err());
    }

    #[test]
    fn test_dimension_surgery() {
        let mut g = evens();
        g.add_space_dimensions_and_embed(1).unwrap();
        assert_eq!(g.space_dimension(), 2);
        // y is unconstrained.
        assert!(g
            .relation_with_congruence(&y().congruent_to(0).modulo(3))
            .unwrap()
            .implies(PolyConRelation::strictly_intersects()));
        g.add_congruence(&y().congruent_to(0).modulo(3)).unwrap();
        g.remove_space_dimensions(&[x()]).unwrap();
        assert_eq!(g.space_dimension(), 1);
        let mut expected = Grid::universe(1).unwrap();
        expected
            .add_congruence(&x().congruent_to(0).modulo(3))
            .unwrap();
        assert!(g.contains(&expected).unwrap());
        assert!(expected.contains(&g).unwrap());
    }

    #[test]
    fn test_map_and_expand_dimensions() {
        let mut g = Grid::universe(2).unwrap();
        g.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        g.map_space_dimensions(&[Some(1), Some(0)]).unwrap();
        assert!(g
            .relation_with_congruence(&y().congruent_to(0).modulo(2))
            .unwrap()
            .implies(PolyConRelation::is_included()));

        let mut e = Grid::universe(1).unwrap();
        e.add_congruence(&x().congruent_to(1).modulo(3)).unwrap();
        e.expand_space_dimension(x(), 1).unwrap();
        assert_eq!(e.space_dimension(), 2);
        assert!(e
            .relation_with_congruence(&y().congruent_to(1).modulo(3))
            .unwrap()
            .implies(PolyConRelation::is_included()));
    }

    #[test]
    fn test_fold_space_dimensions() {
        // Fold 3Z (on y) onto 2Z (on x): join is gcd-driven: 1Z... the
        // join of 2Z and 3Z contains 1 = 3 - 2, so it is Z.
        let mut g = Grid::universe(2).unwrap();
        g.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        g.add_congruence(&y().congruent_to(0).modulo(3)).unwrap();
        g.fold_space_dimensions(&[y()], x()).unwrap();
        assert_eq!(g.space_dimension(), 1);
        let mut ints = Grid::universe(1).unwrap();
        ints.add_congruence(&x().congruent_to(0).modulo(1)).unwrap();
        assert!(g.contains(&ints).unwrap());
        assert!(ints.contains(&g).unwrap());
    }

    #[test]
    fn test_covering_box() {
        // 2Z x (3Z + 1): the covering cell is [0,2] x [1,4]... the lower
        // bound is the residue closest to the origin.
        let mut g = Grid::universe(2).unwrap();
        g.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        g.add_congruence(&y().congruent_to(1).modulo(3)).unwrap();
        let b: IntervalBox<Rational> = g.covering_box().unwrap();
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.lower().value,
            polyhedra_arith::bound::Bound::Finite(ratio(0, 1))
        );
        assert_eq!(
            ix.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(2, 1))
        );
        let iy = b.interval(y()).to_rational_interval();
        assert_eq!(
            iy.lower().value,
            polyhedra_arith::bound::Bound::Finite(ratio(1, 1))
        );
        assert_eq!(
            iy.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(4, 1))
        );
    }

    #[test]
    fn test_covering_box_single_point() {
        let mut g = Grid::universe(1).unwrap();
        g.add_congruence(&x().congruent_to(7).modulo(0)).unwrap();
        let b: IntervalBox<Rational> = g.covering_box().unwrap();
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.lower().value,
            polyhedra_arith::bound::Bound::Finite(ratio(7, 1))
        );
        assert!(ix.upper().is_unbounded());
    }

    #[test]
    fn test_polyhedron_grid_coercions() {
        // Property 4 for the grid: the affine hull contains the grid, the
        // grid hull of the hull contains the original polyhedron's hull.
        let g = evens();
        let ph = Polyhedron::from_grid(&g).unwrap();
        assert!(ph.is_universe().unwrap());
        let back = Grid::from_polyhedron(&ph).unwrap();
        assert!(back.contains(&g).unwrap());

        // A flat polyhedron keeps its equality.
        let mut flat = Polyhedron::universe(2, Topology::Closed).unwrap();
        flat.add_constraint(&x().eq(y())).unwrap();
        let gf = Grid::from_polyhedron(&flat).unwrap();
        let phf = Polyhedron::from_grid(&gf).unwrap();
        assert!(phf.contains(&flat).unwrap());
        assert!(flat.contains(&phf).unwrap());
    }

    #[test]
    fn test_box_grid_coercions() {
        let mut b = IntervalBox::<Rational>::universe(2).unwrap();
        b.interval_mut(x()).refine_lower(&ratio(3, 1), false).unwrap();
        b.interval_mut(x()).refine_upper(&ratio(3, 1), false).unwrap();
        b.interval_mut(y()).refine_lower(&ratio(0, 1), false).unwrap();
        b.interval_mut(y()).refine_upper(&ratio(9, 1), false).unwrap();
        let g = Grid::from_box(&b).unwrap();
        // x is pinned, y is free.
        let bb = IntervalBox::<Rational>::from_grid(&g).unwrap();
        let ix = bb.interval(x()).to_rational_interval();
        assert!(ix.is_singleton());
        assert!(bb.interval(y()).is_universe());
        assert!(bb.contains(&b).unwrap());
    }
}
