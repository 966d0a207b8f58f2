//! Space dimension surgery: embedding, projection, removal, remapping,
//! expansion, and folding.

use num::Zero;
use polyhedra_arith::Coefficient;

use crate::constraint::ConstraintSystem;
use crate::error::{check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::generator::Generator;
use crate::linear::{LinearRow, RowKind, Topology};
use crate::polyhedron::Polyhedron;

impl Polyhedron {
    fn trailing(&self) -> usize {
        usize::from(self.topology() == Topology::NotClosed)
    }

    fn invalidate_minimal_form(&mut self) {
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        self.status.sat_c_up_to_date = false;
        self.status.sat_g_up_to_date = false;
    }

    /// Appends `n` unconstrained dimensions.
    pub fn add_space_dimensions_and_embed(&mut self, n: usize) -> Result<()> {
        check_space_dimension(
            "Polyhedron::add_space_dimensions_and_embed",
            self.space_dimension() + n,
        )?;
        if n == 0 {
            return Ok(());
        }
        let old_dim = self.space_dim;
        self.space_dim += n;
        if self.status.empty {
            return Ok(());
        }
        if self.status.con_up_to_date {
            self.con_sys.add_space_dimensions(n)?;
        }
        if self.status.gen_up_to_date {
            self.gen_sys.add_space_dimensions(n)?;
            // The new dimensions are free: one line each.
            let topology = self.topology();
            let sys = self.gen_sys.system_mut();
            for k in 0..n {
                let mut row = LinearRow::new(sys.row_size(), RowKind::LineOrEquality, topology);
                *row.coeff_mut(old_dim + 1 + k) = Coefficient::from(1);
                sys.add_pending_row(row);
            }
        }
        self.invalidate_minimal_form();
        Ok(())
    }

    /// Appends `n` dimensions pinned to zero.
    pub fn add_space_dimensions_and_project(&mut self, n: usize) -> Result<()> {
        check_space_dimension(
            "Polyhedron::add_space_dimensions_and_project",
            self.space_dimension() + n,
        )?;
        if n == 0 {
            return Ok(());
        }
        let old_dim = self.space_dimension();
        self.add_space_dimensions_and_embed(n)?;
        if self.status.empty {
            return Ok(());
        }
        for k in 0..n {
            self.add_constraint(&Variable(old_dim + k).eq(0))?;
        }
        Ok(())
    }

    /// Projects away the given dimensions and shrinks the space.
    pub fn remove_space_dimensions(&mut self, vars: &[Variable]) -> Result<()> {
        for v in vars {
            if v.space_dimension() > self.space_dimension() {
                return Err(Error::dimension_incompatible(
                    "Polyhedron::remove_space_dimensions",
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
        let new_dim = self.space_dim - removed.len();
        if self.status.empty {
            *self = Polyhedron::empty(new_dim, self.topology())?;
            return Ok(());
        }
        // Projection is a generator-side operation: dropping coordinates
        // of points, rays, and lines is exact.
        let gens = match self.updated_generators()? {
            Some(gs) => gs.into_owned(),
            None => {
                *self = Polyhedron::empty(new_dim, self.topology())?;
                return Ok(());
            }
        };
        let mut sys = gens.system().clone();
        sys.unset_pending_rows();
        // Move the kept columns into place, then chop the tail.
        let keep: Vec<usize> = (0..self.space_dim)
            .filter(|i| !removed.contains(i))
            .collect();
        let mut compacted = crate::linear::LinearSystem::new(
            new_dim + 1 + self.trailing(),
            self.topology(),
        );
        for row in sys.rows() {
            let mut coeffs = Vec::with_capacity(new_dim + 1 + self.trailing());
            coeffs.push(row.coeff(0).clone());
            for &i in &keep {
                coeffs.push(row.coeff(i + 1).clone());
            }
            if self.trailing() == 1 {
                coeffs.push(row.coeff(row.size() - 1).clone());
            }
            let mut new_row = LinearRow::from_coeffs(coeffs, row.kind(), self.topology());
            new_row.strong_normalize();
            compacted.add_row(new_row);
        }
        let mut new_gens = crate::generator::GeneratorSystem::from_system(compacted, new_dim);
        new_gens.remove_invalid_lines_and_rays();
        self.space_dim = new_dim;
        self.gen_sys = new_gens;
        self.con_sys = ConstraintSystem::new(new_dim, self.topology());
        self.status.gen_up_to_date = true;
        self.status.con_up_to_date = false;
        self.invalidate_minimal_form();
        Ok(())
    }

    /// Drops every dimension at or above `new_dim`.
    pub fn remove_higher_space_dimensions(&mut self, new_dim: usize) -> Result<()> {
        if new_dim > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Polyhedron::remove_higher_space_dimensions",
                self.space_dimension(),
                new_dim,
            ));
        }
        let vars: Vec<Variable> = (new_dim..self.space_dimension()).map(Variable).collect();
        self.remove_space_dimensions(&vars)
    }

    /// Applies a partial injective dimension map: `None` projects the
    /// dimension away, the `Some` entries must cover the target range.
    pub fn map_space_dimensions(&mut self, map: &[Option<usize>]) -> Result<()> {
        if map.len() != self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Polyhedron::map_space_dimensions",
                self.space_dimension(),
                map.len(),
            ));
        }
        let new_dim = map.iter().flatten().copied().max().map_or(0, |m| m + 1);
        let mut seen = vec![false; new_dim];
        for &j in map.iter().flatten() {
            if j >= new_dim || seen[j] {
                return Err(Error::invalid_argument(
                    "Polyhedron::map_space_dimensions",
                    "map is not injective",
                ));
            }
            seen[j] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(Error::invalid_argument(
                "Polyhedron::map_space_dimensions",
                "map is not onto the target dimensions",
            ));
        }
        // Drop the unmapped dimensions first, then permute the survivors.
        let dropped: Vec<Variable> = map
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_none())
            .map(|(i, _)| Variable(i))
            .collect();
        let compact: Vec<usize> = map.iter().flatten().copied().collect();
        self.remove_space_dimensions(&dropped)?;
        debug_assert_eq!(self.space_dimension(), compact.len());
        if self.status.empty {
            return Ok(());
        }
        // Build permutation cycles over columns (dimension i sits in
        // column i + 1).
        let mut cycles: Vec<usize> = Vec::new();
        let mut visited = vec![false; compact.len()];
        for start in 0..compact.len() {
            if visited[start] || compact[start] == start {
                visited[start] = true;
                continue;
            }
            let mut i = start;
            loop {
                visited[i] = true;
                cycles.push(i + 1);
                i = compact[i];
                if i == start {
                    break;
                }
            }
            cycles.push(0);
        }
        if !cycles.is_empty() {
            if self.status.con_up_to_date {
                self.con_sys.system_mut().permute_columns(&cycles)?;
            }
            if self.status.gen_up_to_date {
                self.gen_sys.system_mut().permute_columns(&cycles)?;
            }
            self.invalidate_minimal_form();
        }
        Ok(())
    }

    /// Appends `n` clones of dimension `var`, each correlated with the
    /// original exactly as the original is with itself.
    pub fn expand_space_dimension(&mut self, var: Variable, n: usize) -> Result<()> {
        if var.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Polyhedron::expand_space_dimension",
                self.space_dimension(),
                var.space_dimension(),
            ));
        }
        check_space_dimension(
            "Polyhedron::expand_space_dimension",
            self.space_dimension() + n,
        )?;
        if n == 0 || self.status.empty {
            if !self.status.empty {
                return Ok(());
            }
            self.space_dim += n;
            return Ok(());
        }
        let cs = self.updated_constraints()?.into_owned();
        let old_dim = self.space_dimension();
        self.add_space_dimensions_and_embed(n)?;
        for c in cs.iter() {
            let a = c.coefficient(var);
            if a.is_zero() {
                continue;
            }
            for k in 0..n {
                let mut e = LinearExpr::constant(c.inhomogeneous_term().clone());
                for i in 0..old_dim {
                    if i != var.id() {
                        e.set_coefficient(Variable(i), c.coefficient(Variable(i)));
                    }
                }
                e.set_coefficient(Variable(old_dim + k), a.clone());
                let copy = match c.constraint_type() {
                    crate::constraint::ConstraintType::Equality => e.eq(0),
                    crate::constraint::ConstraintType::NonstrictInequality => e.ge(0),
                    crate::constraint::ConstraintType::StrictInequality => e.gt(0),
                };
                self.add_constraint(&copy)?;
            }
        }
        Ok(())
    }

    /// Folds the given dimensions into `dest`: the result on `dest` is the
    /// join of the images, the folded dimensions disappear.
    pub fn fold_space_dimensions(&mut self, vars: &[Variable], dest: Variable) -> Result<()> {
        if dest.space_dimension() > self.space_dimension() {
            return Err(Error::dimension_incompatible(
                "Polyhedron::fold_space_dimensions",
                self.space_dimension(),
                dest.space_dimension(),
            ));
        }
        if vars.contains(&dest) {
            return Err(Error::invalid_argument(
                "Polyhedron::fold_space_dimensions",
                "destination is among the folded dimensions",
            ));
        }
        for v in vars {
            if v.space_dimension() > self.space_dimension() {
                return Err(Error::dimension_incompatible(
                    "Polyhedron::fold_space_dimensions",
                    self.space_dimension(),
                    v.space_dimension(),
                ));
            }
        }
        if vars.is_empty() {
            return Ok(());
        }
        let original = self.clone();
        self.remove_space_dimensions(vars)?;
        for &v in vars {
            let mut swapped = original.clone();
            let mut map: Vec<Option<usize>> = (0..original.space_dimension()).map(Some).collect();
            map[v.id()] = Some(dest.id());
            map[dest.id()] = Some(v.id());
            swapped.map_space_dimensions(&map)?;
            swapped.remove_space_dimensions(vars)?;
            self.poly_hull_assign(&swapped)?;
        }
        Ok(())
    }

    /// Frees the given dimensions: one line per variable.
    pub fn unconstrain(&mut self, vars: &[Variable]) -> Result<()> {
        for v in vars {
            if v.space_dimension() > self.space_dimension() {
                return Err(Error::dimension_incompatible(
                    "Polyhedron::unconstrain",
                    self.space_dimension(),
                    v.space_dimension(),
                ));
            }
        }
        if self.status.empty {
            return Ok(());
        }
        for &v in vars {
            self.add_generator(&Generator::line(LinearExpr::from_variable(v))?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::point;

    fn x() -> Variable {
        Variable(0)
    }

    fn y() -> Variable {
        Variable(1)
    }

    fn segment() -> Polyhedron {
        let mut ph = Polyhedron::universe(1, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&x().le(1)).unwrap();
        ph
    }

    #[test]
    fn test_embed_and_project() {
        let mut a = segment();
        a.add_space_dimensions_and_embed(1).unwrap();
        assert_eq!(a.space_dimension(), 2);
        assert!(!a.constrains(y()).unwrap());

        let mut b = segment();
        b.add_space_dimensions_and_project(1).unwrap();
        assert!(b.constrains(y()).unwrap());
        let on_axis = point(x()).unwrap();
        assert!(b.relation_with_generator(&on_axis).unwrap().subsumes());
        let off_axis = point(x() + y()).unwrap();
        assert!(!b.relation_with_generator(&off_axis).unwrap().subsumes());
    }

    #[test]
    fn test_remove_dimensions_projects() {
        // The diagonal segment projects to [0, 1] on x.
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&x().eq(y())).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&x().le(1)).unwrap();
        ph.remove_space_dimensions(&[y()]).unwrap();
        assert_eq!(ph.space_dimension(), 1);
        let expected = segment();
        assert!(ph.contains(&expected).unwrap());
        assert!(expected.contains(&ph).unwrap());
    }

    #[test]
    fn test_map_space_dimensions_swaps() {
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(3)).unwrap();
        ph.map_space_dimensions(&[Some(1), Some(0)]).unwrap();
        assert!(ph
            .relation_with_constraint(&y().ge(3))
            .unwrap()
            .implies(crate::relation::PolyConRelation::is_included()));
        assert!(!ph.constrains(x()).unwrap());
    }

    #[test]
    fn test_expand_space_dimension() {
        let mut ph = segment();
        ph.expand_space_dimension(x(), 1).unwrap();
        assert_eq!(ph.space_dimension(), 2);
        assert!(ph
            .relation_with_constraint(&y().ge(0))
            .unwrap()
            .implies(crate::relation::PolyConRelation::is_included()));
        assert!(ph
            .relation_with_constraint(&y().le(1))
            .unwrap()
            .implies(crate::relation::PolyConRelation::is_included()));
        // The clone is independent of the original.
        let corner = point(x() + y()).unwrap();
        let opposite = point(y()).unwrap();
        assert!(ph.relation_with_generator(&corner).unwrap().subsumes());
        assert!(ph.relation_with_generator(&opposite).unwrap().subsumes());
    }

    #[test]
    fn test_fold_space_dimensions() {
        // Fold y in [2, 3] onto x in [0, 1]: the hull of the two ranges.
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&x().le(1)).unwrap();
        ph.add_constraint(&y().ge(2)).unwrap();
        ph.add_constraint(&y().le(3)).unwrap();
        ph.fold_space_dimensions(&[y()], x()).unwrap();
        assert_eq!(ph.space_dimension(), 1);
        let mut expected = Polyhedron::universe(1, Topology::Closed).unwrap();
        expected.add_constraint(&x().ge(0)).unwrap();
        expected.add_constraint(&x().le(3)).unwrap();
        assert!(ph.contains(&expected).unwrap());
        assert!(expected.contains(&ph).unwrap());
    }

    #[test]
    fn test_unconstrain() {
        let mut ph = segment();
        ph.unconstrain(&[x()]).unwrap();
        assert!(ph.is_universe().unwrap());
    }
}
