mod conversion;
mod ops;
pub(crate) mod reduction;

use std::borrow::Cow;

use num::{Signed, Zero};
use polyhedra_arith::rational::from_coefficients;
use polyhedra_arith::Rational;
use serde::{Deserialize, Serialize};

use crate::congruence::{Congruence, CongruenceSystem};
use crate::error::{check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::grid_generator::{GridGenerator, GridGeneratorSystem, GridGeneratorType};
use crate::relation::{PolyConRelation, PolyGenRelation};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
struct Status {
    empty: bool,
    con_up_to_date: bool,
    gen_up_to_date: bool,
    con_minimized: bool,
    gen_minimized: bool,
}

/// An integer-lattice abstract domain in dual representation: a congruence
/// system and a grid generator system, kept in strong minimal form by
/// modular triangular reduction and exact matrix inversion.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    space_dim: usize,
    con_sys: CongruenceSystem,
    gen_sys: GridGeneratorSystem,
    status: Status,
}

impl Grid {
    /// The full space: every point belongs to the grid.
    pub fn universe(space_dim: usize) -> Result<Self> {
        check_space_dimension("Grid::universe", space_dim)?;
        Ok(Grid {
            space_dim,
            con_sys: CongruenceSystem::new(space_dim),
            gen_sys: GridGeneratorSystem::new(space_dim),
            status: Status {
                con_up_to_date: true,
                ..Status::default()
            },
        })
    }

    pub fn empty(space_dim: usize) -> Result<Self> {
        check_space_dimension("Grid::empty", space_dim)?;
        let mut g = Grid::universe(space_dim)?;
        g.set_empty();
        Ok(g)
    }

    pub fn from_congruences(cgs: CongruenceSystem) -> Result<Self> {
        let mut g = Grid::universe(cgs.space_dimension())?;
        g.add_congruences(&cgs)?;
        Ok(g)
    }

    /// Builds from grid generators, which must include a point unless the
    /// system is empty.
    pub fn from_generators(gs: GridGeneratorSystem) -> Result<Self> {
        let space_dim = gs.space_dimension();
        if gs.num_rows() == 0 {
            return Grid::empty(space_dim);
        }
        if !gs.has_points() {
            return Err(Error::invalid_argument(
                "Grid::from_generators",
                "grid generator system without a point",
            ));
        }
        let mut gen_sys = gs;
        gen_sys.system_mut().unset_pending_rows();
        Ok(Grid {
            space_dim,
            con_sys: CongruenceSystem::new(space_dim),
            gen_sys,
            status: Status {
                gen_up_to_date: true,
                ..Status::default()
            },
        })
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    pub(crate) fn set_empty(&mut self) {
        self.con_sys = CongruenceSystem::new(self.space_dim);
        self.gen_sys = GridGeneratorSystem::new(self.space_dim);
        self.status = Status {
            empty: true,
            ..Status::default()
        };
    }

    fn is_minimized_form(&self) -> bool {
        self.status.empty || (self.status.con_minimized && self.status.gen_minimized)
    }

    pub(crate) fn minimized_view(&self) -> Result<Cow<'_, Grid>> {
        if self.is_minimized_form() {
            Ok(Cow::Borrowed(self))
        } else {
            let mut copy = self.clone();
            copy.minimize()?;
            Ok(Cow::Owned(copy))
        }
    }

    /// Brings both systems to strong minimal form; returns whether the
    /// grid is nonempty.
    pub fn minimize(&mut self) -> Result<bool> {
        if self.status.empty {
            return Ok(false);
        }
        if self.space_dim == 0 {
            return Ok(true);
        }
        if self.is_minimized_form() {
            return Ok(true);
        }
        if self.status.con_up_to_date {
            self.con_sys.system_mut().unset_pending_rows();
            let Some(reduced) = reduction::reduce_congruences(&self.con_sys)? else {
                log::debug!("minimize: congruence system is unsatisfiable");
                self.set_empty();
                return Ok(false);
            };
            self.con_sys = rebuild_congruences(&reduced, self.space_dim)?;
            self.gen_sys = conversion::congruences_to_generators(&reduced, self.space_dim)?;
        } else {
            debug_assert!(self.status.gen_up_to_date);
            self.gen_sys.system_mut().unset_pending_rows();
            let reduced = reduction::reduce_generators(&self.gen_sys)?;
            self.gen_sys = rebuild_generators(&reduced, self.space_dim)?;
            self.con_sys = conversion::generators_to_congruences(&reduced, self.space_dim)?;
        }
        self.status = Status {
            empty: false,
            con_up_to_date: true,
            gen_up_to_date: true,
            con_minimized: true,
            gen_minimized: true,
        };
        Ok(true)
    }

    pub(crate) fn updated_congruences(&self) -> Result<Cow<'_, CongruenceSystem>> {
        if self.status.empty {
            let mut cgs = CongruenceSystem::new(self.space_dim);
            cgs.insert(Congruence::zero_dim_false())?;
            return Ok(Cow::Owned(cgs));
        }
        if self.status.con_up_to_date {
            return Ok(Cow::Borrowed(&self.con_sys));
        }
        match self.minimized_view()? {
            Cow::Borrowed(g) => Ok(Cow::Borrowed(&g.con_sys)),
            Cow::Owned(g) => {
                if g.status.empty {
                    let mut cgs = CongruenceSystem::new(self.space_dim);
                    cgs.insert(Congruence::zero_dim_false())?;
                    Ok(Cow::Owned(cgs))
                } else {
                    Ok(Cow::Owned(g.con_sys))
                }
            }
        }
    }

    pub(crate) fn updated_generators(&self) -> Result<Option<Cow<'_, GridGeneratorSystem>>> {
        if self.status.empty {
            return Ok(None);
        }
        if self.status.gen_up_to_date && self.gen_sys.system().num_pending_rows() == 0 {
            return Ok(Some(Cow::Borrowed(&self.gen_sys)));
        }
        match self.minimized_view()? {
            Cow::Borrowed(g) => Ok(Some(Cow::Borrowed(&g.gen_sys))),
            Cow::Owned(g) => {
                if g.status.empty {
                    Ok(None)
                } else {
                    Ok(Some(Cow::Owned(g.gen_sys)))
                }
            }
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        if self.status.empty {
            return Ok(true);
        }
        if self.status.gen_up_to_date && self.gen_sys.has_points() {
            return Ok(false);
        }
        if self.space_dim == 0 {
            return Ok(false);
        }
        Ok(self.minimized_view()?.status.empty)
    }

    pub fn is_universe(&self) -> Result<bool> {
        if self.status.empty {
            return Ok(false);
        }
        if self.space_dim == 0 {
            return Ok(true);
        }
        let cgs = self.updated_congruences()?;
        let result = cgs.iter().all(|cg| cg.is_tautological());
        Ok(result)
    }

    /// No lines: the grid is a countable set of isolated points.
    pub fn is_discrete(&self) -> Result<bool> {
        match self.updated_generators()? {
            None => Ok(true),
            Some(gs) => Ok(gs.iter().all(|g| !g.is_line())),
        }
    }

    /// A single point or empty.
    pub fn is_bounded(&self) -> Result<bool> {
        match self.updated_generators()? {
            None => Ok(true),
            Some(gs) => Ok(gs.iter().all(|g| g.is_point()) && gs.num_rows() <= 1),
        }
    }

    pub fn congruences(&self) -> Result<CongruenceSystem> {
        let cgs = self.updated_congruences()?;
        let mut out = CongruenceSystem::new(self.space_dim);
        for cg in cgs.iter() {
            if !cg.is_tautological() {
                out.insert(cg.clone())?;
            }
        }
        Ok(out)
    }

    pub fn minimized_congruences(&mut self) -> Result<CongruenceSystem> {
        self.minimize()?;
        self.congruences()
    }

    pub fn grid_generators(&self) -> Result<GridGeneratorSystem> {
        match self.updated_generators()? {
            None => Ok(GridGeneratorSystem::new(self.space_dim)),
            Some(gs) => Ok(gs.into_owned()),
        }
    }

    pub fn minimized_grid_generators(&mut self) -> Result<GridGeneratorSystem> {
        self.minimize()?;
        self.grid_generators()
    }

    pub fn add_congruence(&mut self, cg: &Congruence) -> Result<()> {
        if cg.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Grid::add_congruence",
                self.space_dim,
                cg.space_dimension(),
            ));
        }
        if self.status.empty || cg.is_tautological() {
            return Ok(());
        }
        if cg.is_inconsistent() {
            self.set_empty();
            return Ok(());
        }
        if !self.status.con_up_to_date {
            let cgs = self.updated_congruences()?.into_owned();
            self.con_sys = cgs;
            self.status.con_up_to_date = true;
        }
        self.con_sys.insert(cg.clone())?;
        self.status.gen_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        Ok(())
    }

    pub fn add_congruences(&mut self, cgs: &CongruenceSystem) -> Result<()> {
        if cgs.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Grid::add_congruences",
                self.space_dim,
                cgs.space_dimension(),
            ));
        }
        for cg in cgs.iter() {
            self.add_congruence(cg)?;
        }
        Ok(())
    }

    /// Adds an equality constraint, the only constraint form a grid can
    /// represent exactly.
    pub fn add_constraint(&mut self, c: &crate::constraint::Constraint) -> Result<()> {
        let cg = Congruence::from_constraint(c)?;
        self.add_congruence(&cg)
    }

    pub fn add_grid_generator(&mut self, g: &GridGenerator) -> Result<()> {
        if g.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Grid::add_grid_generator",
                self.space_dim,
                g.space_dimension(),
            ));
        }
        if self.status.empty {
            if !g.is_point() {
                return Err(Error::invalid_argument(
                    "Grid::add_grid_generator",
                    "a generator for an empty grid must be a point",
                ));
            }
            let mut gs = GridGeneratorSystem::new(self.space_dim);
            gs.insert(g.clone())?;
            gs.system_mut().unset_pending_rows();
            self.gen_sys = gs;
            self.con_sys = CongruenceSystem::new(self.space_dim);
            self.status = Status {
                gen_up_to_date: true,
                ..Status::default()
            };
            return Ok(());
        }
        if !self.status.gen_up_to_date {
            let gs = match self.updated_generators()? {
                Some(gs) => gs.into_owned(),
                None => {
                    self.set_empty();
                    return self.add_grid_generator(g);
                }
            };
            self.gen_sys = gs;
            self.status.gen_up_to_date = true;
        }
        self.gen_sys.insert(g.clone())?;
        self.status.con_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        Ok(())
    }

    pub fn add_grid_generators(&mut self, gs: &GridGeneratorSystem) -> Result<()> {
        let mut items: Vec<&GridGenerator> = gs.iter().collect();
        if self.status.empty {
            if let Some(pos) = items.iter().position(|g| g.is_point()) {
                items.swap(0, pos);
            }
        }
        for g in items {
            self.add_grid_generator(g)?;
        }
        Ok(())
    }

    /// Whether `g` satisfies `cg`: points evaluate the expression, the
    /// directions must keep every residue fixed.
    pub(crate) fn generator_satisfies(g: &GridGenerator, cg: &Congruence) -> Result<bool> {
        let e = cg.linear_expr();
        match g.generator_type() {
            GridGeneratorType::Point => {
                let d = g.divisor()?.clone();
                let mut acc = Rational::from(e.inhomogeneous_term().clone());
                for i in 0..g.space_dimension() {
                    let a = e.coefficient(Variable(i));
                    if !a.is_zero() {
                        acc += Rational::from(a)
                            * from_coefficients(g.coefficient(Variable(i)), d.clone());
                    }
                }
                if cg.is_equality() {
                    Ok(acc.is_zero())
                } else {
                    Ok((acc / Rational::from(cg.modulus().clone())).is_integer())
                }
            }
            GridGeneratorType::Parameter => {
                let d = g.divisor()?.clone();
                let mut acc = Rational::zero();
                for i in 0..g.space_dimension() {
                    let a = e.coefficient(Variable(i));
                    if !a.is_zero() {
                        acc += Rational::from(a)
                            * from_coefficients(g.coefficient(Variable(i)), d.clone());
                    }
                }
                if cg.is_equality() {
                    Ok(acc.is_zero())
                } else {
                    Ok((acc / Rational::from(cg.modulus().clone())).is_integer())
                }
            }
            GridGeneratorType::Line => {
                let mut acc = Rational::zero();
                for i in 0..g.space_dimension() {
                    let a = e.coefficient(Variable(i));
                    if !a.is_zero() {
                        acc += Rational::from(a) * Rational::from(g.coefficient(Variable(i)));
                    }
                }
                Ok(acc.is_zero())
            }
        }
    }

    pub fn contains(&self, other: &Grid) -> Result<bool> {
        crate::error::check_same_dimension("Grid::contains", self.space_dim, other.space_dim)?;
        if other.is_empty()? {
            return Ok(true);
        }
        if self.is_empty()? {
            return Ok(false);
        }
        let cgs = self.updated_congruences()?;
        let gens = other.updated_generators()?.expect("nonempty");
        for cg in cgs.iter() {
            for g in gens.iter() {
                if !Self::generator_satisfies(g, cg)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn strictly_contains(&self, other: &Grid) -> Result<bool> {
        Ok(self.contains(other)? && !other.contains(self)?)
    }

    pub fn relation_with_congruence(&self, cg: &Congruence) -> Result<PolyConRelation> {
        if cg.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Grid::relation_with_congruence",
                self.space_dim,
                cg.space_dimension(),
            ));
        }
        if self.is_empty()? {
            return Ok(PolyConRelation::saturates()
                | PolyConRelation::is_included()
                | PolyConRelation::is_disjoint());
        }
        let gens = self.updated_generators()?.expect("nonempty");
        let mut all_satisfy = true;
        for g in gens.iter() {
            if !Self::generator_satisfies(g, cg)? {
                all_satisfy = false;
                break;
            }
        }
        if all_satisfy {
            // Saturation asks whether the expression is identically zero.
            let saturates = gens.iter().try_fold(true, |acc, g| {
                let zero_cg = cg.linear_expr().congruent_to(0).modulo(0);
                Self::generator_satisfies(g, &zero_cg).map(|ok| acc && ok)
            })?;
            return Ok(if saturates {
                PolyConRelation::saturates() | PolyConRelation::is_included()
            } else {
                PolyConRelation::is_included()
            });
        }
        // Disjoint when no value of the expression hits the residue class.
        match self.expr_structure(&cg.linear_expr())? {
            None => Ok(PolyConRelation::strictly_intersects()),
            Some((base, step, dense)) => {
                if dense {
                    return Ok(PolyConRelation::strictly_intersects());
                }
                let m = if cg.is_equality() {
                    Rational::zero()
                } else {
                    Rational::from(cg.modulus().clone())
                };
                let hits = if m.is_zero() {
                    // Equality: some value must be exactly zero.
                    if step.is_zero() {
                        base.is_zero()
                    } else {
                        (base / step).is_integer()
                    }
                } else if step.is_zero() {
                    (base / m).is_integer()
                } else {
                    let h = rational_gcd(&step, &m);
                    (base / h).is_integer()
                };
                Ok(if hits {
                    PolyConRelation::strictly_intersects()
                } else {
                    PolyConRelation::is_disjoint()
                })
            }
        }
    }

    pub fn relation_with_grid_generator(&self, g: &GridGenerator) -> Result<PolyGenRelation> {
        if g.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Grid::relation_with_grid_generator",
                self.space_dim,
                g.space_dimension(),
            ));
        }
        if self.is_empty()? {
            return Ok(PolyGenRelation::Nothing);
        }
        let cgs = self.updated_congruences()?;
        for cg in cgs.iter() {
            if !Self::generator_satisfies(g, cg)? {
                return Ok(PolyGenRelation::Nothing);
            }
        }
        Ok(PolyGenRelation::Subsumes)
    }

    /// The value structure of a linear expression over the grid:
    /// `(base, step, dense)` meaning values lie in `base + step*Z`, dense
    /// when a line makes them the whole of the rationals. `None` on the
    /// empty grid.
    pub(crate) fn expr_structure(
        &self,
        e: &LinearExpr,
    ) -> Result<Option<(Rational, Rational, bool)>> {
        let Some(gens) = self.updated_generators()? else {
            return Ok(None);
        };
        let mut base: Option<Rational> = None;
        let mut step = Rational::zero();
        let mut dense = false;
        for g in gens.iter() {
            let mut acc = Rational::zero();
            for i in 0..self.space_dim {
                let a = e.coefficient(Variable(i));
                if a.is_zero() {
                    continue;
                }
                let coord = match g.generator_type() {
                    GridGeneratorType::Line => Rational::from(g.coefficient(Variable(i))),
                    _ => from_coefficients(g.coefficient(Variable(i)), g.divisor()?.clone()),
                };
                acc += Rational::from(a) * coord;
            }
            match g.generator_type() {
                GridGeneratorType::Point => {
                    let value = acc + Rational::from(e.inhomogeneous_term().clone());
                    match &base {
                        None => base = Some(value),
                        Some(b) => {
                            let diff = value - b.clone();
                            if !diff.is_zero() {
                                step = rational_gcd(&step, &diff);
                            }
                        }
                    }
                }
                GridGeneratorType::Parameter => {
                    if !acc.is_zero() {
                        step = rational_gcd(&step, &acc);
                    }
                }
                GridGeneratorType::Line => {
                    if !acc.is_zero() {
                        dense = true;
                    }
                }
            }
        }
        Ok(Some((base.expect("nonempty grid has a point"), step, dense)))
    }

    pub fn ascii_dump(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "space_dim {}", self.space_dim);
        let s = &self.status;
        let _ = writeln!(
            out,
            "status {}{}{}{}{}",
            if s.empty { "E" } else { "" },
            if s.con_up_to_date { "C" } else { "" },
            if s.gen_up_to_date { "G" } else { "" },
            if s.con_minimized { "c" } else { "" },
            if s.gen_minimized { "g" } else { "" },
        );
        let _ = writeln!(out, "con_sys");
        self.con_sys.ascii_dump(out);
        let _ = writeln!(out, "gen_sys");
        self.gen_sys.ascii_dump(out);
    }

    pub fn ascii_load(input: &str) -> Option<Self> {
        let mut sections = input.splitn(2, "con_sys\n");
        let header = sections.next()?;
        let mut header_lines = header.lines();
        let space_dim: usize = header_lines
            .next()?
            .strip_prefix("space_dim ")?
            .parse()
            .ok()?;
        let status_word = header_lines.next()?.strip_prefix("status ")?;
        let rest = sections.next()?;
        let mut halves = rest.splitn(2, "gen_sys\n");
        let con_sys = CongruenceSystem::ascii_load(halves.next()?)?;
        let gen_sys = GridGeneratorSystem::ascii_load(halves.next()?)?;
        if con_sys.space_dimension() != space_dim || gen_sys.space_dimension() != space_dim {
            return None;
        }
        Some(Grid {
            space_dim,
            con_sys,
            gen_sys,
            status: Status {
                empty: status_word.contains('E'),
                con_up_to_date: status_word.contains('C'),
                gen_up_to_date: status_word.contains('G'),
                con_minimized: false,
                gen_minimized: false,
            },
        })
    }
}

/// Gcd of two nonnegative-ish rationals as Z-module generators; either may
/// be zero.
pub(crate) fn rational_gcd(a: &Rational, b: &Rational) -> Rational {
    use num::Integer;
    if a.is_zero() {
        return b.abs();
    }
    if b.is_zero() {
        return a.abs();
    }
    let denom = a.denom().lcm(b.denom());
    let aa = (a * Rational::from(denom.clone())).to_integer();
    let bb = (b * Rational::from(denom.clone())).to_integer();
    from_coefficients(aa.gcd(&bb), denom)
}

fn rebuild_congruences(
    reduced: &reduction::ReducedSystem,
    space_dim: usize,
) -> Result<CongruenceSystem> {
    let mut cgs = CongruenceSystem::new(space_dim);
    for d in (1..=space_dim).rev() {
        let Some((row, kind)) = &reduced.rows[d] else {
            continue;
        };
        let (ints, scale) = reduction::integerize(row);
        let mut e = LinearExpr::constant(ints[0].clone());
        for i in 0..space_dim {
            e.set_coefficient(Variable(i), ints[i + 1].clone());
        }
        let cg = match kind {
            reduction::DimKind::Exact => e.congruent_to(0).modulo(0),
            reduction::DimKind::Integral => e.congruent_to(0).modulo(scale),
            reduction::DimKind::Virtual => unreachable!("virtual slots hold no row"),
        };
        cgs.insert(cg)?;
    }
    cgs.system_mut().unset_pending_rows();
    Ok(cgs)
}

fn rebuild_generators(
    reduced: &reduction::ReducedSystem,
    space_dim: usize,
) -> Result<GridGeneratorSystem> {
    let mut gs = GridGeneratorSystem::new(space_dim);
    let (point_row, _) = reduced.rows[0].as_ref().expect("reduced point");
    let (ints, divisor) = reduction::integerize(point_row);
    let mut e = LinearExpr::zero();
    for i in 0..space_dim {
        e.set_coefficient(Variable(i), ints[i + 1].clone());
    }
    gs.insert(GridGenerator::grid_point(e, divisor)?)?;
    for d in 1..=space_dim {
        let Some((row, kind)) = &reduced.rows[d] else {
            continue;
        };
        let (ints, scale) = reduction::integerize(row);
        let mut e = LinearExpr::zero();
        for i in 0..space_dim {
            e.set_coefficient(Variable(i), ints[i + 1].clone());
        }
        match kind {
            reduction::DimKind::Integral => {
                gs.insert(GridGenerator::parameter(e, scale)?)?;
            }
            reduction::DimKind::Exact => {
                gs.insert(GridGenerator::grid_line(e)?)?;
            }
            reduction::DimKind::Virtual => unreachable!("virtual slots hold no row"),
        }
    }
    gs.normalize_divisors();
    gs.system_mut().unset_pending_rows();
    Ok(gs)
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
    fn test_strong_reduction_canonical_form() {
        // S3: {2x = 0 mod 4, 2x + 2y = 0 mod 4} reduces to
        // {x = 0 mod 2, y = 0 mod 2}.
        let mut g = Grid::universe(2).unwrap();
        g.add_congruence(&(x() * 2i32).congruent_to(0).modulo(4)).unwrap();
        g.add_congruence(&(x() * 2i32 + y() * 2i32).congruent_to(0).modulo(4))
            .unwrap();
        let cgs = g.minimized_congruences().unwrap();
        let mut rows: Vec<String> = cgs.iter().map(|cg| format!("{}", cg)).collect();
        rows.sort();
        assert_eq!(rows.len(), 2);
        for cg in cgs.iter() {
            assert_eq!(*cg.modulus(), polyhedra_arith::Coefficient::from(2));
        }
    }

    #[test]
    fn test_empty_detection() {
        let mut g = Grid::universe(1).unwrap();
        g.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        g.add_congruence(&x().congruent_to(1).modulo(2)).unwrap();
        assert!(g.is_empty().unwrap());
    }

    #[test]
    fn test_universe_and_point() {
        let u = Grid::universe(2).unwrap();
        assert!(u.is_universe().unwrap());
        assert!(!u.is_discrete().unwrap());

        let mut p = Grid::universe(2).unwrap();
        p.add_congruence(&x().congruent_to(3).modulo(0)).unwrap();
        p.add_congruence(&y().congruent_to(4).modulo(0)).unwrap();
        assert!(p.is_discrete().unwrap());
        assert!(p.is_bounded().unwrap());
        assert!(u.contains(&p).unwrap());
        assert!(!p.contains(&u).unwrap());
    }

    #[test]
    fn test_contains_lattices() {
        let mut evens = Grid::universe(1).unwrap();
        evens.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        let mut fours = Grid::universe(1).unwrap();
        fours.add_congruence(&x().congruent_to(0).modulo(4)).unwrap();
        assert!(evens.contains(&fours).unwrap());
        assert!(!fours.contains(&evens).unwrap());
        assert!(evens.strictly_contains(&fours).unwrap());
    }

    #[test]
    fn test_relation_with_congruence() {
        let mut evens = Grid::universe(1).unwrap();
        evens.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        assert!(evens
            .relation_with_congruence(&x().congruent_to(0).modulo(2))
            .unwrap()
            .implies(PolyConRelation::is_included()));
        assert!(evens
            .relation_with_congruence(&x().congruent_to(1).modulo(2))
            .unwrap()
            .implies(PolyConRelation::is_disjoint()));
        assert_eq!(
            evens
                .relation_with_congruence(&x().congruent_to(0).modulo(4))
                .unwrap(),
            PolyConRelation::strictly_intersects()
        );
    }

    #[test]
    fn test_generator_round_trip() {
        let mut g = Grid::universe(1).unwrap();
        g.add_congruence(&x().congruent_to(1).modulo(3)).unwrap();
        let gens = g.minimized_grid_generators().unwrap();
        let back = Grid::from_generators(gens).unwrap();
        assert!(back.contains(&g).unwrap());
        assert!(g.contains(&back).unwrap());
    }

    #[test]
    fn test_relation_with_grid_generator() {
        let mut evens = Grid::universe(1).unwrap();
        evens.add_congruence(&x().congruent_to(0).modulo(2)).unwrap();
        let inside = GridGenerator::grid_point(x() * 4, 1).unwrap();
        assert!(evens
            .relation_with_grid_generator(&inside)
            .unwrap()
            .subsumes());
        let outside = GridGenerator::grid_point(x() * 3, 1).unwrap();
        assert!(!evens
            .relation_with_grid_generator(&outside)
            .unwrap()
            .subsumes());
    }

    #[test]
    fn test_ascii_round_trip() {
        let mut g = Grid::universe(1).unwrap();
        g.add_congruence(&x().congruent_to(1).modulo(3)).unwrap();
        g.minimize().unwrap();
        let mut dump = String::new();
        g.ascii_dump(&mut dump);
        let reloaded = Grid::ascii_load(&dump).unwrap();
        assert!(reloaded.contains(&g).unwrap());
        assert!(g.contains(&reloaded).unwrap());
    }
}
