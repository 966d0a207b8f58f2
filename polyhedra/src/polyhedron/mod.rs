mod chdims;
mod coerce;
pub(crate) mod conversion;
pub(crate) mod minimize;
mod ops;
mod widening;

use std::borrow::Cow;

use num::{Signed, Zero};
use polyhedra_arith::Coefficient;
use serde::{Deserialize, Serialize};

use crate::bit_matrix::BitMatrix;
use crate::congruence::Congruence;
use crate::constraint::{Constraint, ConstraintSystem, ConstraintType};
use crate::error::{check_same_dimension, check_space_dimension, Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::generator::{Generator, GeneratorSystem, GeneratorType};
use crate::linear::{reduced_scalar_product, scalar_product, LinearRow, Topology};
use crate::relation::{PolyConRelation, PolyGenRelation};

pub use coerce::bounds_on_expr;

/// Representation state flags. When both sides are minimized the systems
/// are canonical, mutually consistent, and the saturation matrices relate
/// them.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
struct Status {
    empty: bool,
    con_up_to_date: bool,
    gen_up_to_date: bool,
    con_minimized: bool,
    gen_minimized: bool,
    sat_c_up_to_date: bool,
    sat_g_up_to_date: bool,
}

/// A convex polyhedron in dual representation: a constraint system, a
/// generator system, and the saturation matrices coupling them, refreshed
/// lazily by the double-description conversion.
///
/// The constraint side internally carries the implicit rows of its
/// topology (positivity for closed polyhedra, the epsilon bounds for NNC
/// ones); public iteration filters them out.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Polyhedron {
    topology: Topology,
    space_dim: usize,
    con_sys: ConstraintSystem,
    gen_sys: GeneratorSystem,
    sat_c: BitMatrix,
    sat_g: BitMatrix,
    status: Status,
}

impl Polyhedron {
    /// The full space of the given dimension.
    pub fn universe(space_dim: usize, topology: Topology) -> Result<Self> {
        check_space_dimension("Polyhedron::universe", space_dim)?;
        let mut con_sys = ConstraintSystem::new(space_dim, topology);
        push_implicit_rows(&mut con_sys, space_dim, topology);
        con_sys.system_mut().unset_pending_rows();
        Ok(Polyhedron {
            topology,
            space_dim,
            con_sys,
            gen_sys: GeneratorSystem::new(space_dim, topology),
            sat_c: BitMatrix::default(),
            sat_g: BitMatrix::default(),
            status: Status {
                con_up_to_date: true,
                ..Status::default()
            },
        })
    }

    /// The empty set of the given dimension.
    pub fn empty(space_dim: usize, topology: Topology) -> Result<Self> {
        check_space_dimension("Polyhedron::empty", space_dim)?;
        let mut ph = Polyhedron::universe(space_dim, topology)?;
        ph.set_empty();
        Ok(ph)
    }

    /// Builds from a constraint system; the topology follows the system.
    pub fn from_constraints(cs: ConstraintSystem) -> Result<Self> {
        let mut ph = Polyhedron::universe(cs.space_dimension(), cs.topology())?;
        ph.add_constraints(&cs)?;
        Ok(ph)
    }

    /// Builds from a generator system, which must contain a point unless it
    /// is empty.
    pub fn from_generators(gs: GeneratorSystem) -> Result<Self> {
        let space_dim = gs.space_dimension();
        let topology = gs.topology();
        check_space_dimension("Polyhedron::from_generators", space_dim)?;
        if gs.num_rows() == 0 {
            return Polyhedron::empty(space_dim, topology);
        }
        if !gs.has_points() {
            return Err(Error::invalid_argument(
                "Polyhedron::from_generators",
                "generator system without a point",
            ));
        }
        let mut gen_sys = gs;
        gen_sys.system_mut().unset_pending_rows();
        Ok(Polyhedron {
            topology,
            space_dim,
            con_sys: ConstraintSystem::new(space_dim, topology),
            gen_sys,
            sat_c: BitMatrix::default(),
            sat_g: BitMatrix::default(),
            status: Status {
                gen_up_to_date: true,
                ..Status::default()
            },
        })
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub(crate) fn set_empty(&mut self) {
        self.con_sys = ConstraintSystem::new(self.space_dim, self.topology);
        self.gen_sys = GeneratorSystem::new(self.space_dim, self.topology);
        self.sat_c = BitMatrix::default();
        self.sat_g = BitMatrix::default();
        self.status = Status {
            empty: true,
            ..Status::default()
        };
    }

    fn is_minimized_form(&self) -> bool {
        self.status.empty
            || (self.status.con_minimized
                && self.status.gen_minimized
                && self.con_sys.system().num_pending_rows() == 0
                && self.gen_sys.system().num_pending_rows() == 0)
    }

    /// A minimized view of `self`: borrowed when already canonical, an
    /// owned minimized copy otherwise. Immutable queries use this so they
    /// never mutate the receiver.
    pub(crate) fn minimized_view(&self) -> Result<Cow<'_, Polyhedron>> {
        if self.is_minimized_form() {
            Ok(Cow::Borrowed(self))
        } else {
            let mut copy = self.clone();
            copy.minimize()?;
            Ok(Cow::Owned(copy))
        }
    }

    /// Brings both representations to canonical form, rebuilding the stale
    /// side by conversion and pruning the other with the saturation
    /// matrix. Returns whether the polyhedron is nonempty.
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
            self.con_sys.system_mut().sort_rows();
            let mut dest = conversion::universe_dual(self.con_sys.system());
            let mut sat = BitMatrix::new(dest.num_rows(), 0);
            let ok = conversion::conversion(self.con_sys.system(), 0, &mut dest, &mut sat)?;
            let gens = GeneratorSystem::from_system(dest, self.space_dim);
            if !ok || !gens.has_points() {
                log::debug!("minimize: constraint system is unsatisfiable");
                self.set_empty();
                return Ok(false);
            }
            self.gen_sys = gens;
            let mut sat_g = sat.transpose();
            minimize::simplify(self.con_sys.system_mut(), &mut sat_g);
            let mut sat_c = sat_g.transpose();
            minimize::sort_with_sat(self.gen_sys.system_mut(), &mut sat_c);
            self.sat_g = sat_c.transpose();
            self.sat_c = sat_c;
        } else {
            debug_assert!(self.status.gen_up_to_date);
            self.gen_sys.system_mut().unset_pending_rows();
            self.gen_sys.system_mut().sort_rows();
            let mut dest = conversion::universe_dual(self.gen_sys.system());
            let mut sat = BitMatrix::new(dest.num_rows(), 0);
            let ok = conversion::conversion(self.gen_sys.system(), 0, &mut dest, &mut sat)?;
            if !ok {
                // A generator system with a point always spans a nonempty
                // set; a collapse here is an internal inconsistency.
                return Err(Error::RuntimeError {
                    method: "Polyhedron::minimize",
                });
            }
            self.con_sys = ConstraintSystem::from_system(dest, self.space_dim);
            let mut sat_c = sat.transpose();
            minimize::simplify(self.gen_sys.system_mut(), &mut sat_c);
            let mut sat_g = sat_c.transpose();
            minimize::sort_with_sat(self.con_sys.system_mut(), &mut sat_g);
            self.sat_c = sat_g.transpose();
            self.sat_g = sat_g;
        }
        self.status = Status {
            empty: false,
            con_up_to_date: true,
            gen_up_to_date: true,
            con_minimized: true,
            gen_minimized: true,
            sat_c_up_to_date: true,
            sat_g_up_to_date: true,
        };
        Ok(true)
    }

    /// The constraint side, rebuilt on a copy when stale. Empty polyhedra
    /// report the single unsatisfiable constraint.
    pub(crate) fn updated_constraints(&self) -> Result<Cow<'_, ConstraintSystem>> {
        if self.status.empty {
            let mut cs = ConstraintSystem::new(self.space_dim, self.topology);
            let _ = cs.insert(Constraint::zero_dim_false());
            return Ok(Cow::Owned(cs));
        }
        if self.status.con_up_to_date {
            return Ok(Cow::Borrowed(&self.con_sys));
        }
        let view = self.minimized_view()?;
        match view {
            Cow::Borrowed(ph) => Ok(Cow::Borrowed(&ph.con_sys)),
            Cow::Owned(ph) => {
                if ph.status.empty {
                    let mut cs = ConstraintSystem::new(self.space_dim, self.topology);
                    let _ = cs.insert(Constraint::zero_dim_false());
                    Ok(Cow::Owned(cs))
                } else {
                    Ok(Cow::Owned(ph.con_sys))
                }
            }
        }
    }

    /// The generator side, rebuilt on a copy when stale. `None` when the
    /// polyhedron is empty.
    pub(crate) fn updated_generators(&self) -> Result<Option<Cow<'_, GeneratorSystem>>> {
        if self.status.empty {
            return Ok(None);
        }
        if self.status.gen_up_to_date && self.gen_sys.system().num_pending_rows() == 0 {
            return Ok(Some(Cow::Borrowed(&self.gen_sys)));
        }
        let view = self.minimized_view()?;
        match view {
            Cow::Borrowed(ph) => Ok(Some(Cow::Borrowed(&ph.gen_sys))),
            Cow::Owned(ph) => {
                if ph.status.empty {
                    Ok(None)
                } else {
                    Ok(Some(Cow::Owned(ph.gen_sys)))
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
        let view = self.minimized_view()?;
        if view.status.empty {
            return Ok(false);
        }
        let result = view.con_sys.iter().all(is_implicit_row);
        Ok(result)
    }

    /// The publicly visible constraints: the internal system minus its
    /// implicit topology rows.
    pub fn constraints(&self) -> Result<ConstraintSystem> {
        let cs = self.updated_constraints()?;
        let mut out = ConstraintSystem::new(self.space_dim, self.topology);
        for c in cs.iter() {
            if !is_implicit_row(c) {
                out.insert(c.clone())?;
            }
        }
        Ok(out)
    }

    /// The canonical constraint system, latching minimal form first.
    pub fn minimized_constraints(&mut self) -> Result<ConstraintSystem> {
        self.minimize()?;
        self.constraints()
    }

    /// The publicly visible generators. For NNC polyhedra this is the
    /// strongly minimized view: a closure point sitting exactly on a
    /// point is redundant and filtered out.
    pub fn generators(&self) -> Result<GeneratorSystem> {
        match self.updated_generators()? {
            None => Ok(GeneratorSystem::new(self.space_dim, self.topology)),
            Some(gs) => {
                if self.topology == Topology::Closed {
                    return Ok(gs.into_owned());
                }
                let mut out = GeneratorSystem::new(self.space_dim, self.topology);
                for g in gs.iter() {
                    if g.is_closure_point()
                        && gs.iter().any(|p| p.is_point() && same_location(g, p))
                    {
                        continue;
                    }
                    out.insert(g.clone())?;
                }
                Ok(out)
            }
        }
    }

    /// The canonical generator system, latching minimal form first.
    pub fn minimized_generators(&mut self) -> Result<GeneratorSystem> {
        self.minimize()?;
        self.generators()
    }

    /// Adds one constraint to the pending part; the generator side goes
    /// stale.
    pub fn add_constraint(&mut self, c: &Constraint) -> Result<()> {
        if c.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::add_constraint",
                self.space_dim,
                c.space_dimension(),
            ));
        }
        if c.is_strict_inequality() && self.topology == Topology::Closed {
            return Err(Error::invalid_argument(
                "Polyhedron::add_constraint",
                "strict inequality in a necessarily closed polyhedron",
            ));
        }
        if self.status.empty {
            return Ok(());
        }
        if c.is_tautological() {
            return Ok(());
        }
        if c.is_inconsistent() {
            self.set_empty();
            return Ok(());
        }
        if !self.status.con_up_to_date {
            // Materialize the constraint side once so the insertion has a
            // base to be pending against.
            let cs = self.updated_constraints()?.into_owned();
            self.con_sys = cs;
            self.status.con_up_to_date = true;
        }
        self.con_sys.insert(c.clone())?;
        self.status.gen_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        self.status.sat_c_up_to_date = false;
        self.status.sat_g_up_to_date = false;
        Ok(())
    }

    /// Batch insertion. Every precondition is checked before the first
    /// row lands, so a failure leaves the polyhedron untouched.
    pub fn add_constraints(&mut self, cs: &ConstraintSystem) -> Result<()> {
        if cs.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::add_constraints",
                self.space_dim,
                cs.space_dimension(),
            ));
        }
        if self.topology == Topology::Closed && cs.has_strict_inequalities() {
            return Err(Error::invalid_argument(
                "Polyhedron::add_constraints",
                "strict inequality in a necessarily closed polyhedron",
            ));
        }
        for c in cs.iter() {
            self.add_constraint(c)?;
        }
        Ok(())
    }

    /// Adds one generator; an empty polyhedron only accepts a point.
    pub fn add_generator(&mut self, g: &Generator) -> Result<()> {
        if g.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::add_generator",
                self.space_dim,
                g.space_dimension(),
            ));
        }
        if g.is_closure_point() && self.topology == Topology::Closed {
            return Err(Error::invalid_argument(
                "Polyhedron::add_generator",
                "closure point in a necessarily closed polyhedron",
            ));
        }
        if self.status.empty {
            if !g.is_point() {
                return Err(Error::invalid_argument(
                    "Polyhedron::add_generator",
                    "a generator for an empty polyhedron must be a point",
                ));
            }
            let mut gs = GeneratorSystem::new(self.space_dim, self.topology);
            gs.insert(g.clone())?;
            gs.system_mut().unset_pending_rows();
            self.gen_sys = gs;
            self.con_sys = ConstraintSystem::new(self.space_dim, self.topology);
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
                    return self.add_generator(g);
                }
            };
            self.gen_sys = gs;
            self.status.gen_up_to_date = true;
        }
        self.gen_sys.insert(g.clone())?;
        self.status.con_up_to_date = false;
        self.status.con_minimized = false;
        self.status.gen_minimized = false;
        self.status.sat_c_up_to_date = false;
        self.status.sat_g_up_to_date = false;
        Ok(())
    }

    /// Batch insertion, checked up front so a failure leaves the
    /// polyhedron untouched. An empty target takes a point first.
    pub fn add_generators(&mut self, gs: &GeneratorSystem) -> Result<()> {
        if gs.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::add_generators",
                self.space_dim,
                gs.space_dimension(),
            ));
        }
        if self.topology == Topology::Closed && gs.has_closure_points() {
            return Err(Error::invalid_argument(
                "Polyhedron::add_generators",
                "closure point in a necessarily closed polyhedron",
            ));
        }
        let mut iter: Vec<&Generator> = gs.iter().collect();
        if self.status.empty {
            match iter.iter().position(|g| g.is_point()) {
                Some(pos) => iter.swap(0, pos),
                None => {
                    if !iter.is_empty() {
                        return Err(Error::invalid_argument(
                            "Polyhedron::add_generators",
                            "generators for an empty polyhedron need a point",
                        ));
                    }
                }
            }
        }
        for g in iter {
            self.add_generator(g)?;
        }
        Ok(())
    }

    /// Containment: every generator of `other` satisfies every constraint
    /// of `self`.
    pub fn contains(&self, other: &Polyhedron) -> Result<bool> {
        check_same_dimension("Polyhedron::contains", self.space_dim, other.space_dim)?;
        if other.is_empty()? {
            return Ok(true);
        }
        if self.is_empty()? {
            return Ok(false);
        }
        let cs = self.updated_constraints()?;
        let gens = other
            .updated_generators()?
            .expect("nonempty checked above");
        for c in cs.iter() {
            for g in gens.iter() {
                if !generator_satisfies(g, c) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn strictly_contains(&self, other: &Polyhedron) -> Result<bool> {
        Ok(self.contains(other)? && !other.contains(self)?)
    }

    pub fn is_disjoint_from(&self, other: &Polyhedron) -> Result<bool> {
        check_same_dimension(
            "Polyhedron::is_disjoint_from",
            self.space_dim,
            other.space_dim,
        )?;
        let mut meet = self.clone();
        meet.intersection_assign(other)?;
        meet.is_empty()
    }

    /// Classifies every generator by the sign
    /// of its product with the constraint.
    pub fn relation_with_constraint(&self, c: &Constraint) -> Result<PolyConRelation> {
        if c.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::relation_with_constraint",
                self.space_dim,
                c.space_dimension(),
            ));
        }
        if self.is_empty()? {
            return Ok(PolyConRelation::saturates()
                | PolyConRelation::is_included()
                | PolyConRelation::is_disjoint());
        }
        let gens = self.updated_generators()?.expect("nonempty");
        let mut all_saturate = true;
        let mut all_satisfy = true;
        let mut all_outside = true;
        for g in gens.iter() {
            let sp = product_sign(g, c);
            match g.generator_type() {
                GeneratorType::Line => {
                    if sp != 0 {
                        return Ok(PolyConRelation::strictly_intersects());
                    }
                }
                GeneratorType::Ray => {
                    if sp != 0 {
                        all_saturate = false;
                        if c.is_equality() {
                            // Whether the ray escapes the hyperplane on the
                            // occupied side is a sign-mix question settled
                            // below.
                            all_satisfy = false;
                        } else if sp > 0 {
                            all_outside = false;
                        } else {
                            all_satisfy = false;
                        }
                    }
                }
                GeneratorType::Point => {
                    if sp != 0 {
                        all_saturate = false;
                    }
                    match c.constraint_type() {
                        ConstraintType::Equality => {
                            if sp != 0 {
                                all_satisfy = false;
                            }
                            if sp == 0 {
                                all_outside = false;
                            }
                        }
                        ConstraintType::NonstrictInequality => {
                            if sp < 0 {
                                all_satisfy = false;
                            }
                            if sp >= 0 {
                                all_outside = false;
                            }
                        }
                        ConstraintType::StrictInequality => {
                            if sp <= 0 {
                                all_satisfy = false;
                            }
                            if sp > 0 {
                                all_outside = false;
                            }
                        }
                    }
                }
                GeneratorType::ClosurePoint => {
                    if sp != 0 {
                        all_saturate = false;
                    }
                    match c.constraint_type() {
                        ConstraintType::Equality => {
                            if sp != 0 {
                                all_satisfy = false;
                            }
                        }
                        ConstraintType::NonstrictInequality | ConstraintType::StrictInequality => {
                            if sp < 0 {
                                all_satisfy = false;
                            }
                            if sp > 0 {
                                all_outside = false;
                            }
                        }
                    }
                }
            }
        }
        // For equalities "outside" means one strict side; a sign mix was
        // already reported above through the point analysis.
        Ok(if all_saturate {
            match c.constraint_type() {
                ConstraintType::StrictInequality => {
                    PolyConRelation::saturates() | PolyConRelation::is_disjoint()
                }
                _ => PolyConRelation::saturates() | PolyConRelation::is_included(),
            }
        } else if c.is_equality() {
            // Points off the hyperplane: either all on one side or mixed.
            if all_outside && self.points_one_side(&gens, c) {
                PolyConRelation::is_disjoint()
            } else if all_satisfy {
                PolyConRelation::is_included()
            } else {
                PolyConRelation::strictly_intersects()
            }
        } else if all_satisfy {
            PolyConRelation::is_included()
        } else if all_outside {
            PolyConRelation::is_disjoint()
        } else {
            PolyConRelation::strictly_intersects()
        })
    }

    fn points_one_side(&self, gens: &GeneratorSystem, c: &Constraint) -> bool {
        let mut saw_pos = false;
        let mut saw_neg = false;
        for g in gens.iter() {
            let sp = product_sign(g, c);
            match g.generator_type() {
                GeneratorType::Line => {
                    if sp != 0 {
                        return false;
                    }
                }
                _ => {
                    if sp > 0 {
                        saw_pos = true;
                    }
                    if sp < 0 {
                        saw_neg = true;
                    }
                }
            }
        }
        !(saw_pos && saw_neg)
    }

    pub fn relation_with_generator(&self, g: &Generator) -> Result<PolyGenRelation> {
        if g.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::relation_with_generator",
                self.space_dim,
                g.space_dimension(),
            ));
        }
        if self.is_empty()? {
            return Ok(PolyGenRelation::Nothing);
        }
        let cs = self.updated_constraints()?;
        let subsumes = cs.iter().all(|c| generator_satisfies(g, c));
        Ok(if subsumes {
            PolyGenRelation::Subsumes
        } else {
            PolyGenRelation::Nothing
        })
    }

    pub fn relation_with_congruence(&self, cg: &Congruence) -> Result<PolyConRelation> {
        if cg.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::relation_with_congruence",
                self.space_dim,
                cg.space_dimension(),
            ));
        }
        if cg.is_equality() {
            return self.relation_with_constraint(&cg.linear_expr().eq(0));
        }
        if self.is_empty()? {
            return Ok(PolyConRelation::saturates()
                | PolyConRelation::is_included()
                | PolyConRelation::is_disjoint());
        }
        // A proper congruence relates through the range of its expression.
        let e = cg.linear_expr();
        let (lower, upper) = bounds_on_expr(self, &e)?;
        match (lower, upper) {
            (Some(lo), Some(hi)) if lo == hi => {
                let m = polyhedra_arith::Rational::from(cg.modulus().clone());
                if (lo.clone() / &m).is_integer() {
                    Ok(if lo.is_zero() {
                        PolyConRelation::is_included() | PolyConRelation::saturates()
                    } else {
                        PolyConRelation::is_included()
                    })
                } else {
                    Ok(PolyConRelation::is_disjoint())
                }
            }
            (Some(lo), Some(hi)) => {
                let m = polyhedra_arith::Rational::from(cg.modulus().clone());
                let has_multiple = (lo / &m).ceil() <= (hi / &m).floor();
                Ok(if has_multiple {
                    PolyConRelation::strictly_intersects()
                } else {
                    PolyConRelation::is_disjoint()
                })
            }
            _ => Ok(PolyConRelation::strictly_intersects()),
        }
    }

    pub fn is_topologically_closed(&self) -> Result<bool> {
        if self.topology == Topology::Closed || self.is_empty()? {
            return Ok(true);
        }
        let cs = self.updated_constraints()?;
        let result = !cs
            .iter()
            .any(|c| c.is_strict_inequality() && !is_epsilon_bound(c));
        Ok(result)
    }

    /// Replaces the set by its topological closure.
    pub fn topological_closure_assign(&mut self) -> Result<()> {
        if self.topology == Topology::Closed || self.status.empty {
            return Ok(());
        }
        let cs = self.updated_constraints()?.into_owned();
        let mut closed = ConstraintSystem::new(self.space_dim, self.topology);
        for c in cs.iter() {
            if is_epsilon_bound(c) {
                closed.insert(c.clone())?;
            } else {
                closed.insert(c.to_nonstrict())?;
            }
        }
        closed.system_mut().unset_pending_rows();
        self.con_sys = closed;
        self.status = Status {
            con_up_to_date: true,
            ..Status::default()
        };
        Ok(())
    }

    pub fn is_bounded(&self) -> Result<bool> {
        match self.updated_generators()? {
            None => Ok(true),
            Some(gens) => Ok(gens.iter().all(|g| {
                matches!(
                    g.generator_type(),
                    GeneratorType::Point | GeneratorType::ClosurePoint
                )
            })),
        }
    }

    /// A single point, up to topological closure.
    pub fn is_discrete(&self) -> Result<bool> {
        match self.updated_generators()? {
            None => Ok(true),
            Some(gens) => {
                let mut points = 0usize;
                for g in gens.iter() {
                    match g.generator_type() {
                        GeneratorType::Line | GeneratorType::Ray => return Ok(false),
                        GeneratorType::Point | GeneratorType::ClosurePoint => points += 1,
                    }
                }
                Ok(points <= 1)
            }
        }
    }

    /// Whether `var`'s value is restricted at all.
    pub fn constrains(&self, var: Variable) -> Result<bool> {
        if var.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "Polyhedron::constrains",
                self.space_dim,
                var.space_dimension(),
            ));
        }
        if self.is_empty()? {
            return Ok(true);
        }
        let cs = self.updated_constraints()?;
        let result = cs
            .iter()
            .any(|c| !is_implicit_row(c) && !c.coefficient(var).is_zero());
        Ok(result)
    }

    pub fn ascii_dump(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "space_dim {}", self.space_dim);
        let s = &self.status;
        let _ = writeln!(
            out,
            "status {}{}{}{}{}{}{}",
            flag(s.empty, "E"),
            flag(s.con_up_to_date, "C"),
            flag(s.gen_up_to_date, "G"),
            flag(s.con_minimized, "c"),
            flag(s.gen_minimized, "g"),
            flag(s.sat_c_up_to_date, "S"),
            flag(s.sat_g_up_to_date, "s"),
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
        let status = Status {
            empty: status_word.contains('E'),
            con_up_to_date: status_word.contains('C'),
            gen_up_to_date: status_word.contains('G'),
            con_minimized: status_word.contains('c'),
            gen_minimized: status_word.contains('g'),
            sat_c_up_to_date: status_word.contains('S'),
            sat_g_up_to_date: status_word.contains('s'),
        };
        let rest = sections.next()?;
        let mut halves = rest.splitn(2, "gen_sys\n");
        let con_text = halves.next()?;
        let gen_text = halves.next()?;
        let con_sys = ConstraintSystem::ascii_load(con_text)?;
        let gen_sys = GeneratorSystem::ascii_load(gen_text)?;
        if con_sys.space_dimension() != space_dim || gen_sys.space_dimension() != space_dim {
            return None;
        }
        let topology = con_sys.topology();
        let mut ph = Polyhedron {
            topology,
            space_dim,
            con_sys,
            gen_sys,
            sat_c: BitMatrix::default(),
            sat_g: BitMatrix::default(),
            status,
        };
        // Saturation matrices are not dumped; drop the claim to them.
        ph.status.sat_c_up_to_date = false;
        ph.status.sat_g_up_to_date = false;
        ph.status.con_minimized = false;
        ph.status.gen_minimized = false;
        Some(ph)
    }
}

fn flag(b: bool, c: &str) -> &str {
    if b {
        c
    } else {
        ""
    }
}

/// The implicit rows a topology carries: positivity, and the epsilon
/// bounds of NNC systems.
fn push_implicit_rows(cs: &mut ConstraintSystem, space_dim: usize, topology: Topology) {
    match topology {
        Topology::Closed => {
            let _ = cs.insert(Constraint::zero_dim_positivity());
        }
        Topology::NotClosed => {
            let _ = cs.insert(Constraint::epsilon_geq_zero(space_dim));
            let _ = cs.insert(Constraint::epsilon_leq_one(space_dim));
        }
    }
}

/// Rows that only express the topology's bookkeeping, filtered from
/// public views: tautologies (positivity among them) and the epsilon
/// bounds.
fn is_implicit_row(c: &Constraint) -> bool {
    c.is_tautological() || is_epsilon_bound(c)
}

/// An epsilon bound has no homogeneous coefficients besides its epsilon
/// slot.
fn is_epsilon_bound(c: &Constraint) -> bool {
    if c.topology() != Topology::NotClosed {
        return false;
    }
    let row = c.row();
    let eps = row.coeff(row.size() - 1);
    if eps.is_zero() {
        return false;
    }
    (1..row.size() - 1).all(|i| row.coeff(i).is_zero())
}

/// Sign of the topology-adjusted product between a generator and a
/// constraint: the reduced product when either row carries an epsilon
/// slot.
pub(crate) fn product_sign(g: &Generator, c: &Constraint) -> i32 {
    let sp = adjusted_product(g.row(), c.row());
    if sp.is_zero() {
        0
    } else if sp.is_positive() {
        1
    } else {
        -1
    }
}

fn adjusted_product(g: &LinearRow, c: &LinearRow) -> Coefficient {
    let g_nnc = g.topology() == Topology::NotClosed;
    let c_nnc = c.topology() == Topology::NotClosed;
    match (g_nnc, c_nnc) {
        (false, false) => scalar_product(g, c),
        (true, true) => reduced_scalar_product(g, c),
        (true, false) => {
            // Drop the generator's epsilon slot.
            let len = c.size().min(g.size() - 1);
            let mut acc = Coefficient::zero();
            for i in 0..len {
                acc += g.coeff(i) * c.coeff(i);
            }
            acc
        }
        (false, true) => {
            let len = g.size().min(c.size() - 1);
            let mut acc = Coefficient::zero();
            for i in 0..len {
                acc += g.coeff(i) * c.coeff(i);
            }
            acc
        }
    }
}

/// Whether two pointlike generators denote the same coordinates, compared
/// by cross-multiplying their divisors.
fn same_location(a: &Generator, b: &Generator) -> bool {
    let (Ok(da), Ok(db)) = (a.divisor(), b.divisor()) else {
        return false;
    };
    let dim = a.space_dimension().max(b.space_dimension());
    (0..dim).all(|i| {
        a.coefficient(Variable(i)) * db == b.coefficient(Variable(i)) * da
    })
}

/// Whether adding `g` to a set satisfying `c` keeps `c` satisfied.
pub(crate) fn generator_satisfies(g: &Generator, c: &Constraint) -> bool {
    let sp = product_sign(g, c);
    match g.generator_type() {
        GeneratorType::Line => sp == 0,
        GeneratorType::Ray => match c.constraint_type() {
            ConstraintType::Equality => sp == 0,
            _ => sp >= 0,
        },
        GeneratorType::Point => match c.constraint_type() {
            ConstraintType::Equality => sp == 0,
            ConstraintType::NonstrictInequality => sp >= 0,
            ConstraintType::StrictInequality => sp > 0,
        },
        GeneratorType::ClosurePoint => match c.constraint_type() {
            ConstraintType::Equality => sp == 0,
            _ => sp >= 0,
        },
    }
}
