use std::fmt;

use num::{Signed, Zero};
use polyhedra_arith::Coefficient;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::linear::{LinearRow, LinearSystem, RowKind, Topology};

/// The four generator forms.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GeneratorType {
    Line,
    Ray,
    Point,
    ClosurePoint,
}

/// A generator over a row: slot 0 is the divisor (zero for lines and rays),
/// the epsilon slot of a not-necessarily-closed row distinguishes points
/// (epsilon = divisor) from closure points (epsilon = 0).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Generator {
    row: LinearRow,
}

impl Generator {
    pub(crate) fn from_row(row: LinearRow) -> Self {
        Generator { row }
    }

    pub(crate) fn row(&self) -> &LinearRow {
        &self.row
    }

    pub(crate) fn into_row(self) -> LinearRow {
        self.row
    }

    /// A line along `e`; the expression must not be zero and its
    /// inhomogeneous term is ignored.
    pub fn line(e: LinearExpr) -> Result<Self> {
        if e.all_homogeneous_terms_are_zero() {
            return Err(Error::invalid_argument(
                "Generator::line",
                "the direction of a line cannot be zero",
            ));
        }
        Ok(Self::homogeneous(e, RowKind::LineOrEquality))
    }

    /// A ray along `e`; the expression must not be zero.
    pub fn ray(e: LinearExpr) -> Result<Self> {
        if e.all_homogeneous_terms_are_zero() {
            return Err(Error::invalid_argument(
                "Generator::ray",
                "the direction of a ray cannot be zero",
            ));
        }
        Ok(Self::homogeneous(e, RowKind::RayPointOrInequality))
    }

    fn homogeneous(e: LinearExpr, kind: RowKind) -> Self {
        let dim = e.space_dimension();
        let mut coeffs = vec![Coefficient::zero(); dim + 1];
        for i in 1..=dim {
            coeffs[i] = e.all_coefficients()[i].clone();
        }
        let mut row = LinearRow::from_coeffs(coeffs, kind, Topology::Closed);
        row.strong_normalize();
        Generator { row }
    }

    /// The point `e / d`.
    pub fn point(e: LinearExpr, d: impl Into<Coefficient>) -> Result<Self> {
        Self::pointlike(e, d.into(), Topology::Closed, "Generator::point")
    }

    /// The closure point `e / d` of a not-necessarily-closed set.
    pub fn closure_point(e: LinearExpr, d: impl Into<Coefficient>) -> Result<Self> {
        Self::pointlike(e, d.into(), Topology::NotClosed, "Generator::closure_point")
    }

    fn pointlike(
        e: LinearExpr,
        d: Coefficient,
        topology: Topology,
        method: &'static str,
    ) -> Result<Self> {
        if d.is_zero() {
            return Err(Error::invalid_argument(method, "divisor is zero"));
        }
        if d.is_negative() {
            return Err(Error::invalid_argument(method, "divisor is negative"));
        }
        let dim = e.space_dimension();
        let mut coeffs = Vec::with_capacity(dim + 2);
        coeffs.push(d.clone());
        coeffs.extend(e.all_coefficients()[1..].iter().cloned());
        if topology == Topology::NotClosed {
            // Points sit at epsilon = divisor, closure points at zero. A
            // bare closure point is built here; `point` stays closed and is
            // lifted on insertion.
            coeffs.push(Coefficient::zero());
        }
        let mut row = LinearRow::from_coeffs(coeffs, RowKind::RayPointOrInequality, topology);
        row.strong_normalize();
        Ok(Generator { row })
    }

    /// The origin of the 0-dimensional space.
    pub fn zero_dim_point() -> Self {
        Generator {
            row: LinearRow::from_coeffs(
                vec![Coefficient::from(1)],
                RowKind::RayPointOrInequality,
                Topology::Closed,
            ),
        }
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

    pub fn generator_type(&self) -> GeneratorType {
        if self.row.is_line_or_equality() {
            return GeneratorType::Line;
        }
        if self.row.coeff(0).is_zero() {
            return GeneratorType::Ray;
        }
        if self.row.topology() == Topology::NotClosed
            && self.row.coeff(self.row.size() - 1).is_zero()
        {
            return GeneratorType::ClosurePoint;
        }
        GeneratorType::Point
    }

    pub fn is_point(&self) -> bool {
        self.generator_type() == GeneratorType::Point
    }

    pub fn is_line(&self) -> bool {
        self.generator_type() == GeneratorType::Line
    }

    pub fn is_ray(&self) -> bool {
        self.generator_type() == GeneratorType::Ray
    }

    pub fn is_closure_point(&self) -> bool {
        self.generator_type() == GeneratorType::ClosurePoint
    }

    /// The divisor of a point or closure point.
    pub fn divisor(&self) -> Result<&Coefficient> {
        match self.generator_type() {
            GeneratorType::Point | GeneratorType::ClosurePoint => Ok(self.row.coeff(0)),
            _ => Err(Error::invalid_argument(
                "Generator::divisor",
                "lines and rays have no divisor",
            )),
        }
    }

    pub fn coefficient(&self, v: Variable) -> Coefficient {
        if v.space_dimension() > self.space_dimension() {
            return Coefficient::zero();
        }
        self.row.coeff(v.id() + 1).clone()
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.generator_type() {
            GeneratorType::Line => "line",
            GeneratorType::Ray => "ray",
            GeneratorType::Point => "point",
            GeneratorType::ClosurePoint => "closure_point",
        };
        write!(f, "{}(", label)?;
        let dim = self.space_dimension();
        for i in 1..=dim {
            if i > 1 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.row.coeff(i))?;
        }
        match self.generator_type() {
            GeneratorType::Point | GeneratorType::ClosurePoint => {
                write!(f, "; {})", self.row.coeff(0))
            }
            _ => write!(f, ")"),
        }
    }
}

/// Convenience factories mirroring the builder spelling.
pub fn line(e: impl Into<LinearExpr>) -> Result<Generator> {
    Generator::line(e.into())
}

pub fn ray(e: impl Into<LinearExpr>) -> Result<Generator> {
    Generator::ray(e.into())
}

pub fn point(e: impl Into<LinearExpr>) -> Result<Generator> {
    Generator::point(e.into(), 1)
}

pub fn point_div(e: impl Into<LinearExpr>, d: i64) -> Result<Generator> {
    Generator::point(e.into(), d)
}

pub fn closure_point(e: impl Into<LinearExpr>) -> Result<Generator> {
    Generator::closure_point(e.into(), 1)
}

pub fn closure_point_div(e: impl Into<LinearExpr>, d: i64) -> Result<Generator> {
    Generator::closure_point(e.into(), d)
}

/// A system of generators sharing a space dimension and topology.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSystem {
    sys: LinearSystem,
    space_dim: usize,
}

impl GeneratorSystem {
    pub fn new(space_dim: usize, topology: Topology) -> Self {
        let trailing = usize::from(topology == Topology::NotClosed);
        GeneratorSystem {
            sys: LinearSystem::new(space_dim + 1 + trailing, topology),
            space_dim,
        }
    }

    /// The 0-dimensional system holding the single origin point.
    pub fn zero_dim_univ() -> Self {
        let mut gs = GeneratorSystem::new(0, Topology::Closed);
        gs.sys.add_row(Generator::zero_dim_point().into_row());
        gs
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

    pub fn num_lines(&self) -> usize {
        self.sys.num_lines_or_equalities()
    }

    pub fn has_points(&self) -> bool {
        self.iter().any(|g| g.is_point())
    }

    pub fn has_closure_points(&self) -> bool {
        self.topology() == Topology::NotClosed && self.iter().any(|g| g.is_closure_point())
    }

    fn trailing(&self) -> usize {
        usize::from(self.topology() == Topology::NotClosed)
    }

    /// Inserts a generator, growing the space dimension as needed. Closure
    /// points cannot enter a necessarily closed system.
    pub fn insert(&mut self, g: Generator) -> Result<()> {
        if g.is_closure_point() && self.topology() == Topology::Closed {
            return Err(Error::invalid_argument(
                "GeneratorSystem::insert",
                "closure point in a necessarily closed system",
            ));
        }
        if g.space_dimension() > self.space_dim {
            let n = g.space_dimension() - self.space_dim;
            self.sys.add_zero_columns(n, self.trailing())?;
            self.space_dim += n;
        }
        let is_point = g.is_point();
        let kind = g.row().kind();
        let mut row = g.into_row();
        let row_trailing = usize::from(row.topology() == Topology::NotClosed);
        row.resize_with_trailing(self.space_dim + 1 + row_trailing, row_trailing);
        if row_trailing == 0 && self.topology() == Topology::NotClosed {
            let mut coeffs = row.into_coeffs();
            // Lift a closed point to epsilon = divisor; lines and rays sit
            // at epsilon zero.
            let eps = if is_point {
                coeffs[0].clone()
            } else {
                Coefficient::zero()
            };
            coeffs.push(eps);
            row = LinearRow::from_coeffs(coeffs, kind, Topology::NotClosed);
        } else if row_trailing == 1 && self.topology() == Topology::Closed {
            let mut coeffs = row.into_coeffs();
            coeffs.pop();
            row = LinearRow::from_coeffs(coeffs, kind, Topology::Closed);
        }
        self.sys.insert_pending_coerced(row, self.trailing());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Generator> + '_ {
        self.sys.rows().iter().map(generator_ref)
    }

    /// Drops lines and rays whose homogeneous part vanished, typically
    /// after removing space dimensions.
    pub fn remove_invalid_lines_and_rays(&mut self) {
        let dim = self.space_dim;
        self.sys.retain_rows(|row| {
            if !row.coeff(0).is_zero() {
                return true;
            }
            (1..=dim).any(|i| !row.coeff(i).is_zero())
        });
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
        GeneratorSystem { sys, space_dim }
    }

    pub fn ascii_dump(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "space_dim {}", self.space_dim);
        self.sys.ascii_dump_with(out, |row| {
            match generator_ref(row).generator_type() {
                GeneratorType::Line => "L",
                GeneratorType::Ray => "R",
                GeneratorType::Point => "P",
                GeneratorType::ClosurePoint => "C",
            }
            .to_string()
        });
    }

    pub fn ascii_load(input: &str) -> Option<Self> {
        let mut lines = input.lines();
        let space_dim: usize = lines.next()?.strip_prefix("space_dim ")?.parse().ok()?;
        let sys = LinearSystem::ascii_load_with(&mut lines, |tokens, topology| {
            let (coeffs, marker) = tokens.split_at(tokens.len().checked_sub(1)?);
            let kind = match marker[0] {
                "L" => RowKind::LineOrEquality,
                "R" | "P" | "C" => RowKind::RayPointOrInequality,
                _ => return None,
            };
            let coeffs: Option<Vec<Coefficient>> = coeffs.iter().map(|t| t.parse().ok()).collect();
            Some(LinearRow::from_coeffs(coeffs?, kind, topology))
        })?;
        let trailing = usize::from(sys.topology() == Topology::NotClosed);
        if sys.row_size() != space_dim + 1 + trailing {
            return None;
        }
        Some(GeneratorSystem { sys, space_dim })
    }
}

pub(crate) fn generator_ref(row: &LinearRow) -> &Generator {
    // SAFETY: `Generator` is a transparent wrapper around `LinearRow`.
    unsafe { &*(row as *const LinearRow as *const Generator) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_normalization() {
        let x = Variable(0);
        let y = Variable(1);
        let p = Generator::point(x * 2 + y * 4, 2).unwrap();
        // (2, 4)/2 normalizes to (1, 2)/1.
        assert_eq!(*p.divisor().unwrap(), Coefficient::from(1));
        assert_eq!(p.coefficient(x), Coefficient::from(1));
        assert_eq!(p.coefficient(y), Coefficient::from(2));
        assert!(p.is_point());
    }

    #[test]
    fn test_zero_ray_rejected() {
        assert!(Generator::ray(LinearExpr::constant(3)).is_err());
        assert!(Generator::line(LinearExpr::zero()).is_err());
    }

    #[test]
    fn test_zero_divisor_rejected() {
        assert!(Generator::point(LinearExpr::from_variable(Variable(0)), 0).is_err());
    }

    #[test]
    fn test_nnc_insert_lifts_points() {
        let mut gs = GeneratorSystem::new(1, Topology::NotClosed);
        gs.insert(point(Variable(0) * 3).unwrap()).unwrap();
        gs.insert(closure_point(Variable(0) * 5).unwrap()).unwrap();
        let gens: Vec<_> = gs.iter().map(|g| g.generator_type()).collect();
        assert_eq!(gens, vec![GeneratorType::Point, GeneratorType::ClosurePoint]);
    }

    #[test]
    fn test_closure_point_rejected_by_closed_system() {
        let mut gs = GeneratorSystem::new(1, Topology::Closed);
        assert!(gs.insert(closure_point(Variable(0) * 5).unwrap()).is_err());
    }

    #[test]
    fn test_ascii_round_trip() {
        let mut gs = GeneratorSystem::new(2, Topology::Closed);
        gs.insert(point(Variable(0) + Variable(1) * 2).unwrap())
            .unwrap();
        gs.insert(ray(Variable(1)).unwrap()).unwrap();
        gs.insert(line(Variable(0)).unwrap()).unwrap();
        let mut dump = String::new();
        gs.ascii_dump(&mut dump);
        let reloaded = GeneratorSystem::ascii_load(&dump).unwrap();
        assert_eq!(reloaded, gs);
    }
}
