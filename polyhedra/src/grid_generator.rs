use std::fmt;

use num::{Integer, One, Signed, Zero};
use polyhedra_arith::Coefficient;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::linear::{LinearRow, LinearSystem, RowKind, Topology};

/// The three grid generator forms.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GridGeneratorType {
    Line,
    Parameter,
    Point,
}

/// A grid generator over a row: slot 0 holds a point's divisor, the
/// trailing slot a parameter's divisor (points mirror theirs there so a
/// shared-divisor rescale touches one factor per row).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct GridGenerator {
    row: LinearRow,
}

impl GridGenerator {
    pub(crate) fn from_row(row: LinearRow) -> Self {
        GridGenerator { row }
    }

    pub(crate) fn row(&self) -> &LinearRow {
        &self.row
    }

    pub(crate) fn into_row(self) -> LinearRow {
        self.row
    }

    /// A grid line along `e`; the direction must not be zero.
    pub fn grid_line(e: LinearExpr) -> Result<Self> {
        if e.all_homogeneous_terms_are_zero() {
            return Err(Error::invalid_argument(
                "GridGenerator::grid_line",
                "the direction of a line cannot be zero",
            ));
        }
        let dim = e.space_dimension();
        let mut coeffs = vec![Coefficient::zero(); dim + 2];
        for i in 1..=dim {
            coeffs[i] = e.all_coefficients()[i].clone();
        }
        let mut row = LinearRow::from_coeffs(coeffs, RowKind::LineOrEquality, Topology::Closed);
        row.strong_normalize();
        Ok(GridGenerator { row })
    }

    /// The parameter `e / d`: integer multiples of it move between grid
    /// points.
    pub fn parameter(e: LinearExpr, d: impl Into<Coefficient>) -> Result<Self> {
        let d = d.into();
        check_divisor(&d, "GridGenerator::parameter")?;
        let dim = e.space_dimension();
        let mut coeffs = Vec::with_capacity(dim + 2);
        coeffs.push(Coefficient::zero());
        coeffs.extend(e.all_coefficients()[1..].iter().cloned());
        coeffs.push(d);
        Ok(GridGenerator {
            row: LinearRow::from_coeffs(coeffs, RowKind::RayPointOrInequality, Topology::Closed),
        })
    }

    /// The grid point `e / d`.
    pub fn grid_point(e: LinearExpr, d: impl Into<Coefficient>) -> Result<Self> {
        let d = d.into();
        check_divisor(&d, "GridGenerator::grid_point")?;
        let dim = e.space_dimension();
        let mut coeffs = Vec::with_capacity(dim + 2);
        coeffs.push(d.clone());
        coeffs.extend(e.all_coefficients()[1..].iter().cloned());
        coeffs.push(d);
        Ok(GridGenerator {
            row: LinearRow::from_coeffs(coeffs, RowKind::RayPointOrInequality, Topology::Closed),
        })
    }

    /// The origin of the 0-dimensional space.
    pub fn zero_dim_point() -> Self {
        GridGenerator {
            row: LinearRow::from_coeffs(
                vec![Coefficient::one(), Coefficient::one()],
                RowKind::RayPointOrInequality,
                Topology::Closed,
            ),
        }
    }

    pub fn space_dimension(&self) -> usize {
        self.row.size() - 2
    }

    pub fn generator_type(&self) -> GridGeneratorType {
        if self.row.is_line_or_equality() {
            return GridGeneratorType::Line;
        }
        if self.row.coeff(0).is_zero() {
            GridGeneratorType::Parameter
        } else {
            GridGeneratorType::Point
        }
    }

    pub fn is_line(&self) -> bool {
        self.generator_type() == GridGeneratorType::Line
    }

    pub fn is_parameter(&self) -> bool {
        self.generator_type() == GridGeneratorType::Parameter
    }

    pub fn is_point(&self) -> bool {
        self.generator_type() == GridGeneratorType::Point
    }

    /// The divisor of a point or parameter.
    pub fn divisor(&self) -> Result<&Coefficient> {
        match self.generator_type() {
            GridGeneratorType::Point => Ok(self.row.coeff(0)),
            GridGeneratorType::Parameter => Ok(self.row.coeff(self.row.size() - 1)),
            GridGeneratorType::Line => Err(Error::invalid_argument(
                "GridGenerator::divisor",
                "lines have no divisor",
            )),
        }
    }

    pub fn coefficient(&self, v: Variable) -> Coefficient {
        if v.space_dimension() > self.space_dimension() {
            return Coefficient::zero();
        }
        self.row.coeff(v.id() + 1).clone()
    }

    /// Rescales a point or parameter so its divisor becomes `d`, a multiple
    /// of the current one.
    pub(crate) fn scale_to_divisor(&mut self, d: &Coefficient) {
        if self.is_line() {
            return;
        }
        let current = self.divisor().expect("not a line").clone();
        if &current == d {
            return;
        }
        debug_assert!((d % &current).is_zero());
        let factor = d / &current;
        for c in self.row.coeffs_mut() {
            *c *= &factor;
        }
    }
}

fn check_divisor(d: &Coefficient, method: &'static str) -> Result<()> {
    if d.is_zero() {
        return Err(Error::invalid_argument(method, "divisor is zero"));
    }
    if d.is_negative() {
        return Err(Error::invalid_argument(method, "divisor is negative"));
    }
    Ok(())
}

impl fmt::Display for GridGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.generator_type() {
            GridGeneratorType::Line => "grid_line",
            GridGeneratorType::Parameter => "parameter",
            GridGeneratorType::Point => "grid_point",
        };
        write!(f, "{}(", label)?;
        let dim = self.space_dimension();
        for i in 1..=dim {
            if i > 1 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.row.coeff(i))?;
        }
        if let Ok(d) = self.divisor() {
            write!(f, "; {})", d)
        } else {
            write!(f, ")")
        }
    }
}

pub fn grid_line(e: impl Into<LinearExpr>) -> Result<GridGenerator> {
    GridGenerator::grid_line(e.into())
}

pub fn parameter(e: impl Into<LinearExpr>) -> Result<GridGenerator> {
    GridGenerator::parameter(e.into(), 1)
}

pub fn grid_point(e: impl Into<LinearExpr>) -> Result<GridGenerator> {
    GridGenerator::grid_point(e.into(), 1)
}

/// A system of grid generators sharing a space dimension and, once
/// normalized, a common positive divisor.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GridGeneratorSystem {
    sys: LinearSystem,
    space_dim: usize,
}

impl GridGeneratorSystem {
    pub fn new(space_dim: usize) -> Self {
        GridGeneratorSystem {
            sys: LinearSystem::new(space_dim + 2, Topology::Closed),
            space_dim,
        }
    }

    /// The 0-dimensional system holding the single origin point.
    pub fn zero_dim_univ() -> Self {
        let mut gs = GridGeneratorSystem::new(0);
        gs.sys.add_row(GridGenerator::zero_dim_point().into_row());
        gs
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
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

    /// Inserts a grid generator, growing the space dimension as needed.
    pub fn insert(&mut self, g: GridGenerator) -> Result<()> {
        if g.space_dimension() > self.space_dim {
            let n = g.space_dimension() - self.space_dim;
            self.sys.add_zero_columns(n, 1)?;
            self.space_dim += n;
        }
        let mut row = g.into_row();
        row.resize_with_trailing(self.space_dim + 2, 1);
        self.sys.insert_pending_coerced(row, 1);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridGenerator> + '_ {
        self.sys.rows().iter().map(grid_generator_ref)
    }

    /// Rescales every point and parameter to the least common multiple of
    /// their divisors, giving the system one shared divisor.
    pub fn normalize_divisors(&mut self) -> Coefficient {
        let mut lcm = Coefficient::one();
        for g in self.iter() {
            if let Ok(d) = g.divisor() {
                lcm = lcm.lcm(d);
            }
        }
        for row in self.sys.rows_mut() {
            let g = grid_generator_mut(row);
            g.scale_to_divisor(&lcm);
        }
        lcm
    }

    pub(crate) fn system(&self) -> &LinearSystem {
        &self.sys
    }

    pub(crate) fn system_mut(&mut self) -> &mut LinearSystem {
        &mut self.sys
    }

    pub(crate) fn from_system(sys: LinearSystem, space_dim: usize) -> Self {
        GridGeneratorSystem { sys, space_dim }
    }

    pub fn ascii_dump(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "space_dim {}", self.space_dim);
        self.sys.ascii_dump_with(out, |row| {
            match grid_generator_ref(row).generator_type() {
                GridGeneratorType::Line => "L",
                GridGeneratorType::Parameter => "Q",
                GridGeneratorType::Point => "P",
            }
            .to_string()
        });
    }

    pub fn ascii_load(input: &str) -> Option<Self> {
        let mut lines = input.lines();
        let space_dim: usize = lines.next()?.strip_prefix("space_dim ")?.parse().ok()?;
        let sys = LinearSystem::ascii_load_with(&mut lines, |tokens, _topology| {
            let (coeffs, marker) = tokens.split_at(tokens.len().checked_sub(1)?);
            let kind = match marker[0] {
                "L" => RowKind::LineOrEquality,
                "Q" | "P" => RowKind::RayPointOrInequality,
                _ => return None,
            };
            let coeffs: Option<Vec<Coefficient>> = coeffs.iter().map(|t| t.parse().ok()).collect();
            Some(LinearRow::from_coeffs(coeffs?, kind, Topology::Closed))
        })?;
        if sys.row_size() != space_dim + 2 {
            return None;
        }
        Some(GridGeneratorSystem { sys, space_dim })
    }
}

pub(crate) fn grid_generator_ref(row: &LinearRow) -> &GridGenerator {
    // SAFETY: `GridGenerator` is a transparent wrapper around `LinearRow`.
    unsafe { &*(row as *const LinearRow as *const GridGenerator) }
}

pub(crate) fn grid_generator_mut(row: &mut LinearRow) -> &mut GridGenerator {
    // SAFETY: `GridGenerator` is a transparent wrapper around `LinearRow`.
    unsafe { &mut *(row as *mut LinearRow as *mut GridGenerator) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_and_divisors() {
        let x = Variable(0);
        let p = GridGenerator::grid_point(x * 3, 2).unwrap();
        assert!(p.is_point());
        assert_eq!(*p.divisor().unwrap(), Coefficient::from(2));

        let q = GridGenerator::parameter(x * 5, 3).unwrap();
        assert!(q.is_parameter());
        assert_eq!(*q.divisor().unwrap(), Coefficient::from(3));

        let l = grid_line(x).unwrap();
        assert!(l.is_line());
        assert!(l.divisor().is_err());
    }

    #[test]
    fn test_normalize_divisors() {
        let x = Variable(0);
        let mut gs = GridGeneratorSystem::new(1);
        gs.insert(GridGenerator::grid_point(x.into(), 2).unwrap()).unwrap();
        gs.insert(GridGenerator::parameter(x.into(), 3).unwrap()).unwrap();
        let lcm = gs.normalize_divisors();
        assert_eq!(lcm, Coefficient::from(6));
        for g in gs.iter() {
            assert_eq!(*g.divisor().unwrap(), Coefficient::from(6));
        }
    }

    #[test]
    fn test_ascii_round_trip() {
        let x = Variable(0);
        let y = Variable(1);
        let mut gs = GridGeneratorSystem::new(2);
        gs.insert(grid_point(x + y).unwrap()).unwrap();
        gs.insert(parameter(y * 2).unwrap()).unwrap();
        gs.insert(grid_line(x).unwrap()).unwrap();
        let mut dump = String::new();
        gs.ascii_dump(&mut dump);
        let reloaded = GridGeneratorSystem::ascii_load(&dump).unwrap();
        assert_eq!(reloaded, gs);
    }
}
