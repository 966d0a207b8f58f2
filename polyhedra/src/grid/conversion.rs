//! Conversion between the two grid representations: the reduced system is
//! completed to a square matrix over the homogeneous coordinates, inverted
//! exactly, and the dual rows are read off the transpose under the kind
//! duality (parameter <-> proper congruence, line <-> virtual slot,
//! virtual generator <-> equality, point <-> integrality).

use num::{One, Signed, Zero};
use polyhedra_arith::{Coefficient, Rational};

use crate::congruence::CongruenceSystem;
use crate::error::{Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::grid::reduction::{integerize, DimKind, ReducedSystem};
use crate::grid_generator::{GridGenerator, GridGeneratorSystem};

/// Completes the reduced system to its square homogeneous matrix, filling
/// virtual dimensions with identity rows.
fn completed_matrix(reduced: &ReducedSystem) -> Vec<Vec<Rational>> {
    let size = reduced.rows.len();
    (0..size)
        .map(|d| match &reduced.rows[d] {
            Some((row, _)) => row.clone(),
            None => {
                let mut e = vec![Rational::zero(); size];
                e[d] = Rational::one();
                e
            }
        })
        .collect()
}

/// Exact Gauss-Jordan inverse; the completed matrix is always invertible
/// because each row owns its pivot dimension.
fn invert(mut m: Vec<Vec<Rational>>) -> Result<Vec<Vec<Rational>>> {
    let n = m.len();
    let mut inv: Vec<Vec<Rational>> = (0..n)
        .map(|i| {
            let mut row = vec![Rational::zero(); n];
            row[i] = Rational::one();
            row
        })
        .collect();
    for col in 0..n {
        let pivot = (col..n).find(|&r| !m[r][col].is_zero()).ok_or(Error::RuntimeError {
            method: "Grid::conversion",
        })?;
        m.swap(col, pivot);
        inv.swap(col, pivot);
        let p = m[col][col].clone();
        for c in m[col].iter_mut() {
            *c /= &p;
        }
        for c in inv[col].iter_mut() {
            *c /= &p;
        }
        for r in 0..n {
            if r == col || m[r][col].is_zero() {
                continue;
            }
            let factor = m[r][col].clone();
            for j in 0..n {
                let delta = &factor * &m[col][j];
                m[r][j] -= delta;
                let delta = &factor * &inv[col][j];
                inv[r][j] -= delta;
            }
        }
    }
    Ok(inv)
}

/// Reads column `d` of the inverse.
fn column(inv: &[Vec<Rational>], d: usize) -> Vec<Rational> {
    inv.iter().map(|row| row[d].clone()).collect()
}

/// Turns a reduced congruence system into the generator system it
/// describes.
pub(crate) fn congruences_to_generators(
    reduced: &ReducedSystem,
    space_dim: usize,
) -> Result<GridGeneratorSystem> {
    let inv = invert(completed_matrix(reduced))?;
    let mut gs = GridGeneratorSystem::new(space_dim);
    // Dimension 0 answers the integrality row: the point.
    let point_col = column(&inv, 0);
    let (ints, divisor) = integerize(&point_col);
    debug_assert!(!divisor.is_zero());
    let mut e = LinearExpr::zero();
    for i in 0..space_dim {
        e.set_coefficient(Variable(i), ints[i + 1].clone());
    }
    debug_assert_eq!(ints[0], divisor);
    gs.insert(GridGenerator::grid_point(e, divisor)?)?;
    for d in 1..=space_dim {
        match reduced.kind(d) {
            DimKind::Exact => {
                // An equality pins the dimension: no generator.
            }
            DimKind::Integral => {
                let col = column(&inv, d);
                debug_assert!(col[0].is_zero());
                let (ints, divisor) = integerize(&col);
                let mut e = LinearExpr::zero();
                for i in 0..space_dim {
                    e.set_coefficient(Variable(i), ints[i + 1].clone());
                }
                gs.insert(GridGenerator::parameter(e, divisor)?)?;
            }
            DimKind::Virtual => {
                let col = column(&inv, d);
                debug_assert!(col[0].is_zero());
                let (ints, _) = integerize(&col);
                let mut e = LinearExpr::zero();
                for i in 0..space_dim {
                    e.set_coefficient(Variable(i), ints[i + 1].clone());
                }
                gs.insert(GridGenerator::grid_line(e)?)?;
            }
        }
    }
    gs.normalize_divisors();
    gs.system_mut().unset_pending_rows();
    Ok(gs)
}

/// Turns a reduced generator system into the congruence system it
/// satisfies.
pub(crate) fn generators_to_congruences(
    reduced: &ReducedSystem,
    space_dim: usize,
) -> Result<CongruenceSystem> {
    let inv = invert(completed_matrix(reduced))?;
    let mut cgs = CongruenceSystem::new(space_dim);
    for d in 1..=space_dim {
        match reduced.kind(d) {
            DimKind::Integral => {
                // A parameter dimension dualizes to a proper congruence:
                // the column scaled to integers, the scale as modulus.
                let col = column(&inv, d);
                let (ints, modulus) = integerize(&col);
                let mut e = LinearExpr::constant(ints[0].clone());
                for i in 0..space_dim {
                    e.set_coefficient(Variable(i), ints[i + 1].clone());
                }
                cgs.insert(e.congruent_to(0).modulo(modulus))?;
            }
            DimKind::Virtual => {
                // An absent generator dimension dualizes to an equality.
                let col = column(&inv, d);
                let (ints, _) = integerize(&col);
                let mut e = LinearExpr::constant(ints[0].clone());
                for i in 0..space_dim {
                    e.set_coefficient(Variable(i), ints[i + 1].clone());
                }
                cgs.insert(e.congruent_to(0).modulo(0))?;
            }
            DimKind::Exact => {
                // A line leaves its dimension unconstrained.
            }
        }
    }
    cgs.system_mut().unset_pending_rows();
    Ok(cgs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::reduction::{reduce_congruences, reduce_generators};
    use crate::grid_generator::GridGeneratorType;
    use polyhedra_arith::rational::ratio;

    #[test]
    fn test_even_lattice_round_trip() {
        // x = 0 (mod 2) in one dimension.
        let mut cgs = CongruenceSystem::new(1);
        cgs.insert(Variable(0).congruent_to(0).modulo(2)).unwrap();
        let reduced = reduce_congruences(&cgs).unwrap().unwrap();
        let gs = congruences_to_generators(&reduced, 1).unwrap();
        let kinds: Vec<_> = gs.iter().map(|g| g.generator_type()).collect();
        assert_eq!(
            kinds,
            vec![GridGeneratorType::Point, GridGeneratorType::Parameter]
        );
        let param = gs.iter().nth(1).unwrap();
        assert_eq!(param.coefficient(Variable(0)), Coefficient::from(2));

        let back = generators_to_congruences(&reduce_generators(&gs).unwrap(), 1).unwrap();
        let cg = back.iter().next().unwrap();
        assert_eq!(cg.coefficient(Variable(0)), Coefficient::from(1));
        assert_eq!(*cg.modulus(), Coefficient::from(2));
    }

    #[test]
    fn test_single_point_grid() {
        // The grid {5}: an equality congruence comes back.
        use crate::grid_generator::grid_point;
        let mut gs = GridGeneratorSystem::new(1);
        gs.insert(grid_point(Variable(0) * 5).unwrap()).unwrap();
        let cgs = generators_to_congruences(&reduce_generators(&gs).unwrap(), 1).unwrap();
        assert_eq!(cgs.num_rows(), 1);
        let cg = cgs.iter().next().unwrap();
        assert!(cg.is_equality());
        // x - 5 = 0 in canonical form.
        assert_eq!(cg.coefficient(Variable(0)), Coefficient::from(1));
        assert_eq!(*cg.inhomogeneous_term(), Coefficient::from(-5));
    }

    #[test]
    fn test_universe_grid() {
        let cgs = CongruenceSystem::new(2);
        let reduced = reduce_congruences(&cgs).unwrap().unwrap();
        let gs = congruences_to_generators(&reduced, 2).unwrap();
        let kinds: Vec<_> = gs.iter().map(|g| g.generator_type()).collect();
        assert_eq!(
            kinds,
            vec![
                GridGeneratorType::Point,
                GridGeneratorType::Line,
                GridGeneratorType::Line
            ]
        );
    }

    #[test]
    fn test_offset_lattice() {
        // x = 1 (mod 3): point at 1, parameter 3.
        let mut cgs = CongruenceSystem::new(1);
        cgs.insert(Variable(0).congruent_to(1).modulo(3)).unwrap();
        let reduced = reduce_congruences(&cgs).unwrap().unwrap();
        let gs = congruences_to_generators(&reduced, 1).unwrap();
        let point = gs.iter().next().unwrap();
        assert!(point.is_point());
        let coord = ratio(1, 1)
            * polyhedra_arith::rational::from_coefficients(
                point.coefficient(Variable(0)),
                point.divisor().unwrap().clone(),
            );
        // Some representative of 1 mod 3.
        let diff = coord - ratio(1, 1);
        assert!((diff / ratio(3, 1)).is_integer());
    }
}
