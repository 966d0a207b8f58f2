//! The double-description conversion: rebuilding one side of the dual
//! representation from the other, one source row at a time, maintaining the
//! saturation matrix.

use num::{Signed, Zero};
use polyhedra_arith::coefficient::{self, Coefficient};

use crate::abandon::maybe_abandon;
use crate::bit_matrix::{BitMatrix, BitRow};
use crate::error::Result;
use crate::linear::{scalar_product, LinearRow, LinearSystem, RowKind};

/// The dual universe seed: the identity system, every row a line (or an
/// equality, read from the other side), which the conversion carves down.
pub(crate) fn universe_dual(template: &LinearSystem) -> LinearSystem {
    let size = template.row_size();
    let mut dest = LinearSystem::new(size, template.topology());
    for i in 0..size {
        let mut row = LinearRow::new(size, RowKind::LineOrEquality, template.topology());
        *row.coeff_mut(i) = Coefficient::from(1);
        dest.add_row(row);
    }
    dest
}

/// Combines `target` with `pivot` so the scalar product of the result with
/// the current source row becomes zero. `target` is scaled by a positive
/// factor only, so rays stay rays.
fn combine(
    target: &mut LinearRow,
    pivot: &LinearRow,
    sp_target: &Coefficient,
    sp_pivot: &Coefficient,
) {
    let g = coefficient::gcd(sp_pivot, sp_target);
    let mut na = sp_pivot / &g;
    let mut nb = sp_target / &g;
    if na.is_negative() {
        na = -na;
        nb = -nb;
    }
    for i in 0..target.size() {
        let t = std::mem::take(target.coeff_mut(i));
        *target.coeff_mut(i) = t * &na - pivot.coeff(i).clone() * &nb;
    }
    target.strong_normalize();
}

/// Runs the conversion of `source` rows `[start, ..)` into `dest`,
/// updating `sat` (rows parallel `dest`, columns parallel `source`; a set
/// bit records a zero product). Returns `false` when the destination cone
/// collapses to nothing.
///
/// `dest` must hold a valid description of the cone cut by the source rows
/// before `start`, with its lines/equalities leading.
pub(crate) fn conversion(
    source: &LinearSystem,
    start: usize,
    dest: &mut LinearSystem,
    sat: &mut BitMatrix,
) -> Result<bool> {
    debug_assert_eq!(sat.num_rows(), dest.num_rows());
    sat.add_cols(source.num_rows() - sat.num_cols());
    let mut num_lines = count_leading_lines(dest);
    log::trace!(
        "conversion: {} source rows into {} destination rows",
        source.num_rows() - start,
        dest.num_rows()
    );

    for k in start..source.num_rows() {
        maybe_abandon("Polyhedron::conversion")?;
        let src = source.row(k);
        let mut sp: Vec<Coefficient> = dest
            .rows()
            .iter()
            .map(|row| scalar_product(row, src))
            .collect();

        // A line with a nonzero product pivots everything else to zero.
        if let Some(pivot_idx) = (0..num_lines).find(|&i| !sp[i].is_zero()) {
            let pivot_row = dest.row(pivot_idx).clone();
            let sp_pivot = sp[pivot_idx].clone();
            for i in 0..dest.num_rows() {
                if i != pivot_idx && !sp[i].is_zero() {
                    combine(&mut dest.rows_mut()[i], &pivot_row, &sp[i], &sp_pivot);
                    sp[i] = Coefficient::zero();
                }
            }
            if src.is_line_or_equality() {
                dest.remove_row(pivot_idx);
                sat.remove_row(pivot_idx);
                num_lines -= 1;
            } else {
                // The pivot line splits: keep the half satisfying the
                // source row, demoted to a ray.
                if sp_pivot.is_negative() {
                    dest.rows_mut()[pivot_idx].negate();
                }
                dest.rows_mut()[pivot_idx].set_kind(RowKind::RayPointOrInequality);
                num_lines -= 1;
                // Keep lines leading.
                dest.swap_rows(pivot_idx, num_lines);
                sat.swap_rows(pivot_idx, num_lines);
            }
            // Everything remaining saturates the source row, except a
            // freshly split ray.
            for i in 0..dest.num_rows() {
                if i != num_lines || src.is_line_or_equality() {
                    sat.set(i, k);
                }
            }
            continue;
        }

        // No line is cut. Partition the rays by product sign.
        let pos: Vec<usize> = (num_lines..dest.num_rows())
            .filter(|&i| sp[i].is_positive())
            .collect();
        let neg: Vec<usize> = (num_lines..dest.num_rows())
            .filter(|&i| sp[i].is_negative())
            .collect();
        if pos.is_empty() && neg.is_empty() {
            // Everything saturates; the row adds nothing new.
            for i in 0..dest.num_rows() {
                sat.set(i, k);
            }
            continue;
        }

        // Combine adjacent straddling pairs into rows saturating the
        // source row.
        let mut new_rows: Vec<(LinearRow, BitRow)> = Vec::new();
        for &p in &pos {
            for &n in &neg {
                let common = sat.row(p).and(sat.row(n));
                if !is_adjacent_pair(sat, &common, p, n, num_lines, dest.num_rows()) {
                    continue;
                }
                let mut row = dest.row(p).clone();
                combine(&mut row, dest.row(n), &sp[p], &sp[n]);
                if row.is_zero() {
                    continue;
                }
                let mut sat_row = common;
                sat_row.set(k);
                new_rows.push((row, sat_row));
            }
        }

        // Keep the satisfying part, drop the violating one.
        let keep_pos = !src.is_line_or_equality();
        let mut kept = LinearSystem::new(dest.row_size(), dest.topology());
        let mut kept_sat = BitMatrix::new(0, sat.num_cols());
        for i in 0..dest.num_rows() {
            let satisfies = if sp[i].is_zero() {
                true
            } else if sp[i].is_positive() {
                keep_pos
            } else {
                false
            };
            if satisfies {
                let mut sat_row = sat.row(i).clone();
                if sp[i].is_zero() {
                    sat_row.set(k);
                }
                kept.add_row(dest.row(i).clone());
                kept_sat.push_row(sat_row);
            }
        }
        for (row, sat_row) in new_rows {
            kept.add_row(row);
            kept_sat.push_row(sat_row);
        }
        *dest = kept;
        *sat = kept_sat;
        num_lines = count_leading_lines(dest);
        if dest.num_rows() == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Lines/equalities lead a converted system; everything before the first
/// ray row counts.
fn count_leading_lines(sys: &LinearSystem) -> usize {
    let mut n = 0;
    for row in sys.rows() {
        if row.is_line_or_equality() {
            n += 1;
        } else {
            break;
        }
    }
    debug_assert!(sys.rows()[n..].iter().all(|r| !r.is_line_or_equality()));
    n
}

/// Two straddling rays are adjacent when no other ray saturates everything
/// they both saturate.
fn is_adjacent_pair(
    sat: &BitMatrix,
    common: &BitRow,
    p: usize,
    n: usize,
    num_lines: usize,
    num_rows: usize,
) -> bool {
    for r in num_lines..num_rows {
        if r != p && r != n && common.is_subset_of(sat.row(r)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::Topology;

    fn row(cs: &[i64], kind: RowKind) -> LinearRow {
        LinearRow::from_coeffs(
            cs.iter().map(|&c| Coefficient::from(c)).collect(),
            kind,
            Topology::Closed,
        )
    }

    fn convert(source: &LinearSystem) -> (bool, LinearSystem, BitMatrix) {
        let mut dest = universe_dual(source);
        let mut sat = BitMatrix::new(dest.num_rows(), 0);
        let ok = conversion(source, 0, &mut dest, &mut sat).unwrap();
        (ok, dest, sat)
    }

    #[test]
    fn test_unit_interval_generators() {
        // 0 <= x <= 1 with positivity: generators are the two endpoints.
        let mut source = LinearSystem::new(2, Topology::Closed);
        source.add_row(row(&[1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, 1], RowKind::RayPointOrInequality));
        source.add_row(row(&[1, -1], RowKind::RayPointOrInequality));
        let (ok, dest, _) = convert(&source);
        assert!(ok);
        use num::ToPrimitive;
        let mut points: Vec<Vec<i64>> = dest
            .rows()
            .iter()
            .map(|r| {
                vec![
                    r.coeff(0).to_i64().unwrap(),
                    r.coeff(1).to_i64().unwrap(),
                ]
            })
            .collect();
        points.sort();
        assert_eq!(points, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_half_line() {
        // x >= 0: origin point plus the positive ray.
        let mut source = LinearSystem::new(2, Topology::Closed);
        source.add_row(row(&[1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, 1], RowKind::RayPointOrInequality));
        let (ok, dest, _) = convert(&source);
        assert!(ok);
        assert_eq!(dest.num_rows(), 2);
        assert!(dest.rows().iter().any(|r| r.coeff(0).is_zero()));
        assert!(dest.rows().iter().any(|r| !r.coeff(0).is_zero()));
    }

    #[test]
    fn test_infeasible_collapses() {
        // x >= 1 and x <= 0.
        let mut source = LinearSystem::new(2, Topology::Closed);
        source.add_row(row(&[1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[-1, 1], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, -1], RowKind::RayPointOrInequality));
        let (ok, dest, _) = convert(&source);
        assert!(!ok || !dest.rows().iter().any(|r| r.coeff(0).is_positive()));
    }

    #[test]
    fn test_equality_produces_flat() {
        // x = 0 in 2 dims: a point and the y line.
        let mut source = LinearSystem::new(3, Topology::Closed);
        source.add_row(row(&[0, 1, 0], RowKind::LineOrEquality));
        source.add_row(row(&[1, 0, 0], RowKind::RayPointOrInequality));
        let (ok, dest, _) = convert(&source);
        assert!(ok);
        assert_eq!(dest.num_rows(), 2);
        assert_eq!(
            dest.rows().iter().filter(|r| r.is_line_or_equality()).count(),
            1
        );
    }

    #[test]
    fn test_square_has_four_vertices() {
        // 0 <= x <= 1, 0 <= y <= 1.
        let mut source = LinearSystem::new(3, Topology::Closed);
        source.add_row(row(&[1, 0, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, 1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[1, -1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, 0, 1], RowKind::RayPointOrInequality));
        source.add_row(row(&[1, 0, -1], RowKind::RayPointOrInequality));
        let (ok, dest, sat) = convert(&source);
        assert!(ok);
        assert_eq!(dest.num_rows(), 4);
        // Every vertex of the square saturates exactly two of the five
        // source rows (its two incident sides).
        for i in 0..dest.num_rows() {
            assert_eq!(sat.row(i).count_ones(), 2);
        }
    }

    #[test]
    fn test_round_trip_to_constraints() {
        // Convert the square's vertices back: four nontrivial constraints
        // plus whatever trivial ones simplification would drop.
        let mut source = LinearSystem::new(3, Topology::Closed);
        source.add_row(row(&[1, 0, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, 1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[1, -1, 0], RowKind::RayPointOrInequality));
        source.add_row(row(&[0, 0, 1], RowKind::RayPointOrInequality));
        source.add_row(row(&[1, 0, -1], RowKind::RayPointOrInequality));
        let (_, vertices, _) = convert(&source);
        let (ok, cons, _) = convert(&vertices);
        assert!(ok);
        // The homogeneous cone of the square has exactly four facets, one
        // per side; positivity is implied.
        assert_eq!(cons.num_rows(), 4);
        assert!(cons.rows().iter().all(|r| !r.is_line_or_equality()));
    }
}
