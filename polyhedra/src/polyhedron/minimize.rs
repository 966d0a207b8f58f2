//! Redundancy removal for one side of the dual representation, guided by
//! the saturation matrix produced while converting to the other side.

use num::Zero;

use crate::bit_matrix::{BitMatrix, BitRow};
use crate::linear::{LinearRow, LinearSystem, RowKind};

/// Minimizes `sys` in place. `sat` has one row per row of `sys` and one
/// column per row of the dual side; a set bit records saturation. The dual
/// side is assumed minimal (a conversion result).
///
/// Steps: promote inequalities saturated by the whole dual side to
/// equalities, run Gaussian elimination on the equalities, reduce the
/// inequalities by the equality pivots, then drop every inequality whose
/// saturator set is dominated by another's.
pub(crate) fn simplify(sys: &mut LinearSystem, sat: &mut BitMatrix) {
    let num_dual = sat.num_cols();

    // An inequality every dual row saturates is an implicit equality.
    for (i, row) in sys.rows_mut().iter_mut().enumerate() {
        if !row.is_line_or_equality() && sat.row(i).count_ones() == num_dual {
            row.set_kind(RowKind::LineOrEquality);
            row.strong_normalize();
        }
    }

    gaussian_reduce(sys);
    drop_zero_rows(sys, sat);
    drop_dominated_inequalities(sys, sat);
    sort_with_sat(sys, sat);
}

/// Row echelon form on the equality rows, then elimination of their pivot
/// columns from the inequality rows. Combining with an equality preserves
/// every saturation bit, since equalities are saturated by the whole dual
/// side.
fn gaussian_reduce(sys: &mut LinearSystem) {
    let size = sys.row_size();
    let n = sys.num_rows();
    let mut pivots: Vec<(usize, usize)> = Vec::new();
    let mut used: Vec<bool> = vec![false; n];
    // Pivot search over homogeneous columns first, the inhomogeneous slot
    // last.
    let col_order: Vec<usize> = (1..size).chain(std::iter::once(0)).collect();
    for &col in &col_order {
        let pivot = (0..n).find(|&i| {
            !used[i] && sys.row(i).is_line_or_equality() && !sys.row(i).coeff(col).is_zero()
        });
        let Some(p) = pivot else { continue };
        used[p] = true;
        pivots.push((p, col));
        let pivot_row = sys.row(p).clone();
        for i in 0..n {
            if i != p && sys.row(i).is_line_or_equality() && !sys.row(i).coeff(col).is_zero() {
                sys.rows_mut()[i].linear_combine(&pivot_row, col);
            }
        }
    }
    // Reduce the inequalities by every equality pivot.
    for &(p, col) in &pivots {
        let pivot_row = sys.row(p).clone();
        for i in 0..n {
            if !sys.row(i).is_line_or_equality() && !sys.row(i).coeff(col).is_zero() {
                sys.rows_mut()[i].linear_combine(&pivot_row, col);
            }
        }
    }
}

fn drop_zero_rows(sys: &mut LinearSystem, sat: &mut BitMatrix) {
    let zero: Vec<bool> = sys.rows().iter().map(|r| r.is_zero()).collect();
    retain(sys, sat, |i, _| !zero[i]);
}

/// An inequality is redundant when another inequality's saturator set
/// contains its own; ties keep the earlier row.
fn drop_dominated_inequalities(sys: &mut LinearSystem, sat: &mut BitMatrix) {
    let n = sys.num_rows();
    let mut redundant = vec![false; n];
    for i in 0..n {
        if sys.row(i).is_line_or_equality() || redundant[i] {
            continue;
        }
        for j in 0..n {
            if j == i || sys.row(j).is_line_or_equality() || redundant[j] {
                continue;
            }
            if sat.row(i).is_subset_of(sat.row(j)) {
                let proper = sat.row(i) != sat.row(j);
                if proper || j < i {
                    redundant[i] = true;
                    break;
                }
            }
        }
    }
    retain(sys, sat, |i, _| !redundant[i]);
}

fn retain(sys: &mut LinearSystem, sat: &mut BitMatrix, mut keep: impl FnMut(usize, &LinearRow) -> bool) {
    let mut kept = LinearSystem::new(sys.row_size(), sys.topology());
    let mut kept_sat = BitMatrix::new(0, sat.num_cols());
    for i in 0..sys.num_rows() {
        if keep(i, sys.row(i)) {
            kept.add_row(sys.row(i).clone());
            kept_sat.push_row(sat.row(i).clone());
        }
    }
    *sys = kept;
    *sat = kept_sat;
}

/// Sorts rows by the documented key, carrying the saturation rows along
/// and merging duplicates.
pub(crate) fn sort_with_sat(sys: &mut LinearSystem, sat: &mut BitMatrix) {
    let mut paired: Vec<(LinearRow, BitRow)> = sys
        .rows()
        .iter()
        .cloned()
        .zip((0..sat.num_rows()).map(|i| sat.row(i).clone()))
        .collect();
    paired.sort_by(|(a, _), (b, _)| a.compare(b));
    paired.dedup_by(|(a, _), (b, _)| a == b);
    let mut kept = LinearSystem::new(sys.row_size(), sys.topology());
    let mut kept_sat = BitMatrix::new(0, sat.num_cols());
    for (row, sat_row) in paired {
        kept.add_row(row);
        kept_sat.push_row(sat_row);
    }
    *sys = kept;
    *sat = kept_sat;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::Topology;
    use polyhedra_arith::Coefficient;

    fn row(cs: &[i64], kind: RowKind) -> LinearRow {
        LinearRow::from_coeffs(
            cs.iter().map(|&c| Coefficient::from(c)).collect(),
            kind,
            Topology::Closed,
        )
    }

    #[test]
    fn test_gaussian_drops_dependent_equalities() {
        let mut sys = LinearSystem::new(3, Topology::Closed);
        sys.add_row(row(&[0, 1, 1], RowKind::LineOrEquality));
        sys.add_row(row(&[0, 2, 2], RowKind::LineOrEquality));
        sys.add_row(row(&[0, 1, -1], RowKind::LineOrEquality));
        let mut sat = BitMatrix::new(3, 1);
        simplify(&mut sys, &mut sat);
        assert_eq!(sys.num_rows(), 2);
        assert!(sys.rows().iter().all(|r| r.is_line_or_equality()));
    }

    #[test]
    fn test_dominated_inequality_dropped() {
        let mut sys = LinearSystem::new(2, Topology::Closed);
        sys.add_row(row(&[0, 1], RowKind::RayPointOrInequality));
        sys.add_row(row(&[1, 1], RowKind::RayPointOrInequality));
        let mut sat = BitMatrix::new(2, 2);
        // Row 0 saturated by dual rows {0, 1}; row 1 by {0} only.
        sat.set(0, 0);
        sat.set(0, 1);
        sat.set(1, 0);
        simplify(&mut sys, &mut sat);
        assert_eq!(sys.num_rows(), 1);
        assert_eq!(sys.row(0), &row(&[0, 1], RowKind::RayPointOrInequality));
    }

    #[test]
    fn test_implicit_equality_promotion() {
        let mut sys = LinearSystem::new(2, Topology::Closed);
        sys.add_row(row(&[0, 1], RowKind::RayPointOrInequality));
        let mut sat = BitMatrix::new(1, 2);
        sat.set(0, 0);
        sat.set(0, 1);
        simplify(&mut sys, &mut sat);
        assert!(sys.row(0).is_line_or_equality());
    }

    #[test]
    fn test_duplicate_rows_merged() {
        let mut sys = LinearSystem::new(2, Topology::Closed);
        sys.add_row(row(&[0, 1], RowKind::RayPointOrInequality));
        sys.add_row(row(&[0, 1], RowKind::RayPointOrInequality));
        let mut sat = BitMatrix::new(2, 1);
        sat.set(0, 0);
        sat.set(1, 0);
        simplify(&mut sys, &mut sat);
        assert_eq!(sys.num_rows(), 1);
    }
}
