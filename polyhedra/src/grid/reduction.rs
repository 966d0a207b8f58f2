//! Strong reduction of congruence and grid generator systems into the
//! triangular per-dimension form the conversion inverts.
//!
//! Rows are handled as exact rational vectors over the homogeneous
//! coordinates `0..=n`: a proper congruence `r·x + b ≡ 0 (mod m)` becomes
//! the row `(b, r)/m` whose product with `(1, x)` must be an integer, an
//! equality the row itself with product zero. Generators dually: a point
//! `(1, p)`, a parameter `(0, q/d)`, a line `(0, l)`.

use num::{BigInt, Integer, One, Signed, Zero};
use polyhedra_arith::rational::from_coefficients;
use polyhedra_arith::{Coefficient, Rational};

use crate::congruence::CongruenceSystem;
use crate::error::Result;
use crate::expr::Variable;
use crate::grid_generator::{GridGeneratorSystem, GridGeneratorType};

/// What a homogeneous dimension carries after reduction. The kinds are
/// dual under conversion: a parameter answers a proper congruence, a line
/// a virtual congruence row, a virtual generator row an equality.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum DimKind {
    /// No row: an unconstrained congruence slot or an absent generator.
    Virtual,
    /// A proper congruence, or on the generator side the point (dim 0)
    /// and the parameters.
    Integral,
    /// An equality congruence, or a grid line.
    Exact,
}

/// One reduced system: a rational row per non-virtual homogeneous
/// dimension, tagged by kind.
#[derive(Clone, Debug)]
pub(crate) struct ReducedSystem {
    pub rows: Vec<Option<(Vec<Rational>, DimKind)>>,
}

impl ReducedSystem {
    pub fn kind(&self, dim: usize) -> DimKind {
        self.rows[dim]
            .as_ref()
            .map_or(DimKind::Virtual, |(_, k)| *k)
    }
}

/// Gcd of two nonnegative rationals seen as generators of a Z-module,
/// with a Bezout certificate: returns `(g, u, v)` with `g = u*a + v*b`.
fn rational_gcd_bezout(a: &Rational, b: &Rational) -> (Rational, BigInt, BigInt) {
    let denom = a.denom().lcm(b.denom());
    let aa = (a * Rational::from(denom.clone())).to_integer();
    let bb = (b * Rational::from(denom.clone())).to_integer();
    let ext = aa.extended_gcd(&bb);
    (
        from_coefficients(ext.gcd, denom),
        ext.x,
        ext.y,
    )
}

fn row_is_zero(row: &[Rational]) -> bool {
    row.iter().all(|c| c.is_zero())
}

fn highest_nonzero(row: &[Rational]) -> Option<usize> {
    (0..row.len()).rev().find(|&i| !row[i].is_zero())
}

fn scale_row(row: &[Rational], factor: &Rational) -> Vec<Rational> {
    row.iter().map(|c| c * factor).collect()
}

fn sub_scaled(row: &mut [Rational], other: &[Rational], factor: &Rational) {
    for (r, o) in row.iter_mut().zip(other) {
        *r -= o * factor;
    }
}

/// Places `(row, kind)` into the echelon, combining with occupants until
/// it finds a free pivot or vanishes. Returns `false` when an
/// inconsistency shows the system unsatisfiable.
fn place(
    slots: &mut Vec<Option<(Vec<Rational>, DimKind)>>,
    mut row: Vec<Rational>,
    mut kind: DimKind,
) -> bool {
    loop {
        if row_is_zero(&row) {
            return true;
        }
        let Some(p) = highest_nonzero(&row) else {
            return true;
        };
        if p == 0 {
            // Only the inhomogeneous slot is left: an equality demands it
            // be zero, an integral row that it be an integer.
            return match kind {
                DimKind::Exact => false,
                DimKind::Integral => row[0].is_integer(),
                DimKind::Virtual => unreachable!("virtual rows are never placed"),
            };
        }
        match &slots[p] {
            None => {
                // Positive pivot by convention.
                if row[p].is_negative() {
                    for c in row.iter_mut() {
                        *c = -std::mem::take(c);
                    }
                }
                slots[p] = Some((row, kind));
                return true;
            }
            Some((occ, occ_kind)) => match (*occ_kind, kind) {
                (DimKind::Exact, _) => {
                    // The exact occupant eliminates over the rationals.
                    let factor = &row[p] / &occ[p];
                    let occ = occ.clone();
                    sub_scaled(&mut row, &occ, &factor);
                }
                (DimKind::Integral, DimKind::Exact) => {
                    // An equality outranks the integral occupant: swap.
                    let (occ_row, occ_kind) = slots[p].take().expect("occupied");
                    if row[p].is_negative() {
                        for c in row.iter_mut() {
                            *c = -std::mem::take(c);
                        }
                    }
                    slots[p] = Some((row, kind));
                    row = occ_row;
                    kind = occ_kind;
                }
                (DimKind::Integral, DimKind::Integral) => {
                    let a = occ[p].clone();
                    let b = row[p].clone();
                    let (g, u, v) = rational_gcd_bezout(&a, &b);
                    let occ = occ.clone();
                    // New pivot row u*occ + v*row, leftover (b/g)*occ -
                    // (a/g)*row with a zero pivot.
                    let mut pivot_row = scale_row(&occ, &Rational::from(u));
                    let scaled = scale_row(&row, &Rational::from(v));
                    for (pr, s) in pivot_row.iter_mut().zip(&scaled) {
                        *pr += s;
                    }
                    let bg = (&b / &g).to_integer();
                    let ag = (&a / &g).to_integer();
                    let mut leftover = scale_row(&occ, &Rational::from(bg));
                    let scaled = scale_row(&row, &Rational::from(ag));
                    for (l, s) in leftover.iter_mut().zip(&scaled) {
                        *l -= s;
                    }
                    debug_assert!(leftover[p].is_zero());
                    slots[p] = Some((pivot_row, DimKind::Integral));
                    row = leftover;
                    kind = DimKind::Integral;
                }
                (DimKind::Integral, DimKind::Virtual) => {
                    unreachable!("virtual rows are never placed")
                }
                (DimKind::Virtual, _) => unreachable!("virtual rows are never stored"),
            },
        }
    }
}

/// Back-reduction: exact pivots clear their column everywhere, integral
/// pivots reduce other integral rows to the centered residue
/// `(-pivot/2, pivot/2]`.
fn back_reduce(slots: &mut [Option<(Vec<Rational>, DimKind)>]) {
    for p in (0..slots.len()).rev() {
        let Some((pivot_row, pivot_kind)) = slots[p].clone() else {
            continue;
        };
        let pivot = pivot_row[p].clone();
        for q in 0..slots.len() {
            if q == p {
                continue;
            }
            let Some((row, kind)) = slots[q].as_mut() else {
                continue;
            };
            if row[p].is_zero() {
                continue;
            }
            match pivot_kind {
                DimKind::Exact => {
                    let factor = &row[p] / &pivot;
                    sub_scaled(row, &pivot_row, &factor);
                }
                DimKind::Integral => {
                    if *kind != DimKind::Integral {
                        continue;
                    }
                    // Centered residue: entry - round(entry/pivot)*pivot.
                    let ratio = &row[p] / &pivot;
                    let k = round_half_down(&ratio);
                    if !k.is_zero() {
                        sub_scaled(row, &pivot_row, &Rational::from(k));
                    }
                }
                DimKind::Virtual => unreachable!(),
            }
        }
    }
}

/// Rounds to the nearest integer, ties toward negative infinity, so the
/// residue lands in `(-pivot/2, pivot/2]`.
fn round_half_down(q: &Rational) -> BigInt {
    let shifted = q + Rational::new(BigInt::from(1), BigInt::from(2));
    shifted.ceil().to_integer() - 1
}

/// Reduces a congruence system. `None` means the system is unsatisfiable.
pub(crate) fn reduce_congruences(
    cgs: &CongruenceSystem,
) -> Result<Option<ReducedSystem>> {
    let n = cgs.space_dimension();
    let mut slots: Vec<Option<(Vec<Rational>, DimKind)>> = vec![None; n + 1];
    for cg in cgs.iter() {
        if cg.is_tautological() {
            continue;
        }
        let mut row: Vec<Rational> = Vec::with_capacity(n + 1);
        row.push(Rational::from(cg.inhomogeneous_term().clone()));
        for i in 0..n {
            row.push(Rational::from(cg.coefficient(Variable(i))));
        }
        let kind = if cg.is_equality() {
            DimKind::Exact
        } else {
            let m = Rational::from(cg.modulus().clone());
            for c in row.iter_mut() {
                *c /= &m;
            }
            DimKind::Integral
        };
        if !place(&mut slots, row, kind) {
            return Ok(None);
        }
    }
    // The integrality row pins the homogeneous dimension.
    if slots[0].is_none() {
        let mut e0 = vec![Rational::zero(); n + 1];
        e0[0] = Rational::one();
        slots[0] = Some((e0, DimKind::Integral));
    }
    back_reduce(&mut slots);
    Ok(Some(ReducedSystem { rows: slots }))
}

/// Reduces a generator system; it must contain a point. Extra points are
/// turned into parameters against the first.
pub(crate) fn reduce_generators(gs: &GridGeneratorSystem) -> Result<ReducedSystem> {
    let n = gs.space_dimension();
    let mut slots: Vec<Option<(Vec<Rational>, DimKind)>> = vec![None; n + 1];
    let mut first_point: Option<Vec<Rational>> = None;
    let mut pending: Vec<(Vec<Rational>, DimKind)> = Vec::new();
    for g in gs.iter() {
        let mut row = vec![Rational::zero(); n + 1];
        match g.generator_type() {
            GridGeneratorType::Point => {
                let d = g.divisor()?.clone();
                row[0] = Rational::one();
                for i in 0..n {
                    row[i + 1] = from_coefficients(g.coefficient(Variable(i)), d.clone());
                }
                match &first_point {
                    None => first_point = Some(row),
                    Some(p) => {
                        // The difference of two points moves between grid
                        // points: a parameter.
                        for (r, base) in row.iter_mut().zip(p) {
                            *r -= base;
                        }
                        pending.push((row, DimKind::Integral));
                    }
                }
            }
            GridGeneratorType::Parameter => {
                let d = g.divisor()?.clone();
                for i in 0..n {
                    row[i + 1] = from_coefficients(g.coefficient(Variable(i)), d.clone());
                }
                pending.push((row, DimKind::Integral));
            }
            GridGeneratorType::Line => {
                for i in 0..n {
                    row[i + 1] = Rational::from(g.coefficient(Variable(i)));
                }
                pending.push((row, DimKind::Exact));
            }
        }
    }
    for (row, kind) in pending {
        // Direction rows always place; the homogeneous slot is zero.
        let placed = place(&mut slots, row, kind);
        debug_assert!(placed);
    }
    let point = first_point.expect("caller guarantees a point");
    debug_assert!(slots[0].is_none());
    slots[0] = Some((point, DimKind::Integral));
    back_reduce(&mut slots);
    Ok(ReducedSystem { rows: slots })
}

/// Scales a rational row into a primitive integer row plus the positive
/// scale that divided it: `row = integers / scale`.
pub(crate) fn integerize(row: &[Rational]) -> (Vec<Coefficient>, Coefficient) {
    let mut scale = Coefficient::one();
    for c in row {
        scale = scale.lcm(c.denom());
    }
    let ints: Vec<Coefficient> = row
        .iter()
        .map(|c| (c * Rational::from(scale.clone())).to_integer())
        .collect();
    (ints, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhedra_arith::rational::ratio;

    #[test]
    fn test_rational_gcd_bezout() {
        let (g, u, v) = rational_gcd_bezout(&ratio(1, 2), &ratio(1, 3));
        assert_eq!(
            g,
            &ratio(1, 2) * Rational::from(u) + &ratio(1, 3) * Rational::from(v)
        );
        assert_eq!(g, ratio(1, 6));
    }

    #[test]
    fn test_round_half_down() {
        assert_eq!(round_half_down(&ratio(3, 2)), BigInt::from(1));
        assert_eq!(round_half_down(&ratio(1, 2)), BigInt::from(0));
        assert_eq!(round_half_down(&ratio(-1, 2)), BigInt::from(-1));
        assert_eq!(round_half_down(&ratio(5, 4)), BigInt::from(1));
        assert_eq!(round_half_down(&ratio(-5, 4)), BigInt::from(-1));
    }

    #[test]
    fn test_reduce_congruences_strong_form() {
        // The S3 system: 2x = 0 (mod 4), 2x + 2y = 0 (mod 4) reduces to
        // x = 0 (mod 2), y = 0 (mod 2).
        let mut cgs = CongruenceSystem::new(2);
        cgs.insert((Variable(0) * 2i32).congruent_to(0).modulo(4))
            .unwrap();
        cgs.insert((Variable(0) * 2i32 + Variable(1) * 2i32).congruent_to(0).modulo(4))
            .unwrap();
        let reduced = reduce_congruences(&cgs).unwrap().unwrap();
        let (row1, _) = reduced.rows[1].as_ref().unwrap();
        let (row2, _) = reduced.rows[2].as_ref().unwrap();
        assert_eq!(row1, &vec![ratio(0, 1), ratio(1, 2), ratio(0, 1)]);
        assert_eq!(row2, &vec![ratio(0, 1), ratio(0, 1), ratio(1, 2)]);
        assert_eq!(reduced.kind(1), DimKind::Integral);
        assert_eq!(reduced.kind(2), DimKind::Integral);
    }

    #[test]
    fn test_inconsistent_congruences_detected() {
        // x = 0 (mod 2) and x = 1 (mod 2).
        let mut cgs = CongruenceSystem::new(1);
        cgs.insert(Variable(0).congruent_to(0).modulo(2)).unwrap();
        cgs.insert(Variable(0).congruent_to(1).modulo(2)).unwrap();
        assert!(reduce_congruences(&cgs).unwrap().is_none());
    }

    #[test]
    fn test_inconsistent_equalities_detected() {
        let mut cgs = CongruenceSystem::new(1);
        cgs.insert(Variable(0).congruent_to(0).modulo(0)).unwrap();
        cgs.insert(Variable(0).congruent_to(1).modulo(0)).unwrap();
        assert!(reduce_congruences(&cgs).unwrap().is_none());
    }

    #[test]
    fn test_reduce_generators() {
        use crate::grid_generator::{grid_point, GridGenerator};
        let mut gs = GridGeneratorSystem::new(1);
        gs.insert(grid_point(Variable(0) * 5).unwrap()).unwrap();
        gs.insert(GridGenerator::parameter(Variable(0) * 3, 1).unwrap())
            .unwrap();
        let reduced = reduce_generators(&gs).unwrap();
        let (point, _) = reduced.rows[0].as_ref().unwrap();
        // The point's coordinate is reduced into the centered residue of
        // the parameter step.
        assert_eq!(point[0], ratio(1, 1));
        assert_eq!(point[1], ratio(-1, 1));
        let (param, _) = reduced.rows[1].as_ref().unwrap();
        assert_eq!(param[1], ratio(3, 1));
    }
}
