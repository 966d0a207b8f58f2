use num::{One, Signed, Zero};
use polyhedra_arith::{Coefficient, Rational};

use crate::abandon::maybe_abandon;
use crate::constraint::{ConstraintSystem, ConstraintType};
use crate::error::{Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::generator::Generator;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OptimizationMode {
    Maximization,
    Minimization,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MipStatus {
    Unfeasible,
    Unbounded,
    Optimized,
}

/// An exact linear program over rationals: nonstrict constraints, a linear
/// objective, and an optimization mode. Solved by a dense two-phase simplex
/// with Bland's rule. Integer variables are out of scope; the name keeps
/// the seam the coercions consult.
#[derive(Clone, Debug)]
pub struct MipProblem {
    space_dim: usize,
    rows: Vec<(Vec<Rational>, Rational, bool)>,
    objective: LinearExpr,
    mode: OptimizationMode,
    solution: Option<(MipStatus, Option<Vec<Rational>>)>,
}

impl MipProblem {
    pub fn new(space_dim: usize) -> Self {
        MipProblem {
            space_dim,
            rows: Vec::new(),
            objective: LinearExpr::zero(),
            mode: OptimizationMode::Maximization,
            solution: None,
        }
    }

    /// Builds a problem from a constraint system; strict inequalities are
    /// rejected.
    pub fn from_constraints(
        cs: &ConstraintSystem,
        objective: LinearExpr,
        mode: OptimizationMode,
    ) -> Result<Self> {
        let mut problem = MipProblem::new(cs.space_dimension());
        for c in cs.iter() {
            problem.add_constraint_row(
                (0..cs.space_dimension())
                    .map(|i| Rational::from(c.coefficient(Variable(i))))
                    .collect(),
                -Rational::from(c.inhomogeneous_term().clone()),
                c.constraint_type(),
            )?;
        }
        problem.objective = objective;
        problem.mode = mode;
        Ok(problem)
    }

    pub fn set_optimization_mode(&mut self, mode: OptimizationMode) {
        self.mode = mode;
        self.solution = None;
    }

    pub fn set_objective_function(&mut self, objective: LinearExpr) -> Result<()> {
        if objective.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "MipProblem::set_objective_function",
                self.space_dim,
                objective.space_dimension(),
            ));
        }
        self.objective = objective;
        self.solution = None;
        Ok(())
    }

    /// Adds `sum coeffs[i] x_i relop rhs` with `relop` drawn from the
    /// nonstrict constraint types.
    fn add_constraint_row(
        &mut self,
        coeffs: Vec<Rational>,
        rhs: Rational,
        kind: ConstraintType,
    ) -> Result<()> {
        match kind {
            ConstraintType::StrictInequality => Err(Error::invalid_argument(
                "MipProblem::add_constraint",
                "strict inequalities are not expressible in a linear program",
            )),
            ConstraintType::Equality => {
                self.rows.push((coeffs, rhs, true));
                self.solution = None;
                Ok(())
            }
            ConstraintType::NonstrictInequality => {
                // Stored as >=.
                self.rows.push((coeffs, rhs, false));
                self.solution = None;
                Ok(())
            }
        }
    }

    pub fn add_constraint(&mut self, c: &crate::constraint::Constraint) -> Result<()> {
        if c.space_dimension() > self.space_dim {
            return Err(Error::dimension_incompatible(
                "MipProblem::add_constraint",
                self.space_dim,
                c.space_dimension(),
            ));
        }
        self.add_constraint_row(
            (0..self.space_dim)
                .map(|i| Rational::from(c.coefficient(Variable(i))))
                .collect(),
            -Rational::from(c.inhomogeneous_term().clone()),
            c.constraint_type(),
        )
    }

    pub fn solve(&mut self) -> Result<MipStatus> {
        if let Some((status, _)) = &self.solution {
            return Ok(*status);
        }
        log::debug!(
            "simplex: {} rows over {} dimensions",
            self.rows.len(),
            self.space_dim
        );
        let solved = self.run_simplex()?;
        self.solution = Some(solved.clone());
        Ok(solved.0)
    }

    /// The feasible point attaining the optimum, as a generator.
    pub fn optimizing_point(&self) -> Result<Generator> {
        match &self.solution {
            Some((MipStatus::Optimized, Some(point))) => {
                // Clear denominators into a single divisor.
                let mut den = Coefficient::one();
                for q in point {
                    den = num::Integer::lcm(&den, q.denom());
                }
                let mut e = LinearExpr::zero();
                for (i, q) in point.iter().enumerate() {
                    let scaled = q * Rational::from(den.clone());
                    debug_assert!(scaled.is_integer());
                    e.set_coefficient(Variable(i), scaled.to_integer());
                }
                Generator::point(e, den)
            }
            _ => Err(Error::invalid_argument(
                "MipProblem::optimizing_point",
                "no optimizing point is available",
            )),
        }
    }

    pub fn optimal_value(&self) -> Result<Rational> {
        match &self.solution {
            Some((MipStatus::Optimized, Some(point))) => Ok(self.evaluate(point)),
            _ => Err(Error::invalid_argument(
                "MipProblem::optimal_value",
                "no optimum is available",
            )),
        }
    }

    fn evaluate(&self, point: &[Rational]) -> Rational {
        let mut acc = Rational::from(self.objective.inhomogeneous_term().clone());
        for i in 0..self.space_dim {
            let a = self.objective.coefficient(Variable(i));
            if !a.is_zero() {
                acc += Rational::from(a) * &point[i];
            }
        }
        acc
    }

    /// Two-phase dense simplex. Free variables are split into differences
    /// of nonnegatives; every row gets a slack or artificial so phase one
    /// starts from an identity basis.
    fn run_simplex(&self) -> Result<(MipStatus, Option<Vec<Rational>>)> {
        let n = self.space_dim;
        let split = 2 * n;
        let m = self.rows.len();
        if m == 0 {
            // Unconstrained: any nonzero objective direction is unbounded.
            let constant = (0..n).all(|i| self.objective.coefficient(Variable(i)).is_zero());
            return Ok(if constant {
                (MipStatus::Optimized, Some(vec![Rational::zero(); n]))
            } else {
                (MipStatus::Unbounded, None)
            });
        }
        // Columns: [x+ | x- | slacks | artificials], rhs kept separately.
        let mut num_slacks = 0;
        for (_, _, is_eq) in &self.rows {
            if !is_eq {
                num_slacks += 1;
            }
        }
        let total = split + num_slacks + m;
        let mut tab: Vec<Vec<Rational>> = Vec::with_capacity(m);
        let mut rhs: Vec<Rational> = Vec::with_capacity(m);
        let mut basis: Vec<usize> = Vec::with_capacity(m);
        let mut slack_idx = 0;
        for (r, (coeffs, b, is_eq)) in self.rows.iter().enumerate() {
            let mut row = vec![Rational::zero(); total];
            // Stored as sum a_i x_i >= b (or = b): bring to <=/= with
            // nonnegative rhs below.
            for i in 0..n {
                row[i] = -coeffs[i].clone();
                row[n + i] = coeffs[i].clone();
            }
            let mut b = -b.clone();
            if !is_eq {
                row[split + slack_idx] = Rational::one();
                slack_idx += 1;
            }
            if b.is_negative() {
                for c in row.iter_mut() {
                    *c = -std::mem::take(c);
                }
                b = -b;
            }
            row[split + num_slacks + r] = Rational::one();
            basis.push(split + num_slacks + r);
            tab.push(row);
            rhs.push(b);
        }
        // Phase one: drive the artificials to zero.
        let phase1_cost: Vec<Rational> = (0..total)
            .map(|j| {
                if j >= split + num_slacks {
                    Rational::one()
                } else {
                    Rational::zero()
                }
            })
            .collect();
        let feasible = simplex_phase1(&mut tab, &mut rhs, &mut basis, &phase1_cost)?;
        if !feasible {
            return Ok((MipStatus::Unfeasible, None));
        }
        // Pivot out any artificial still basic at zero level.
        for r in 0..m {
            if basis[r] >= split + num_slacks {
                if let Some(col) = (0..split + num_slacks).find(|&j| !tab[r][j].is_zero()) {
                    pivot(&mut tab, &mut rhs, &mut basis, r, col);
                }
            }
        }
        // Phase two on the real objective; maximization flips the sign.
        let mut phase2_cost = vec![Rational::zero(); total];
        for i in 0..n {
            let a = Rational::from(self.objective.coefficient(Variable(i)));
            let a = match self.mode {
                OptimizationMode::Maximization => -a,
                OptimizationMode::Minimization => a,
            };
            phase2_cost[i] = a.clone();
            phase2_cost[n + i] = -a;
        }
        let bounded = simplex_phase2(&mut tab, &mut rhs, &mut basis, &phase2_cost, split + num_slacks)?;
        if !bounded {
            return Ok((MipStatus::Unbounded, None));
        }
        let mut point = vec![Rational::zero(); n];
        for (r, &b) in basis.iter().enumerate() {
            if b < n {
                point[b] += &rhs[r];
            } else if b < split {
                point[b - n] -= &rhs[r];
            }
        }
        Ok((MipStatus::Optimized, Some(point)))
    }
}

/// Runs phase one to completion; returns whether the artificial objective
/// reached zero.
fn simplex_phase1(
    tab: &mut Vec<Vec<Rational>>,
    rhs: &mut Vec<Rational>,
    basis: &mut Vec<usize>,
    cost: &[Rational],
) -> Result<bool> {
    loop {
        maybe_abandon("MipProblem::solve")?;
        let reduced = reduced_costs(tab, basis, cost);
        // Bland: the lowest-index improving column.
        let entering = (0..cost.len()).find(|&j| reduced[j].is_negative());
        let Some(col) = entering else {
            let mut objective_value = Rational::zero();
            for (r, &b) in basis.iter().enumerate() {
                objective_value += &cost[b] * &rhs[r];
            }
            return Ok(objective_value.is_zero());
        };
        match leaving_row(tab, rhs, basis, col) {
            Some(row) => pivot(tab, rhs, basis, row, col),
            None => return Ok(false),
        }
    }
}

/// Runs phase two; returns false when the objective is unbounded.
fn simplex_phase2(
    tab: &mut Vec<Vec<Rational>>,
    rhs: &mut Vec<Rational>,
    basis: &mut Vec<usize>,
    cost: &[Rational],
    artificial_start: usize,
) -> Result<bool> {
    loop {
        maybe_abandon("MipProblem::solve")?;
        let reduced = reduced_costs(tab, basis, cost);
        let entering = (0..artificial_start).find(|&j| reduced[j].is_negative());
        let Some(col) = entering else {
            return Ok(true);
        };
        match leaving_row(tab, rhs, basis, col) {
            Some(row) => pivot(tab, rhs, basis, row, col),
            None => return Ok(false),
        }
    }
}

fn reduced_costs(tab: &[Vec<Rational>], basis: &[usize], cost: &[Rational]) -> Vec<Rational> {
    let mut reduced = cost.to_vec();
    for (r, &b) in basis.iter().enumerate() {
        if cost[b].is_zero() {
            continue;
        }
        for j in 0..reduced.len() {
            if !tab[r][j].is_zero() {
                let delta = &cost[b] * &tab[r][j];
                reduced[j] -= delta;
            }
        }
    }
    reduced
}

/// The Bland ratio test: the smallest ratio, ties broken by the lowest
/// basis index.
fn leaving_row(
    tab: &[Vec<Rational>],
    rhs: &[Rational],
    basis: &[usize],
    col: usize,
) -> Option<usize> {
    let mut best: Option<(Rational, usize, usize)> = None;
    for r in 0..tab.len() {
        if tab[r][col].is_positive() {
            let ratio = &rhs[r] / &tab[r][col];
            let candidate = (ratio, basis[r], r);
            best = Some(match best.take() {
                None => candidate,
                Some(b) => {
                    if candidate.0 < b.0 || (candidate.0 == b.0 && candidate.1 < b.1) {
                        candidate
                    } else {
                        b
                    }
                }
            });
        }
    }
    best.map(|(_, _, r)| r)
}

fn pivot(
    tab: &mut [Vec<Rational>],
    rhs: &mut [Rational],
    basis: &mut [usize],
    row: usize,
    col: usize,
) {
    let p = tab[row][col].clone();
    debug_assert!(!p.is_zero());
    for c in tab[row].iter_mut() {
        *c = std::mem::take(c) / &p;
    }
    rhs[row] /= &p;
    for r in 0..tab.len() {
        if r == row || tab[r][col].is_zero() {
            continue;
        }
        let factor = tab[r][col].clone();
        for j in 0..tab[r].len() {
            let delta = &factor * &tab[row][j];
            tab[r][j] -= delta;
        }
        let delta = &factor * &rhs[row];
        rhs[r] -= delta;
    }
    basis[row] = col;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::Topology;
    use polyhedra_arith::rational::ratio;

    fn diamond() -> ConstraintSystem {
        // |x| + |y| <= 1 as four constraints.
        let x = Variable(0);
        let y = Variable(1);
        let mut cs = ConstraintSystem::new(2, Topology::Closed);
        cs.insert((x + y).le(1)).unwrap();
        cs.insert((x - y).le(1)).unwrap();
        cs.insert((-x + y).le(1)).unwrap();
        cs.insert((-x - y).le(1)).unwrap();
        cs
    }

    #[test]
    fn test_maximize_over_diamond() {
        let x = Variable(0);
        let y = Variable(1);
        let mut p = MipProblem::from_constraints(
            &diamond(),
            LinearExpr::from_variable(x) + y,
            OptimizationMode::Maximization,
        )
        .unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::Optimized);
        assert_eq!(p.optimal_value().unwrap(), ratio(1, 1));
    }

    #[test]
    fn test_minimize_single_axis() {
        let x = Variable(0);
        let mut p = MipProblem::from_constraints(
            &diamond(),
            LinearExpr::from_variable(x),
            OptimizationMode::Minimization,
        )
        .unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::Optimized);
        assert_eq!(p.optimal_value().unwrap(), ratio(-1, 1));
        let g = p.optimizing_point().unwrap();
        assert!(g.is_point());
        assert_eq!(g.coefficient(x), Coefficient::from(-1));
    }

    #[test]
    fn test_unbounded() {
        let x = Variable(0);
        let mut cs = ConstraintSystem::new(1, Topology::Closed);
        cs.insert(x.ge(0)).unwrap();
        let mut p = MipProblem::from_constraints(
            &cs,
            LinearExpr::from_variable(x),
            OptimizationMode::Maximization,
        )
        .unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::Unbounded);
    }

    #[test]
    fn test_unfeasible() {
        let x = Variable(0);
        let mut cs = ConstraintSystem::new(1, Topology::Closed);
        cs.insert(x.ge(1)).unwrap();
        cs.insert(x.le(0)).unwrap();
        let mut p = MipProblem::from_constraints(
            &cs,
            LinearExpr::from_variable(x),
            OptimizationMode::Maximization,
        )
        .unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::Unfeasible);
    }

    #[test]
    fn test_equality_constraints() {
        let x = Variable(0);
        let y = Variable(1);
        let mut cs = ConstraintSystem::new(2, Topology::Closed);
        cs.insert((x + y).eq(4)).unwrap();
        cs.insert(x.ge(1)).unwrap();
        cs.insert(y.ge(1)).unwrap();
        let mut p = MipProblem::from_constraints(
            &cs,
            LinearExpr::from_variable(x),
            OptimizationMode::Maximization,
        )
        .unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::Optimized);
        assert_eq!(p.optimal_value().unwrap(), ratio(3, 1));
    }

    #[test]
    fn test_strict_rejected() {
        let x = Variable(0);
        let mut p = MipProblem::new(1);
        assert!(p.add_constraint(&x.gt(0)).is_err());
    }
}
