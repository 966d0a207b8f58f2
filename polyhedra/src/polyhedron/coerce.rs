//! Bound queries over the generator side and the coercions between
//! polyhedra and boxes.

use num::{Signed, Zero};
use polyhedra_arith::rational::from_coefficients;
use polyhedra_arith::{IntervalScalar, Rational};

use crate::abandon::maybe_abandon;
use crate::boxes::{Complexity, IntervalBox};
use crate::error::{Error, Result};
use crate::expr::{LinearExpr, Variable};
use crate::generator::GeneratorType;
use crate::polyhedron::Polyhedron;

/// The exact range of a linear expression over a nonempty polyhedron:
/// `(lower, upper)` with `None` for an unbounded side.
pub fn bounds_on_expr(
    ph: &Polyhedron,
    e: &LinearExpr,
) -> Result<(Option<Rational>, Option<Rational>)> {
    let gens = match ph.updated_generators()? {
        Some(gs) => gs,
        None => {
            return Err(Error::invalid_argument(
                "bounds_on_expr",
                "the polyhedron is empty",
            ));
        }
    };
    let mut lower: Option<Rational> = None;
    let mut upper: Option<Rational> = None;
    let mut unbounded_below = false;
    let mut unbounded_above = false;
    for g in gens.iter() {
        let mut direction = <Rational as num::Zero>::zero();
        for i in 0..ph.space_dimension() {
            let a = e.coefficient(Variable(i));
            if !a.is_zero() {
                direction += Rational::from(a) * Rational::from(g.coefficient(Variable(i)));
            }
        }
        match g.generator_type() {
            GeneratorType::Line => {
                if !direction.is_zero() {
                    unbounded_below = true;
                    unbounded_above = true;
                }
            }
            GeneratorType::Ray => {
                if direction.is_positive() {
                    unbounded_above = true;
                } else if direction.is_negative() {
                    unbounded_below = true;
                }
            }
            GeneratorType::Point | GeneratorType::ClosurePoint => {
                let d = g.divisor().expect("pointlike").clone();
                let value = direction / Rational::from(d)
                    + Rational::from(e.inhomogeneous_term().clone());
                lower = Some(match lower {
                    None => value.clone(),
                    Some(lo) => lo.min(value.clone()),
                });
                upper = Some(match upper {
                    None => value.clone(),
                    Some(hi) => hi.max(value),
                });
            }
        }
    }
    Ok((
        if unbounded_below { None } else { lower },
        if unbounded_above { None } else { upper },
    ))
}

impl Polyhedron {
    pub fn bounds_from_above(&self, e: &LinearExpr) -> Result<bool> {
        if self.is_empty()? {
            return Ok(true);
        }
        Ok(bounds_on_expr(self, e)?.1.is_some())
    }

    pub fn bounds_from_below(&self, e: &LinearExpr) -> Result<bool> {
        if self.is_empty()? {
            return Ok(true);
        }
        Ok(bounds_on_expr(self, e)?.0.is_some())
    }

    /// The supremum of `e` and whether a point of the set attains it;
    /// `None` when empty or unbounded above.
    pub fn maximize(&self, e: &LinearExpr) -> Result<Option<(Rational, bool)>> {
        if self.is_empty()? {
            return Ok(None);
        }
        let (_, upper) = bounds_on_expr(self, e)?;
        let Some(sup) = upper else {
            return Ok(None);
        };
        let attained = self.value_attained(e, &sup)?;
        Ok(Some((sup, attained)))
    }

    /// The infimum of `e` and whether it is attained; `None` when empty or
    /// unbounded below.
    pub fn minimize_value(&self, e: &LinearExpr) -> Result<Option<(Rational, bool)>> {
        if self.is_empty()? {
            return Ok(None);
        }
        let (lower, _) = bounds_on_expr(self, e)?;
        let Some(inf) = lower else {
            return Ok(None);
        };
        let attained = self.value_attained(e, &inf)?;
        Ok(Some((inf, attained)))
    }

    /// Whether some actual point (not a mere closure point) evaluates `e`
    /// to `value`.
    fn value_attained(&self, e: &LinearExpr, value: &Rational) -> Result<bool> {
        let gens = self.updated_generators()?.expect("nonempty");
        for g in gens.iter() {
            if g.generator_type() != GeneratorType::Point {
                continue;
            }
            let d = g.divisor()?.clone();
            let mut acc = Rational::from(e.inhomogeneous_term().clone());
            for i in 0..self.space_dimension() {
                let a = e.coefficient(Variable(i));
                if !a.is_zero() {
                    acc += Rational::from(a)
                        * from_coefficients(g.coefficient(Variable(i)), d.clone());
                }
            }
            if &acc == value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Builds the polyhedron described by a box's constraints.
    pub fn from_box<S: IntervalScalar>(b: &IntervalBox<S>) -> Result<Polyhedron> {
        Polyhedron::from_constraints(b.constraints()?)
    }
}

impl<S: IntervalScalar> IntervalBox<S> {
    /// The box enclosing a polyhedron, at the requested effort:
    /// `Polynomial` reads only the interval constraints, `Simplex`
    /// propagates every constraint to a fixpoint, `Any` extracts the exact
    /// per-axis bounds from the generators.
    pub fn from_polyhedron(ph: &Polyhedron, complexity: Complexity) -> Result<Self> {
        let n = ph.space_dimension();
        if ph.is_empty()? {
            return IntervalBox::empty(n);
        }
        let mut result = IntervalBox::universe(n)?;
        match complexity {
            Complexity::Polynomial => {
                result.refine_with_constraints(&ph.constraints()?)?;
            }
            Complexity::Simplex => {
                let cs = ph.constraints()?;
                loop {
                    maybe_abandon("IntervalBox::from_polyhedron")?;
                    let before = result.clone();
                    for c in cs.iter() {
                        result.propagate_constraint(c)?;
                    }
                    if result == before {
                        break;
                    }
                }
            }
            Complexity::Any => {
                for k in 0..n {
                    let v = LinearExpr::from_variable(Variable(k));
                    if let Some((sup, attained)) = ph.maximize(&v)? {
                        result
                            .interval_mut(Variable(k))
                            .refine_upper(&sup, !attained && S::CAN_BE_OPEN)?;
                    }
                    if let Some((inf, attained)) = ph.minimize_value(&v)? {
                        result
                            .interval_mut(Variable(k))
                            .refine_lower(&inf, !attained && S::CAN_BE_OPEN)?;
                    }
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::Topology;
    use polyhedra_arith::rational::ratio;

    fn x() -> Variable {
        Variable(0)
    }

    fn y() -> Variable {
        Variable(1)
    }

    fn diamondish() -> Polyhedron {
        // The S6 polyhedron: {x+y<=1, x-y<=1, -x<=1, -y<=1}.
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&(x() + y()).le(1)).unwrap();
        ph.add_constraint(&(x() - y()).le(1)).unwrap();
        ph.add_constraint(&(-x()).le(1)).unwrap();
        ph.add_constraint(&(-y()).le(1)).unwrap();
        ph
    }

    #[test]
    fn test_maximize_over_polyhedron() {
        let ph = diamondish();
        let (max, attained) = ph.maximize(&LinearExpr::from_variable(x())).unwrap().unwrap();
        assert_eq!(max, ratio(1, 1));
        assert!(attained);
        let (min, _) = ph
            .minimize_value(&LinearExpr::from_variable(x()))
            .unwrap()
            .unwrap();
        assert_eq!(min, ratio(-1, 1));
    }

    #[test]
    fn test_unbounded_direction() {
        let mut ph = Polyhedron::universe(1, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        assert!(ph.maximize(&LinearExpr::from_variable(x())).unwrap().is_none());
        assert!(ph.bounds_from_below(&LinearExpr::from_variable(x())).unwrap());
        assert!(!ph.bounds_from_above(&LinearExpr::from_variable(x())).unwrap());
    }

    #[test]
    fn test_s6_box_coercion() {
        let ph = diamondish();
        let b = IntervalBox::<Rational>::from_polyhedron(&ph, Complexity::Simplex).unwrap();
        // Propagation widens past the LP optimum along both axes.
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.lower().value,
            polyhedra_arith::bound::Bound::Finite(ratio(-1, 1))
        );
        assert_eq!(
            ix.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(2, 1))
        );
        let iy = b.interval(y()).to_rational_interval();
        assert_eq!(
            iy.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(2, 1))
        );
        // The reconstructed polyhedron strictly contains the original.
        let back = Polyhedron::from_box(&b).unwrap();
        assert!(back.strictly_contains(&ph).unwrap());
    }

    #[test]
    fn test_exact_box_via_generators() {
        let ph = diamondish();
        let b = IntervalBox::<Rational>::from_polyhedron(&ph, Complexity::Any).unwrap();
        let ix = b.interval(x()).to_rational_interval();
        assert_eq!(
            ix.upper().value,
            polyhedra_arith::bound::Bound::Finite(ratio(1, 1))
        );
        let back = Polyhedron::from_box(&b).unwrap();
        assert!(back.contains(&ph).unwrap());
    }

    #[test]
    fn test_coercion_round_trip_is_identity_on_boxes() {
        // Property 4 equality case: a polyhedron that is already a box.
        let mut ph = Polyhedron::universe(2, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(0)).unwrap();
        ph.add_constraint(&x().le(1)).unwrap();
        ph.add_constraint(&y().ge(-2)).unwrap();
        ph.add_constraint(&y().le(2)).unwrap();
        let b = IntervalBox::<Rational>::from_polyhedron(&ph, Complexity::Any).unwrap();
        let back = Polyhedron::from_box(&b).unwrap();
        assert!(back.contains(&ph).unwrap());
        assert!(ph.contains(&back).unwrap());
    }
}
