//! Widenings and extrapolations. Every operator takes the previous,
//! smaller iterate as its argument and guarantees the result contains the
//! receiver; an optional token budget absorbs precision-losing steps.

use crate::constraint::ConstraintSystem;
use crate::error::{check_same_dimension, Error, Result};
use crate::polyhedron::{generator_satisfies, Polyhedron};
use crate::relation::PolyConRelation;

impl Polyhedron {
    /// The standard constraint-selection widening: keep the constraints of
    /// the previous iterate that every generator of the current one
    /// satisfies.
    ///
    /// Requires `older` to be contained in `self`. A consumed token is
    /// only decremented when a widening step is actually absorbed; an
    /// unwind leaves the budget untouched.
    pub fn h79_widening_assign(
        &mut self,
        older: &Polyhedron,
        tp: Option<&mut u32>,
    ) -> Result<()> {
        check_same_dimension(
            "Polyhedron::h79_widening_assign",
            self.space_dimension(),
            older.space_dimension(),
        )?;
        if self.topology() != older.topology() {
            return Err(Error::invalid_argument(
                "Polyhedron::h79_widening_assign",
                "topology mismatch",
            ));
        }
        if older.is_empty()? || self.is_empty()? {
            return Ok(());
        }
        let widened = self.h79_candidate(older)?;
        self.commit_widening(widened, tp)
    }

    fn h79_candidate(&self, older: &Polyhedron) -> Result<Polyhedron> {
        let gens = self
            .updated_generators()?
            .expect("receiver is nonempty here");
        let mut kept = ConstraintSystem::new(self.space_dimension(), self.topology());
        for c in older_inequality_view(older)? {
            if gens.iter().all(|g| generator_satisfies(g, &c)) {
                kept.insert(c)?;
            }
        }
        let mut widened = Polyhedron::universe(self.space_dimension(), self.topology())?;
        widened.add_constraints(&kept)?;
        Ok(widened)
    }

    fn commit_widening(&mut self, widened: Polyhedron, tp: Option<&mut u32>) -> Result<()> {
        debug_assert!(widened.contains(self)?);
        if let Some(tokens) = tp {
            if *tokens > 0 && !self.contains(&widened)? {
                *tokens -= 1;
                return Ok(());
            }
        }
        *self = widened;
        Ok(())
    }

    /// H79 with a set of extrapolation constraints: those of `cs` the
    /// receiver already satisfies survive the widening.
    pub fn limited_h79_extrapolation_assign(
        &mut self,
        older: &Polyhedron,
        cs: &ConstraintSystem,
        tp: Option<&mut u32>,
    ) -> Result<()> {
        if self.topology() == crate::linear::Topology::Closed && cs.has_strict_inequalities() {
            return Err(Error::invalid_argument(
                "Polyhedron::limited_h79_extrapolation_assign",
                "strict inequality in a necessarily closed polyhedron",
            ));
        }
        let mut keep = ConstraintSystem::new(self.space_dimension(), self.topology());
        for c in cs.iter() {
            if self
                .relation_with_constraint(c)?
                .implies(PolyConRelation::is_included())
            {
                keep.insert(c.clone())?;
            }
        }
        self.h79_widening_assign(older, tp)?;
        self.add_constraints(&keep)
    }

    /// Limited extrapolation whose constraint set is enlarged with the
    /// bounding box of the receiver.
    pub fn bounded_h79_extrapolation_assign(
        &mut self,
        older: &Polyhedron,
        cs: &ConstraintSystem,
        tp: Option<&mut u32>,
    ) -> Result<()> {
        let boxed = crate::boxes::IntervalBox::<polyhedra_arith::Rational>::from_polyhedron(
            self,
            crate::boxes::Complexity::Any,
        )?;
        let mut enlarged = cs.clone();
        for c in boxed.constraints()?.iter() {
            enlarged.insert(c.clone())?;
        }
        self.limited_h79_extrapolation_assign(older, &enlarged, tp)
    }

    /// The refined widening: improve on H79 by combining pairs of dropped
    /// constraints of the previous iterate, provided the candidate stays
    /// between the iterates and certifies progress with strictly more
    /// constraints; fall back to H79 otherwise.
    pub fn bhrz03_widening_assign(
        &mut self,
        older: &Polyhedron,
        tp: Option<&mut u32>,
    ) -> Result<()> {
        check_same_dimension(
            "Polyhedron::bhrz03_widening_assign",
            self.space_dimension(),
            older.space_dimension(),
        )?;
        if self.topology() != older.topology() {
            return Err(Error::invalid_argument(
                "Polyhedron::bhrz03_widening_assign",
                "topology mismatch",
            ));
        }
        if older.is_empty()? || self.is_empty()? {
            return Ok(());
        }
        let h79 = self.h79_candidate(older)?;
        let gens = self
            .updated_generators()?
            .expect("receiver is nonempty here");
        let dropped: Vec<_> = older_inequality_view(older)?
            .into_iter()
            .filter(|c| !gens.iter().all(|g| generator_satisfies(g, c)))
            .collect();
        let mut combined = ConstraintSystem::new(self.space_dimension(), self.topology());
        for (i, c1) in dropped.iter().enumerate() {
            for c2 in dropped.iter().skip(i + 1) {
                let sum = c1.linear_expr() + c2.linear_expr();
                let candidate = sum.ge(0);
                if gens.iter().all(|g| generator_satisfies(g, &candidate)) {
                    combined.insert(candidate)?;
                }
            }
        }
        if combined.is_empty() {
            return self.commit_widening(h79, tp);
        }
        let mut refined = h79.clone();
        refined.add_constraints(&combined)?;
        // Certificate: strictly more constraints than plain H79 while
        // still containing the receiver.
        let improves = refined.contains(self)? && {
            let mut r = refined.clone();
            let mut h = h79.clone();
            r.minimized_constraints()?.num_rows() > h.minimized_constraints()?.num_rows()
        };
        if improves {
            self.commit_widening(refined, tp)
        } else {
            self.commit_widening(h79, tp)
        }
    }
}

/// The previous iterate's minimized constraints with every equality split
/// into its two half-spaces, the form constraint selection works on.
fn older_inequality_view(older: &Polyhedron) -> Result<Vec<crate::constraint::Constraint>> {
    let older_cs = {
        let mut o = older.clone();
        o.minimized_constraints()?
    };
    let mut out = Vec::new();
    for c in older_cs.iter() {
        if c.is_equality() {
            let e = c.linear_expr();
            out.push(e.clone().ge(0));
            out.push(e.le(0));
        } else {
            out.push(c.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Variable;
    use crate::linear::Topology;

    fn x() -> Variable {
        Variable(0)
    }

    fn interval(lo: i64, hi: i64) -> Polyhedron {
        let mut ph = Polyhedron::universe(1, Topology::Closed).unwrap();
        ph.add_constraint(&x().ge(lo)).unwrap();
        ph.add_constraint(&x().le(hi)).unwrap();
        ph
    }

    #[test]
    fn test_h79_widening_saturates() {
        // Widening the growing chain {x = 0}, {0 <= x <= 1}, ...
        // stabilizes at {x >= 0} after one step.
        let p0 = interval(0, 0);
        let mut p1 = interval(0, 1);
        p1.h79_widening_assign(&p0, None).unwrap();
        let mut expected = Polyhedron::universe(1, Topology::Closed).unwrap();
        expected.add_constraint(&x().ge(0)).unwrap();
        assert!(p1.contains(&expected).unwrap());
        assert!(expected.contains(&p1).unwrap());

        // The next step is stationary.
        let mut p2 = p1.clone();
        p2.add_constraint(&x().le(2)).unwrap();
        let mut next = p1.clone();
        next.poly_hull_assign(&p2).unwrap();
        next.h79_widening_assign(&p1, None).unwrap();
        assert!(next.contains(&p1).unwrap());
        assert!(p1.contains(&next).unwrap());
    }

    #[test]
    fn test_widening_is_upper_bound() {
        let old = interval(0, 1);
        let mut new = interval(0, 5);
        let before = new.clone();
        new.h79_widening_assign(&old, None).unwrap();
        assert!(new.contains(&before).unwrap());
        assert!(new.contains(&old).unwrap());
    }

    #[test]
    fn test_token_absorbs_step() {
        let old = interval(0, 1);
        let mut new = interval(0, 5);
        let mut tokens = 1u32;
        new.h79_widening_assign(&old, Some(&mut tokens)).unwrap();
        assert_eq!(tokens, 0);
        // The token swallowed the widening: still bounded.
        assert!(new.is_bounded().unwrap());
        new.h79_widening_assign(&old, Some(&mut tokens)).unwrap();
        assert!(!new.is_bounded().unwrap());
    }

    #[test]
    fn test_limited_extrapolation_keeps_bound() {
        let old = interval(0, 1);
        let mut new = interval(0, 5);
        let mut cs = ConstraintSystem::new(1, Topology::Closed);
        cs.insert(x().le(100)).unwrap();
        new.limited_h79_extrapolation_assign(&old, &cs, None).unwrap();
        assert!(new.is_bounded().unwrap());
        assert!(new
            .relation_with_constraint(&x().le(100))
            .unwrap()
            .implies(PolyConRelation::is_included()));
    }

    #[test]
    fn test_bhrz03_sound_and_no_looser_than_needed() {
        let old = interval(0, 1);
        let mut new = interval(0, 5);
        let before = new.clone();
        new.bhrz03_widening_assign(&old, None).unwrap();
        assert!(new.contains(&before).unwrap());
        assert!(new.contains(&old).unwrap());
    }
}
