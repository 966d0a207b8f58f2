//! The finite-union domain: a sequence of convex disjuncts read as their
//! set union.

use std::fmt::Debug;

use itertools::Itertools;

use crate::abandon::maybe_abandon;
use crate::domain::AbstractDomain;
use crate::error::{check_same_dimension, Result};

/// A finite union of elements of `D`.
#[derive(Clone, Debug, PartialEq)]
pub struct Powerset<D: AbstractDomain> {
    disjuncts: Vec<D>,
    space_dim: usize,
}

impl<D: AbstractDomain + Debug> Powerset<D> {
    /// The bottom element: no disjuncts.
    pub fn new_empty(space_dim: usize) -> Self {
        Powerset {
            disjuncts: Vec::new(),
            space_dim,
        }
    }

    pub fn from_disjunct(d: D) -> Self {
        let space_dim = d.space_dimension();
        Powerset {
            disjuncts: vec![d],
            space_dim,
        }
    }

    pub fn space_dimension(&self) -> usize {
        self.space_dim
    }

    pub fn num_disjuncts(&self) -> usize {
        self.disjuncts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &D> + '_ {
        self.disjuncts.iter()
    }

    pub fn is_empty(&self) -> Result<bool> {
        for d in &self.disjuncts {
            if !d.is_empty()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn add_disjunct(&mut self, d: D) -> Result<()> {
        check_same_dimension(
            "Powerset::add_disjunct",
            self.space_dim,
            d.space_dimension(),
        )?;
        if !d.is_empty()? {
            self.disjuncts.push(d);
        }
        Ok(())
    }

    /// Removes disjuncts contained in another disjunct (and empty ones).
    pub fn omega_reduce(&mut self) -> Result<()> {
        let mut kept: Vec<D> = Vec::new();
        'outer: for d in self.disjuncts.drain(..) {
            if d.is_empty()? {
                continue;
            }
            let mut i = 0;
            while i < kept.len() {
                if kept[i].contains(&d)? {
                    continue 'outer;
                }
                if d.contains(&kept[i])? {
                    kept.remove(i);
                } else {
                    i += 1;
                }
            }
            kept.push(d);
        }
        self.disjuncts = kept;
        Ok(())
    }

    /// Merges pairs whose join is exactly their union, repeating until no
    /// pair merges.
    pub fn pairwise_reduce(&mut self) -> Result<()> {
        self.omega_reduce()?;
        loop {
            maybe_abandon("Powerset::pairwise_reduce")?;
            let mut merged = false;
            'search: for i in 0..self.disjuncts.len() {
                for j in i + 1..self.disjuncts.len() {
                    let mut candidate = self.disjuncts[i].clone();
                    if candidate.upper_bound_assign_if_exact(&self.disjuncts[j])? {
                        self.disjuncts[i] = candidate;
                        self.disjuncts.remove(j);
                        merged = true;
                        break 'search;
                    }
                }
            }
            if !merged {
                return Ok(());
            }
        }
    }

    /// Entailment: every disjunct of `other` lies inside some disjunct.
    pub fn definitely_entails(&self, other: &Powerset<D>) -> Result<bool> {
        check_same_dimension(
            "Powerset::definitely_entails",
            self.space_dim,
            other.space_dim,
        )?;
        'outer: for d in &other.disjuncts {
            if d.is_empty()? {
                continue;
            }
            for s in &self.disjuncts {
                if s.contains(d)? {
                    continue 'outer;
                }
            }
            return Ok(false);
        }
        Ok(true)
    }

    pub fn intersection_assign(&mut self, other: &Powerset<D>) -> Result<()> {
        check_same_dimension(
            "Powerset::intersection_assign",
            self.space_dim,
            other.space_dim,
        )?;
        let mut products: Vec<D> = Vec::new();
        for (a, b) in self.disjuncts.iter().cartesian_product(&other.disjuncts) {
            let mut meet = a.clone();
            meet.intersection_assign(b)?;
            if !meet.is_empty()? {
                products.push(meet);
            }
        }
        self.disjuncts = products;
        self.omega_reduce()
    }

    /// Set union: concatenation plus omega reduction.
    pub fn upper_bound_assign(&mut self, other: &Powerset<D>) -> Result<()> {
        check_same_dimension(
            "Powerset::upper_bound_assign",
            self.space_dim,
            other.space_dim,
        )?;
        self.disjuncts.extend(other.disjuncts.iter().cloned());
        self.omega_reduce()
    }

    /// The single-disjunct hull of the union.
    fn collapsed(&self) -> Result<Option<D>> {
        let mut iter = self.disjuncts.iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut hull = first.clone();
        for d in iter {
            hull.upper_bound_assign(d)?;
        }
        Ok(Some(hull))
    }

    /// The BGP99 extrapolation: each disjunct is widened against an older
    /// disjunct it contains, then the sequence is omega-reduced and capped
    /// at the older iterate's cardinality by pairwise joins.
    pub fn bgp99_extrapolation_assign(&mut self, older: &Powerset<D>) -> Result<()> {
        check_same_dimension(
            "Powerset::bgp99_extrapolation_assign",
            self.space_dim,
            older.space_dim,
        )?;
        for d in &mut self.disjuncts {
            maybe_abandon("Powerset::bgp99_extrapolation_assign")?;
            for o in &older.disjuncts {
                if d.contains(o)? {
                    d.widening_assign(o, None)?;
                    break;
                }
            }
        }
        self.omega_reduce()?;
        let cap = older.disjuncts.len().max(1);
        while self.disjuncts.len() > cap {
            maybe_abandon("Powerset::bgp99_extrapolation_assign")?;
            let last = self.disjuncts.pop().expect("len > cap >= 1");
            let target = self.disjuncts.last_mut().expect("len >= 1");
            target.upper_bound_assign(&last)?;
        }
        self.omega_reduce()
    }

    /// The BHZ03 widening: when the disjunct count stopped shrinking the
    /// sequence collapses and the underlying widening takes over;
    /// otherwise the BGP99 step already certifies progress.
    pub fn bhz03_widening_assign(&mut self, older: &Powerset<D>) -> Result<()> {
        check_same_dimension(
            "Powerset::bhz03_widening_assign",
            self.space_dim,
            older.space_dim,
        )?;
        if self.disjuncts.len() <= older.disjuncts.len() {
            return self.bgp99_extrapolation_assign(older);
        }
        let Some(mut hull) = self.collapsed()? else {
            return Ok(());
        };
        if let Some(older_hull) = older.collapsed()? {
            if hull.contains(&older_hull)? {
                hull.widening_assign(&older_hull, None)?;
            }
        }
        self.disjuncts = vec![hull];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::IntervalBox;
    use crate::expr::Variable;
    use polyhedra_arith::rational::ratio;
    use polyhedra_arith::Rational;

    type QBox = IntervalBox<Rational>;

    fn interval_box(lo: i64, hi: i64) -> QBox {
        let mut b = QBox::universe(1).unwrap();
        b.interval_mut(Variable(0))
            .refine_lower(&ratio(lo, 1), false)
            .unwrap();
        b.interval_mut(Variable(0))
            .refine_upper(&ratio(hi, 1), false)
            .unwrap();
        b
    }

    #[test]
    fn test_omega_reduce_drops_contained() {
        let mut p = Powerset::new_empty(1);
        p.add_disjunct(interval_box(0, 10)).unwrap();
        p.add_disjunct(interval_box(2, 3)).unwrap();
        p.add_disjunct(interval_box(20, 30)).unwrap();
        p.omega_reduce().unwrap();
        assert_eq!(p.num_disjuncts(), 2);
    }

    #[test]
    fn test_pairwise_reduce_merges_touching() {
        let mut p = Powerset::new_empty(1);
        p.add_disjunct(interval_box(0, 5)).unwrap();
        p.add_disjunct(interval_box(5, 9)).unwrap();
        p.add_disjunct(interval_box(20, 30)).unwrap();
        p.pairwise_reduce().unwrap();
        assert_eq!(p.num_disjuncts(), 2);
    }

    #[test]
    fn test_entailment() {
        let mut p = Powerset::new_empty(1);
        p.add_disjunct(interval_box(0, 10)).unwrap();
        p.add_disjunct(interval_box(20, 30)).unwrap();
        let q = Powerset::from_disjunct(interval_box(1, 2));
        assert!(p.definitely_entails(&q).unwrap());
        let r = Powerset::from_disjunct(interval_box(15, 16));
        assert!(!p.definitely_entails(&r).unwrap());
    }

    #[test]
    fn test_intersection() {
        let mut p = Powerset::new_empty(1);
        p.add_disjunct(interval_box(0, 10)).unwrap();
        p.add_disjunct(interval_box(20, 30)).unwrap();
        let mut q = Powerset::new_empty(1);
        q.add_disjunct(interval_box(5, 25)).unwrap();
        p.intersection_assign(&q).unwrap();
        assert_eq!(p.num_disjuncts(), 2);
        assert!(p.definitely_entails(&Powerset::from_disjunct(interval_box(5, 10))).unwrap());
    }

    #[test]
    fn test_bgp99_widens_disjuncts() {
        let mut older = Powerset::new_empty(1);
        older.add_disjunct(interval_box(0, 1)).unwrap();
        let mut newer = Powerset::new_empty(1);
        newer.add_disjunct(interval_box(0, 5)).unwrap();
        newer.bgp99_extrapolation_assign(&older).unwrap();
        assert_eq!(newer.num_disjuncts(), 1);
        let widened = newer.iter().next().unwrap();
        assert!(widened.interval(Variable(0)).upper().is_unbounded());
    }

    #[test]
    fn test_bhz03_collapses_growth() {
        let mut older = Powerset::new_empty(1);
        older.add_disjunct(interval_box(0, 1)).unwrap();
        let mut newer = Powerset::new_empty(1);
        newer.add_disjunct(interval_box(0, 1)).unwrap();
        newer.add_disjunct(interval_box(10, 11)).unwrap();
        newer.add_disjunct(interval_box(20, 21)).unwrap();
        newer.bhz03_widening_assign(&older).unwrap();
        assert_eq!(newer.num_disjuncts(), 1);
    }
}
