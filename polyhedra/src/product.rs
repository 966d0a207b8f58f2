//! Partially reduced products: two domains tracking the same points,
//! synchronized by a pluggable reduction strategy.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::abandon::maybe_abandon;
use crate::domain::AbstractDomain;
use crate::error::{check_same_dimension, Result};

/// How the two components inform each other after an operation.
pub trait Reduction {
    fn reduce<D1: AbstractDomain, D2: AbstractDomain>(d1: &mut D1, d2: &mut D2) -> Result<()>;
}

/// No propagation at all.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoReduction;

impl Reduction for NoReduction {
    fn reduce<D1: AbstractDomain, D2: AbstractDomain>(_d1: &mut D1, _d2: &mut D2) -> Result<()> {
        Ok(())
    }
}

/// Emptiness propagates: if either component is empty, both become empty.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SmashReduction;

impl Reduction for SmashReduction {
    fn reduce<D1: AbstractDomain, D2: AbstractDomain>(d1: &mut D1, d2: &mut D2) -> Result<()> {
        if d1.is_empty()? {
            d2.make_empty();
        } else if d2.is_empty()? {
            d1.make_empty();
        }
        Ok(())
    }
}

/// Each component refines the other with its constraints, to a fixpoint or
/// until the abandon handler fires.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ConstraintsReduction;

impl Reduction for ConstraintsReduction {
    fn reduce<D1: AbstractDomain, D2: AbstractDomain>(d1: &mut D1, d2: &mut D2) -> Result<()> {
        loop {
            maybe_abandon("ConstraintsReduction::reduce")?;
            let before1 = d1.clone();
            let before2 = d2.clone();
            let cs1 = d1.constraints()?;
            d2.refine_with_constraints(&cs1)?;
            let cs2 = d2.constraints()?;
            d1.refine_with_constraints(&cs2)?;
            if *d1 == before1 && *d2 == before2 {
                return Ok(());
            }
        }
    }
}

/// The product of two domains over the same space, reduced by `R`.
#[derive(Clone, Debug, PartialEq)]
pub struct PartiallyReducedProduct<D1: AbstractDomain, D2: AbstractDomain, R: Reduction> {
    first: D1,
    second: D2,
    _reduction: PhantomData<R>,
}

impl<D1, D2, R> PartiallyReducedProduct<D1, D2, R>
where
    D1: AbstractDomain + Debug,
    D2: AbstractDomain + Debug,
    R: Reduction,
{
    pub fn new(first: D1, second: D2) -> Result<Self> {
        check_same_dimension(
            "PartiallyReducedProduct::new",
            first.space_dimension(),
            second.space_dimension(),
        )?;
        let mut product = PartiallyReducedProduct {
            first,
            second,
            _reduction: PhantomData,
        };
        product.reduce()?;
        Ok(product)
    }

    pub fn space_dimension(&self) -> usize {
        self.first.space_dimension()
    }

    pub fn first(&self) -> &D1 {
        &self.first
    }

    pub fn second(&self) -> &D2 {
        &self.second
    }

    /// Re-runs the reduction strategy.
    pub fn reduce(&mut self) -> Result<()> {
        R::reduce(&mut self.first, &mut self.second)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.first.is_empty()? || self.second.is_empty()?)
    }

    pub fn contains(&self, other: &Self) -> Result<bool> {
        Ok(self.first.contains(&other.first)? && self.second.contains(&other.second)?)
    }

    pub fn intersection_assign(&mut self, other: &Self) -> Result<()> {
        self.first.intersection_assign(&other.first)?;
        self.second.intersection_assign(&other.second)?;
        self.reduce()
    }

    pub fn upper_bound_assign(&mut self, other: &Self) -> Result<()> {
        self.first.upper_bound_assign(&other.first)?;
        self.second.upper_bound_assign(&other.second)?;
        self.reduce()
    }

    pub fn widening_assign(&mut self, older: &Self, mut tp: Option<&mut u32>) -> Result<()> {
        self.first
            .widening_assign(&older.first, tp.as_deref_mut())?;
        self.second.widening_assign(&older.second, tp)?;
        // No reduction here: tightening a widened iterate can defeat
        // termination.
        Ok(())
    }

    pub fn refine_with_constraints(
        &mut self,
        cs: &crate::constraint::ConstraintSystem,
    ) -> Result<()> {
        self.first.refine_with_constraints(cs)?;
        self.second.refine_with_constraints(cs)?;
        self.reduce()
    }
}
