use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num::Zero;
use polyhedra_arith::Coefficient;
use serde::{Deserialize, Serialize};

/// A dimension of the vector space, numbered from 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Variable(pub usize);

impl Variable {
    pub fn id(self) -> usize {
        self.0
    }

    /// The least space dimension a set must have to constrain this variable.
    pub fn space_dimension(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A linear form `b + a0*x0 + a1*x1 + ...` with unbounded integer
/// coefficients. Slot 0 holds the inhomogeneous term.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    coeffs: Vec<Coefficient>,
}

impl LinearExpr {
    pub fn zero() -> Self {
        LinearExpr {
            coeffs: vec![Coefficient::zero()],
        }
    }

    pub fn constant(c: impl Into<Coefficient>) -> Self {
        LinearExpr {
            coeffs: vec![c.into()],
        }
    }

    pub fn from_variable(v: Variable) -> Self {
        let mut coeffs = vec![Coefficient::zero(); v.id() + 2];
        coeffs[v.id() + 1] = Coefficient::from(1);
        LinearExpr { coeffs }
    }

    /// Builds an expression from the inhomogeneous term and one coefficient
    /// per dimension.
    pub fn from_parts(inhomogeneous: Coefficient, homogeneous: Vec<Coefficient>) -> Self {
        let mut coeffs = Vec::with_capacity(homogeneous.len() + 1);
        coeffs.push(inhomogeneous);
        coeffs.extend(homogeneous);
        LinearExpr { coeffs }
    }

    pub fn space_dimension(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn inhomogeneous_term(&self) -> &Coefficient {
        &self.coeffs[0]
    }

    /// The coefficient of `v`, zero when the expression is too short.
    pub fn coefficient(&self, v: Variable) -> Coefficient {
        self.coeffs
            .get(v.id() + 1)
            .cloned()
            .unwrap_or_else(Coefficient::zero)
    }

    pub fn set_coefficient(&mut self, v: Variable, c: Coefficient) {
        self.grow(v.id() + 1);
        self.coeffs[v.id() + 1] = c;
    }

    pub fn set_inhomogeneous_term(&mut self, c: Coefficient) {
        self.coeffs[0] = c;
    }

    /// All slots, inhomogeneous term first.
    pub fn all_coefficients(&self) -> &[Coefficient] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_zero())
    }

    /// Whether every homogeneous coefficient is zero.
    pub fn all_homogeneous_terms_are_zero(&self) -> bool {
        self.coeffs[1..].iter().all(|c| c.is_zero())
    }

    fn grow(&mut self, dim: usize) {
        if self.coeffs.len() < dim + 1 {
            self.coeffs.resize(dim + 1, Coefficient::zero());
        }
    }
}

impl From<Variable> for LinearExpr {
    fn from(v: Variable) -> Self {
        LinearExpr::from_variable(v)
    }
}

impl From<i32> for LinearExpr {
    fn from(c: i32) -> Self {
        LinearExpr::constant(c)
    }
}

impl From<i64> for LinearExpr {
    fn from(c: i64) -> Self {
        LinearExpr::constant(c)
    }
}

impl From<Coefficient> for LinearExpr {
    fn from(c: Coefficient) -> Self {
        LinearExpr { coeffs: vec![c] }
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        let rhs = rhs.into();
        self.grow(rhs.space_dimension());
        for (lhs, r) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *lhs += r;
        }
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        let rhs = rhs.into();
        self.grow(rhs.space_dimension());
        for (lhs, r) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *lhs -= r;
        }
        self
    }
}

impl<T: Into<LinearExpr>> Add<T> for Variable {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from_variable(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for Variable {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from_variable(self) - rhs
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(mut self) -> LinearExpr {
        for c in self.coeffs.iter_mut() {
            *c = -std::mem::take(c);
        }
        self
    }
}

impl Neg for Variable {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        -LinearExpr::from_variable(self)
    }
}

impl Mul<i32> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: i32) -> LinearExpr {
        self * i64::from(rhs)
    }
}

impl Mul<i64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: i64) -> LinearExpr {
        let rhs = Coefficient::from(rhs);
        for c in self.coeffs.iter_mut() {
            *c *= &rhs;
        }
        self
    }
}

impl Mul<i32> for Variable {
    type Output = LinearExpr;

    fn mul(self, rhs: i32) -> LinearExpr {
        LinearExpr::from_variable(self) * i64::from(rhs)
    }
}

impl Mul<i64> for Variable {
    type Output = LinearExpr;

    fn mul(self, rhs: i64) -> LinearExpr {
        LinearExpr::from_variable(self) * rhs
    }
}

impl Mul<Coefficient> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: Coefficient) -> LinearExpr {
        for c in self.coeffs.iter_mut() {
            *c *= &rhs;
        }
        self
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (i, c) in self.coeffs.iter().enumerate().skip(1) {
            if c.is_zero() {
                continue;
            }
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "{}*x{}", c, i - 1)?;
        }
        if !self.coeffs[0].is_zero() || first {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}", self.coeffs[0])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let x = Variable(0);
        let y = Variable(1);
        let e = x * 2i32 + y - 3;
        assert_eq!(e.coefficient(x), Coefficient::from(2));
        assert_eq!(e.coefficient(y), Coefficient::from(1));
        assert_eq!(*e.inhomogeneous_term(), Coefficient::from(-3));
        assert_eq!(e.space_dimension(), 2);
    }

    #[test]
    fn test_neg() {
        let x = Variable(0);
        let e = -(x * 5i32 - 1);
        assert_eq!(e.coefficient(x), Coefficient::from(-5));
        assert_eq!(*e.inhomogeneous_term(), Coefficient::from(1));
    }

    #[test]
    fn test_short_expression_coefficient_is_zero() {
        let e = LinearExpr::from_variable(Variable(0));
        assert_eq!(e.coefficient(Variable(7)), Coefficient::zero());
    }
}
