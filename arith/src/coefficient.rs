use num::bigint::BigInt;
use num::{Integer, Signed, Zero};

/// The coefficient type of every linear row: an unbounded signed integer.
pub type Coefficient = BigInt;

/// Nonnegative gcd, with `gcd(0, 0) = 0`.
pub fn gcd(a: &Coefficient, b: &Coefficient) -> Coefficient {
    a.gcd(b)
}

pub fn lcm(a: &Coefficient, b: &Coefficient) -> Coefficient {
    a.lcm(b)
}

/// Divides `x` by `d`, which must divide it exactly.
pub fn exact_div_assign(x: &mut Coefficient, d: &Coefficient) {
    debug_assert!(!d.is_zero());
    debug_assert!((&*x % d).is_zero());
    *x /= d;
}

/// Gcd of the nonzero entries of `coeffs`, or zero if all entries are zero.
pub fn gcd_of_slice(coeffs: &[Coefficient]) -> Coefficient {
    let mut g = Coefficient::zero();
    for c in coeffs {
        if !c.is_zero() {
            g = g.gcd(c);
            if num::One::is_one(&g) {
                break;
            }
        }
    }
    g
}

/// Divides every entry by the gcd of the nonzero entries, making the slice
/// primitive. A zero slice is left untouched.
pub fn normalize_slice(coeffs: &mut [Coefficient]) {
    let g = gcd_of_slice(coeffs);
    if g.is_zero() || num::One::is_one(&g) {
        return;
    }
    for c in coeffs.iter_mut() {
        exact_div_assign(c, &g);
    }
}

/// Sign of a coefficient as -1, 0, or 1.
pub fn sign(c: &Coefficient) -> i32 {
    if c.is_zero() {
        0
    } else if c.is_positive() {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: i64) -> Coefficient {
        Coefficient::from(n)
    }

    #[test]
    fn test_normalize_slice() {
        let mut v = vec![c(6), c(-9), c(0), c(12)];
        normalize_slice(&mut v);
        assert_eq!(v, vec![c(2), c(-3), c(0), c(4)]);

        let mut z = vec![c(0), c(0)];
        normalize_slice(&mut z);
        assert_eq!(z, vec![c(0), c(0)]);
    }

    #[test]
    fn test_exact_div() {
        let mut x = c(42);
        exact_div_assign(&mut x, &c(-7));
        assert_eq!(x, c(-6));
    }
}
