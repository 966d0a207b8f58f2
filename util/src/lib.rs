#![allow(clippy::needless_range_loop)]

//! Small helpers shared by the `polyhedra` crates, mostly word-level
//! operations backing the saturation bit matrix.

/// Number of `u64` words needed to hold `n` bits.
pub const fn words_for_bits(n: usize) -> usize {
    ceil_div_usize(n, 64)
}

pub const fn ceil_div_usize(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// The word index and in-word mask addressing bit `i` of a packed row.
#[inline]
pub const fn bit_address(i: usize) -> (usize, u64) {
    (i / 64, 1u64 << (i % 64))
}

/// Number of set bits in a packed row.
pub fn count_ones(words: &[u64]) -> usize {
    words.iter().map(|w| w.count_ones() as usize).sum()
}

/// Whether the set of bits in `xs` is a subset of the set in `ys`.
///
/// The slices may differ in length; missing words are zero.
pub fn is_bit_subset(xs: &[u64], ys: &[u64]) -> bool {
    if xs.len() > ys.len() && xs[ys.len()..].iter().any(|&w| w != 0) {
        return false;
    }
    xs.iter().zip(ys).all(|(&x, &y)| x & !y == 0)
}

/// Rotates the elements of `xs` one step along the positions listed in
/// `cycle`: the element at `cycle[0]` moves to `cycle[1]`, and so on, the
/// last moving back to `cycle[0]`.
pub fn rotate_cycle<T>(xs: &mut [T], cycle: &[usize]) {
    for w in cycle.windows(2).rev() {
        xs.swap(w[0], w[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_for_bits() {
        assert_eq!(words_for_bits(0), 0);
        assert_eq!(words_for_bits(1), 1);
        assert_eq!(words_for_bits(64), 1);
        assert_eq!(words_for_bits(65), 2);
    }

    #[test]
    fn test_is_bit_subset() {
        assert!(is_bit_subset(&[0b0101], &[0b1101]));
        assert!(!is_bit_subset(&[0b0111], &[0b1101]));
        assert!(is_bit_subset(&[0b1, 0], &[0b1]));
        assert!(!is_bit_subset(&[0b1, 0b10], &[0b1]));
    }

    #[test]
    fn test_rotate_cycle() {
        let mut xs = vec![10, 11, 12, 13];
        rotate_cycle(&mut xs, &[0, 2, 3]);
        // 10 -> slot 2, 12 -> slot 3, 13 -> slot 0.
        assert_eq!(xs, vec![13, 11, 10, 12]);
    }

    #[test]
    fn test_subset_matches_reference() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let xs: Vec<u64> = (0..3).map(|_| rng.gen()).collect();
            let ys: Vec<u64> = xs.iter().map(|&x| x | rng.gen::<u64>()).collect();
            assert!(is_bit_subset(&xs, &ys));
            let flipped: Vec<u64> = ys.iter().map(|&y| !y).collect();
            if xs.iter().any(|&x| x != 0) {
                assert!(!is_bit_subset(&ys, &flipped) || ys.iter().all(|&y| y == 0));
            }
        }
    }
}
