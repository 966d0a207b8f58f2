use polyhedra_util::{bit_address, count_ones, is_bit_subset, words_for_bits};
use serde::{Deserialize, Serialize};

/// A packed row of bits.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BitRow {
    words: Vec<u64>,
}

impl BitRow {
    pub fn new(num_bits: usize) -> Self {
        BitRow {
            words: vec![0; words_for_bits(num_bits)],
        }
    }

    pub fn get(&self, i: usize) -> bool {
        let (w, mask) = bit_address(i);
        self.words.get(w).is_some_and(|word| word & mask != 0)
    }

    pub fn set(&mut self, i: usize) {
        let (w, mask) = bit_address(i);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= mask;
    }

    pub fn clear(&mut self, i: usize) {
        let (w, mask) = bit_address(i);
        if w < self.words.len() {
            self.words[w] &= !mask;
        }
    }

    pub fn count_ones(&self) -> usize {
        count_ones(&self.words)
    }

    /// Set intersection with `other`.
    pub fn and(&self, other: &BitRow) -> BitRow {
        let words = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(&a, &b)| a & b)
            .collect();
        BitRow { words }
    }

    /// Set union with `other`, in place.
    pub fn or_assign(&mut self, other: &BitRow) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    /// Whether this row's set of bits is contained in `other`'s.
    pub fn is_subset_of(&self, other: &BitRow) -> bool {
        is_bit_subset(&self.words, &other.words)
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Grows the addressable width; new bits are unset.
    pub fn grow(&mut self, num_bits: usize) {
        let need = words_for_bits(num_bits);
        if self.words.len() < need {
            self.words.resize(need, 0);
        }
    }
}

/// A matrix of bits: one row per generator-side row, one column per
/// constraint-side row, a set bit meaning the generator saturates the
/// constraint.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BitMatrix {
    rows: Vec<BitRow>,
    num_cols: usize,
}

impl BitMatrix {
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        BitMatrix {
            rows: vec![BitRow::new(num_cols); num_rows],
            num_cols,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn row(&self, i: usize) -> &BitRow {
        &self.rows[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut BitRow {
        &mut self.rows[i]
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.rows[i].get(j)
    }

    pub fn set(&mut self, i: usize, j: usize) {
        debug_assert!(j < self.num_cols);
        self.rows[i].set(j);
    }

    pub fn push_row(&mut self, row: BitRow) {
        self.rows.push(row);
    }

    pub fn remove_row(&mut self, i: usize) -> BitRow {
        self.rows.remove(i)
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) {
        self.rows.swap(i, j);
    }

    pub fn truncate_rows(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Adds `n` columns of unset bits.
    pub fn add_cols(&mut self, n: usize) {
        self.num_cols += n;
        for row in &mut self.rows {
            row.grow(self.num_cols);
        }
    }

    pub fn transpose(&self) -> BitMatrix {
        let mut t = BitMatrix::new(self.num_cols, self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            for j in 0..self.num_cols {
                if row.get(j) {
                    t.set(j, i);
                }
            }
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_count() {
        let mut m = BitMatrix::new(2, 100);
        m.set(0, 3);
        m.set(0, 99);
        m.set(1, 64);
        assert!(m.get(0, 3) && m.get(0, 99) && m.get(1, 64));
        assert!(!m.get(1, 63));
        assert_eq!(m.row(0).count_ones(), 2);
    }

    #[test]
    fn test_subset_and_and() {
        let mut a = BitRow::new(10);
        let mut b = BitRow::new(10);
        a.set(1);
        a.set(4);
        b.set(1);
        b.set(4);
        b.set(7);
        assert!(a.is_subset_of(&b));
        assert!(!b.is_subset_of(&a));
        assert_eq!(a.and(&b), a);
    }

    #[test]
    fn test_transpose() {
        let mut m = BitMatrix::new(2, 3);
        m.set(0, 2);
        m.set(1, 0);
        let t = m.transpose();
        assert_eq!(t.num_rows(), 3);
        assert!(t.get(2, 0));
        assert!(t.get(0, 1));
        assert!(!t.get(1, 0));
    }
}
