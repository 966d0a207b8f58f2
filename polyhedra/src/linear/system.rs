use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::linear::row::{LinearRow, RowKind, Topology};

/// An ordered multiset of rows sharing a width and a topology, with a
/// sortedness flag and a boundary separating incorporated rows from pending
/// ones.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinearSystem {
    rows: Vec<LinearRow>,
    row_size: usize,
    topology: Topology,
    sorted: bool,
    first_pending: usize,
}

impl LinearSystem {
    pub fn new(row_size: usize, topology: Topology) -> Self {
        debug_assert!(row_size >= 1);
        LinearSystem {
            rows: Vec::new(),
            row_size,
            topology,
            sorted: true,
            first_pending: 0,
        }
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn first_pending_index(&self) -> usize {
        self.first_pending
    }

    pub fn num_pending_rows(&self) -> usize {
        self.rows.len() - self.first_pending
    }

    pub fn rows(&self) -> &[LinearRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [LinearRow] {
        self.sorted = false;
        &mut self.rows
    }

    pub fn row(&self, i: usize) -> &LinearRow {
        &self.rows[i]
    }

    pub fn into_rows(self) -> Vec<LinearRow> {
        self.rows
    }

    pub fn num_lines_or_equalities(&self) -> usize {
        self.rows.iter().filter(|r| r.is_line_or_equality()).count()
    }

    /// Appends an incorporated row. Must not be called while pending rows
    /// exist; use [`LinearSystem::add_pending_row`] for those.
    pub fn add_row(&mut self, row: LinearRow) {
        debug_assert_eq!(self.first_pending, self.rows.len());
        debug_assert_eq!(row.size(), self.row_size);
        if self.sorted && !self.rows.is_empty() {
            let last = self.rows.last().expect("nonempty");
            self.sorted = last.compare(&row) != std::cmp::Ordering::Greater;
        }
        self.rows.push(row);
        self.first_pending = self.rows.len();
    }

    /// Appends a row to the pending partition.
    pub fn add_pending_row(&mut self, row: LinearRow) {
        debug_assert_eq!(row.size(), self.row_size);
        self.rows.push(row);
    }

    /// Promotes every pending row to incorporated status. Sortedness of the
    /// whole system is not re-established here; call
    /// [`LinearSystem::sort_rows`] when it is wanted.
    pub fn unset_pending_rows(&mut self) {
        if self.first_pending != self.rows.len() {
            self.first_pending = self.rows.len();
            self.sorted = self.rows.len() <= 1;
            if !self.sorted {
                self.sorted = self
                    .rows
                    .windows(2)
                    .all(|w| w[0].compare(&w[1]) != std::cmp::Ordering::Greater);
            }
        }
    }

    /// Sorts the incorporated rows by the documented key and merges exact
    /// duplicates. Pending rows are untouched and keep following the
    /// incorporated part.
    pub fn sort_rows(&mut self) {
        let pending: Vec<LinearRow> = self.rows.drain(self.first_pending..).collect();
        self.rows.sort_by(|x, y| x.compare(y));
        self.rows.dedup_by(|x, y| x == y);
        self.first_pending = self.rows.len();
        self.rows.extend(pending);
        self.sorted = true;
    }

    /// Removes the row at `i`, giving up order (the sorted flag drops
    /// unless the system trivially stays sorted).
    pub fn remove_row(&mut self, i: usize) -> LinearRow {
        let row = self.rows.remove(i);
        if i < self.first_pending {
            self.first_pending -= 1;
        }
        self.sorted = self.rows.len() <= 1;
        row
    }

    /// Keeps only the rows accepted by `keep`, preserving order.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&LinearRow) -> bool) {
        let mut i = 0;
        let mut removed_before_pending = 0;
        let first_pending = self.first_pending;
        self.rows.retain(|r| {
            let k = keep(r);
            if !k && i < first_pending {
                removed_before_pending += 1;
            }
            i += 1;
            k
        });
        self.first_pending -= removed_before_pending;
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) {
        self.rows.swap(i, j);
        if i != j {
            self.sorted = self.rows.len() <= 1;
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.first_pending = 0;
        self.sorted = true;
    }

    /// Applies the permutation given as 1-origin cycles terminated by 0 to
    /// the columns of every row: within a cycle `(c1 ... ck)` the content of
    /// column `c1` moves to `c2`, and so on, `ck` wrapping to `c1`.
    pub fn permute_columns(&mut self, cycles: &[usize]) -> Result<()> {
        let mut start = 0;
        for (i, &c) in cycles.iter().enumerate() {
            if c == 0 {
                let cycle = &cycles[start..i];
                if cycle.iter().any(|&c| c >= self.row_size) {
                    return Err(Error::invalid_argument(
                        "LinearSystem::permute_columns",
                        "cycle index out of range",
                    ));
                }
                if cycle.len() > 1 {
                    for row in &mut self.rows {
                        polyhedra_util::rotate_cycle(row.coeffs_mut(), cycle);
                    }
                }
                start = i + 1;
            }
        }
        if start != cycles.len() {
            return Err(Error::invalid_argument(
                "LinearSystem::permute_columns",
                "cycle list not terminated by 0",
            ));
        }
        self.sorted = self.rows.len() <= 1;
        Ok(())
    }

    /// Inserts `n` zero columns before the last `trailing` columns of every
    /// row.
    pub fn add_zero_columns(&mut self, n: usize, trailing: usize) -> Result<()> {
        let new_size = self
            .row_size
            .checked_add(n)
            .ok_or_else(|| Error::length("LinearSystem::add_zero_columns", "row size overflow"))?;
        for row in &mut self.rows {
            row.resize_with_trailing(new_size, trailing);
        }
        self.row_size = new_size;
        self.sorted = self.rows.len() <= 1;
        Ok(())
    }

    /// Drops `n` columns just before the last `trailing` columns.
    pub fn remove_trailing_columns(&mut self, n: usize, trailing: usize) {
        debug_assert!(self.row_size >= n + 1 + trailing);
        let new_size = self.row_size - n;
        for row in &mut self.rows {
            row.resize_with_trailing(new_size, trailing);
        }
        self.row_size = new_size;
        self.sorted = self.rows.len() <= 1;
    }

    pub fn swap_columns(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        for row in &mut self.rows {
            row.coeffs_mut().swap(i, j);
        }
        self.sorted = self.rows.len() <= 1;
    }

    /// Appends a row after coercing it to this system's width, keeping its
    /// last `trailing` slots trailing.
    pub fn insert_pending_coerced(&mut self, mut row: LinearRow, trailing: usize) {
        if row.size() != self.row_size {
            debug_assert!(row.size() <= self.row_size);
            row.resize_with_trailing(self.row_size, trailing);
        }
        row.set_topology(self.topology);
        self.add_pending_row(row);
    }

    /// Strong-normalizes every row.
    pub fn strong_normalize_all(&mut self) {
        for row in &mut self.rows {
            row.strong_normalize();
        }
        self.sorted = self.rows.len() <= 1;
    }

    /// Dumps the header and raw rows; `marker` renders the per-row trailer.
    pub(crate) fn ascii_dump_with(
        &self,
        out: &mut String,
        marker: impl Fn(&LinearRow) -> String,
    ) {
        let topology = match self.topology {
            Topology::Closed => "NECESSARILY_CLOSED",
            Topology::NotClosed => "NOT_NECESSARILY_CLOSED",
        };
        let _ = writeln!(out, "topology {}", topology);
        let _ = writeln!(
            out,
            "{} x {} {}",
            self.rows.len(),
            self.row_size,
            if self.sorted { "(sorted)" } else { "(not_sorted)" }
        );
        let _ = writeln!(out, "index_first_pending {}", self.first_pending);
        for row in &self.rows {
            for c in row.coeffs() {
                let _ = write!(out, "{} ", c);
            }
            let _ = writeln!(out, "{}", marker(row));
        }
    }

    /// Parses what [`LinearSystem::ascii_dump_with`] wrote. `parse_row`
    /// turns the coefficient tokens plus trailer tokens into a row. Returns
    /// `None` on malformed input, leaving `self` untouched (the caller
    /// swaps in the result).
    pub(crate) fn ascii_load_with(
        lines: &mut std::str::Lines<'_>,
        parse_row: impl Fn(&[&str], Topology) -> Option<LinearRow>,
    ) -> Option<LinearSystem> {
        let topology = match lines.next()?.strip_prefix("topology ")? {
            "NECESSARILY_CLOSED" => Topology::Closed,
            "NOT_NECESSARILY_CLOSED" => Topology::NotClosed,
            _ => return None,
        };
        let dims: Vec<&str> = lines.next()?.split_whitespace().collect();
        if dims.len() != 4 || dims[1] != "x" {
            return None;
        }
        let num_rows: usize = dims[0].parse().ok()?;
        let row_size: usize = dims[2].parse().ok()?;
        let sorted = match dims[3] {
            "(sorted)" => true,
            "(not_sorted)" => false,
            _ => return None,
        };
        let first_pending: usize = lines
            .next()?
            .strip_prefix("index_first_pending ")?
            .parse()
            .ok()?;
        if first_pending > num_rows {
            return None;
        }
        let mut rows = Vec::with_capacity(num_rows);
        for _ in 0..num_rows {
            let tokens: Vec<&str> = lines.next()?.split_whitespace().collect();
            let row = parse_row(&tokens, topology)?;
            if row.size() != row_size {
                return None;
            }
            rows.push(row);
        }
        Some(LinearSystem {
            rows,
            row_size,
            topology,
            sorted,
            first_pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyhedra_arith::Coefficient;

    fn row(cs: &[i64], kind: RowKind) -> LinearRow {
        LinearRow::from_coeffs(
            cs.iter().map(|&c| Coefficient::from(c)).collect(),
            kind,
            Topology::Closed,
        )
    }

    #[test]
    fn test_pending_partition() {
        let mut sys = LinearSystem::new(3, Topology::Closed);
        sys.add_row(row(&[0, 1, 0], RowKind::RayPointOrInequality));
        sys.add_pending_row(row(&[0, 0, 1], RowKind::RayPointOrInequality));
        assert_eq!(sys.first_pending_index(), 1);
        assert_eq!(sys.num_pending_rows(), 1);
        sys.unset_pending_rows();
        assert_eq!(sys.first_pending_index(), 2);
        assert_eq!(sys.num_pending_rows(), 0);
    }

    #[test]
    fn test_sort_merges_duplicates() {
        let mut sys = LinearSystem::new(3, Topology::Closed);
        sys.add_row(row(&[0, 1, 0], RowKind::RayPointOrInequality));
        sys.add_row(row(&[0, 0, 1], RowKind::RayPointOrInequality));
        sys.add_row(row(&[0, 1, 0], RowKind::RayPointOrInequality));
        sys.sort_rows();
        assert_eq!(sys.num_rows(), 2);
        assert!(sys.is_sorted());
    }

    #[test]
    fn test_permute_columns() {
        let mut sys = LinearSystem::new(4, Topology::Closed);
        sys.add_row(row(&[9, 1, 2, 3], RowKind::RayPointOrInequality));
        // Swap columns 1 and 2, leave 3 alone.
        sys.permute_columns(&[1, 2, 0]).unwrap();
        assert_eq!(sys.row(0), &row(&[9, 2, 1, 3], RowKind::RayPointOrInequality));
    }

    #[test]
    fn test_column_surgery() {
        let mut sys = LinearSystem::new(3, Topology::NotClosed);
        sys.add_row(row(&[1, 2, 7], RowKind::RayPointOrInequality));
        sys.add_zero_columns(2, 1).unwrap();
        assert_eq!(sys.row_size(), 5);
        assert_eq!(
            sys.row(0).coeffs(),
            row(&[1, 2, 0, 0, 7], RowKind::RayPointOrInequality).coeffs()
        );
        sys.remove_trailing_columns(2, 1);
        assert_eq!(
            sys.row(0).coeffs(),
            row(&[1, 2, 7], RowKind::RayPointOrInequality).coeffs()
        );
    }

    #[test]
    fn test_ascii_round_trip() {
        let mut sys = LinearSystem::new(3, Topology::Closed);
        sys.add_row(row(&[1, -2, 0], RowKind::LineOrEquality));
        sys.add_pending_row(row(&[0, 1, 1], RowKind::RayPointOrInequality));
        let mut dump = String::new();
        sys.ascii_dump_with(&mut dump, |r| {
            match r.kind() {
                RowKind::LineOrEquality => "=",
                RowKind::RayPointOrInequality => ">=",
            }
            .to_string()
        });
        let reloaded = LinearSystem::ascii_load_with(&mut dump.lines(), |tokens, topology| {
            let (coeffs, marker) = tokens.split_at(tokens.len() - 1);
            let kind = match marker[0] {
                "=" => RowKind::LineOrEquality,
                ">=" => RowKind::RayPointOrInequality,
                _ => return None,
            };
            let coeffs: Option<Vec<Coefficient>> =
                coeffs.iter().map(|t| t.parse().ok()).collect();
            Some(LinearRow::from_coeffs(coeffs?, kind, topology))
        })
        .unwrap();
        assert_eq!(reloaded, sys);
    }
}
