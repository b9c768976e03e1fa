//! GF(2) linear solver for the lift-correction systems.

use fixedbitset::FixedBitSet;
use itertools::Itertools;

/// Gauss-Jordan solver for a single GF(2) equation `A x = b`.
///
/// The augmented system is stored row-wise as bitsets, with `b` in the last
/// column. Pivoting scans columns left to right and rows top to bottom, so
/// the elimination order, and hence the particular solution returned when
/// the system is underdetermined, is fully deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gf2Solver {
    /// Number of equations.
    rows: usize,
    /// Number of unknowns.
    cols: usize,
    /// Rank of the coefficient matrix. Available after elimination.
    rank: Option<usize>,
    /// Permutation of columns introduced by pivot moves.
    perm: Vec<usize>,
    /// Augmented rows, `cols + 1` bits wide.
    work: Vec<FixedBitSet>,
}

impl Gf2Solver {
    /// Takes ownership of the augmented working storage.
    ///
    /// # Arguments
    ///
    /// - `work`: Augmented rows; the last column is the right-hand side.
    ///
    /// # Errors
    ///
    /// - If `work` is empty or jagged.
    /// - If rows have no room for at least one unknown plus the right-hand
    ///   side.
    pub fn attach(work: Vec<FixedBitSet>) -> anyhow::Result<Self> {
        let rows = work.len();
        anyhow::ensure!(rows > 0, "work is empty");
        let Ok(width) = work.iter().map(FixedBitSet::len).all_equal_value() else {
            anyhow::bail!("work is jagged");
        };
        anyhow::ensure!(width > 1, "no unknowns");
        let cols = width - 1;
        Ok(Self {
            rows,
            cols,
            rank: None,
            perm: (0..cols).collect(),
            work,
        })
    }

    /// Moves `(r, c)` to `(i, i)` and records the column swap.
    fn move_pivot_impl(&mut self, i: usize, r: usize, c: usize) {
        self.work.swap(i, r);
        if i == c {
            return;
        }
        for row in &mut self.work {
            let bi = row[i];
            let bc = row[c];
            row.set(i, bc);
            row.set(c, bi);
        }
        self.perm.swap(i, c);
    }

    /// Finds the first remaining `1` and moves it to `(i, i)`.
    fn move_pivot(&mut self, i: usize) -> bool {
        for c in i..self.cols {
            for (offset, row) in self.work[i..].iter().enumerate() {
                if row[c] {
                    self.move_pivot_impl(i, offset + i, c);
                    return true;
                }
            }
        }
        false
    }

    /// Clears below each pivot, fixing the rank.
    fn eliminate_lower(&mut self) {
        debug_assert!(self.rank.is_none());
        let rmax = self.rows.min(self.cols);
        for i in 0..rmax {
            if !self.move_pivot(i) {
                self.rank = Some(i);
                return;
            }
            for r in i + 1..self.rows {
                if !self.work[r][i] {
                    continue;
                }
                // i < r: split to borrow source and destination rows at once
                let (upper, lower) = self.work.split_at_mut(r);
                lower[0] ^= &upper[i];
            }
        }
        self.rank = Some(rmax);
    }

    /// Clears above each pivot. Requires the rank to be known.
    fn eliminate_upper(&mut self) {
        let rank = self.rank.expect("rank known after lower elimination");
        for i in (0..rank).rev() {
            for r in 0..i {
                if !self.work[r][i] {
                    continue;
                }
                // r < i
                let (upper, lower) = self.work.split_at_mut(i);
                upper[r] ^= &lower[0];
            }
        }
    }

    /// Full elimination. No-op if already performed.
    fn eliminate(&mut self) {
        if self.rank.is_some() {
            return;
        }
        self.eliminate_lower();
        self.eliminate_upper();
    }

    /// Solves the system, eliminating first if needed.
    ///
    /// Returns `None` if the system is inconsistent; otherwise the unique
    /// deterministic particular solution with all free variables at zero.
    pub fn solve(&mut self) -> Option<FixedBitSet> {
        self.eliminate();
        let rank = self.rank.expect("rank known after elimination");
        // Inconsistent: rhs hits a zeroed row
        for row in &self.work[rank..] {
            if row[self.cols] {
                return None;
            }
        }
        let mut out = FixedBitSet::with_capacity(self.cols);
        for i in 0..rank {
            if self.work[i][self.cols] {
                out.insert(self.perm[i]);
            }
        }
        Some(out)
    }

    #[cfg(test)]
    fn validate_eliminated(&self) -> bool {
        let rank = self.rank.expect("rank known after elimination");
        for c in 0..rank {
            for r in 0..rank {
                if self.work[r][c] != (r == c) {
                    return false;
                }
            }
        }
        self.work[rank..]
            .iter()
            .all(|row| row.count_ones(..self.cols) == 0)
    }
}
