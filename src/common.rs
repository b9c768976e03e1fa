//! Common functionalities.

use thiserror::Error;

/// Positions of A forced to zero, as 0-based `(row, col)` pairs.
pub type SparsityMask = hashbrown::HashSet<(usize, usize)>;

/// Dimensions of the matrix product `C = A * B` with A of shape `m x n`,
/// B of shape `n x k` and C of shape `m x k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

impl Dims {
    /// Creates dimensions, rejecting degenerate axes.
    ///
    /// # Panics
    ///
    /// If any of `m`, `n`, `k` is zero.
    #[must_use]
    pub fn new(m: usize, n: usize, k: usize) -> Self {
        assert!(m > 0 && n > 0 && k > 0, "degenerate dimensions");
        Self { m, n, k }
    }

    /// Length of the coefficient vector over A.
    #[must_use]
    pub fn a_len(self) -> usize {
        self.m * self.n
    }

    /// Length of the coefficient vector over B.
    #[must_use]
    pub fn b_len(self) -> usize {
        self.n * self.k
    }

    /// Length of the coefficient vector over C.
    #[must_use]
    pub fn c_len(self) -> usize {
        self.k * self.m
    }

    /// Number of entries of the structure tensor.
    #[must_use]
    pub fn tensor_len(self) -> usize {
        self.a_len() * self.b_len() * self.c_len()
    }

    /// Index of `a{i+1}{j+1}` in the A coefficient vector.
    #[must_use]
    pub fn a_index(self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.m && j < self.n);
        i * self.n + j
    }

    /// Index of `b{j+1}{l+1}` in the B coefficient vector.
    #[must_use]
    pub fn b_index(self, j: usize, l: usize) -> usize {
        debug_assert!(j < self.n && l < self.k);
        j * self.k + l
    }

    /// Index of output entry `C[i][l]` in the C coefficient vector.
    ///
    /// The human-readable label of this position is `c{l+1}{i+1}`: the text
    /// format stores C transposed, and that convention is preserved verbatim.
    #[must_use]
    pub fn c_index(self, i: usize, l: usize) -> usize {
        debug_assert!(i < self.m && l < self.k);
        l * self.m + i
    }

    /// Flattens a tensor index triple.
    #[must_use]
    pub fn flat(self, a: usize, b: usize, c: usize) -> usize {
        debug_assert!(a < self.a_len() && b < self.b_len() && c < self.c_len());
        (a * self.b_len() + b) * self.c_len() + c
    }
}

/// Error type for strategy construction and engine failures.
///
/// Search/lift outcomes that are expected in normal operation (`Exhausted`,
/// `Failed { order }`) are *not* errors; they are returned as enum values by
/// the respective engines.
#[derive(Debug, Error)]
pub enum Error {
    #[error("term {term}: {slot} vector has length {found}, expected {expected}")]
    MalformedStrategy {
        term: usize,
        slot: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("lift order {0} not supported (must be in 1..=63)")]
    UnsupportedOrder(u32),
    #[error("{context}: produced strategy does not match its target tensor")]
    InvariantViolation { context: &'static str },
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}
