//! Structure tensors of matrix multiplication over GF(2) and Z/2^e.

use fixedbitset::FixedBitSet;

use crate::common::{Dims, SparsityMask};

/// Dense tensor over GF(2), flattened into a single bitset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitTensor {
    dims: Dims,
    bits: FixedBitSet,
}

impl BitTensor {
    /// Creates the all-zero tensor.
    #[must_use]
    pub fn zeros(dims: Dims) -> Self {
        Self {
            dims,
            bits: FixedBitSet::with_capacity(dims.tensor_len()),
        }
    }

    /// Creates the matrix multiplication tensor `T(m, n, k)` modulo 2.
    ///
    /// Entries are 1 exactly at the triples `(a(i,j), b(j,l), c(i,l))`.
    #[must_use]
    pub fn matmul(dims: Dims) -> Self {
        Self::matmul_masked(dims, &SparsityMask::new())
    }

    /// Creates the sparsity-constrained target `T'`: the slices of A
    /// positions in `mask` are zeroed out.
    #[must_use]
    pub fn matmul_masked(dims: Dims, mask: &SparsityMask) -> Self {
        let mut out = Self::zeros(dims);
        for i in 0..dims.m {
            for j in 0..dims.n {
                if mask.contains(&(i, j)) {
                    continue;
                }
                for l in 0..dims.k {
                    out.bits
                        .insert(dims.flat(dims.a_index(i, j), dims.b_index(j, l), dims.c_index(i, l)));
                }
            }
        }
        out
    }

    #[must_use]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Entry at the flattened index.
    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        self.bits[idx]
    }

    /// Number of nonzero entries.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.bits.count_ones(..)
    }

    /// Toggles the entry at the flattened index (GF(2) addition of 1).
    pub(crate) fn toggle(&mut self, idx: usize) {
        self.bits.toggle(idx);
    }
}

/// Dense tensor over Z/2^e with entries held as canonical residues.
///
/// Every arithmetic operation reduces explicitly modulo `2^e`; values never
/// rely on fixed-width wraparound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntTensor {
    dims: Dims,
    modexp: u32,
    data: Vec<u64>,
}

impl IntTensor {
    /// Creates the all-zero tensor over Z/2^`modexp`.
    ///
    /// # Panics
    ///
    /// If `modexp` is outside `1..=63`.
    #[must_use]
    pub fn zeros(dims: Dims, modexp: u32) -> Self {
        assert!((1..=63).contains(&modexp), "modexp out of range");
        Self {
            dims,
            modexp,
            data: vec![0; dims.tensor_len()],
        }
    }

    /// Creates the matrix multiplication tensor over Z/2^`modexp`.
    #[must_use]
    pub fn matmul(dims: Dims, modexp: u32) -> Self {
        Self::matmul_masked(dims, &SparsityMask::new(), modexp)
    }

    /// Creates the sparsity-constrained target over Z/2^`modexp`.
    #[must_use]
    pub fn matmul_masked(dims: Dims, mask: &SparsityMask, modexp: u32) -> Self {
        let mut out = Self::zeros(dims, modexp);
        for i in 0..dims.m {
            for j in 0..dims.n {
                if mask.contains(&(i, j)) {
                    continue;
                }
                for l in 0..dims.k {
                    let idx =
                        dims.flat(dims.a_index(i, j), dims.b_index(j, l), dims.c_index(i, l));
                    out.data[idx] = 1;
                }
            }
        }
        out
    }

    /// Creates a tensor from raw entries, reducing each modulo `2^modexp`.
    ///
    /// # Panics
    ///
    /// If `modexp` is outside `1..=63` or `data` has the wrong length.
    #[must_use]
    pub fn from_entries(dims: Dims, modexp: u32, data: Vec<u64>) -> Self {
        assert!((1..=63).contains(&modexp), "modexp out of range");
        assert_eq!(data.len(), dims.tensor_len(), "entry count mismatch");
        let modulus = 1u64 << modexp;
        let data = data.into_iter().map(|x| x % modulus).collect();
        Self { dims, modexp, data }
    }

    #[must_use]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[must_use]
    pub fn modexp(&self) -> u32 {
        self.modexp
    }

    /// Entry at the flattened index, as a canonical residue mod `2^modexp`.
    #[must_use]
    pub fn get(&self, idx: usize) -> u64 {
        self.data[idx]
    }

    /// Entry reduced to the coarser modulus `2^e`.
    ///
    /// # Panics
    ///
    /// If `e` exceeds the tensor's own modulus exponent.
    #[must_use]
    pub fn get_mod(&self, idx: usize, e: u32) -> u64 {
        assert!(e <= self.modexp, "requested modulus finer than stored");
        self.data[idx] & ((1u64 << e) - 1)
    }

    pub(crate) fn add_assign(&mut self, idx: usize, value: u64) {
        let modulus = 1u64 << self.modexp;
        self.data[idx] = (self.data[idx] + value % modulus) % modulus;
    }
}

/// `(x * y) % 2^modexp` without overflow.
pub(crate) fn mul_mod(x: u64, y: u64, modexp: u32) -> u64 {
    let modulus = 1u128 << modexp;
    ((u128::from(x) * u128::from(y)) % modulus) as u64
}
