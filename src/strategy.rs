//! Bilinear strategies over GF(2) and Z/2^e.
//!
//! A strategy of rank `r` computes `C = A * B` with `r` scalar
//! multiplications; each term holds one coefficient vector per operand. The
//! single correctness criterion used everywhere is that the sum of outer
//! products of the terms equals the target structure tensor over the ring in
//! use.

use fixedbitset::FixedBitSet;

use crate::{
    common::{Dims, Error, SparsityMask},
    tensor::{mul_mod, BitTensor, IntTensor},
};

/// One scalar multiplication: coefficient vectors over A, B and C.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub u: FixedBitSet,
    pub v: FixedBitSet,
    pub w: FixedBitSet,
}

/// GF(2) strategy: an ordered sequence of terms of uniform dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    dims: Dims,
    terms: Vec<Term>,
}

impl Strategy {
    /// Creates a strategy, validating every term against `dims`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedStrategy`] on the first term whose coefficient
    /// vector length disagrees with the declared dimensions. Lengths are
    /// never silently truncated or grown.
    pub fn new(dims: Dims, terms: Vec<Term>) -> Result<Self, Error> {
        for (index, term) in terms.iter().enumerate() {
            for (slot, len, expected) in [
                ("u", term.u.len(), dims.a_len()),
                ("v", term.v.len(), dims.b_len()),
                ("w", term.w.len(), dims.c_len()),
            ] {
                if len != expected {
                    return Err(Error::MalformedStrategy {
                        term: index,
                        slot,
                        found: len,
                        expected,
                    });
                }
            }
        }
        Ok(Self { dims, terms })
    }

    /// The schoolbook decomposition: one term per `a_ij * b_jl` product.
    ///
    /// Rank `m * n * k`, valid over any ring.
    #[must_use]
    pub fn schoolbook(dims: Dims) -> Self {
        let mut terms = Vec::with_capacity(dims.m * dims.n * dims.k);
        for i in 0..dims.m {
            for j in 0..dims.n {
                for l in 0..dims.k {
                    let mut u = FixedBitSet::with_capacity(dims.a_len());
                    let mut v = FixedBitSet::with_capacity(dims.b_len());
                    let mut w = FixedBitSet::with_capacity(dims.c_len());
                    u.insert(dims.a_index(i, j));
                    v.insert(dims.b_index(j, l));
                    w.insert(dims.c_index(i, l));
                    terms.push(Term { u, v, w });
                }
            }
        }
        Self { dims, terms }
    }

    /// Projects the strategy onto the sparsity constraint.
    ///
    /// Masked A coordinates are zeroed in every `u` vector; terms whose `u`
    /// dies entirely are dropped (they read only forced-zero entries).
    #[must_use]
    pub fn masked(&self, mask: &SparsityMask) -> Self {
        let mut terms = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            let mut u = term.u.clone();
            for &(i, j) in mask {
                if i < self.dims.m && j < self.dims.n {
                    u.remove(self.dims.a_index(i, j));
                }
            }
            if u.count_ones(..) == 0 && term.u.count_ones(..) > 0 {
                continue;
            }
            terms.push(Term {
                u,
                v: term.v.clone(),
                w: term.w.clone(),
            });
        }
        Self {
            dims: self.dims,
            terms,
        }
    }

    #[must_use]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Number of terms.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub(crate) fn terms_mut(&mut self) -> &mut Vec<Term> {
        &mut self.terms
    }

    /// Sum of outer products of all terms over GF(2).
    #[must_use]
    pub fn to_tensor(&self) -> BitTensor {
        let mut out = BitTensor::zeros(self.dims);
        for term in &self.terms {
            for a in term.u.ones() {
                for b in term.v.ones() {
                    for c in term.w.ones() {
                        out.toggle(self.dims.flat(a, b, c));
                    }
                }
            }
        }
        out
    }

    /// Whether the strategy computes exactly `target` over GF(2).
    ///
    /// # Panics
    ///
    /// If `target` was built for different dimensions.
    #[must_use]
    pub fn is_valid(&self, target: &BitTensor) -> bool {
        assert_eq!(self.dims, target.dims(), "dimension mismatch");
        self.to_tensor() == *target
    }
}

/// One scalar multiplication with coefficients in Z/2^e.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedTerm {
    pub u: Vec<u64>,
    pub v: Vec<u64>,
    pub w: Vec<u64>,
}

/// Strategy over Z/2^e, produced by Hensel lifting.
///
/// Coefficients are canonical residues `< 2^modexp`; reading them as signed
/// integers uses the representative in `(-2^(e-1), 2^(e-1)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedStrategy {
    dims: Dims,
    modexp: u32,
    terms: Vec<LiftedTerm>,
}

impl LiftedStrategy {
    /// Creates a lifted strategy, validating every term against `dims` and
    /// reducing coefficients to canonical residues mod `2^modexp`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedStrategy`] on the first term whose coefficient
    /// vector length disagrees with the declared dimensions.
    ///
    /// # Panics
    ///
    /// If `modexp` is outside `1..=63`.
    pub fn new(dims: Dims, modexp: u32, terms: Vec<LiftedTerm>) -> Result<Self, Error> {
        assert!((1..=63).contains(&modexp), "modexp out of range");
        for (index, term) in terms.iter().enumerate() {
            for (slot, len, expected) in [
                ("u", term.u.len(), dims.a_len()),
                ("v", term.v.len(), dims.b_len()),
                ("w", term.w.len(), dims.c_len()),
            ] {
                if len != expected {
                    return Err(Error::MalformedStrategy {
                        term: index,
                        slot,
                        found: len,
                        expected,
                    });
                }
            }
        }
        let modulus = 1u64 << modexp;
        let terms = terms
            .into_iter()
            .map(|t| LiftedTerm {
                u: t.u.into_iter().map(|x| x % modulus).collect(),
                v: t.v.into_iter().map(|x| x % modulus).collect(),
                w: t.w.into_iter().map(|x| x % modulus).collect(),
            })
            .collect();
        Ok(Self {
            dims,
            modexp,
            terms,
        })
    }

    /// Embeds a GF(2) strategy as a strategy over Z/2 (order 1).
    #[must_use]
    pub fn from_bits(base: &Strategy) -> Self {
        let terms = base
            .terms()
            .iter()
            .map(|t| LiftedTerm {
                u: (0..t.u.len()).map(|i| u64::from(t.u[i])).collect(),
                v: (0..t.v.len()).map(|i| u64::from(t.v[i])).collect(),
                w: (0..t.w.len()).map(|i| u64::from(t.w[i])).collect(),
            })
            .collect();
        Self {
            dims: base.dims(),
            modexp: 1,
            terms,
        }
    }

    #[must_use]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Modulus exponent: coefficients live in Z/2^`modexp`.
    #[must_use]
    pub fn modexp(&self) -> u32 {
        self.modexp
    }

    /// Number of terms.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn terms(&self) -> &[LiftedTerm] {
        &self.terms
    }

    /// Restriction to the coarser modulus `2^e`.
    ///
    /// # Panics
    ///
    /// If `e` is zero or exceeds the current modulus exponent.
    #[must_use]
    pub fn reduced_mod(&self, e: u32) -> Self {
        assert!(e >= 1 && e <= self.modexp, "invalid restriction modulus");
        let low = (1u64 << e) - 1;
        let terms = self
            .terms
            .iter()
            .map(|t| LiftedTerm {
                u: t.u.iter().map(|&x| x & low).collect(),
                v: t.v.iter().map(|&x| x & low).collect(),
                w: t.w.iter().map(|&x| x & low).collect(),
            })
            .collect();
        Self {
            dims: self.dims,
            modexp: e,
            terms,
        }
    }

    /// Sum of outer products over Z/2^`modexp`.
    #[must_use]
    pub fn to_tensor(&self) -> IntTensor {
        let mut out = IntTensor::zeros(self.dims, self.modexp);
        for term in &self.terms {
            for (a, &ua) in term.u.iter().enumerate() {
                if ua == 0 {
                    continue;
                }
                for (b, &vb) in term.v.iter().enumerate() {
                    if vb == 0 {
                        continue;
                    }
                    let uv = mul_mod(ua, vb, self.modexp);
                    for (c, &wc) in term.w.iter().enumerate() {
                        if wc == 0 {
                            continue;
                        }
                        out.add_assign(self.dims.flat(a, b, c), mul_mod(uv, wc, self.modexp));
                    }
                }
            }
        }
        out
    }

    /// Whether the strategy computes `target` modulo `2^e`.
    ///
    /// # Panics
    ///
    /// If dimensions disagree or `e` exceeds either modulus exponent.
    #[must_use]
    pub fn is_valid_mod(&self, target: &IntTensor, e: u32) -> bool {
        assert_eq!(self.dims, target.dims(), "dimension mismatch");
        assert!(e <= self.modexp, "e finer than strategy modulus");
        let own = self.to_tensor();
        (0..self.dims.tensor_len()).all(|idx| own.get_mod(idx, e) == target.get_mod(idx, e))
    }

    /// Adds the order-`j` correction `2^j * delta` and raises the modulus to
    /// `2^(j+1)`.
    ///
    /// `delta` is the packed GF(2) solution vector laid out term-major as
    /// `[du | dv | dw]`.
    pub(crate) fn corrected(&self, j: u32, delta: &FixedBitSet) -> Self {
        debug_assert_eq!(self.modexp, j);
        let dims = self.dims;
        let stride = dims.a_len() + dims.b_len() + dims.c_len();
        debug_assert_eq!(delta.len(), stride * self.terms.len());
        let bump = |base: usize, coeffs: &[u64]| -> Vec<u64> {
            coeffs
                .iter()
                .enumerate()
                .map(|(p, &x)| x + (u64::from(delta[base + p]) << j))
                .collect()
        };
        let terms = self
            .terms
            .iter()
            .enumerate()
            .map(|(t, term)| {
                let at = t * stride;
                LiftedTerm {
                    u: bump(at, &term.u),
                    v: bump(at + dims.a_len(), &term.v),
                    w: bump(at + dims.a_len() + dims.b_len(), &term.w),
                }
            })
            .collect();
        Self {
            dims,
            modexp: j + 1,
            terms,
        }
    }

    /// Keeps the coefficients and raises the modulus by one order.
    ///
    /// Used when the lift residual at this order is zero.
    pub(crate) fn widened(&self) -> Self {
        Self {
            dims: self.dims,
            modexp: self.modexp + 1,
            terms: self.terms.clone(),
        }
    }
}

/// Signed representative of a canonical residue mod `2^e`, chosen in
/// `(-2^(e-1), 2^(e-1)]`.
#[must_use]
pub fn signed(x: u64, e: u32) -> i64 {
    debug_assert!(e >= 1 && x < (1u64 << e));
    let half = 1u64 << (e - 1);
    if x > half {
        // i128 intermediate: 2^e does not fit i64 when e == 63.
        (i128::from(x) - (1i128 << e)) as i64
    } else {
        x as i64
    }
}
