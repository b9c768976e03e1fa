//! Order-by-order Hensel lifting of GF(2) strategies to Z/2^k.
//!
//! Given a strategy valid modulo 2 and a target order `k`, the engine
//! reconstructs coefficients modulo `2^k` one bit at a time. At order `j` the
//! residual `(T' - S_j) / 2^j`, reduced modulo 2, is matched by a correction
//! `2^j * delta` whose first-order effect is linear in `delta`; the resulting
//! GF(2) system is solved with a fixed elimination order so results are
//! reproducible. Lower-order bits are never perturbed.

use fixedbitset::FixedBitSet;

use crate::{
    common::Error,
    gf2_linalg::Gf2Solver,
    strategy::{LiftedStrategy, Strategy},
    tensor::IntTensor,
};

/// Lift outcome. `Failed` is a normal result: no valid correction exists at
/// the reported order, and the caller should try a different base strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Strategy valid modulo `2^k`, restricting modulo 2 to the input.
    Lifted(LiftedStrategy),
    Failed { order: u32 },
}

/// Lifts `base` to a strategy valid against `target` modulo `2^order`.
///
/// `target` must carry at least `order` bits of the intended tensor; callers
/// normally pass [`IntTensor::matmul_masked`] at modulus exponent `order`.
///
/// # Errors
///
/// - [`Error::UnsupportedOrder`] if `order` is 0, exceeds 63, or exceeds the
///   modulus of `target`.
/// - [`Error::InvariantViolation`] if `base` is not valid modulo 2, if a
///   residual entry is not divisible by `2^j` (broken mod-2^j validity), or
///   if a corrected strategy fails its mandatory re-check.
pub fn lift(base: &Strategy, target: &IntTensor, order: u32) -> Result<Outcome, Error> {
    if order == 0 || order > 63 || order > target.modexp() {
        return Err(Error::UnsupportedOrder(order));
    }
    let mut cur = LiftedStrategy::from_bits(base);
    if !cur.is_valid_mod(target, 1) {
        return Err(Error::InvariantViolation {
            context: "lift input",
        });
    }
    tracing::debug!(rank = base.rank(), order, "hensel lift");
    for j in 1..order {
        let rhs = residual_bits(target, &cur, j)?;
        let weight = rhs.count_ones(..);
        tracing::debug!(order = j, residual_weight = weight, "lift step");
        let next = if weight == 0 {
            // Already valid at the next order.
            cur.widened()
        } else {
            let work = correction_system(base, &rhs);
            let mut solver = Gf2Solver::attach(work).map_err(|_| Error::InvariantViolation {
                context: "lift system assembly",
            })?;
            let Some(delta) = solver.solve() else {
                tracing::debug!(order = j, "no correction exists");
                return Ok(Outcome::Failed { order: j });
            };
            cur.corrected(j, &delta)
        };
        // Mandatory re-check, not optional: a failure here means the solver
        // or the linearization is wrong.
        if !next.is_valid_mod(target, j + 1) {
            return Err(Error::InvariantViolation {
                context: "lift step",
            });
        }
        debug_assert_eq!(next.reduced_mod(j), cur);
        cur = next;
    }
    Ok(Outcome::Lifted(cur))
}

/// Computes `(target - S_j) / 2^j mod 2` as a bit vector over tensor entries.
///
/// Divisibility of every entry by `2^j` is exactly mod-2^j validity of `S_j`;
/// a violation is an internal error, not a lift failure.
fn residual_bits(target: &IntTensor, cur: &LiftedStrategy, j: u32) -> Result<FixedBitSet, Error> {
    let dims = cur.dims();
    // Tensor entries carry integer multiplicities, so the sum must be taken
    // at modulus 2^(j+1): reducing mod 2^j first would drop the carry into
    // bit j, the very bit this order corrects.
    let own = cur.widened().to_tensor();
    let modulus = 1u64 << (j + 1);
    let low = (1u64 << j) - 1;
    let mut rhs = FixedBitSet::with_capacity(dims.tensor_len());
    for idx in 0..dims.tensor_len() {
        let have = own.get(idx);
        let want = target.get_mod(idx, j + 1);
        let diff = (want + modulus - have) % modulus;
        if diff & low != 0 {
            return Err(Error::InvariantViolation {
                context: "lift residual divisibility",
            });
        }
        if (diff >> j) & 1 == 1 {
            rhs.insert(idx);
        }
    }
    Ok(rhs)
}

/// Builds the augmented GF(2) system for the order-`j` correction.
///
/// Unknowns are laid out term-major as `[du | dv | dw]`; rows are tensor
/// entries. Coefficients come from the base strategy: by the restriction law
/// they equal `S_j` modulo 2 at every order, so the matrix is the same for
/// the whole lift.
fn correction_system(base: &Strategy, rhs: &FixedBitSet) -> Vec<FixedBitSet> {
    let dims = base.dims();
    let stride = dims.a_len() + dims.b_len() + dims.c_len();
    let cols = base.rank() * stride;
    let mut work = vec![FixedBitSet::with_capacity(cols + 1); dims.tensor_len()];
    for (t, term) in base.terms().iter().enumerate() {
        let at = t * stride;
        // du ⊗ v ⊗ w
        for p in 0..dims.a_len() {
            for b in term.v.ones() {
                for c in term.w.ones() {
                    work[dims.flat(p, b, c)].insert(at + p);
                }
            }
        }
        // u ⊗ dv ⊗ w
        for q in 0..dims.b_len() {
            for a in term.u.ones() {
                for c in term.w.ones() {
                    work[dims.flat(a, q, c)].insert(at + dims.a_len() + q);
                }
            }
        }
        // u ⊗ v ⊗ dw
        for s in 0..dims.c_len() {
            for a in term.u.ones() {
                for b in term.v.ones() {
                    work[dims.flat(a, b, s)].insert(at + dims.a_len() + dims.b_len() + s);
                }
            }
        }
    }
    for idx in rhs.ones() {
        work[idx].insert(cols);
    }
    work
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::Dims,
        strategy::signed,
        test_utils::{SCHOOLBOOK_333_A11, STRASSEN_MOD2},
    };

    #[test_log::test]
    fn test_lift_schoolbook_to_order_3() {
        // Scenario C: the 24-term schoolbook strategy is already integral, so
        // every residual is zero and the lift is deterministic.
        let s = &*SCHOOLBOOK_333_A11;
        let target = IntTensor::matmul_masked(s.dims(), &mask![(0, 0)], 3);
        let Outcome::Lifted(lifted) = lift(s, &target, 3).unwrap() else {
            panic!("expected lift to succeed");
        };
        assert_eq!(lifted.modexp(), 3);
        assert_eq!(lifted.rank(), s.rank());
        assert!(lifted.is_valid_mod(&target, 3));
        // Restriction law down to the original input.
        assert_eq!(lifted.reduced_mod(1), LiftedStrategy::from_bits(s));
        // All coefficients stayed 0/1.
        for term in lifted.terms() {
            for &x in term.u.iter().chain(&term.v).chain(&term.w) {
                assert!(x <= 1);
            }
        }
    }

    #[test_log::test]
    fn test_lift_strassen_mod2() {
        // The mod-2 image of Strassen needs genuine corrections. A greedy
        // order-by-order lift may legitimately fail at some order, but it must
        // never return an invalid strategy.
        let s = &*STRASSEN_MOD2;
        let target = IntTensor::matmul(s.dims(), 3);
        match lift(s, &target, 3).unwrap() {
            Outcome::Lifted(lifted) => {
                assert!(lifted.is_valid_mod(&target, 3));
                assert_eq!(lifted.reduced_mod(1), LiftedStrategy::from_bits(s));
            }
            Outcome::Failed { order } => {
                assert!(order < 3);
            }
        }
    }

    #[test_log::test]
    fn test_lift_carries_across_identical_terms() {
        // Three copies of the unit 1x1x1 term sum to 3: valid mod 2, with
        // the whole order-1 residual sitting in the carry bit. Setting one
        // du bit lifts it (3 + 2 = 5, congruent to 1 mod 4).
        let dims = Dims::new(1, 1, 1);
        let term = Strategy::schoolbook(dims).terms()[0].clone();
        let s = Strategy::new(dims, vec![term.clone(), term.clone(), term]).unwrap();
        let target = IntTensor::matmul(dims, 2);
        let Outcome::Lifted(lifted) = lift(&s, &target, 2).unwrap() else {
            panic!("expected lift to succeed");
        };
        assert!(lifted.is_valid_mod(&target, 2));
        assert_eq!(lifted.reduced_mod(1), LiftedStrategy::from_bits(&s));
    }

    #[test_log::test]
    fn test_lift_order_one_is_identity() {
        let s = &*STRASSEN_MOD2;
        let target = IntTensor::matmul(s.dims(), 1);
        let Outcome::Lifted(lifted) = lift(s, &target, 1).unwrap() else {
            panic!("expected success at order 1");
        };
        assert_eq!(lifted, LiftedStrategy::from_bits(s));
    }

    #[test_log::test]
    fn test_lift_failure_is_reported() {
        // m=1, n=2, k=2 with a single term e0 ⊗ e0 ⊗ e0. The linearization
        // only reaches tensors supported on the slices through that term, so
        // a target with an extra 2 at entry (1, 1, 1) is valid modulo 2 but
        // admits no order-1 correction.
        let dims = Dims::new(1, 2, 2);
        let mut terms = Strategy::schoolbook(dims).terms().to_vec();
        terms.truncate(1);
        let s = Strategy::new(dims, terms).unwrap();
        let mut entries = vec![0u64; dims.tensor_len()];
        entries[dims.flat(0, 0, 0)] = 1;
        entries[dims.flat(1, 1, 1)] = 2;
        let target = IntTensor::from_entries(dims, 2, entries);
        assert_eq!(
            lift(&s, &target, 2).unwrap(),
            Outcome::Failed { order: 1 }
        );
    }

    #[test_log::test]
    fn test_unsupported_order() {
        let s = &*STRASSEN_MOD2;
        let target = IntTensor::matmul(s.dims(), 3);
        assert!(matches!(
            lift(s, &target, 0),
            Err(Error::UnsupportedOrder(0))
        ));
        // Target carries fewer bits than requested.
        assert!(matches!(
            lift(s, &target, 5),
            Err(Error::UnsupportedOrder(5))
        ));
    }

    #[test_log::test]
    fn test_invalid_base_rejected() {
        let dims = Dims::new(2, 2, 2);
        let s = Strategy::schoolbook(dims);
        let target = IntTensor::matmul_masked(dims, &mask![(0, 0)], 3);
        assert!(matches!(
            lift(&s, &target, 3),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_signed_view_of_lifted() {
        let s = &*SCHOOLBOOK_333_A11;
        let target = IntTensor::matmul_masked(s.dims(), &mask![(0, 0)], 2);
        let Outcome::Lifted(lifted) = lift(s, &target, 2).unwrap() else {
            panic!("expected lift to succeed");
        };
        for term in lifted.terms() {
            for &x in term.u.iter().chain(&term.v).chain(&term.w) {
                assert!(matches!(signed(x, 2), 0 | 1));
            }
        }
    }
}
