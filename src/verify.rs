//! Algebraic spot check of lifted strategies.
//!
//! Evaluates a strategy on random integer matrices (with the masked entries
//! of A forced to zero) and compares against the schoolbook product. This is
//! an independent check on top of the tensor validity invariant, with
//! coefficients read as signed representatives.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    common::SparsityMask,
    strategy::{signed, LiftedStrategy},
};

/// Checks `trials` random products against the strategy.
///
/// # Errors
///
/// Fails with the offending trial, output position and both values on the
/// first mismatch.
pub fn check(
    strategy: &LiftedStrategy,
    mask: &SparsityMask,
    trials: usize,
    seed: u64,
) -> anyhow::Result<()> {
    let dims = strategy.dims();
    let e = strategy.modexp();
    let mut rng = StdRng::seed_from_u64(seed);
    for trial in 0..trials {
        let mut a = vec![0i64; dims.a_len()];
        let mut b = vec![0i64; dims.b_len()];
        for (idx, x) in a.iter_mut().enumerate() {
            *x = if mask.contains(&(idx / dims.n, idx % dims.n)) {
                0
            } else {
                rng.gen_range(0..10)
            };
        }
        for x in &mut b {
            *x = rng.gen_range(0..10);
        }
        // Schoolbook reference
        let mut expected = vec![0i128; dims.c_len()];
        for i in 0..dims.m {
            for l in 0..dims.k {
                for j in 0..dims.n {
                    expected[dims.c_index(i, l)] +=
                        i128::from(a[dims.a_index(i, j)]) * i128::from(b[dims.b_index(j, l)]);
                }
            }
        }
        // Strategy evaluation; signed coefficients reach 2^62 in magnitude
        // at the widest modulus, so products need i128.
        let mut got = vec![0i128; dims.c_len()];
        for term in strategy.terms() {
            let ua: i128 = term
                .u
                .iter()
                .enumerate()
                .map(|(p, &x)| i128::from(signed(x, e)) * i128::from(a[p]))
                .sum();
            let vb: i128 = term
                .v
                .iter()
                .enumerate()
                .map(|(p, &x)| i128::from(signed(x, e)) * i128::from(b[p]))
                .sum();
            let prod = ua * vb;
            for (p, &x) in term.w.iter().enumerate() {
                got[p] += i128::from(signed(x, e)) * prod;
            }
        }
        for p in 0..dims.c_len() {
            anyhow::ensure!(
                got[p] == expected[p],
                "trial {trial}: output {p} computed {} expected {}",
                got[p],
                expected[p]
            );
        }
    }
    Ok(())
}
