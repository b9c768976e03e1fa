//! Random-walk rank reduction of GF(2) strategies.
//!
//! The engine walks the flip graph of a fixed-rank strategy: every legal move
//! is a rank-preserving rewrite of an ordered pair of terms sharing one
//! coefficient vector, chosen uniformly at random. Whenever a term becomes
//! eliminable, because a coefficient vector died or two terms agree in two of
//! three slots, the engine removes it and returns the lower-rank strategy
//! immediately.
//!
//! Coefficient vectors have fixed length, so no rewrite can leave the
//! declared dimension bounds; masked u-coordinates are zero in both operands
//! of every XOR and therefore stay zero along the whole walk.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{common::Error, strategy::Strategy, tensor::BitTensor};

/// Which coefficient vector two terms have in common.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    U,
    V,
    W,
}

/// Rank-preserving rewrite of the ordered term pair `(i, j)`.
///
/// With the shared vector `s`, the identity applied is
/// `s: U  =>  (u, v_i + v_j, w_i), (u, v_j, w_i + w_j)` and its analogues for
/// shared `v`/`w`; the opposite orientation is the move on `(j, i)`.
#[derive(Debug, Clone, Copy)]
struct FlipMove {
    i: usize,
    j: usize,
    shared: Slot,
}

/// Rank-lowering rewrite detected on the current strategy.
#[derive(Debug, Clone, Copy)]
enum Reduction {
    /// Some coefficient vector of the term is all-zero.
    DeadTerm(usize),
    /// Terms `i` and `j` agree in all slots except (at most) `differ`.
    Merge { i: usize, j: usize, differ: Slot },
}

/// Search outcome. `Exhausted` is a normal result: the budget ran out with no
/// reduction, and the caller keeps the input strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A strategy of rank exactly one below the input.
    Reduced(Strategy),
    Exhausted,
}

/// Search budget: `restarts` independent walks of at most `path_length`
/// steps, seeded from `seed`.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub path_length: usize,
    pub restarts: usize,
    pub seed: u64,
}

/// Runs the flip search from `init` against `target`.
///
/// Returns the first reduced strategy found across restarts, or
/// [`Outcome::Exhausted`] once the whole budget is consumed. Restart `a`
/// depends only on `(seed + a)`, so runs are reproducible and callers may
/// shard restarts externally.
///
/// # Errors
///
/// - [`Error::InvariantViolation`] if `init` does not match `target`, or if
///   any produced strategy fails the per-move validity re-check (an internal
///   bug in move generation, never ignored).
pub fn find(init: &Strategy, target: &BitTensor, opts: &SearchOptions) -> Result<Outcome, Error> {
    if !init.is_valid(target) {
        return Err(Error::InvariantViolation {
            context: "flip search input",
        });
    }
    tracing::debug!(
        rank = init.rank(),
        path_length = opts.path_length,
        restarts = opts.restarts,
        "flip search"
    );
    // A reduction available before any flip is returned without walking.
    if let Some(red) = find_reduction(init) {
        return reduce(init, red, target);
    }
    for attempt in 0..opts.restarts {
        let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(attempt as u64));
        let mut cur = init.clone();
        for step in 0..opts.path_length {
            let moves = legal_moves(&cur);
            if moves.is_empty() {
                tracing::debug!(attempt, step, "no legal moves, restarting");
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            apply_move(&mut cur, mv);
            if !cur.is_valid(target) {
                return Err(Error::InvariantViolation {
                    context: "flip move",
                });
            }
            if let Some(red) = find_reduction(&cur) {
                tracing::debug!(attempt, step, "reduction event");
                return reduce(&cur, red, target);
            }
        }
        tracing::debug!(attempt, "path exhausted");
    }
    Ok(Outcome::Exhausted)
}

fn reduce(cur: &Strategy, red: Reduction, target: &BitTensor) -> Result<Outcome, Error> {
    let next = apply_reduction(cur, red);
    debug_assert_eq!(next.rank() + 1, cur.rank());
    if !next.is_valid(target) {
        return Err(Error::InvariantViolation {
            context: "rank reduction",
        });
    }
    tracing::debug!(rank = next.rank(), "reduced");
    Ok(Outcome::Reduced(next))
}

/// Scans for an eliminable term: dead terms first, then mergeable pairs.
fn find_reduction(s: &Strategy) -> Option<Reduction> {
    let terms = s.terms();
    for (i, t) in terms.iter().enumerate() {
        if t.u.count_ones(..) == 0 || t.v.count_ones(..) == 0 || t.w.count_ones(..) == 0 {
            return Some(Reduction::DeadTerm(i));
        }
    }
    for i in 0..terms.len() {
        for j in i + 1..terms.len() {
            let eq_u = terms[i].u == terms[j].u;
            let eq_v = terms[i].v == terms[j].v;
            let eq_w = terms[i].w == terms[j].w;
            // Two (or three) equal slots: the pair collapses into one term.
            // Identical terms merge into a dead term and are removed by the
            // next reduction event, keeping every event at exactly -1.
            let differ = match (eq_u, eq_v, eq_w) {
                (true, true, _) => Slot::W,
                (true, _, true) => Slot::V,
                (_, true, true) => Slot::U,
                _ => continue,
            };
            return Some(Reduction::Merge { i, j, differ });
        }
    }
    None
}

fn apply_reduction(s: &Strategy, red: Reduction) -> Strategy {
    let mut out = s.clone();
    let terms = out.terms_mut();
    match red {
        Reduction::DeadTerm(i) => {
            terms.remove(i);
        }
        Reduction::Merge { i, j, differ } => {
            let absorbed = terms[j].clone();
            match differ {
                Slot::U => terms[i].u ^= &absorbed.u,
                Slot::V => terms[i].v ^= &absorbed.v,
                Slot::W => terms[i].w ^= &absorbed.w,
            }
            terms.remove(j);
        }
    }
    out
}

/// Enumerates every legal move: one per ordered pair and shared slot.
fn legal_moves(s: &Strategy) -> Vec<FlipMove> {
    let terms = s.terms();
    let mut moves = Vec::new();
    for i in 0..terms.len() {
        for j in 0..terms.len() {
            if i == j {
                continue;
            }
            if terms[i].u == terms[j].u {
                moves.push(FlipMove { i, j, shared: Slot::U });
            }
            if terms[i].v == terms[j].v {
                moves.push(FlipMove { i, j, shared: Slot::V });
            }
            if terms[i].w == terms[j].w {
                moves.push(FlipMove { i, j, shared: Slot::W });
            }
        }
    }
    moves
}

/// Applies a flip in place. Rank and validity are preserved by construction.
fn apply_move(s: &mut Strategy, mv: FlipMove) {
    let terms = s.terms_mut();
    let FlipMove { i, j, shared } = mv;
    match shared {
        // (u, v_i, w_i), (u, v_j, w_j) -> (u, v_i + v_j, w_i), (u, v_j, w_i + w_j)
        Slot::U => {
            let vj = terms[j].v.clone();
            let wi = terms[i].w.clone();
            terms[i].v ^= &vj;
            terms[j].w ^= &wi;
        }
        // (u_i, v, w_i), (u_j, v, w_j) -> (u_i + u_j, v, w_i), (u_j, v, w_i + w_j)
        Slot::V => {
            let uj = terms[j].u.clone();
            let wi = terms[i].w.clone();
            terms[i].u ^= &uj;
            terms[j].w ^= &wi;
        }
        // (u_i, v_i, w), (u_j, v_j, w) -> (u_i + u_j, v_i, w), (u_j, v_i + v_j, w)
        Slot::W => {
            let uj = terms[j].u.clone();
            let vi = terms[i].v.clone();
            terms[i].u ^= &uj;
            terms[j].v ^= &vi;
        }
    }
}
