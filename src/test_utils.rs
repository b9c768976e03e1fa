//! Testing utilities.

use std::sync::LazyLock;

use crate::{common::Dims, strategy::Strategy};

pub mod exports {
    pub use fixedbitset::FixedBitSet;
    pub use hashbrown::HashSet;
}

macro_rules! bits {
    ($len:expr; $($i:expr),* $(,)?) => {{
        let mut out = $crate::test_utils::exports::FixedBitSet::with_capacity($len);
        $(out.insert($i);)*
        out
    }};
}

macro_rules! mask {
    ($(($r:expr, $c:expr)),* $(,)?) => {
        $crate::test_utils::exports::HashSet::from_iter([$(($r, $c)),*].iter().copied())
    };
}

macro_rules! term {
    ($d:expr; u: [$($u:expr),*], v: [$($v:expr),*], w: [$($w:expr),*]) => {
        $crate::strategy::Term {
            u: bits![$d.a_len(); $($u),*],
            v: bits![$d.b_len(); $($v),*],
            w: bits![$d.c_len(); $($w),*],
        }
    };
}

/// Six-term strategy for 2x2x2 with `a11 = 0` (the schoolbook expansion with
/// the masked products removed).
pub static MASKED_222: LazyLock<Strategy> = LazyLock::new(|| {
    Strategy::schoolbook(Dims::new(2, 2, 2)).masked(&mask![(0, 0)])
});

/// 24-term schoolbook strategy for 3x3x3 with `a11 = 0`.
pub static SCHOOLBOOK_333_A11: LazyLock<Strategy> = LazyLock::new(|| {
    Strategy::schoolbook(Dims::new(3, 3, 3)).masked(&mask![(0, 0)])
});

/// Strassen's seven multiplications for the unconstrained 2x2x2 product,
/// reduced modulo 2.
///
/// Index map for m = n = k = 2: `a11 a12 a21 a22 -> 0 1 2 3`, same for b;
/// w positions are transposed, so `C11 C21 C12 C22 -> 0 1 2 3`.
pub static STRASSEN_MOD2: LazyLock<Strategy> = LazyLock::new(|| {
    let d = Dims::new(2, 2, 2);
    let terms = vec![
        // (a11+a22)(b11+b22) -> C11 + C22
        term!(d; u: [0, 3], v: [0, 3], w: [0, 3]),
        // (a21+a22) b11 -> C21 - C22
        term!(d; u: [2, 3], v: [0], w: [1, 3]),
        // a11 (b12-b22) -> C12 + C22
        term!(d; u: [0], v: [1, 3], w: [2, 3]),
        // a22 (b21-b11) -> C11 + C21
        term!(d; u: [3], v: [0, 2], w: [0, 1]),
        // (a11+a12) b22 -> C12 - C11
        term!(d; u: [0, 1], v: [3], w: [0, 2]),
        // (a21-a11)(b11+b12) -> C22
        term!(d; u: [0, 2], v: [0, 1], w: [3]),
        // (a12-a22)(b21+b22) -> C11
        term!(d; u: [1, 3], v: [2, 3], w: [0]),
    ];
    Strategy::new(d, terms).expect("well-formed fixture")
});
