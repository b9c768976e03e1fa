//! Low-rank bilinear strategies for sparse matrix multiplication.
//!
//! A *strategy* of rank `r` computes the product of small matrices with `r`
//! scalar multiplications of linear combinations of the operands' entries,
//! specialized to a known zero entry of A. The crate provides the three core
//! engines:
//!
//! - [`strategy`] / [`tensor`]: canonical tensor form of a strategy and the
//!   validity check against the (sparsity-constrained) matrix multiplication
//!   tensor.
//! - [`flip`]: stochastic rank reduction over GF(2) via rank-preserving flip
//!   rewrites.
//! - [`lift`]: order-by-order Hensel lifting of a modulo-2 strategy to
//!   Z/2^k.
//!
//! [`parse`] speaks the human-readable one-term-per-line format and
//! [`verify`] double-checks lifted strategies on random integer products.
//! Both engines report budget exhaustion and lift failure as ordinary tagged
//! outcomes; only malformed inputs and broken internal invariants are errors.
#![warn(clippy::pedantic)]

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod common;
pub mod flip;
mod gf2_linalg;
pub mod lift;
pub mod parse;
pub mod strategy;
pub mod tensor;
pub mod verify;

pub use common::{Dims, Error, SparsityMask};
pub use strategy::{LiftedStrategy, Strategy, Term};
pub use tensor::{BitTensor, IntTensor};
